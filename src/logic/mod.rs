pub mod associate;
pub mod outcome;
pub mod resolve;
pub mod validate;

pub use associate::*;
pub use outcome::*;
pub use resolve::*;
pub use validate::*;
