pub mod batch;
pub mod common;
pub mod picture;
pub mod requests;
pub mod tags;
pub mod trainer;

pub use batch::*;
pub use common::*;
pub use picture::*;
pub use requests::*;
pub use tags::*;
pub use trainer::*;
