use media_catalog::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Info by default, sqlx debug logs suppressed; RUST_LOG still overrides
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}, backend={:?}, dedup={:?}",
        config.server_address(),
        config.database.backend,
        config.associations.dedup
    );

    let load_seed = std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true";
    media_catalog::run_server(config, load_seed).await
}
