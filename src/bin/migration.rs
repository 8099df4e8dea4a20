use procurement_api::{config, migrator};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("Starting database migration");
    migrator::run_migration(cfg.database_url()).await?;
    info!("Migration completed successfully");

    Ok(())
}
