use app_hub::config::HubConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HubConfig::from_env()?;
    app_hub::init_tracing(config.log_dir.as_deref())?;
    app_hub::run(config).await?;
    Ok(())
}
