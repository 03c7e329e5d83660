use clap::Parser;
use linko_gateway::{server, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let _guard = linko_telemetry::init(&config.telemetry())?;

    server::run(config).await?;
    Ok(())
}
