use anyhow::Context;
use chrono::Utc;
use custodian::cli::{GcArgs, init_logging};
use custodian::{ClientConfig, ContainerClient, GarbageCollector};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args = GcArgs::parse();
    let options = args.into_options(Utc::now())?;
    let client_config = ClientConfig::from_env(options.timeout)?;

    let client = ContainerClient::connect(&client_config)
        .await
        .with_context(|| format!("could not reach the daemon at {}", client_config.host))?;

    let report = GarbageCollector::new(&client, &options.gc).run().await;
    info!("Garbage collection finished: {}", report);
    Ok(())
}
