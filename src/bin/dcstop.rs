use anyhow::Context;
use chrono::Utc;
use custodian::cli::{StopArgs, init_logging};
use custodian::{ClientConfig, ContainerClient, ContainerStopper};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args = StopArgs::parse();
    let timeout = args.timeout;
    let config = args.into_config(Utc::now())?;
    let client_config = ClientConfig::from_env(timeout)?;

    let client = ContainerClient::connect(&client_config)
        .await
        .with_context(|| format!("could not reach the daemon at {}", client_config.host))?;

    let report = ContainerStopper::new(&client, &config)
        .stop_containers()
        .await;
    info!("Stopping finished: {}", report);
    Ok(())
}
