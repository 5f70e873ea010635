//! Forwarder service binary.

use forwarder_service::{Application, Config};
use relay_common::{init_tracing, wait_for_signal};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.tracing);

    info!(
        environment = %config.environment,
        node_id = %config.node,
        topic = %config.topic(),
        "Starting forwarder service"
    );

    let app = Application::new(&config).await?;
    let consumer_task = app.run();
    info!("Forwarder service is running");

    wait_for_signal().await;

    let report = app
        .terminators(consumer_task)
        .shutdown(config.shutdown_timeout)
        .await;
    if report.failed > 0 || report.timed_out {
        error!(?report, "Shutdown did not complete cleanly");
    }

    info!("Forwarder service stopped");
    Ok(())
}
