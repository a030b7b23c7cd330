mod telemetry;

use booking_rules_engine::job_schedulers::{
    start_rules_job_scheduler, start_send_notifications_job,
};
use booking_rules_infra::{run_migration, setup_context};
use telemetry::{get_subscriber, init_subscriber};
use tokio::task::LocalSet;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("booking_rules".into(), "info".into());
    init_subscriber(subscriber)?;

    run_migration().await?;
    let context = setup_context().await?;

    // The usecases are not `Send`, the jobs run on the current thread
    let local = LocalSet::new();
    local
        .run_until(async move {
            start_rules_job_scheduler(context.clone());
            start_send_notifications_job(context);
            info!("Started the job schedulers");

            tokio::signal::ctrl_c().await
        })
        .await?;
    info!("Shutting down");

    Ok(())
}
