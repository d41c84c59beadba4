use crate::metrics::MetricsSnapshot;
use crate::spammer::{SpamMode, Spammer};
use crate::traits::LedgerClient;
use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, Instrument};

pub struct SpamRunner;

impl SpamRunner {
    /// Runs the spammer on its own task until it halts. Ctrl+C becomes a
    /// cooperative stop request. Returns the spammer so its final state can
    /// be inspected, plus a metrics snapshot.
    pub async fn run<C>(mut spammer: Spammer<C>, mode: SpamMode) -> Result<(Spammer<C>, MetricsSnapshot)>
    where
        C: LedgerClient + 'static,
    {
        let handle = spammer.handle();
        let signal_handle = handle.clone();

        let signal_task = tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. Finishing the current iteration...");
                    signal_handle.stop();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        let start_time = std::time::Instant::now();
        let span = tracing::info_span!("spammer", rpc = %spammer.active_client().rpc_url());

        let worker = tokio::spawn(
            async move {
                spammer.start(mode).await;
                spammer
            }
            .instrument(span),
        );

        let joined = worker.await;
        signal_task.abort();
        let spammer = joined.context("Spammer task panicked or was cancelled")?;

        let snapshot = handle.metrics();
        info!("🛑 Spammer halted.");
        info!(
            "Total Time: {:.1}s | Submitted: {} | Success: {} | Failed: {} | Success Rate: {:.2}% | Rotations: {}",
            start_time.elapsed().as_secs_f64(),
            snapshot.submissions.total,
            snapshot.submissions.success,
            snapshot.submissions.failed,
            snapshot.submissions.success_rate,
            snapshot.rpc.rotations
        );

        Ok((spammer, snapshot))
    }
}
