use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels `cancelation` on Ctrl-C, or returns early if somebody else cancels it first. Used by
/// long running commands so that tickers and feeds are torn down before exiting.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {}
    };
}
