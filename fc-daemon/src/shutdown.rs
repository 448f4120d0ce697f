//! Shutdown signalling shared by the control loop and the status server

use tokio::sync::watch;

/// Resolve once shutdown is requested or the sender is gone
///
/// Cancel safe, so it can sit in a `select!` arm that is rebuilt every loop.
pub async fn requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
