use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::PowerHandler;
use crate::error::{CommandError, ProtocolError};
use crate::link::DispatcherHandle;
use crate::protocol::PowerStatus;

/// Periodic reader of the power status register.
///
/// The next poll is scheduled only after the previous one resolved, so a slow
/// device delays polling instead of stacking requests in the queue.
pub struct StatusPoller;

impl StatusPoller {
    /// Spawns the polling task and returns the published status.
    ///
    /// The first poll is queued immediately.
    pub fn spawn(
        dispatcher: DispatcherHandle,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> (watch::Receiver<PowerStatus>, JoinHandle<()>) {
        let (status_tx, status_rx) = watch::channel(PowerStatus::Unknown);
        let task = tokio::spawn(Self::run(dispatcher, interval, status_tx, shutdown));
        (status_rx, task)
    }

    #[instrument(skip_all, name = "status_poller", level = "debug", fields(?interval))]
    async fn run(
        dispatcher: DispatcherHandle,
        interval: Duration,
        status: watch::Sender<PowerStatus>,
        shutdown: CancellationToken,
    ) {
        loop {
            let polled = tokio::select! {
                () = shutdown.cancelled() => break,
                polled = PowerHandler::read_status(&dispatcher) => polled,
            };

            match polled {
                Ok(current) => {
                    publish(&status, current);
                }
                Err(ProtocolError::Command(error))
                    if matches!(*error, CommandError::DispatcherStopped) =>
                {
                    break;
                }
                Err(error) => warn!(%error, "power status poll failed"),
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
    }
}

/// Stores `current`, logging only when it differs from the previous status.
fn publish(status: &watch::Sender<PowerStatus>, current: PowerStatus) -> bool {
    status.send_if_modified(|previous| {
        if *previous == current {
            return false;
        }
        info!(from = %previous, to = %current, "power state changed");
        *previous = current;
        true
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn publish_reports_only_changes() {
        let (status, receiver) = watch::channel(PowerStatus::Unknown);

        assert!(publish(&status, PowerStatus::Standby));
        assert!(!publish(&status, PowerStatus::Standby));
        assert!(publish(&status, PowerStatus::Startup));
        assert_eq!(PowerStatus::Startup, *receiver.borrow());
    }
}
