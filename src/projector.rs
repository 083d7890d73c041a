use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::instrument;

use crate::error::ProtocolError;
use crate::handlers::{PowerCommand, PowerHandler, Response, StatusPoller};
use crate::link::{Command, Dispatcher, DispatcherHandle, LinkConnector};
use crate::protocol::PowerStatus;

/// Default wait between failed open attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Default wait between power status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Timing settings for a projector link.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct ProjectorConfig {
    #[builder(default = DEFAULT_RETRY_DELAY)]
    retry_delay: Duration,
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    poll_interval: Duration,
}

impl ProjectorConfig {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Running projector link: command dispatcher plus status poller.
///
/// This is the API consumed by outer surfaces such as an HTTP facade.
pub struct Projector {
    dispatcher: DispatcherHandle,
    status: watch::Receiver<PowerStatus>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl Projector {
    /// Starts the dispatcher and the status poller on the current runtime.
    ///
    /// ```
    /// # async fn demo() {
    /// use pjcontrol::{FakeProjectorConfig, Projector, ProjectorConfig, PowerStatus};
    ///
    /// let connector = pjcontrol::fake_connector(FakeProjectorConfig::builder().build());
    /// let projector = Projector::start(connector, ProjectorConfig::default());
    /// assert_eq!(PowerStatus::Unknown, projector.power_status());
    /// projector.shutdown().await;
    /// # }
    /// ```
    #[must_use]
    pub fn start(connector: Arc<dyn LinkConnector>, config: ProjectorConfig) -> Self {
        let shutdown = CancellationToken::new();
        let tasks = TaskTracker::new();

        let (dispatcher, dispatcher_task) =
            Dispatcher::spawn(connector, config.retry_delay, shutdown.child_token());
        let (status, poller_task) = StatusPoller::spawn(
            dispatcher.clone(),
            config.poll_interval,
            shutdown.child_token(),
        );
        tasks.spawn(async move {
            let _ = dispatcher_task.await;
        });
        tasks.spawn(async move {
            let _ = poller_task.await;
        });
        tasks.close();

        Self {
            dispatcher,
            status,
            shutdown,
            tasks,
        }
    }

    /// Last polled power status; [`PowerStatus::Unknown`] until the first poll succeeds.
    #[must_use]
    pub fn power_status(&self) -> PowerStatus {
        *self.status.borrow()
    }

    /// Stream of published power statuses, starting with the current one.
    #[must_use]
    pub fn status_changes(&self) -> WatchStream<PowerStatus> {
        WatchStream::new(self.status.clone())
    }

    /// Handle for queueing raw commands.
    #[must_use]
    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.dispatcher
    }

    /// Switches the projector on.
    ///
    /// # Errors
    ///
    /// Returns an error when the command fails to send or its reply is malformed.
    #[instrument(skip(self), level = "info")]
    pub async fn power_on(&self) -> Result<(), ProtocolError> {
        PowerHandler::set_power(&self.dispatcher, PowerCommand::On).await
    }

    /// Switches the projector off.
    ///
    /// # Errors
    ///
    /// Returns an error when the command fails to send or its reply is malformed.
    #[instrument(skip(self), level = "info")]
    pub async fn power_off(&self) -> Result<(), ProtocolError> {
        PowerHandler::set_power(&self.dispatcher, PowerCommand::Off).await
    }

    /// Reads the power status now instead of waiting for the next poll.
    ///
    /// # Errors
    ///
    /// Returns an error when the read fails or the reply is malformed.
    pub async fn refresh_power_status(&self) -> Result<PowerStatus, ProtocolError> {
        PowerHandler::read_status(&self.dispatcher).await
    }

    /// Queues one raw command and waits for it to resolve.
    ///
    /// # Errors
    ///
    /// Returns an error when the command fails to send or its reply is malformed.
    pub async fn send(&self, command: Command) -> Result<Option<Response>, ProtocolError> {
        Ok(self.dispatcher.enqueue(command).await?)
    }

    /// Stops polling and dispatching; queued commands fail with `DispatcherStopped`.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.tasks.wait().await;
    }
}

impl Drop for Projector {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
