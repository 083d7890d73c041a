use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::connector::LinkConnector;
use super::session::{LinkOutcome, LinkSession, LinkState};
use crate::error::CommandError;
use crate::handlers::{FrameCodec, Response};
use crate::protocol::{CommandKind, ItemNumber};
use crate::utils::format_hex;

/// Result delivered to the caller of a queued command.
pub type CommandResult = Result<Option<Response>, CommandError>;

/// One get or set request for the projector.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Command {
    item_number: ItemNumber,
    kind: CommandKind,
    data: u16,
}

impl Command {
    /// Reads a register.
    ///
    /// ```
    /// use pjcontrol::{Command, ItemNumber};
    ///
    /// let command = Command::get(ItemNumber::POWER_STATUS);
    /// assert!(command.expects_reply());
    /// ```
    #[must_use]
    pub fn get(item_number: ItemNumber) -> Self {
        Self {
            item_number,
            kind: CommandKind::Get,
            data: 0x0000,
        }
    }

    /// Writes `data` to a register or triggers an action.
    #[must_use]
    pub fn set(item_number: ItemNumber, data: u16) -> Self {
        Self {
            item_number,
            kind: CommandKind::Set,
            data,
        }
    }

    #[must_use]
    pub fn item_number(&self) -> ItemNumber {
        self.item_number
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    #[must_use]
    pub fn data(&self) -> u16 {
        self.data
    }

    /// Whether the dispatcher waits for a reply frame after writing this command.
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.item_number.expects_reply()
    }
}

/// Completion handle for one queued command.
///
/// Resolves exactly once: with the decoded reply, with `None` for commands
/// that expect no reply, or with the reason the command failed.
#[derive(Debug)]
#[must_use = "a ticket does nothing unless awaited; the command is queued either way"]
pub struct CommandTicket {
    receiver: oneshot::Receiver<CommandResult>,
}

impl Future for CommandTicket {
    type Output = CommandResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CommandError::DispatcherStopped)))
    }
}

#[derive(Debug)]
struct PendingCommand {
    command: Command,
    completion: oneshot::Sender<CommandResult>,
}

impl PendingCommand {
    fn resolve(self, result: CommandResult) {
        if self.completion.send(result).is_err() {
            debug!(item_number = %self.command.item_number, "command resolved after its ticket was dropped");
        }
    }
}

enum DispatcherRequest {
    Enqueue(PendingCommand),
    EnsureOpen(oneshot::Sender<()>),
    LinkState(oneshot::Sender<LinkState>),
}

/// Cloneable handle for submitting commands to a running [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    requests: mpsc::UnboundedSender<DispatcherRequest>,
}

impl DispatcherHandle {
    /// Appends `command` to the queue tail.
    ///
    /// ```
    /// # async fn demo(handle: pjcontrol::DispatcherHandle) -> Result<(), pjcontrol::CommandError> {
    /// use pjcontrol::{Command, ItemNumber};
    ///
    /// let reply = handle.enqueue(Command::get(ItemNumber::POWER_STATUS)).await?;
    /// let _ = reply;
    /// # Ok(())
    /// # }
    /// ```
    pub fn enqueue(&self, command: Command) -> CommandTicket {
        let (completion, receiver) = oneshot::channel();
        let pending = PendingCommand {
            command,
            completion,
        };
        if self
            .requests
            .send(DispatcherRequest::Enqueue(pending))
            .is_err()
        {
            debug!(item_number = %command.item_number, "dispatcher stopped before enqueue");
        }
        CommandTicket { receiver }
    }

    /// Waits until the link is open, joining any open attempt in progress.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::DispatcherStopped`] if the dispatcher exits first.
    pub async fn ensure_open(&self) -> Result<(), CommandError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        self.requests
            .send(DispatcherRequest::EnsureOpen(ready_tx))
            .map_err(|_| CommandError::DispatcherStopped)?;
        ready_rx.await.map_err(|_| CommandError::DispatcherStopped)
    }

    /// Returns the current link state.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::DispatcherStopped`] if the dispatcher has exited.
    pub async fn link_state(&self) -> Result<LinkState, CommandError> {
        let (state_tx, state_rx) = oneshot::channel();
        self.requests
            .send(DispatcherRequest::LinkState(state_tx))
            .map_err(|_| CommandError::DispatcherStopped)?;
        state_rx.await.map_err(|_| CommandError::DispatcherStopped)
    }
}

enum Step {
    Shutdown,
    Request(Option<DispatcherRequest>),
    Link(super::session::LinkEvent),
}

/// Single owner of the command queue and the link.
///
/// Runs as one task; queue, active command and link state are only touched
/// from its event loop, so at most one command is ever in flight and commands
/// go out in the order they were enqueued.
pub struct Dispatcher {
    link: LinkSession,
    queue: VecDeque<PendingCommand>,
    active: Option<PendingCommand>,
    requests: mpsc::UnboundedReceiver<DispatcherRequest>,
    accepting: bool,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Spawns the dispatcher task and returns its handle.
    ///
    /// The task stops when `shutdown` is cancelled, or when every handle is
    /// dropped and the queue has drained.
    pub fn spawn(
        connector: Arc<dyn LinkConnector>,
        retry_delay: Duration,
        shutdown: CancellationToken,
    ) -> (DispatcherHandle, tokio::task::JoinHandle<()>) {
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let dispatcher = Self {
            link: LinkSession::new(connector, retry_delay),
            queue: VecDeque::new(),
            active: None,
            requests,
            accepting: true,
            shutdown,
        };
        let task = tokio::spawn(dispatcher.run());
        (
            DispatcherHandle {
                requests: requests_tx,
            },
            task,
        )
    }

    #[instrument(skip(self), name = "dispatcher", level = "debug")]
    async fn run(mut self) {
        loop {
            let step = tokio::select! {
                () = self.shutdown.cancelled() => Step::Shutdown,
                request = self.requests.recv(), if self.accepting => Step::Request(request),
                event = self.link.next_event() => Step::Link(event),
            };

            match step {
                Step::Shutdown => break,
                Step::Request(Some(request)) => self.handle_request(request),
                Step::Request(None) => self.accepting = false,
                Step::Link(event) => self.handle_link_event(event),
            }
            self.pump();

            if !self.accepting && self.queue.is_empty() && self.active.is_none() {
                break;
            }
        }

        info!(
            dropped_commands = self.queue.len() + usize::from(self.active.is_some()),
            "dispatcher stopped"
        );
    }

    fn handle_request(&mut self, request: DispatcherRequest) {
        match request {
            DispatcherRequest::Enqueue(pending) => {
                debug!(
                    item_number = %pending.command.item_number,
                    kind = %pending.command.kind,
                    queued = self.queue.len(),
                    "command enqueued"
                );
                self.queue.push_back(pending);
            }
            DispatcherRequest::EnsureOpen(ready) => self.link.ensure_open(Some(ready)),
            DispatcherRequest::LinkState(reply) => {
                let _ = reply.send(self.link.state());
            }
        }
    }

    fn handle_link_event(&mut self, event: super::session::LinkEvent) {
        match self.link.apply(event) {
            LinkOutcome::Nothing | LinkOutcome::Ready => {}
            LinkOutcome::Sent { bytes_written } => {
                if let Some(active) = self.active.take() {
                    debug!(item_number = %active.command.item_number, bytes_written, "command sent without reply");
                    active.resolve(Ok(None));
                }
            }
            LinkOutcome::SendFailed(source) => {
                if let Some(active) = self.active.take() {
                    let item_number = active.command.item_number;
                    error!(%item_number, error = %source, "error when sending command");
                    active.resolve(Err(CommandError::Write {
                        item_number,
                        source,
                    }));
                }
            }
            LinkOutcome::Reply(chunk) => {
                let Some(active) = self.active.take() else {
                    warn!(chunk = %format_hex(&chunk), "reply arrived with no active command");
                    return;
                };
                let item_number = active.command.item_number;
                match FrameCodec::decode(&chunk) {
                    Ok(response) => {
                        debug!(
                            %item_number,
                            reply_item = %response.item_number(),
                            data = response.data(),
                            is_reply = response.is_reply(),
                            "command answered"
                        );
                        active.resolve(Ok(Some(response)));
                    }
                    Err(source) => {
                        warn!(%item_number, error = %source, "invalid response");
                        active.resolve(Err(CommandError::Framing {
                            item_number,
                            source,
                        }));
                    }
                }
            }
            LinkOutcome::Unsolicited(chunk) => match FrameCodec::decode(&chunk) {
                Ok(response) => debug!(
                    item_number = %response.item_number(),
                    data = response.data(),
                    is_reply = response.is_reply(),
                    "discarding unsolicited frame"
                ),
                Err(error) => debug!(%error, "discarding unsolicited bytes"),
            },
            LinkOutcome::Lost => {
                if let Some(active) = self.active.take() {
                    let item_number = active.command.item_number;
                    active.resolve(Err(CommandError::LinkLost { item_number }));
                }
            }
        }
    }

    /// Sends the queue head when the link is idle; opens the link when needed.
    ///
    /// Called after every event from the run loop, never from itself.
    fn pump(&mut self) {
        while self.active.is_none() && !self.queue.is_empty() {
            match self.link.state() {
                LinkState::Idle => {}
                LinkState::Closed => {
                    self.link.ensure_open(None);
                    return;
                }
                LinkState::Opening | LinkState::Sending | LinkState::AwaitingReply => return,
            }

            let Some(pending) = self.queue.pop_front() else {
                return;
            };
            let command = pending.command;
            let frame = FrameCodec::encode(command.item_number, command.kind, command.data);
            debug!(item_number = %command.item_number, frame = %format_hex(&frame), "sending command");

            if self.link.begin_send(frame, command.expects_reply()) {
                self.active = Some(pending);
            } else {
                pending.resolve(Err(CommandError::LinkLost {
                    item_number: command.item_number,
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn ticket_reports_stopped_dispatcher() {
        let (completion, receiver) = oneshot::channel::<CommandResult>();
        drop(completion);

        assert_matches!(
            CommandTicket { receiver }.await,
            Err(CommandError::DispatcherStopped)
        );
    }

    #[test]
    fn set_command_keeps_its_data_word() {
        let command = Command::set(ItemNumber::new(0x0020), 0x8001);

        assert_eq!(CommandKind::Set, command.kind());
        assert_eq!(0x8001, command.data());
        assert!(command.expects_reply());
    }
}
