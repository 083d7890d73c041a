use std::io;
use std::sync::Arc;
use std::time::Duration;

use strum_macros::Display;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use super::connector::{LinkConnector, LinkPort, PortReader, PortWriter};
use crate::error::LinkError;
use crate::handlers::Frame;
use crate::utils::format_hex;

const READ_BUFFER_LEN: usize = 64;

/// Lifecycle state of the projector link.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum LinkState {
    /// No port is open and no open attempt is running.
    #[strum(to_string = "closed")]
    Closed,
    /// An open attempt, or the wait before retrying one, is in progress.
    #[strum(to_string = "opening")]
    Opening,
    /// Open with no command in flight.
    #[strum(to_string = "idle")]
    Idle,
    /// A frame is being written.
    #[strum(to_string = "sending")]
    Sending,
    /// The frame was written and the link waits for the reply bytes.
    #[strum(to_string = "awaiting_reply")]
    AwaitingReply,
}

impl LinkState {
    /// Whether a port is currently open.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Idle | Self::Sending | Self::AwaitingReply)
    }
}

/// Completion of one asynchronous link operation.
pub(crate) enum LinkEvent {
    OpenFinished(Result<LinkPort, LinkError>),
    RetryDue,
    WriteFinished {
        generation: u64,
        writer: PortWriter,
        result: io::Result<usize>,
    },
    Inbound {
        generation: u64,
        chunk: Vec<u8>,
    },
    ReadStopped {
        generation: u64,
        error: Option<io::Error>,
    },
    TaskFailed(JoinError),
}

/// What an applied [`LinkEvent`] means for the active command.
#[derive(Debug)]
pub(crate) enum LinkOutcome {
    Nothing,
    Ready,
    /// A command that expects no reply was written.
    Sent { bytes_written: usize },
    SendFailed(io::Error),
    Reply(Vec<u8>),
    /// Bytes arrived while no reply was awaited.
    Unsolicited(Vec<u8>),
    /// The port closed underneath the session.
    Lost,
}

/// Owner of the physical link: opening with retries, writes and inbound chunks.
///
/// Every open, write and read runs as a spawned task whose completion comes
/// back through [`LinkSession::next_event`]; state only changes inside
/// [`LinkSession::apply`] and the `begin_*` calls.
pub(crate) struct LinkSession {
    connector: Arc<dyn LinkConnector>,
    retry_delay: Duration,
    state: LinkState,
    expects_reply: bool,
    writer: Option<PortWriter>,
    reader: Option<AbortHandle>,
    generation: u64,
    open_attempts: u64,
    open_waiters: Vec<oneshot::Sender<()>>,
    tasks: JoinSet<LinkEvent>,
    inbound_tx: mpsc::UnboundedSender<LinkEvent>,
    inbound_rx: mpsc::UnboundedReceiver<LinkEvent>,
}

impl LinkSession {
    pub(crate) fn new(connector: Arc<dyn LinkConnector>, retry_delay: Duration) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            retry_delay,
            state: LinkState::Closed,
            expects_reply: false,
            writer: None,
            reader: None,
            generation: 0,
            open_attempts: 0,
            open_waiters: Vec::new(),
            tasks: JoinSet::new(),
            inbound_tx,
            inbound_rx,
        }
    }

    pub(crate) fn state(&self) -> LinkState {
        self.state
    }

    /// Makes sure the link is open or opening; `waiter` fires once it is open.
    ///
    /// A request made while an attempt is running joins that attempt.
    pub(crate) fn ensure_open(&mut self, waiter: Option<oneshot::Sender<()>>) {
        if self.state.is_open() {
            if let Some(waiter) = waiter {
                let _ = waiter.send(());
            }
            return;
        }

        self.open_waiters.extend(waiter);
        if self.state == LinkState::Closed {
            self.begin_open();
        }
    }

    /// Starts writing `frame`. Only valid while [`LinkState::Idle`].
    ///
    /// Returns `false` when the link cannot take a frame right now.
    pub(crate) fn begin_send(&mut self, frame: Frame, expects_reply: bool) -> bool {
        if self.state != LinkState::Idle {
            return false;
        }
        let Some(mut writer) = self.writer.take() else {
            warn!("idle link has no writer; closing it");
            self.reset();
            return false;
        };

        self.state = LinkState::Sending;
        self.expects_reply = expects_reply;
        let generation = self.generation;
        self.tasks.spawn(async move {
            let result = write_frame(&mut writer, &frame).await;
            LinkEvent::WriteFinished {
                generation,
                writer,
                result,
            }
        });
        true
    }

    /// Waits for the next completion from any running link operation.
    ///
    /// Cancel safe.
    pub(crate) async fn next_event(&mut self) -> LinkEvent {
        tokio::select! {
            biased;
            Some(event) = self.inbound_rx.recv() => event,
            Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => match joined {
                Ok(event) => event,
                Err(error) => LinkEvent::TaskFailed(error),
            },
        }
    }

    /// Applies one completion to the link state.
    pub(crate) fn apply(&mut self, event: LinkEvent) -> LinkOutcome {
        match event {
            LinkEvent::OpenFinished(Ok(port)) => self.finish_open(port),
            LinkEvent::OpenFinished(Err(error)) => {
                error!(
                    error = %error,
                    attempt = self.open_attempts,
                    retry_in = ?self.retry_delay,
                    "error opening the link"
                );
                let retry_delay = self.retry_delay;
                self.tasks.spawn(async move {
                    tokio::time::sleep(retry_delay).await;
                    LinkEvent::RetryDue
                });
                LinkOutcome::Nothing
            }
            LinkEvent::RetryDue => {
                if self.state == LinkState::Opening {
                    self.spawn_open();
                }
                LinkOutcome::Nothing
            }
            LinkEvent::WriteFinished {
                generation,
                writer,
                result,
            } => {
                if generation != self.generation || self.state != LinkState::Sending {
                    return LinkOutcome::Nothing;
                }
                self.writer = Some(writer);
                match result {
                    Ok(bytes_written) if self.expects_reply => {
                        debug!(bytes_written, "frame sent, awaiting reply");
                        self.state = LinkState::AwaitingReply;
                        LinkOutcome::Nothing
                    }
                    Ok(bytes_written) => {
                        debug!(bytes_written, "frame sent");
                        self.state = LinkState::Idle;
                        LinkOutcome::Sent { bytes_written }
                    }
                    Err(error) => {
                        self.state = LinkState::Idle;
                        LinkOutcome::SendFailed(error)
                    }
                }
            }
            LinkEvent::Inbound { generation, chunk } => {
                if generation != self.generation {
                    return LinkOutcome::Nothing;
                }
                debug!(chunk = %format_hex(&chunk), "received bytes");
                match self.state {
                    LinkState::AwaitingReply => {
                        self.state = LinkState::Idle;
                        LinkOutcome::Reply(chunk)
                    }
                    // The reply overtook the write completion; the link stays
                    // in Sending until the writer comes back.
                    LinkState::Sending if self.expects_reply => {
                        self.expects_reply = false;
                        LinkOutcome::Reply(chunk)
                    }
                    _ => LinkOutcome::Unsolicited(chunk),
                }
            }
            LinkEvent::ReadStopped { generation, error } => {
                if generation != self.generation {
                    return LinkOutcome::Nothing;
                }
                match error {
                    Some(error) => warn!(%error, "link read failed; closing the link"),
                    None => warn!("link closed by the device"),
                }
                self.reset();
                LinkOutcome::Lost
            }
            LinkEvent::TaskFailed(error) => {
                if error.is_cancelled() {
                    return LinkOutcome::Nothing;
                }
                error!(%error, "link task failed; closing the link");
                self.reset();
                LinkOutcome::Lost
            }
        }
    }

    fn begin_open(&mut self) {
        self.state = LinkState::Opening;
        self.spawn_open();
    }

    fn spawn_open(&mut self) {
        self.open_attempts += 1;
        info!(attempt = self.open_attempts, "attempting to open the link");
        let connector = Arc::clone(&self.connector);
        self.tasks
            .spawn(async move { LinkEvent::OpenFinished(connector.open().await) });
    }

    fn finish_open(&mut self, port: LinkPort) -> LinkOutcome {
        if self.state != LinkState::Opening {
            debug!(state = %self.state, "dropping port from an open attempt nobody waits for");
            return LinkOutcome::Nothing;
        }

        info!(attempts = self.open_attempts, "link opened");
        let (reader, writer) = port.into_halves();
        self.generation += 1;
        self.open_attempts = 0;
        self.writer = Some(writer);
        self.reader = Some(self.tasks.spawn(read_chunks(
            reader,
            self.generation,
            self.inbound_tx.clone(),
        )));
        self.state = LinkState::Idle;

        for waiter in self.open_waiters.drain(..) {
            let _ = waiter.send(());
        }
        LinkOutcome::Ready
    }

    /// Drops the open port and returns to [`LinkState::Closed`].
    fn reset(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.writer = None;
        self.generation += 1;
        self.state = LinkState::Closed;
    }
}

async fn write_frame(writer: &mut PortWriter, frame: &Frame) -> io::Result<usize> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(frame.len())
}

/// Forwards each successful read as one inbound chunk until the port closes.
async fn read_chunks(
    mut reader: PortReader,
    generation: u64,
    inbound: mpsc::UnboundedSender<LinkEvent>,
) -> LinkEvent {
    let mut buffer = [0u8; READ_BUFFER_LEN];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                return LinkEvent::ReadStopped {
                    generation,
                    error: None,
                };
            }
            Ok(read) => {
                let event = LinkEvent::Inbound {
                    generation,
                    chunk: buffer[..read].to_vec(),
                };
                if inbound.send(event).is_err() {
                    return LinkEvent::ReadStopped {
                        generation,
                        error: None,
                    };
                }
            }
            Err(error) => {
                return LinkEvent::ReadStopped {
                    generation,
                    error: Some(error),
                };
            }
        }
    }
}
