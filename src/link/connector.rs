use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use super::fake_backend::{FakeConnector, FakeProjectorConfig};
use super::serial_backend::SerialConnector;
use crate::error::LinkError;

/// Read half of an open link.
pub type PortReader = Box<dyn AsyncRead + Send + Unpin>;
/// Write half of an open link.
pub type PortWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Runtime link backend selection.
#[derive(Debug)]
pub(crate) enum LinkBackend {
    Serial { path: String, baud_rate: u32 },
    Fake(FakeProjectorConfig),
}

/// Builds an injected connector for the selected runtime backend.
pub(crate) fn connector_from_backend(backend: LinkBackend) -> Arc<dyn LinkConnector> {
    match backend {
        LinkBackend::Serial { path, baud_rate } => {
            Arc::new(SerialConnector::new(path, baud_rate))
        }
        LinkBackend::Fake(config) => {
            info!("using simulated projector link");
            Arc::new(FakeConnector::new(config))
        }
    }
}

/// Opens the physical link to the projector.
///
/// Each successful call yields a fresh port; the session calls it again after
/// an open failure or after the previous port closed.
#[async_trait]
pub trait LinkConnector: Send + Sync {
    /// Attempts to open the link once.
    async fn open(&self) -> Result<LinkPort, LinkError>;
}

/// An open link split into independently owned halves.
pub struct LinkPort {
    reader: PortReader,
    writer: PortWriter,
}

impl LinkPort {
    /// Wraps already split read and write halves.
    #[must_use]
    pub fn new(reader: PortReader, writer: PortWriter) -> Self {
        Self { reader, writer }
    }

    /// Splits any bidirectional stream into a port.
    ///
    /// ```
    /// let (_device, host) = tokio::io::duplex(64);
    /// let port = pjcontrol::LinkPort::from_stream(host);
    /// let _ = port;
    /// ```
    #[must_use]
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(Box::new(reader), Box::new(writer))
    }

    pub(crate) fn into_halves(self) -> (PortReader, PortWriter) {
        (self.reader, self.writer)
    }
}

impl fmt::Debug for LinkPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkPort").finish_non_exhaustive()
    }
}
