#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use pjcontrol::{FRAME_LEN, FrameCodec, ItemNumber, LinkConnector, LinkError, LinkPort, Request};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, WriteHalf};
use tokio::sync::mpsc;

const PIPE_CAPACITY: usize = 64;

/// In-memory link whose device ends are handed to the test.
pub struct PipeLink {
    connector: Arc<PipeConnector>,
    devices: mpsc::UnboundedReceiver<DuplexStream>,
}

impl PipeLink {
    pub fn new() -> Self {
        Self::with_settings(0, None)
    }

    pub fn with_open_failures(failures: usize) -> Self {
        Self::with_settings(failures, None)
    }

    /// Writes of frames addressed to `item_number` fail on the host side.
    pub fn with_faulty_item(item_number: ItemNumber) -> Self {
        Self::with_settings(0, Some(item_number))
    }

    fn with_settings(failures: usize, faulty_item: Option<ItemNumber>) -> Self {
        let (devices_tx, devices) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(PipeConnector {
                attempts: AtomicUsize::new(0),
                failures: AtomicUsize::new(failures),
                faulty_item,
                devices: devices_tx,
            }),
            devices,
        }
    }

    pub fn connector(&self) -> Arc<dyn LinkConnector> {
        self.connector.clone()
    }

    /// Number of open attempts made so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.connector.attempts.load(Ordering::SeqCst)
    }

    pub async fn next_device(&mut self) -> Device {
        let stream = self
            .devices
            .recv()
            .await
            .expect("connector should hand over a device end");
        Device { stream }
    }
}

struct PipeConnector {
    attempts: AtomicUsize,
    failures: AtomicUsize,
    faulty_item: Option<ItemNumber>,
    devices: mpsc::UnboundedSender<DuplexStream>,
}

#[async_trait]
impl LinkConnector for PipeConnector {
    async fn open(&self) -> Result<LinkPort, LinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
        {
            return Err(LinkError::Io(io::Error::other("device busy")));
        }

        let (device, host) = tokio::io::duplex(PIPE_CAPACITY);
        let _ = self.devices.send(device);
        let (reader, writer) = tokio::io::split(host);
        Ok(LinkPort::new(
            Box::new(reader),
            Box::new(FaultyWriter {
                inner: writer,
                faulty_item: self.faulty_item,
            }),
        ))
    }
}

struct FaultyWriter {
    inner: WriteHalf<DuplexStream>,
    faulty_item: Option<ItemNumber>,
}

impl AsyncWrite for FaultyWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(item_number) = self.faulty_item
            && buf.get(1..3) == Some(&item_number.raw().to_be_bytes()[..])
        {
            return Poll::Ready(Err(io::Error::other("line fault")));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Projector side of a [`PipeLink`].
pub struct Device {
    stream: DuplexStream,
}

impl Device {
    pub async fn read_request(&mut self) -> Request {
        let mut frame = [0u8; FRAME_LEN];
        self.stream
            .read_exact(&mut frame)
            .await
            .expect("device should receive a full frame");
        FrameCodec::decode_request(&frame).expect("host should send well-formed requests")
    }

    pub async fn reply(&mut self, item_number: ItemNumber, data: u16) {
        let frame = FrameCodec::encode_response(item_number, data, true);
        self.send_raw(&frame).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream
            .write_all(bytes)
            .await
            .expect("device should be able to write");
    }

    /// Asserts the host sends nothing for `duration`.
    pub async fn assert_silent_for(&mut self, duration: Duration) {
        let mut byte = [0u8; 1];
        let read = tokio::time::timeout(duration, self.stream.read(&mut byte)).await;
        assert!(read.is_err(), "host sent unexpected bytes: {read:?}");
    }
}
