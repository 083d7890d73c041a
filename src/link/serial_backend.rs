use async_trait::async_trait;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};
use tracing::instrument;

use super::connector::{LinkConnector, LinkPort};
use crate::error::LinkError;

/// Connector for the projector's RS-232 port: 8 data bits, even parity, 1 stop bit.
#[derive(Debug, Clone)]
pub(crate) struct SerialConnector {
    path: String,
    baud_rate: u32,
}

impl SerialConnector {
    pub(crate) fn new(path: String, baud_rate: u32) -> Self {
        Self { path, baud_rate }
    }
}

#[async_trait]
impl LinkConnector for SerialConnector {
    #[instrument(skip(self), level = "debug", fields(path = %self.path, baud_rate = self.baud_rate))]
    async fn open(&self) -> Result<LinkPort, LinkError> {
        let stream = tokio_serial::new(self.path.as_str(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|source| LinkError::Serial {
                path: self.path.clone(),
                source,
            })?;

        Ok(LinkPort::from_stream(stream))
    }
}
