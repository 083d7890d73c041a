use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bon::Builder;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tracing::{debug, warn};

use super::connector::{LinkConnector, LinkPort};
use crate::error::{LinkError, ValueParseError};
use crate::handlers::{FrameCodec, Request};
use crate::protocol::{CommandKind, FRAME_LEN, ItemNumber, PowerStatus};

const PIPE_CAPACITY: usize = 64;

/// Settings for the simulated projector.
#[derive(Debug, Clone, Builder)]
pub struct FakeProjectorConfig {
    /// Power status reported before any power command is received.
    #[builder(default = PowerStatus::Standby)]
    initial_status: PowerStatus,
    /// Number of open attempts that fail before the link comes up.
    #[builder(default)]
    open_failures: usize,
}

/// Connector that serves each open with an in-memory simulated projector.
#[derive(Debug)]
pub(crate) struct FakeConnector {
    projector: Arc<Mutex<FakeProjector>>,
}

impl FakeConnector {
    pub(crate) fn new(config: FakeProjectorConfig) -> Self {
        Self {
            projector: Arc::new(Mutex::new(FakeProjector {
                status: config.initial_status,
                remaining_open_failures: config.open_failures,
            })),
        }
    }
}

#[async_trait]
impl LinkConnector for FakeConnector {
    async fn open(&self) -> Result<LinkPort, LinkError> {
        {
            let mut projector = self
                .projector
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if projector.remaining_open_failures > 0 {
                projector.remaining_open_failures -= 1;
                return Err(LinkError::SimulatedOpenFailure {
                    remaining: projector.remaining_open_failures,
                });
            }
        }

        let (device_side, host_side) = tokio::io::duplex(PIPE_CAPACITY);
        tokio::spawn(serve_device(device_side, Arc::clone(&self.projector)));
        Ok(LinkPort::from_stream(host_side))
    }
}

#[derive(Debug)]
struct FakeProjector {
    status: PowerStatus,
    remaining_open_failures: usize,
}

impl FakeProjector {
    /// Applies one request and returns the data word to reply with, if any.
    fn handle(&mut self, request: Request) -> Option<u16> {
        let item_number = request.item_number();
        if !item_number.expects_reply() {
            return None;
        }

        match (request.kind(), item_number) {
            (CommandKind::Get, ItemNumber::POWER_STATUS) => {
                let reported = self.status;
                self.status = match reported {
                    PowerStatus::Startup | PowerStatus::StartupLamp => PowerStatus::PowerOn,
                    PowerStatus::Cooling1 | PowerStatus::Cooling2 => PowerStatus::Standby,
                    other => other,
                };
                Some(u16::from_be_bytes(reported.as_raw().to_be_bytes()))
            }
            (CommandKind::Set, ItemNumber::POWER_ON) => {
                if !matches!(self.status, PowerStatus::PowerOn) {
                    self.status = PowerStatus::Startup;
                }
                Some(0x0000)
            }
            (CommandKind::Set, ItemNumber::POWER_OFF) => {
                if matches!(self.status, PowerStatus::PowerOn) {
                    self.status = PowerStatus::Cooling1;
                }
                Some(0x0000)
            }
            (CommandKind::Get, _) => Some(0x0000),
            (CommandKind::Set, _) => Some(request.data()),
        }
    }
}

async fn serve_device(mut stream: DuplexStream, projector: Arc<Mutex<FakeProjector>>) {
    let mut frame = [0u8; FRAME_LEN];
    while stream.read_exact(&mut frame).await.is_ok() {
        let request = match FrameCodec::decode_request(&frame) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "simulated projector ignored a malformed request");
                continue;
            }
        };

        let reply = projector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle(request);
        let Some(data) = reply else {
            debug!(item_number = %request.item_number(), "simulated projector sends no reply");
            continue;
        };

        let response = FrameCodec::encode_response(request.item_number(), data, true);
        if stream.write_all(&response).await.is_err() {
            break;
        }
    }
}

/// Parses a power status name such as `standby` or `PowerOn`.
pub(crate) fn parse_power_status(value: &str) -> Result<PowerStatus, ValueParseError> {
    value
        .parse()
        .map_err(|_| ValueParseError::UnknownPowerStatus {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn projector(status: PowerStatus) -> FakeProjector {
        FakeProjector {
            status,
            remaining_open_failures: 0,
        }
    }

    fn request(item_number: ItemNumber, kind: CommandKind, data: u16) -> Request {
        let frame = FrameCodec::encode(item_number, kind, data);
        FrameCodec::decode_request(&frame).expect("test request should decode")
    }

    #[test]
    fn power_on_passes_through_startup() {
        let mut projector = projector(PowerStatus::Standby);
        let status = request(ItemNumber::POWER_STATUS, CommandKind::Get, 0);

        assert_eq!(
            Some(0),
            projector.handle(request(ItemNumber::POWER_ON, CommandKind::Set, 0))
        );
        assert_eq!(Some(1), projector.handle(status));
        assert_eq!(Some(3), projector.handle(status));
    }

    #[test]
    fn power_off_passes_through_cooling() {
        let mut projector = projector(PowerStatus::PowerOn);
        let status = request(ItemNumber::POWER_STATUS, CommandKind::Get, 0);

        projector.handle(request(ItemNumber::POWER_OFF, CommandKind::Set, 0));
        assert_eq!(Some(4), projector.handle(status));
        assert_eq!(Some(0), projector.handle(status));
    }

    #[test]
    fn ir_emulation_items_get_no_reply() {
        let mut projector = projector(PowerStatus::Standby);
        assert_eq!(
            None,
            projector.handle(request(ItemNumber::new(0x0117), CommandKind::Set, 0))
        );
    }

    #[test]
    fn unknown_status_is_reported_as_all_ones() {
        let mut projector = projector(PowerStatus::Unknown);
        assert_eq!(
            Some(0xFFFF),
            projector.handle(request(ItemNumber::POWER_STATUS, CommandKind::Get, 0))
        );
    }

    #[rstest]
    #[case("standby", PowerStatus::Standby)]
    #[case("PowerOn", PowerStatus::PowerOn)]
    #[case("savingcooling2", PowerStatus::SavingCooling2)]
    fn parse_power_status_accepts_names(#[case] value: &str, #[case] expected: PowerStatus) {
        assert_eq!(
            expected,
            parse_power_status(value).expect("status name should parse")
        );
    }

    #[test]
    fn parse_power_status_rejects_unknown_names() {
        assert_matches!(
            parse_power_status("warming"),
            Err(ValueParseError::UnknownPowerStatus { value }) if value == "warming"
        );
    }

    #[tokio::test]
    async fn connector_fails_configured_number_of_opens() {
        let connector = FakeConnector::new(
            FakeProjectorConfig::builder()
                .open_failures(2)
                .build(),
        );

        assert_matches!(
            connector.open().await,
            Err(LinkError::SimulatedOpenFailure { remaining: 1 })
        );
        assert_matches!(
            connector.open().await,
            Err(LinkError::SimulatedOpenFailure { remaining: 0 })
        );
        assert_matches!(connector.open().await, Ok(_));
    }
}
