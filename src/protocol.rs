use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Frame start code.
pub(crate) const START_CODE: u8 = 0xA9;
/// Frame end code.
pub(crate) const END_CODE: u8 = 0x9A;
/// Fixed wire length of every frame in both directions.
pub const FRAME_LEN: usize = 8;

/// Type code for an outbound set request.
pub(crate) const TYPE_SET: u8 = 0x00;
/// Type code for an outbound get request.
pub(crate) const TYPE_GET: u8 = 0x01;
/// Type code for an inbound reply.
pub(crate) const TYPE_REPLY: u8 = 0x02;
/// Type code for an inbound notification.
pub(crate) const TYPE_NOTIFICATION: u8 = 0x03;

/// Low bytes of item numbers used for IR remote emulation.
const IR_EMULATION_LOW_BYTES: [u8; 3] = [0x17, 0x19, 0x1B];

/// A 16-bit protocol register or action identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
)]
#[display("0x{_0:04X}")]
pub struct ItemNumber(u16);

impl ItemNumber {
    /// Power status register.
    pub const POWER_STATUS: Self = Self(0x0102);
    /// Power-on action.
    pub const POWER_ON: Self = Self(0x172E);
    /// Power-off action.
    pub const POWER_OFF: Self = Self(0x172F);

    /// Creates an item number from its raw value.
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw 16-bit value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether the device answers a command for this item with a reply frame.
    ///
    /// IR remote emulation codes are fire-and-forget.
    ///
    /// ```
    /// use pjcontrol::ItemNumber;
    ///
    /// assert!(ItemNumber::POWER_STATUS.expects_reply());
    /// assert!(!ItemNumber::new(0x0117).expects_reply());
    /// ```
    #[must_use]
    pub fn expects_reply(self) -> bool {
        let [_, low] = self.0.to_be_bytes();
        !IR_EMULATION_LOW_BYTES.contains(&low)
    }
}

/// Whether a command reads or writes its register.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum CommandKind {
    #[strum(to_string = "get")]
    Get,
    #[strum(to_string = "set")]
    Set,
}

impl CommandKind {
    pub(crate) fn type_code(self) -> u8 {
        match self {
            Self::Get => TYPE_GET,
            Self::Set => TYPE_SET,
        }
    }
}

/// Projector power state as reported by the power status register.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
)]
#[strum(ascii_case_insensitive)]
pub enum PowerStatus {
    /// No status has been read yet, or the device reported an unrecognised value.
    #[default]
    Unknown,
    Standby,
    Startup,
    StartupLamp,
    PowerOn,
    Cooling1,
    Cooling2,
    SavingCooling1,
    SavingCooling2,
    SavingStandby,
}

impl PowerStatus {
    /// Maps a power status data word, falling back to [`PowerStatus::Unknown`].
    ///
    /// ```
    /// use pjcontrol::PowerStatus;
    ///
    /// assert_eq!(PowerStatus::PowerOn, PowerStatus::from_data(3));
    /// assert_eq!(PowerStatus::Unknown, PowerStatus::from_data(0x00FF));
    /// ```
    #[must_use]
    pub const fn from_data(data: u16) -> Self {
        match data {
            0 => Self::Standby,
            1 => Self::Startup,
            2 => Self::StartupLamp,
            3 => Self::PowerOn,
            4 => Self::Cooling1,
            5 => Self::Cooling2,
            6 => Self::SavingCooling1,
            7 => Self::SavingCooling2,
            8 => Self::SavingStandby,
            _ => Self::Unknown,
        }
    }

    /// Returns the protocol value, `-1` for [`PowerStatus::Unknown`].
    #[must_use]
    pub const fn as_raw(self) -> i16 {
        match self {
            Self::Unknown => -1,
            Self::Standby => 0,
            Self::Startup => 1,
            Self::StartupLamp => 2,
            Self::PowerOn => 3,
            Self::Cooling1 => 4,
            Self::Cooling2 => 5,
            Self::SavingCooling1 => 6,
            Self::SavingCooling2 => 7,
            Self::SavingStandby => 8,
        }
    }
}
