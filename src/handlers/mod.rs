mod frame_codec;
mod power;
mod status_poller;

pub use self::frame_codec::{Frame, FrameCodec, FrameCodecError, Request, Response};
pub use self::power::{PowerCommand, PowerHandler};
pub use self::status_poller::StatusPoller;
