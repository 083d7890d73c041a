mod connector;
mod dispatcher;
mod fake_backend;
mod serial_backend;
mod session;

pub(crate) use self::connector::{LinkBackend, connector_from_backend};
pub use self::connector::{LinkConnector, LinkPort, PortReader, PortWriter};
pub use self::dispatcher::{Command, CommandResult, CommandTicket, Dispatcher, DispatcherHandle};
pub use self::fake_backend::FakeProjectorConfig;
pub(crate) use self::fake_backend::parse_power_status;
pub use self::session::LinkState;
