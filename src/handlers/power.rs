use crate::error::ProtocolError;
use crate::link::{Command, DispatcherHandle};
use crate::protocol::{ItemNumber, PowerStatus};

/// Requested projector power transition.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PowerCommand {
    /// Switch the lamp off and cool down.
    Off,
    /// Start up from standby.
    On,
}

impl PowerCommand {
    fn item_number(self) -> ItemNumber {
        match self {
            Self::Off => ItemNumber::POWER_OFF,
            Self::On => ItemNumber::POWER_ON,
        }
    }
}

/// Handler for power commands and power status reads.
pub struct PowerHandler;

impl PowerHandler {
    fn command_for(power: PowerCommand) -> Command {
        Command::set(power.item_number(), 0x0000)
    }

    /// Queues a power command and waits for the projector to accept it.
    ///
    /// ```
    /// # async fn demo(dispatcher: pjcontrol::DispatcherHandle) -> Result<(), pjcontrol::ProtocolError> {
    /// use pjcontrol::{PowerCommand, PowerHandler};
    ///
    /// PowerHandler::set_power(&dispatcher, PowerCommand::On).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the command fails to send or its reply is malformed.
    pub async fn set_power(
        dispatcher: &DispatcherHandle,
        power: PowerCommand,
    ) -> Result<(), ProtocolError> {
        dispatcher.enqueue(Self::command_for(power)).await?;
        Ok(())
    }

    /// Reads the power status register once.
    ///
    /// # Errors
    ///
    /// Returns an error when the command fails, its reply is malformed, or the
    /// device does not answer with a frame.
    pub async fn read_status(dispatcher: &DispatcherHandle) -> Result<PowerStatus, ProtocolError> {
        let item_number = ItemNumber::POWER_STATUS;
        let response = dispatcher
            .enqueue(Command::get(item_number))
            .await?
            .ok_or(ProtocolError::MissingReply { item_number })?;
        Ok(PowerStatus::from_data(response.data()))
    }
}
