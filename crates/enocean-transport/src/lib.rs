//! enocean-transport: link-layer abstractions for EnOcean transceivers
//!
//! This crate provides the packet types, the ESP3 codec and the [`Communicator`] trait used
//! to talk to a transceiver, with feature-gated backends. The default build enables a `mock`
//! backend so that binaries can compile on any host without a serial port.

mod types;
pub use types::{
    rorg, Packet, PacketKind, PortInfo, RadioFrame, RawPacket, ResponseFrame, ReturnCode,
    Timestamp,
};

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::Communicator;

pub mod esp3;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::MockCommunicator;

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::{SerialCommunicator, ESP3_BAUD};
