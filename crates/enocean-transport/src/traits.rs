use crate::{Packet, PortInfo, RawPacket, Result, TransportError};

/// A transceiver link shared between a receive thread and any number of senders.
///
/// Every method takes `&self`; backends keep their read and write paths behind separate
/// locks so a `send` never waits on a blocked `recv`.
pub trait Communicator: Send + Sync {
    /// Open a transceiver by serial path (e.g., "/dev/ttyUSB0").
    fn open(path: &str) -> Result<Self>
    where
        Self: Sized;

    /// Attempt to list available ports for this backend.
    fn list() -> Result<Vec<PortInfo>>
    where
        Self: Sized;

    /// Prepare the link for receiving.
    fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Ask the transceiver for its own 4-byte address.
    fn base_address(&self) -> Result<[u8; 4]> {
        Err(TransportError::Unsupported("base address query not supported"))
    }

    /// Receive one decoded packet (blocking with optional timeout in milliseconds).
    fn recv(&self, timeout_ms: Option<u64>) -> Result<Packet>;

    /// Send one packet. Does not wait for the transceiver's response.
    fn send(&self, packet: &RawPacket) -> Result<()>;
}
