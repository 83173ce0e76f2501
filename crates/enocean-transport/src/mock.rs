use crate::{Communicator, Packet, PortInfo, RawPacket, Result, TransportError};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// An in-process transceiver. Inbound packets are injected by the caller and every
/// outbound packet is recorded.
pub struct MockCommunicator {
    name: String,
    base: [u8; 4],
    fail_connect: bool,
    inbound: Mutex<VecDeque<Packet>>,
    ready: Condvar,
    sent: Mutex<Vec<RawPacket>>,
}

impl MockCommunicator {
    pub fn new(name: &str, base: [u8; 4]) -> Self {
        Self {
            name: name.to_string(),
            base,
            fail_connect: false,
            inbound: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A transceiver that never answers the base address query.
    pub fn unreachable(name: &str) -> Self {
        Self {
            fail_connect: true,
            ..Self::new(name, [0; 4])
        }
    }

    /// Queue a packet for the next `recv`.
    pub fn inject(&self, packet: Packet) {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(packet);
        self.ready.notify_one();
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<RawPacket> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Communicator for MockCommunicator {
    fn open(name: &str) -> Result<Self> {
        Ok(Self::new(name, [0xFF, 0x80, 0x00, 0x00]))
    }

    fn list() -> Result<Vec<PortInfo>> {
        Ok(vec![PortInfo {
            name: "mock0".to_string(),
            driver: "mock".to_string(),
        }])
    }

    fn start(&self) -> Result<()> {
        if self.fail_connect {
            return Err(TransportError::InterfaceNotFound(self.name.clone()));
        }
        Ok(())
    }

    fn base_address(&self) -> Result<[u8; 4]> {
        if self.fail_connect {
            return Err(TransportError::Timeout);
        }
        Ok(self.base)
    }

    fn recv(&self, timeout_ms: Option<u64>) -> Result<Packet> {
        let guard = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        let wait = Duration::from_millis(timeout_ms.unwrap_or(100));
        let (mut queue, _) = self
            .ready
            .wait_timeout_while(guard, wait, |q| q.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        queue.pop_front().ok_or(TransportError::Timeout)
    }

    fn send(&self, packet: &RawPacket) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(packet.clone());
        Ok(())
    }
}
