use crate::classify::classify_packet;
use crate::profile::ProfileResolver;
use crate::{
    Classification, DeviceRegistry, GatewayError, MetricsHub, RegisteredDevice, Result,
};
use enocean_transport::{Communicator, Packet, RawPacket, TransportError};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the receive thread blocks in `recv` before checking whether the dongle is gone.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Lifecycle of a dongle. A `Dongle` only exists once `open` succeeded, so there is no
/// uninitialized state to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DongleState {
    Connected,
    Running,
}

/// Sole owner of the transceiver link, the device registry and the base address.
pub struct Dongle {
    comm: Arc<dyn Communicator>,
    resolver: Arc<dyn ProfileResolver>,
    registry: DeviceRegistry,
    base_address: RwLock<[u8; 4]>,
    state: Mutex<DongleState>,
    metrics: MetricsHub,
}

impl Dongle {
    /// Start the link and capture the transceiver's base address.
    pub fn open(
        comm: Arc<dyn Communicator>,
        resolver: Arc<dyn ProfileResolver>,
    ) -> Result<Arc<Self>> {
        comm.start()?;
        let base = comm.base_address()?;
        info!(base = %crate::format_address(u32::from_be_bytes(base)), "dongle connected");
        Ok(Arc::new(Self {
            comm,
            resolver,
            registry: DeviceRegistry::new(),
            base_address: RwLock::new(base),
            state: Mutex::new(DongleState::Connected),
            metrics: MetricsHub::new()?,
        }))
    }

    /// `open` followed by `start`; the receive thread is detached.
    pub fn connect(
        comm: Arc<dyn Communicator>,
        resolver: Arc<dyn ProfileResolver>,
    ) -> Result<Arc<Self>> {
        let dongle = Self::open(comm, resolver)?;
        dongle.start()?;
        Ok(dongle)
    }

    /// Spawn the receive thread. The thread only holds a weak reference and exits once the
    /// last `Arc<Dongle>` is dropped. A handler that captures a [`crate::Device`] keeps the
    /// dongle alive through the registry, so in that case the thread lives until the process
    /// exits.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == DongleState::Running {
                return Err(GatewayError::AlreadyRunning);
            }
            *state = DongleState::Running;
        }
        let weak = Arc::downgrade(self);
        let comm = Arc::clone(&self.comm);
        let handle = thread::Builder::new()
            .name("eno-rx".into())
            .spawn(move || receive_loop(weak, comm))
            .map_err(|e| {
                *self.state.lock().unwrap_or_else(PoisonError::into_inner) = DongleState::Connected;
                GatewayError::Transport(TransportError::Io(e.to_string()))
            })?;
        Ok(handle)
    }

    pub fn state(&self) -> DongleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn base_address(&self) -> [u8; 4] {
        *self.base_address.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &MetricsHub {
        &self.metrics
    }

    pub(crate) fn register(&self, device: RegisteredDevice) {
        debug!(device = %device.label, capability = %device.capability, "registering device");
        let count = self.registry.register(device);
        self.metrics
            .gw
            .devices_registered
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Forward a packet to the transceiver without waiting for its response.
    pub fn send(&self, packet: &RawPacket) -> Result<()> {
        self.comm.send(packet)?;
        self.metrics.gw.tx_packets.inc();
        debug!(kind = ?packet.kind, len = packet.data.len(), "sent packet");
        Ok(())
    }

    /// Classify one inbound packet and apply it: dispatch an event or adopt a new base
    /// address. Packets arriving before `start` are ignored.
    pub fn on_packet(&self, packet: &Packet) -> Result<Classification> {
        if self.state() != DongleState::Running {
            debug!("dongle not running; ignoring packet");
            return Ok(Classification::Ignored);
        }
        self.metrics.gw.rx_packets.inc();
        debug!(packet = %packet, "received packet");

        let classification = match classify_packet(packet, self.resolver.as_ref()) {
            Ok(c) => c,
            Err(e) => {
                self.metrics.gw.frames_dropped.inc();
                warn!(error = %e, "dropping frame");
                return Err(e);
            }
        };
        match &classification {
            Classification::Event(event) => {
                let invoked = self.registry.dispatch(event);
                self.metrics.gw.events_dispatched.inc_by(invoked as u64);
                debug!(category = ?event.category, value = ?event.value, invoked, "dispatched event");
            }
            Classification::BaseAddressUpdate { address } => {
                *self
                    .base_address
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = *address;
                info!(base = %crate::format_address(u32::from_be_bytes(*address)), "base address updated");
            }
            Classification::Ignored => {}
        }
        Ok(classification)
    }
}

fn receive_loop(dongle: Weak<Dongle>, comm: Arc<dyn Communicator>) {
    loop {
        let received = comm.recv(Some(POLL_INTERVAL_MS));
        let Some(dongle) = dongle.upgrade() else {
            break;
        };
        match received {
            // errors are logged and counted inside on_packet
            Ok(packet) => {
                let _ = dongle.on_packet(&packet);
            }
            Err(TransportError::Timeout) => {}
            Err(e) => {
                warn!(error = %e, "receive failed");
                drop(dongle);
                thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
            }
        }
    }
    debug!("receive loop exiting");
}
