use crate::encode::{actuator_status_query, actuator_switch, dimmer_command, radio_telegram};
use crate::{combine, Capability, DeviceHandler, Dongle, RegisteredDevice, Result};
use enocean_transport::{PacketKind, RawPacket};
use std::sync::Arc;

/// A device bound to one dongle.
///
/// Creating a `Device` registers its handler with the dongle and snapshots the dongle's
/// base address at that moment; later base address updates are not reflected here.
pub struct Device {
    dongle: Arc<Dongle>,
    label: String,
    capability: Capability,
    address: [u8; 4],
    base_address: [u8; 4],
}

impl Device {
    pub fn register(
        dongle: &Arc<Dongle>,
        label: impl Into<String>,
        capability: Capability,
        address: &[u8],
        handler: Arc<dyn DeviceHandler>,
    ) -> Result<Self> {
        let combined = combine(address)?;
        let label = label.into();
        dongle.register(RegisteredDevice {
            label: label.clone(),
            capability,
            address: combined,
            handler,
        });
        Ok(Self {
            dongle: Arc::clone(dongle),
            label,
            capability,
            address: combined.to_be_bytes(),
            base_address: dongle.base_address(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn address(&self) -> [u8; 4] {
        self.address
    }

    /// Only switches carry a channel; everything else reports 0.
    pub fn channel(&self) -> u8 {
        match self.capability {
            Capability::Switch { channel } => channel,
            _ => 0,
        }
    }

    pub fn base_address(&self) -> [u8; 4] {
        self.base_address
    }

    pub fn send_command(&self, data: Vec<u8>, optional: Vec<u8>, kind: PacketKind) -> Result<()> {
        self.send_packet(&RawPacket::new(kind, data, optional))
    }

    pub fn send_packet(&self, packet: &RawPacket) -> Result<()> {
        self.dongle.send(packet)
    }

    /// Send an ERP1 telegram with this device's base address snapshot as sender.
    pub fn send_radio(&self, org: u8, payload: &[u8], destination: Option<[u8; 4]>) -> Result<()> {
        self.send_packet(&radio_telegram(org, payload, self.base_address, destination))
    }

    /// Switch this device's output channel on or off.
    pub fn set_output(&self, on: bool) -> Result<()> {
        let packet = actuator_switch(self.base_address, self.address, self.channel(), on);
        self.send_packet(&packet)
    }

    /// Ask this device to report the state of its output channel.
    pub fn query_output(&self) -> Result<()> {
        let packet = actuator_status_query(self.base_address, self.address, self.channel());
        self.send_packet(&packet)
    }

    pub fn dim(&self, percent: u8) -> Result<()> {
        self.send_packet(&dimmer_command(self.base_address, percent))
    }
}
