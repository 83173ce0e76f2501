use enocean_transport::{rorg, PacketKind, RawPacket};

/// Destination used for broadcast telegrams.
pub const BROADCAST: [u8; 4] = [0xFF; 4];

/// Build an ERP1 telegram: `[rorg, payload.., sender, status]` with the standard optional
/// block `[subtel, destination, dBm, security]`.
pub fn radio_telegram(
    org: u8,
    payload: &[u8],
    sender: [u8; 4],
    destination: Option<[u8; 4]>,
) -> RawPacket {
    let mut data = Vec::with_capacity(payload.len() + 6);
    data.push(org);
    data.extend_from_slice(payload);
    data.extend_from_slice(&sender);
    data.push(0x00);

    let mut optional = Vec::with_capacity(7);
    optional.push(0x03);
    optional.extend_from_slice(&destination.unwrap_or(BROADCAST));
    optional.extend_from_slice(&[0xFF, 0x00]);
    RawPacket::new(PacketKind::RadioErp1, data, optional)
}

/// D2-01 actuator "set output" (CMD 0x01) addressed to one device.
pub fn actuator_switch(sender: [u8; 4], destination: [u8; 4], channel: u8, on: bool) -> RawPacket {
    let level = if on { 0x64 } else { 0x00 };
    radio_telegram(rorg::VLD, &[0x01, channel & 0x1F, level], sender, Some(destination))
}

/// A5-38-08 central command, dimming function. `percent` is clamped to 1..=100; the
/// telegram carries a ramp of 1 and the switch-on flag.
pub fn dimmer_command(sender: [u8; 4], percent: u8) -> RawPacket {
    let level = percent.clamp(1, 100);
    let mut packet = radio_telegram(rorg::BS4, &[0x02, level, 0x01, 0x09], sender, None);
    packet.optional.clear();
    packet
}

/// Ask a D2-01 actuator for its output state (CMD 0x03).
pub fn actuator_status_query(sender: [u8; 4], destination: [u8; 4], channel: u8) -> RawPacket {
    radio_telegram(rorg::VLD, &[0x03, channel & 0x1F], sender, Some(destination))
}
