//! ESP3 serial framing: `0x55 | len(2) optlen(1) type(1) | crc8h | data | optional | crc8d`.

use crate::{PacketKind, RawPacket, Result, TransportError};
use tracing::warn;

pub const SYNC_BYTE: u8 = 0x55;
const HEADER_LEN: usize = 4;

/// Common command code to read the transceiver's base ID.
pub const CO_RD_IDBASE: u8 = 0x08;

/// CRC-8 with polynomial 0x07 and zero init, as used by ESP3.
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &b in bytes {
        crc ^= b;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
    }
    crc
}

pub fn encode_packet(packet: &RawPacket) -> Result<Vec<u8>> {
    let data_len =
        u16::try_from(packet.data.len()).map_err(|_| TransportError::InvalidFrame("data > 65535"))?;
    let opt_len =
        u8::try_from(packet.optional.len()).map_err(|_| TransportError::InvalidFrame("optional > 255"))?;
    let mut out = Vec::with_capacity(7 + packet.data.len() + packet.optional.len());
    out.push(SYNC_BYTE);
    let [hi, lo] = data_len.to_be_bytes();
    let header = [hi, lo, opt_len, packet.kind.code()];
    out.extend_from_slice(&header);
    out.push(crc8(&header));
    let body_start = out.len();
    out.extend_from_slice(&packet.data);
    out.extend_from_slice(&packet.optional);
    let crc = crc8(&out[body_start..]);
    out.push(crc);
    Ok(out)
}

/// The base ID read request sent on connect.
pub fn read_base_id_command() -> RawPacket {
    RawPacket::new(PacketKind::CommonCommand, vec![CO_RD_IDBASE], vec![])
}

/// Base ID carried by a reply to [`read_base_id_command`]: a `Response` with return code
/// OK and at least four data bytes after it. Anything else yields `None`.
pub fn base_id_reply(raw: &RawPacket) -> Option<[u8; 4]> {
    if raw.kind != PacketKind::Response {
        return None;
    }
    match raw.data.as_slice() {
        [0x00, a, b, c, d, ..] => Some([*a, *b, *c, *d]),
        _ => None,
    }
}

/// Incremental decoder for a byte stream read off the serial port.
#[derive(Debug, Default)]
pub struct Esp3Decoder {
    buf: Vec<u8>,
}

impl Esp3Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pull the next complete packet, if one is buffered.
    ///
    /// Garbage before a sync byte and headers with a bad CRC are skipped. A packet whose
    /// body CRC fails is consumed and reported as [`TransportError::Checksum`].
    pub fn next_packet(&mut self) -> Option<Result<RawPacket>> {
        loop {
            let start = match self.buf.iter().position(|&b| b == SYNC_BYTE) {
                Some(pos) => pos,
                None => {
                    self.buf.clear();
                    return None;
                }
            };
            self.buf.drain(..start);
            if self.buf.len() < 1 + HEADER_LEN + 1 {
                return None;
            }
            let header = [self.buf[1], self.buf[2], self.buf[3], self.buf[4]];
            if crc8(&header) != self.buf[5] {
                warn!("esp3 header crc mismatch; resyncing");
                self.buf.drain(..1);
                continue;
            }
            let data_len = usize::from(u16::from_be_bytes([header[0], header[1]]));
            let opt_len = usize::from(header[2]);
            let total = 1 + HEADER_LEN + 1 + data_len + opt_len + 1;
            if self.buf.len() < total {
                return None;
            }
            let frame: Vec<u8> = self.buf.drain(..total).collect();
            let body = &frame[6..total - 1];
            let expected = crc8(body);
            let actual = frame[total - 1];
            if expected != actual {
                return Some(Err(TransportError::Checksum { expected, actual }));
            }
            let (data, optional) = body.split_at(data_len);
            return Some(Ok(RawPacket::new(
                PacketKind::from(header[3]),
                data.to_vec(),
                optional.to_vec(),
            )));
        }
    }
}
