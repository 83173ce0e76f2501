use core::fmt;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{Result, TransportError};

/// Radio organization codes (RORG) carried in the first byte of an ERP1 payload.
pub mod rorg {
    /// Repeated switch communication (rocker switches).
    pub const RPS: u8 = 0xF6;
    /// 1-byte communication.
    pub const BS1: u8 = 0xD5;
    /// 4-byte communication.
    pub const BS4: u8 = 0xA5;
    /// Variable-length data.
    pub const VLD: u8 = 0xD2;
}

/// ESP3 packet type byte
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    RadioErp1,
    Response,
    RadioSubTel,
    Event,
    CommonCommand,
    SmartAckCommand,
    RemoteManCommand,
    RadioMessage,
    RadioErp2,
    Other(u8),
}

impl PacketKind {
    pub fn code(self) -> u8 {
        match self {
            PacketKind::RadioErp1 => 0x01,
            PacketKind::Response => 0x02,
            PacketKind::RadioSubTel => 0x03,
            PacketKind::Event => 0x04,
            PacketKind::CommonCommand => 0x05,
            PacketKind::SmartAckCommand => 0x06,
            PacketKind::RemoteManCommand => 0x07,
            PacketKind::RadioMessage => 0x09,
            PacketKind::RadioErp2 => 0x0A,
            PacketKind::Other(code) => code,
        }
    }
}

impl From<u8> for PacketKind {
    fn from(code: u8) -> Self {
        match code {
            0x01 => PacketKind::RadioErp1,
            0x02 => PacketKind::Response,
            0x03 => PacketKind::RadioSubTel,
            0x04 => PacketKind::Event,
            0x05 => PacketKind::CommonCommand,
            0x06 => PacketKind::SmartAckCommand,
            0x07 => PacketKind::RemoteManCommand,
            0x09 => PacketKind::RadioMessage,
            0x0A => PacketKind::RadioErp2,
            other => PacketKind::Other(other),
        }
    }
}

/// Status code in the first data byte of a response packet
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCode {
    Ok,
    Error,
    NotSupported,
    WrongParam,
    OperationDenied,
    Other(u8),
}

impl From<u8> for ReturnCode {
    fn from(code: u8) -> Self {
        match code {
            0x00 => ReturnCode::Ok,
            0x01 => ReturnCode::Error,
            0x02 => ReturnCode::NotSupported,
            0x03 => ReturnCode::WrongParam,
            0x04 => ReturnCode::OperationDenied,
            other => ReturnCode::Other(other),
        }
    }
}

impl ReturnCode {
    pub fn code(self) -> u8 {
        match self {
            ReturnCode::Ok => 0x00,
            ReturnCode::Error => 0x01,
            ReturnCode::NotSupported => 0x02,
            ReturnCode::WrongParam => 0x03,
            ReturnCode::OperationDenied => 0x04,
            ReturnCode::Other(code) => code,
        }
    }
}

/// An undecoded ESP3 packet, used for outbound commands and as the decoder output.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RawPacket {
    pub kind: PacketKind,
    pub data: Vec<u8>,
    pub optional: Vec<u8>,
}

impl RawPacket {
    pub fn new(kind: PacketKind, data: Vec<u8>, optional: Vec<u8>) -> Self {
        Self {
            kind,
            data,
            optional,
        }
    }
}

/// An inbound ERP1 radio telegram
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RadioFrame {
    /// Organization code; mirrors `data[0]` for frames read off the wire.
    pub org: u8,
    pub sender: [u8; 4],
    /// Full ERP1 data including the leading RORG byte and trailing sender/status.
    pub data: Vec<u8>,
    pub optional: Vec<u8>,
    pub timestamp: Option<Timestamp>,
}

impl RadioFrame {
    /// Split an ERP1 data field: `[rorg, payload.., sender(4), status]`.
    pub fn from_erp1(data: Vec<u8>, optional: Vec<u8>) -> Result<Self> {
        if data.len() < 6 {
            return Err(TransportError::InvalidFrame("short erp1"));
        }
        let tail = data.len() - 5;
        let mut sender = [0u8; 4];
        sender.copy_from_slice(&data[tail..tail + 4]);
        Ok(Self {
            org: data[0],
            sender,
            data,
            optional,
            timestamp: None,
        })
    }

    pub fn sender_int(&self) -> u32 {
        u32::from_be_bytes(self.sender)
    }

    /// Payload bytes between the RORG byte and the sender address.
    pub fn payload(&self) -> &[u8] {
        let end = self.data.len().saturating_sub(5).max(1);
        self.data.get(1..end).unwrap_or(&[])
    }
}

/// Any inbound packet that is not a radio telegram
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponseFrame {
    pub kind: PacketKind,
    pub status: ReturnCode,
    pub response_data: Vec<u8>,
}

/// A decoded inbound unit as handed to the dongle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Packet {
    Radio(RadioFrame),
    Response(ResponseFrame),
}

impl Packet {
    pub fn from_raw(raw: RawPacket) -> Result<Self> {
        match raw.kind {
            PacketKind::RadioErp1 => {
                let mut frame = RadioFrame::from_erp1(raw.data, raw.optional)?;
                frame.timestamp = Some(Timestamp(OffsetDateTime::now_utc()));
                Ok(Packet::Radio(frame))
            }
            kind => {
                let (status, rest) = raw
                    .data
                    .split_first()
                    .ok_or(TransportError::InvalidFrame("empty response"))?;
                Ok(Packet::Response(ResponseFrame {
                    kind,
                    status: ReturnCode::from(*status),
                    response_data: rest.to_vec(),
                }))
            }
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Radio(r) => {
                write!(f, "radio org=0x{:02X} sender={:08X} data=", r.org, r.sender_int())?;
                for b in &r.data {
                    write!(f, "{b:02X}")?;
                }
                if let Some(ts) = r.timestamp {
                    write!(f, " at={ts}")?;
                }
                Ok(())
            }
            Packet::Response(r) => write!(
                f,
                "{:?} status={:?} len={}",
                r.kind,
                r.status,
                r.response_data.len()
            ),
        }
    }
}

/// Wall-clock time a radio frame was taken off the link.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timestamp(pub OffsetDateTime);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[derive(Clone, Debug)]
pub struct PortInfo {
    pub name: String,
    pub driver: String,
}
