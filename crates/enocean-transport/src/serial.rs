use crate::esp3::{base_id_reply, encode_packet, read_base_id_command, Esp3Decoder};
use crate::{
    Communicator, Packet, PortInfo, RawPacket, Result, TransportError,
};
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::io::{ErrorKind, Read, Write};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// ESP3 line rate for USB300-class transceivers.
pub const ESP3_BAUD: u32 = 57_600;

const BASE_ID_WAIT: Duration = Duration::from_secs(1);

struct Reader {
    port: Box<dyn SerialPort>,
    decoder: Esp3Decoder,
}

/// ESP3 over a serial port (USB300, TCM310 and friends)
pub struct SerialCommunicator {
    port_path: String,
    reader: Mutex<Reader>,
    writer: Mutex<Box<dyn SerialPort>>,
}

impl SerialCommunicator {
    pub fn open_with(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(200))
            .open()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let writer = port
            .try_clone()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Self {
            port_path: path.to_string(),
            reader: Mutex::new(Reader {
                port,
                decoder: Esp3Decoder::new(),
            }),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &str {
        &self.port_path
    }

    fn read_raw(reader: &mut Reader, deadline: Instant) -> Result<RawPacket> {
        let mut buf = [0u8; 128];
        loop {
            match reader.decoder.next_packet() {
                Some(Ok(raw)) => return Ok(raw),
                Some(Err(e)) => {
                    warn!(error = %e, "dropping corrupt esp3 packet");
                    continue;
                }
                None => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(TransportError::Timeout);
            }
            reader
                .port
                .set_timeout(deadline - now)
                .map_err(|e| TransportError::Io(e.to_string()))?;
            match reader.port.read(&mut buf) {
                Ok(n) if n > 0 => reader.decoder.push(&buf[..n]),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut => return Err(TransportError::Timeout),
                Err(e) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }
}

impl Communicator for SerialCommunicator {
    fn open(path: &str) -> Result<Self> {
        Self::open_with(path, ESP3_BAUD)
    }

    fn list() -> Result<Vec<PortInfo>> {
        let mut out = Vec::new();
        for p in serialport::available_ports().map_err(|e| TransportError::Io(e.to_string()))? {
            let driver = match p.port_type {
                SerialPortType::UsbPort(_) => "esp3-usb",
                _ => "serial",
            };
            out.push(PortInfo {
                name: p.port_name,
                driver: driver.to_string(),
            });
        }
        Ok(out)
    }

    fn start(&self) -> Result<()> {
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        reader
            .port
            .clear(ClearBuffer::Input)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        reader.decoder = Esp3Decoder::new();
        Ok(())
    }

    fn base_address(&self) -> Result<[u8; 4]> {
        self.send(&read_base_id_command())?;
        let deadline = Instant::now() + BASE_ID_WAIT;
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let raw = Self::read_raw(&mut reader, deadline)?;
            match base_id_reply(&raw) {
                Some(base) => return Ok(base),
                None => debug!(
                    kind = ?raw.kind,
                    len = raw.data.len(),
                    "skipping packet while waiting for base id"
                ),
            }
        }
    }

    fn recv(&self, timeout_ms: Option<u64>) -> Result<Packet> {
        let wait = Duration::from_millis(timeout_ms.unwrap_or(500));
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = Self::read_raw(&mut reader, Instant::now() + wait)?;
        Packet::from_raw(raw)
    }

    fn send(&self, packet: &RawPacket) -> Result<()> {
        let bytes = encode_packet(packet)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer
            .write_all(&bytes)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(())
    }
}
