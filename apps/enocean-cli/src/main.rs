use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use enocean_gateway as gw;
use enocean_transport as eno;
use enocean_transport::Communicator;

#[derive(Parser, Debug)]
#[command(
    name = "eno",
    version,
    about = "EnOcean gateway CLI",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    Serial,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OnOff {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available transceiver ports
    Ports {
        /// Backend to query
        #[arg(long, value_enum, default_value_t = Backend::Serial)]
        backend: Backend,
    },
    /// Connect to the dongle and print value changes of configured devices as JSON lines
    Listen {
        /// Gateway YAML config (serial path and devices)
        #[arg(long)]
        config: String,
        #[arg(long, value_enum, default_value_t = Backend::Serial)]
        backend: Backend,
        /// Stop after this many seconds (runs until killed otherwise)
        #[arg(long)]
        seconds: Option<u64>,
        /// Print prometheus metrics on exit
        #[arg(long, action = ArgAction::SetTrue)]
        metrics: bool,
    },
    /// Send one raw ESP3 packet through the dongle
    Send {
        #[arg(long, value_enum, default_value_t = Backend::Serial)]
        backend: Backend,
        /// Serial device path (e.g., /dev/ttyUSB0)
        #[arg(long)]
        device: String,
        /// ESP3 packet type (1 = radio ERP1, 5 = common command)
        #[arg(long, default_value_t = 1)]
        kind: u8,
        /// Data bytes as hex, space separated (e.g., F6 30 FF 80 00 01 00)
        #[arg(long, num_args = 1.., required = true)]
        data: Vec<String>,
        /// Optional bytes as hex
        #[arg(long, num_args = 1..)]
        optional: Vec<String>,
    },
    /// Switch an actuator output channel on or off
    Switch {
        #[arg(long, value_enum, default_value_t = Backend::Serial)]
        backend: Backend,
        #[arg(long)]
        device: String,
        /// Actuator address (e.g., 01:94:E3:B9)
        #[arg(long)]
        target: String,
        #[arg(long, default_value_t = 0)]
        channel: u8,
        #[arg(value_enum)]
        state: OnOff,
    },
    /// Set a dimmer level in percent (clamped to 1..=100)
    Dim {
        #[arg(long, value_enum, default_value_t = Backend::Serial)]
        backend: Backend,
        #[arg(long)]
        device: String,
        #[arg(long)]
        target: String,
        percent: u8,
    },
    /// Classify an ERP1 data field offline and print the result as JSON
    Classify {
        /// ERP1 data bytes as hex, including RORG, sender and status
        #[arg(long, num_args = 1.., required = true)]
        data: Vec<String>,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ports { backend } => list_ports(backend),
        Commands::Listen {
            config,
            backend,
            seconds,
            metrics,
        } => listen(&config, backend, seconds, metrics),
        Commands::Send {
            backend,
            device,
            kind,
            data,
            optional,
        } => send(backend, &device, kind, &data, &optional),
        Commands::Switch {
            backend,
            device,
            target,
            channel,
            state,
        } => {
            let dev = bind_target(backend, &device, &target, gw::Capability::Switch { channel })?;
            dev.set_output(state == OnOff::On)?;
            info!(address = %target, channel, ?state, "switch command sent");
            Ok(())
        }
        Commands::Dim {
            backend,
            device,
            target,
            percent,
        } => {
            let dev = bind_target(backend, &device, &target, gw::Capability::Dimmer)?;
            dev.dim(percent)?;
            info!(address = %target, percent, "dim command sent");
            Ok(())
        }
        Commands::Classify { data } => classify_offline(&data),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn list_ports(backend: Backend) -> Result<()> {
    let ports = match backend {
        Backend::Mock => eno::MockCommunicator::list()?,
        Backend::Serial => eno::SerialCommunicator::list()?,
    };
    for port in ports {
        println!("{}\t{}", port.name, port.driver);
    }
    Ok(())
}

fn open_dongle(backend: Backend, device: &str) -> Result<Arc<gw::Dongle>> {
    let comm: Arc<dyn Communicator> = match backend {
        Backend::Mock => Arc::new(eno::MockCommunicator::open(device)?),
        Backend::Serial => Arc::new(eno::SerialCommunicator::open(device)?),
    };
    let dongle = gw::Dongle::open(comm, Arc::new(gw::EepResolver))
        .map_err(|e| anyhow::anyhow!("connecting to {device}: {e}"))?;
    Ok(dongle)
}

fn listen(config: &str, backend: Backend, seconds: Option<u64>, metrics: bool) -> Result<()> {
    let cfg = gw::load_config_file(config)?;
    let dongle = open_dongle(backend, &cfg.device)?;

    let mut devices = Vec::with_capacity(cfg.devices.len());
    for dc in &cfg.devices {
        let name = dc.name.clone();
        let capability = dc.capability()?;
        let handler = move |change: gw::ValueChange| {
            let line = serde_json::json!({
                "device": name,
                "capability": capability.to_string(),
                "change": change,
            });
            println!("{line}");
        };
        devices.push(gw::Device::register(
            &dongle,
            dc.name.clone(),
            capability,
            &dc.address()?,
            Arc::new(handler),
        )?);
    }
    info!(device = %cfg.device, registered = devices.len(), "listening");
    let _rx = dongle.start()?;

    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        thread::sleep(Duration::from_millis(200));
    }
    if metrics {
        print!("{}", dongle.metrics().encode_text());
    }
    Ok(())
}

fn send(backend: Backend, device: &str, kind: u8, data: &[String], optional: &[String]) -> Result<()> {
    let packet = eno::RawPacket::new(
        eno::PacketKind::from(kind),
        parse_hex_bytes(data)?,
        parse_hex_bytes(optional)?,
    );
    let dongle = open_dongle(backend, device)?;
    dongle.send(&packet)?;
    info!(device, kind = ?packet.kind, len = packet.data.len(), "sent packet");
    Ok(())
}

/// Open the dongle and bind a send-only device for `target`.
fn bind_target(
    backend: Backend,
    device: &str,
    target: &str,
    capability: gw::Capability,
) -> Result<gw::Device> {
    let dongle = open_dongle(backend, device)?;
    let address = gw::parse_address(target)?;
    let dev = gw::Device::register(
        &dongle,
        target,
        capability,
        &address,
        Arc::new(|_change: gw::ValueChange| {}),
    )?;
    Ok(dev)
}

fn classify_offline(data: &[String]) -> Result<()> {
    let bytes = parse_hex_bytes(data)?;
    let frame = eno::RadioFrame::from_erp1(bytes, Vec::new())?;
    let packet = eno::Packet::Radio(frame);
    match gw::classify_packet(&packet, &gw::EepResolver) {
        Ok(c) => println!("{}", serde_json::to_string(&c)?),
        Err(e) => {
            warn!(error = %e, "classification failed");
            return Err(e.into());
        }
    }
    Ok(())
}

fn parse_hex_bytes(items: &[String]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(items.len());
    for s in items {
        let t = s.trim();
        let no_prefix = t.strip_prefix("0x").unwrap_or(t);
        let b = u8::from_str_radix(no_prefix, 16)
            .map_err(|e| anyhow::anyhow!("invalid hex byte '{t}': {e}"))?;
        out.push(b);
    }
    Ok(out)
}
