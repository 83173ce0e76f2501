//! enocean-gateway: classify EnOcean radio frames and route them to registered devices

mod types;
pub use types::*;

mod error;
pub use error::{GatewayError, Result};

mod address;
pub use address::{combine, format_address, parse_address};

pub mod profile;
pub use profile::{EepResolver, ProfileFields, ProfileResolver};

pub mod classify;
pub use classify::{classify, classify_packet};

mod registry;
pub use registry::{DeviceHandler, DeviceRegistry, RegisteredDevice};

mod dongle;
pub use dongle::{Dongle, DongleState, POLL_INTERVAL_MS};

mod device;
pub use device::Device;

mod config;
pub use config::{load_config_file, parse_config, DeviceConfig, DeviceKind, GatewayConfig};

mod metrics;
pub use metrics::{GatewayMetrics, MetricsHub};

pub mod encode;
