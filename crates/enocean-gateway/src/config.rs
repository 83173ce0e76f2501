use crate::{parse_address, Capability, GatewayError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Serial path of the transceiver, e.g. `/dev/ttyUSB0`.
    pub device: String,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Cover,
    Listener,
    PowerSensor,
    Switch,
    Dimmer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    pub id: String,
    pub kind: DeviceKind,
    #[serde(default)]
    pub channel: Option<u8>,
}

impl DeviceConfig {
    pub fn address(&self) -> Result<[u8; 4]> {
        parse_address(&self.id)
    }

    pub fn capability(&self) -> Result<Capability> {
        match (self.kind, self.channel) {
            (DeviceKind::Switch, ch) => Ok(Capability::Switch {
                channel: ch.unwrap_or(0),
            }),
            (kind, Some(_)) => Err(GatewayError::Config(format!(
                "device {}: channel is only valid for switches, not {kind:?}",
                self.name
            ))),
            (DeviceKind::Cover, None) => Ok(Capability::Cover),
            (DeviceKind::Listener, None) => Ok(Capability::Listener),
            (DeviceKind::PowerSensor, None) => Ok(Capability::PowerSensor),
            (DeviceKind::Dimmer, None) => Ok(Capability::Dimmer),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(GatewayError::Config("serial device path is empty".into()));
        }
        for dev in &self.devices {
            dev.address()?;
            dev.capability()?;
        }
        Ok(())
    }
}

pub fn parse_config(raw: &str) -> anyhow::Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(raw).context("parsing gateway config")?;
    cfg.validate().context("validating gateway config")?;
    Ok(cfg)
}

pub fn load_config_file(path: impl AsRef<Path>) -> anyhow::Result<GatewayConfig> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading config: {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("loading config: {}", path.display()))
}
