use crate::{GatewayError, Result};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct GatewayMetrics {
    pub rx_packets: IntCounter,
    pub tx_packets: IntCounter,
    pub events_dispatched: IntCounter,
    pub frames_dropped: IntCounter,
    pub devices_registered: IntGauge,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub gw: GatewayMetrics,
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    IntCounter::new(name, help).map_err(|e| GatewayError::Metrics(e.to_string()))
}

impl MetricsHub {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let gw = GatewayMetrics {
            rx_packets: counter("eno_rx_packets", "Total packets received from the transceiver")?,
            tx_packets: counter("eno_tx_packets", "Total packets handed to the transceiver")?,
            events_dispatched: counter(
                "eno_events_dispatched",
                "Device handler invocations from classified events",
            )?,
            frames_dropped: counter(
                "eno_frames_dropped",
                "Frames that failed classification",
            )?,
            devices_registered: IntGauge::new(
                "eno_devices_registered",
                "Number of devices in the dispatch registry",
            )
            .map_err(|e| GatewayError::Metrics(e.to_string()))?,
        };
        let _ = registry.register(Box::new(gw.rx_packets.clone()));
        let _ = registry.register(Box::new(gw.tx_packets.clone()));
        let _ = registry.register(Box::new(gw.events_dispatched.clone()));
        let _ = registry.register(Box::new(gw.frames_dropped.clone()));
        let _ = registry.register(Box::new(gw.devices_registered.clone()));
        Ok(Self { registry, gw })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
