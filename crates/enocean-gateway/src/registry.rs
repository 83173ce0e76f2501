use crate::{Capability, SemanticEvent, ValueChange};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Receives value changes for one registered device.
pub trait DeviceHandler: Send + Sync {
    fn value_changed(&self, change: ValueChange);
}

impl<F> DeviceHandler for F
where
    F: Fn(ValueChange) + Send + Sync,
{
    fn value_changed(&self, change: ValueChange) {
        self(change)
    }
}

pub struct RegisteredDevice {
    pub label: String,
    pub capability: Capability,
    /// Combined sender address.
    pub address: u32,
    pub handler: Arc<dyn DeviceHandler>,
}

/// Append-only, ordered collection of dispatch targets.
///
/// Entries are never removed or deduplicated. `dispatch` iterates over a snapshot, so
/// handlers may register more devices while a dispatch is in flight; those are picked up by
/// the next dispatch.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<Vec<Arc<RegisteredDevice>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a device and return the new registry size.
    pub fn register(&self, device: RegisteredDevice) -> usize {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        devices.push(Arc::new(device));
        devices.len()
    }

    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every matching handler in registration order; returns how many were called.
    pub fn dispatch(&self, event: &SemanticEvent) -> usize {
        let snapshot: Vec<Arc<RegisteredDevice>> = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut invoked = 0;
        for device in snapshot.iter().filter(|d| d.address == event.sender) {
            if let Some(change) = device.capability.matches(event) {
                trace!(device = %device.label, capability = %device.capability, ?change, "value changed");
                device.handler.value_changed(change);
                invoked += 1;
            }
        }
        invoked
    }
}
