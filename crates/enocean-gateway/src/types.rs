use core::fmt;
use serde::Serialize;

/// Semantic category a radio frame was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cover,
    WallSwitch,
    Power,
    SwitchStatus,
    DimmerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticEvent {
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    pub channel: u8,
    pub sender: u32,
    /// `data[1]` of the source frame; the rocker code for RPS telegrams.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<u8>,
}

/// Outcome of running an inbound packet through the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    Event(SemanticEvent),
    BaseAddressUpdate { address: [u8; 4] },
    Ignored,
}

/// Arguments passed to a device's value-changed handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValueChange {
    pub value: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<u8>,
}

impl ValueChange {
    pub fn new(value: Option<u32>) -> Self {
        Self { value, extra: None }
    }
}

/// What a registered device is able to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Cover,
    Listener,
    PowerSensor,
    Switch { channel: u8 },
    Dimmer,
}

impl Capability {
    /// Per-capability match predicate. Address filtering happens in the registry.
    pub fn matches(&self, event: &SemanticEvent) -> Option<ValueChange> {
        match (*self, event.category) {
            (Capability::Cover, Category::Cover)
            | (Capability::PowerSensor, Category::Power)
            | (Capability::Dimmer, Category::DimmerStatus) => Some(ValueChange::new(event.value)),
            (Capability::Listener, Category::WallSwitch) => Some(ValueChange {
                value: event.value,
                extra: event.extra,
            }),
            (Capability::Switch { .. }, Category::Power) => event
                .value
                .filter(|watts| *watts > 10)
                .map(|_| ValueChange::new(Some(1))),
            (Capability::Switch { channel }, Category::SwitchStatus) if channel == event.channel => {
                Some(ValueChange::new(event.value))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Cover => f.write_str("cover"),
            Capability::Listener => f.write_str("listener"),
            Capability::PowerSensor => f.write_str("power_sensor"),
            Capability::Switch { channel } => write!(f, "switch[{channel}]"),
            Capability::Dimmer => f.write_str("dimmer"),
        }
    }
}

/// EnOcean Equipment Profile identifier (RORG-FUNC-TYPE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Eep {
    pub rorg: u8,
    pub func: u8,
    pub typ: u8,
}

impl Eep {
    pub const fn new(rorg: u8, func: u8, typ: u8) -> Self {
        Self { rorg, func, typ }
    }
}

impl fmt::Display for Eep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}-{:02X}-{:02X}", self.rorg, self.func, self.typ)
    }
}
