use crate::{Eep, GatewayError, Result};
use enocean_transport::{rorg, RadioFrame};
use std::collections::HashMap;

/// D2-05-00: blinds control for position and angle.
pub const BLIND_CONTROL: Eep = Eep::new(rorg::VLD, 0x05, 0x00);

/// Raw field values decoded from one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    raw: HashMap<String, u32>,
}

impl ProfileFields {
    pub fn insert(&mut self, name: impl Into<String>, raw_value: u32) {
        self.raw.insert(name.into(), raw_value);
    }

    pub fn raw_value(&self, name: &str) -> Option<u32> {
        self.raw.get(name).copied()
    }
}

/// Decodes variable-length payloads according to an Equipment Profile.
pub trait ProfileResolver: Send + Sync {
    fn resolve(&self, eep: Eep, frame: &RadioFrame) -> Result<ProfileFields>;
}

struct FieldSpec {
    name: &'static str,
    offset: usize,
    size: usize,
}

const BLIND_CONTROL_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "POS", offset: 1, size: 7 },
    FieldSpec { name: "ANG", offset: 9, size: 7 },
    FieldSpec { name: "LOCK", offset: 21, size: 3 },
    FieldSpec { name: "CMD", offset: 28, size: 4 },
];

/// Built-in resolver for the profiles this gateway understands.
#[derive(Debug, Default, Clone, Copy)]
pub struct EepResolver;

impl EepResolver {
    fn fields_for(eep: Eep) -> Option<&'static [FieldSpec]> {
        if eep == BLIND_CONTROL {
            Some(BLIND_CONTROL_FIELDS)
        } else {
            None
        }
    }
}

impl ProfileResolver for EepResolver {
    fn resolve(&self, eep: Eep, frame: &RadioFrame) -> Result<ProfileFields> {
        let specs = Self::fields_for(eep).ok_or_else(|| GatewayError::ProfileDecode {
            profile: eep,
            reason: "unsupported profile".into(),
        })?;
        let payload = frame.payload();
        let mut fields = ProfileFields::default();
        for spec in specs {
            let raw = read_bits(payload, spec.offset, spec.size).ok_or_else(|| {
                GatewayError::ProfileDecode {
                    profile: eep,
                    reason: format!(
                        "field {} needs {} bits, payload has {}",
                        spec.name,
                        spec.offset + spec.size,
                        payload.len() * 8
                    ),
                }
            })?;
            fields.insert(spec.name, raw);
        }
        Ok(fields)
    }
}

/// Big-endian bit extraction; bit 0 is the MSB of the first byte.
fn read_bits(bytes: &[u8], offset: usize, size: usize) -> Option<u32> {
    if size > 32 || offset + size > bytes.len() * 8 {
        return None;
    }
    let mut out = 0u32;
    for bit in offset..offset + size {
        let byte = bytes[bit / 8];
        let set = (byte >> (7 - bit % 8)) & 1;
        out = (out << 1) | u32::from(set);
    }
    Some(out)
}
