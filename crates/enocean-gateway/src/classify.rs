//! Frame classification.
//!
//! Classification runs in two stages. Stage one decodes variable-length (VLD) frames through
//! the blind-control profile and proposes a `cover` event. Stage two walks [`RULES`] in order;
//! the first rule that matches replaces whatever stage one produced, even when stage one
//! matched as well.

use crate::profile::{ProfileResolver, BLIND_CONTROL};
use crate::{Category, Classification, GatewayError, Result, SemanticEvent};
use enocean_transport::{rorg, Packet, PacketKind, RadioFrame, ReturnCode};
use tracing::trace;

type Outcome = (Category, Option<u32>, u8);

/// One row of the stage-two table.
pub struct Rule {
    pub name: &'static str,
    when: fn(&[u8]) -> bool,
    then: fn(&[u8]) -> Outcome,
}

impl Rule {
    pub fn matches(&self, data: &[u8]) -> bool {
        (self.when)(data)
    }
}

fn byte(data: &[u8], idx: usize) -> Option<u8> {
    data.get(idx).copied()
}

fn switch_state(data: &[u8]) -> Option<u32> {
    match byte(data, 3) {
        Some(0xE4) => Some(1),
        Some(0x80) => Some(0),
        _ => None,
    }
}

/// Stage-two rules, first match wins.
pub const RULES: &[Rule] = &[
    Rule {
        name: "rocker_pressed",
        when: |d| byte(d, 6) == Some(0x30),
        then: |_| (Category::WallSwitch, Some(1), 0),
    },
    Rule {
        name: "rocker_released",
        when: |d| byte(d, 6) == Some(0x20),
        then: |_| (Category::WallSwitch, Some(0), 0),
    },
    Rule {
        name: "power_meter",
        when: |d| byte(d, 4) == Some(0x0C),
        then: |d| {
            let hi = u32::from(byte(d, 2).unwrap_or(0));
            let lo = u32::from(byte(d, 3).unwrap_or(0));
            (Category::Power, Some(lo + (hi << 8)), 0)
        },
    },
    Rule {
        name: "switch_status",
        when: |d| byte(d, 2).is_some_and(|b| b & 0x60 == 0x60),
        then: |d| {
            let channel = byte(d, 2).unwrap_or(0) & 0x1F;
            (Category::SwitchStatus, switch_state(d), channel)
        },
    },
    Rule {
        name: "dimmer_status",
        when: |d| byte(d, 0) == Some(rorg::BS4) && byte(d, 1) == Some(0x02),
        then: |d| (Category::DimmerStatus, byte(d, 2).map(u32::from), 0),
    },
];

/// Classify one radio frame into at most one semantic event.
pub fn classify(frame: &RadioFrame, resolver: &dyn ProfileResolver) -> Result<Option<SemanticEvent>> {
    let mut tentative: Option<Outcome> = None;
    if frame.org == rorg::VLD {
        let fields = resolver.resolve(BLIND_CONTROL, frame)?;
        let pos = fields
            .raw_value("POS")
            .ok_or_else(|| GatewayError::ProfileDecode {
                profile: BLIND_CONTROL,
                reason: "missing POS field".into(),
            })?;
        tentative = Some((Category::Cover, Some(pos), 0));
    }

    let outcome = match RULES.iter().find(|rule| rule.matches(&frame.data)) {
        Some(rule) => {
            trace!(rule = rule.name, "stage-two rule matched");
            Some((rule.then)(&frame.data))
        }
        None => tentative,
    };

    Ok(outcome.map(|(category, value, channel)| SemanticEvent {
        category,
        value,
        channel,
        sender: frame.sender_int(),
        extra: byte(&frame.data, 1),
    }))
}

/// Classify any inbound packet, including the base-address response.
pub fn classify_packet(packet: &Packet, resolver: &dyn ProfileResolver) -> Result<Classification> {
    match packet {
        Packet::Radio(frame) => Ok(match classify(frame, resolver)? {
            Some(event) => Classification::Event(event),
            None => Classification::Ignored,
        }),
        Packet::Response(resp) => {
            if resp.kind == PacketKind::Response && resp.status == ReturnCode::Ok {
                if let Ok(address) = <[u8; 4]>::try_from(resp.response_data.as_slice()) {
                    return Ok(Classification::BaseAddressUpdate { address });
                }
            }
            Ok(Classification::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{EepResolver, ProfileFields};
    use crate::Eep;
    use enocean_transport::ResponseFrame;

    struct FixedPos(u32);

    impl ProfileResolver for FixedPos {
        fn resolve(&self, _eep: Eep, _frame: &RadioFrame) -> Result<ProfileFields> {
            let mut fields = ProfileFields::default();
            fields.insert("POS", self.0);
            Ok(fields)
        }
    }

    struct Broken;

    impl ProfileResolver for Broken {
        fn resolve(&self, eep: Eep, _frame: &RadioFrame) -> Result<ProfileFields> {
            Err(GatewayError::ProfileDecode {
                profile: eep,
                reason: "boom".into(),
            })
        }
    }

    fn frame(org: u8, data: &[u8]) -> RadioFrame {
        RadioFrame {
            org,
            sender: [0x01, 0x02, 0x03, 0x04],
            data: data.to_vec(),
            optional: vec![],
            timestamp: None,
        }
    }

    #[test]
    fn vld_without_stage_two_match_is_cover() -> anyhow::Result<()> {
        let f = frame(rorg::VLD, &[0xD2, 0x2A, 0x00, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04, 0x00]);
        let ev = classify(&f, &FixedPos(42))?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!(ev.category, Category::Cover);
        assert_eq!(ev.value, Some(42));
        assert_eq!(ev.channel, 0);
        assert_eq!(ev.sender, 0x0102_0304);
        Ok(())
    }

    #[test]
    fn stage_two_overrides_cover() -> anyhow::Result<()> {
        let f = frame(rorg::VLD, &[0xD2, 0x2A, 0x00, 0x00, 0x04, 0x01, 0x30, 0x03, 0x04, 0x00]);
        let ev = classify(&f, &FixedPos(42))?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!(ev.category, Category::WallSwitch);
        assert_eq!(ev.value, Some(1));
        Ok(())
    }

    #[test]
    fn builtin_resolver_drives_cover() -> anyhow::Result<()> {
        let f = RadioFrame::from_erp1(
            vec![0xD2, 0x2A, 0x00, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04, 0x00],
            vec![],
        )?;
        let ev = classify(&f, &EepResolver)?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!((ev.category, ev.value), (Category::Cover, Some(42)));
        Ok(())
    }

    #[test]
    fn rocker_frames() -> anyhow::Result<()> {
        let pressed = frame(rorg::RPS, &[0xF6, 0x50, 0xFE, 0xF4, 0x5C, 0x1A, 0x30]);
        let ev = classify(&pressed, &EepResolver)?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!((ev.category, ev.value, ev.extra), (Category::WallSwitch, Some(1), Some(0x50)));

        let released = frame(rorg::RPS, &[0xF6, 0x00, 0xFE, 0xF4, 0x5C, 0x1A, 0x20]);
        let ev = classify(&released, &EepResolver)?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!((ev.category, ev.value), (Category::WallSwitch, Some(0)));
        Ok(())
    }

    #[test]
    fn power_value_is_big_endian_pair() -> anyhow::Result<()> {
        let f = frame(rorg::BS4, &[0xA5, 0x00, 0x01, 0x2C, 0x0C, 0x01, 0x02, 0x03, 0x04, 0x00]);
        let ev = classify(&f, &EepResolver)?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!((ev.category, ev.value), (Category::Power, Some(300)));
        Ok(())
    }

    #[test]
    fn switch_status_extracts_channel() -> anyhow::Result<()> {
        let on = frame(0xD2, &[0xD2, 0x04, 0x65, 0xE4, 0x00]);
        let ev = classify(&on, &FixedPos(0))?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!((ev.category, ev.value, ev.channel), (Category::SwitchStatus, Some(1), 0x05));

        let off = frame(0xD1, &[0xD2, 0x04, 0x61, 0x80, 0x00]);
        let ev = classify(&off, &EepResolver)?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!((ev.value, ev.channel), (Some(0), 0x01));

        let unknown = frame(0xD1, &[0xD2, 0x04, 0x60, 0x12, 0x00]);
        let ev = classify(&unknown, &EepResolver)?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!((ev.category, ev.value), (Category::SwitchStatus, None));
        Ok(())
    }

    #[test]
    fn dimmer_status() -> anyhow::Result<()> {
        let f = frame(rorg::BS4, &[0xA5, 0x02, 0x37, 0x00, 0x09, 0x01, 0x02, 0x03, 0x04, 0x00]);
        let ev = classify(&f, &EepResolver)?.ok_or_else(|| anyhow::anyhow!("no event"))?;
        assert_eq!((ev.category, ev.value), (Category::DimmerStatus, Some(0x37)));
        Ok(())
    }

    #[test]
    fn unmatched_frame_yields_nothing() -> anyhow::Result<()> {
        let f = frame(rorg::BS1, &[0xD5, 0x09, 0x01, 0x02, 0x03, 0x04, 0x00]);
        assert_eq!(classify(&f, &EepResolver)?, None);
        // too short for every rule
        assert_eq!(classify(&frame(rorg::BS1, &[0xD5]), &EepResolver)?, None);
        Ok(())
    }

    #[test]
    fn profile_failure_is_per_frame_error() {
        let f = frame(rorg::VLD, &[0xD2, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x00]);
        assert!(matches!(
            classify(&f, &Broken),
            Err(GatewayError::ProfileDecode { .. })
        ));
    }

    #[test]
    fn base_address_response() -> anyhow::Result<()> {
        let ok = Packet::Response(ResponseFrame {
            kind: PacketKind::Response,
            status: ReturnCode::Ok,
            response_data: vec![0xFF, 0x80, 0x00, 0x01],
        });
        assert_eq!(
            classify_packet(&ok, &EepResolver)?,
            Classification::BaseAddressUpdate {
                address: [0xFF, 0x80, 0x00, 0x01]
            }
        );

        let short = Packet::Response(ResponseFrame {
            kind: PacketKind::Response,
            status: ReturnCode::Ok,
            response_data: vec![0xFF, 0x80],
        });
        assert_eq!(classify_packet(&short, &EepResolver)?, Classification::Ignored);

        let failed = Packet::Response(ResponseFrame {
            kind: PacketKind::Response,
            status: ReturnCode::Error,
            response_data: vec![0xFF, 0x80, 0x00, 0x01],
        });
        assert_eq!(classify_packet(&failed, &EepResolver)?, Classification::Ignored);

        let event = Packet::Response(ResponseFrame {
            kind: PacketKind::Event,
            status: ReturnCode::Ok,
            response_data: vec![0xFF, 0x80, 0x00, 0x01],
        });
        assert_eq!(classify_packet(&event, &EepResolver)?, Classification::Ignored);
        Ok(())
    }
}
