use crate::{GatewayError, Result};

/// Fold a 4-byte address into one integer, first byte most significant.
pub fn combine(bytes: &[u8]) -> Result<u32> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| GatewayError::InvalidAddress(bytes.len()))?;
    Ok(u32::from_be_bytes(arr))
}

pub fn format_address(addr: u32) -> String {
    let [a, b, c, d] = addr.to_be_bytes();
    format!("{a:02X}:{b:02X}:{c:02X}:{d:02X}")
}

/// Accepts `01:94:E3:B9`, `0194E3B9` or `0x0194E3B9`.
pub fn parse_address(s: &str) -> Result<[u8; 4]> {
    let t = s.trim();
    let hex: String = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t)
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect();
    if hex.len() != 8 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GatewayError::InvalidAddress(hex.len() / 2));
    }
    let val = u32::from_str_radix(&hex, 16).map_err(|_| GatewayError::InvalidAddress(4))?;
    Ok(val.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_is_big_endian() -> anyhow::Result<()> {
        assert_eq!(combine(&[0x01, 0x02, 0x03, 0x04])?, 0x0102_0304);
        assert_eq!(combine(&[0xFF, 0x00, 0x00, 0x01])?, 0xFF00_0001);
        Ok(())
    }

    #[test]
    fn combine_rejects_wrong_length() {
        assert!(matches!(
            combine(&[0x01, 0x02, 0x03]),
            Err(GatewayError::InvalidAddress(3))
        ));
        assert!(matches!(
            combine(&[0; 5]),
            Err(GatewayError::InvalidAddress(5))
        ));
    }

    #[test]
    fn parse_accepts_common_spellings() -> anyhow::Result<()> {
        let want = [0x01, 0x94, 0xE3, 0xB9];
        assert_eq!(parse_address("01:94:E3:B9")?, want);
        assert_eq!(parse_address("0194e3b9")?, want);
        assert_eq!(parse_address(" 0x0194E3B9 ")?, want);
        assert!(parse_address("01:94:E3").is_err());
        assert!(parse_address("zz:94:E3:B9").is_err());
        assert_eq!(format_address(0x0194_E3B9), "01:94:E3:B9");
        Ok(())
    }

    #[test]
    fn parse_rejects_signs_and_non_hex() {
        assert!(matches!(
            parse_address("+1234567"),
            Err(GatewayError::InvalidAddress(4))
        ));
        assert!(matches!(
            parse_address("zz:94:E3:B9"),
            Err(GatewayError::InvalidAddress(4))
        ));
    }
}
