//! Common protocol types

use std::fmt;
use std::str::FromStr;

/// MAC address (6 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error type for MAC address parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMacAddrError {
    input: String,
}

impl fmt::Display for ParseMacAddrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid MAC address '{}'", self.input)
    }
}

impl std::error::Error for ParseMacAddrError {}

impl FromStr for MacAddr {
    type Err = ParseMacAddrError;

    /// Accepts "00:11:22:33:44:55" or "00-11-22-33-44-55"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMacAddrError {
            input: s.to_string(),
        };

        let separator = if s.contains(':') { ':' } else { '-' };
        let parts: Vec<&str> = s.split(separator).collect();
        if parts.len() != 6 {
            return Err(err());
        }

        let mut result = [0u8; 6];
        for (slot, part) in result.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(err());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }

        Ok(MacAddr(result))
    }
}

/// EtherType values this crate cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
    Vlan = 0x8100,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_addr_display() {
        let mac = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(format!("{}", mac), "00:11:22:33:44:55");
    }

    #[test]
    fn test_mac_addr_parse_colon() {
        let mac: MacAddr = "00:11:22:33:44:55".parse().unwrap();
        assert_eq!(mac, MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));
    }

    #[test]
    fn test_mac_addr_parse_hyphen_uppercase() {
        let mac: MacAddr = "AA-BB-CC-DD-EE-FF".parse().unwrap();
        assert_eq!(mac, MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]));
    }

    #[test]
    fn test_mac_addr_parse_invalid() {
        assert!("00:11:22:33:44".parse::<MacAddr>().is_err());
        assert!("00:11:22:33:44:gg".parse::<MacAddr>().is_err());
        assert!("0:11:22:33:44:55:".parse::<MacAddr>().is_err());
        assert!("001122334455".parse::<MacAddr>().is_err());
    }
}
