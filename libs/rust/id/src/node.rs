//! Node identity derived from the pod's IPv4 address.

use crate::IdError;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Number of bits the node identity occupies in a generated ID.
///
/// Matches the host bits of a /16 network, so every pod on the same /16
/// gets a distinct node id.
pub const NODE_BITS: u32 = 16;

/// A small integer distinguishing this process from other ID generators.
///
/// Always within `[0, 2^NODE_BITS)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u16);

impl NodeId {
    /// Largest representable node id.
    pub const MAX: Self = Self(u16::MAX);

    /// Wrap a raw node id.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// The raw node id.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Derive the node id from the lower 16 bits of an IPv4 address.
    ///
    /// IPv4-mapped IPv6 literals (`::ffff:10.0.1.2`) are treated as their
    /// IPv4 address.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidAddress`] for malformed input and
    /// [`IdError::NotIpv4`] for IPv6 addresses.
    ///
    /// # Examples
    ///
    /// ```
    /// use relay_id::NodeId;
    ///
    /// assert_eq!(NodeId::from_ipv4("127.1.1.1").unwrap().get(), 257);
    /// assert!(NodeId::from_ipv4("::1").is_err());
    /// ```
    pub fn from_ipv4(addr: &str) -> Result<Self, IdError> {
        let ip: IpAddr = addr
            .parse()
            .map_err(|_| IdError::InvalidAddress(addr.to_string()))?;

        let v4 = match ip {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .ok_or_else(|| IdError::NotIpv4(addr.to_string()))?,
        };

        let [_, _, hi, lo] = v4.octets();
        Ok(Self(u16::from_be_bytes([hi, lo])))
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_ipv4(s)
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_from_ipv4() {
        let cases = [
            ("127.0.0.1", 1),
            ("127.0.0.255", 255),
            ("127.1.255.255", 65535),
            ("127.1.0.1", 1),
            ("127.1.1.1", 257),
            ("10.42.3.7", 0x0307),
        ];

        for (ip, expected) in cases {
            assert_eq!(NodeId::from_ipv4(ip).unwrap().get(), expected, "ip {ip}");
        }
    }

    #[test]
    fn test_malformed_address_rejected() {
        assert_eq!(
            NodeId::from_ipv4("127.0.0"),
            Err(IdError::InvalidAddress("127.0.0".to_string()))
        );
        assert!(matches!(NodeId::from_ipv4(""), Err(IdError::InvalidAddress(_))));
        assert!(matches!(NodeId::from_ipv4("256.0.0.1"), Err(IdError::InvalidAddress(_))));
        assert!(matches!(NodeId::from_ipv4("pod-ip"), Err(IdError::InvalidAddress(_))));
    }

    #[test]
    fn test_ipv6_rejected() {
        assert_eq!(NodeId::from_ipv4("::1"), Err(IdError::NotIpv4("::1".to_string())));
        assert!(matches!(NodeId::from_ipv4("fe80::1"), Err(IdError::NotIpv4(_))));
    }

    #[test]
    fn test_ipv4_mapped_ipv6_accepted() {
        assert_eq!(NodeId::from_ipv4("::ffff:127.1.1.1").unwrap().get(), 257);
    }

    #[test]
    fn test_error_display() {
        let err = NodeId::from_ipv4("::1").unwrap_err();
        assert_eq!(err.to_string(), "not an ipv4 address: ::1");
    }
}
