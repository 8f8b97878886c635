//! Source identity for admission control.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Numeric identity of a client, derived from its IPv4 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(u32);

impl SourceKey {
    /// Derive a key from a peer address.
    ///
    /// Returns `None` for IPv6 peers. IPv4-mapped IPv6 addresses
    /// (`::ffff:a.b.c.d`) are treated as the IPv4 address they carry.
    pub fn from_ip(ip: IpAddr) -> Option<Self> {
        match ip {
            IpAddr::V4(v4) => Some(Self::from(v4)),
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(Self::from),
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn ipv4(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0)
    }

    /// Address octets in network order.
    pub fn octets(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl From<Ipv4Addr> for SourceKey {
    fn from(addr: Ipv4Addr) -> Self {
        Self(u32::from_be_bytes(addr.octets()))
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ipv4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn ipv4_is_big_endian() {
        let key = SourceKey::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))).unwrap();
        assert_eq!(key.as_u32(), 0x0A00_0001);
        assert_eq!(key.octets(), [10, 0, 0, 1]);
        assert_eq!(key.to_string(), "10.0.0.1");
    }

    #[test]
    fn mapped_ipv6_counts_as_ipv4() {
        let mapped = Ipv4Addr::new(192, 168, 1, 7).to_ipv6_mapped();
        let key = SourceKey::from_ip(IpAddr::V6(mapped)).unwrap();
        assert_eq!(key.ipv4(), Ipv4Addr::new(192, 168, 1, 7));
    }

    #[test]
    fn native_ipv6_is_rejected() {
        assert!(SourceKey::from_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)).is_none());
    }
}
