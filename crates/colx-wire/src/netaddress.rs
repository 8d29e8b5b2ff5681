//! Network addresses as carried in `version` and `addr` messages.

use crate::encode::{ensure, read_u16_be, read_u32, read_u64};
use crate::{ServiceFlags, WireResult, NET_ADDRESS_TIME_VERSION};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::time::{SystemTime, UNIX_EPOCH};

/// Serialized size without the timestamp: services (8) + ip (16) + port (2).
const NET_ADDRESS_BASE_SIZE: usize = 26;

/// A peer address with the services it advertises.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetAddress {
    /// Last time the address was seen (seconds since epoch).
    /// Not present in `version` messages nor before `NET_ADDRESS_TIME_VERSION`.
    pub timestamp: u32,
    /// Services advertised by the address.
    pub services: ServiceFlags,
    /// IP address. IPv4 travels as an IPv4-mapped IPv6 address.
    pub ip: IpAddr,
    /// Port (big-endian on the wire).
    pub port: u16,
}

impl Default for NetAddress {
    fn default() -> Self {
        Self {
            timestamp: 0,
            services: ServiceFlags::NONE,
            ip: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            port: 0,
        }
    }
}

impl NetAddress {
    /// Create an address stamped with the current time.
    pub fn new(addr: SocketAddr, services: ServiceFlags) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self {
            timestamp,
            services,
            ip: addr.ip(),
            port: addr.port(),
        }
    }

    /// Socket address form.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Key identifying the address regardless of timestamp and services.
    pub fn key(&self) -> String {
        self.socket_addr().to_string()
    }

    /// Serialized size at the given protocol version.
    pub fn max_payload(pver: u32) -> usize {
        if pver >= NET_ADDRESS_TIME_VERSION {
            NET_ADDRESS_BASE_SIZE + 4
        } else {
            NET_ADDRESS_BASE_SIZE
        }
    }

    /// Encode, with the timestamp when `with_timestamp` and the version carries one.
    pub(crate) fn encode(&self, dst: &mut BytesMut, pver: u32, with_timestamp: bool) {
        if with_timestamp && pver >= NET_ADDRESS_TIME_VERSION {
            dst.put_u32_le(self.timestamp);
        }
        dst.put_u64_le(self.services.0);
        let octets = match self.ip {
            IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            IpAddr::V6(v6) => v6.octets(),
        };
        dst.put_slice(&octets);
        dst.put_u16(self.port);
    }

    pub(crate) fn decode(buf: &mut Bytes, pver: u32, with_timestamp: bool) -> WireResult<Self> {
        let timestamp = if with_timestamp && pver >= NET_ADDRESS_TIME_VERSION {
            read_u32(buf, "address timestamp")?
        } else {
            0
        };
        let services = ServiceFlags(read_u64(buf, "address services")?);

        ensure(buf, 16, "address ip")?;
        let mut octets = [0u8; 16];
        buf.copy_to_slice(&mut octets);
        let v6 = Ipv6Addr::from(octets);
        let ip = match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        };

        let port = read_u16_be(buf, "address port")?;

        Ok(Self {
            timestamp,
            services,
            ip,
            port,
        })
    }
}
