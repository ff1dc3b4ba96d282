use std::net::{IpAddr, Ipv4Addr};
use crate::error::DiscoveryError;

/// First IPv4 address on this host that peers elsewhere can reach.
pub fn advertise_address() -> Result<Ipv4Addr, DiscoveryError> {
    let interfaces = if_addrs::get_if_addrs()?;
    select_advertise_address(interfaces.iter().map(|iface| iface.ip()))
}

/// Skips loopback and anything in 172.x, which the container bridge uses on
/// the host.
pub fn select_advertise_address<I>(addrs: I) -> Result<Ipv4Addr, DiscoveryError>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs
        .into_iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(v6) => v6.to_ipv4_mapped(),
        })
        .find(|v4| !matches!(v4.octets()[0], 127 | 172))
        .ok_or(DiscoveryError::NotFound)
}
