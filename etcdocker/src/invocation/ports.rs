use std::net::IpAddr;
use crate::error::InvocationError;

/// One host mapping read from a `-p` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPort {
    /// `<port>/<protocol>`
    pub container_port: String,
    /// Empty when the mapping binds every address
    pub host_ip: String,
    /// Empty when the host port is assigned at launch
    pub host_port: String,
}

const PROTOCOLS: [&str; 3] = ["tcp", "udp", "sctp"];

/// Parse `[ip:][hostPort:]containerPort[/proto]`, expanding port ranges.
pub fn parse_publish(spec: &str) -> Result<Vec<PublishedPort>, InvocationError> {
    let invalid = |reason: &str| InvocationError::InvalidPublish {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let (addr, proto) = match spec.rsplit_once('/') {
        Some((addr, proto)) => (addr, proto.to_lowercase()),
        None => (spec, "tcp".to_string()),
    };
    if !PROTOCOLS.contains(&proto.as_str()) {
        return Err(invalid("unknown protocol"));
    }

    let (host_ip, host_port, container_port) = if let Some(bracketed) = addr.strip_prefix('[') {
        let (ip, rest) = bracketed
            .split_once("]:")
            .ok_or_else(|| invalid("unterminated IPv6 address"))?;
        let (host_port, container_port) = rest
            .split_once(':')
            .ok_or_else(|| invalid("missing container port"))?;
        (ip, host_port, container_port)
    } else {
        let parts: Vec<&str> = addr.split(':').collect();
        match parts.as_slice() {
            [container] => ("", "", *container),
            [host_port, container] => ("", *host_port, *container),
            [ip, host_port, container] => (*ip, *host_port, *container),
            _ => return Err(invalid("too many colons")),
        }
    };

    if !host_ip.is_empty() && host_ip.parse::<IpAddr>().is_err() {
        return Err(invalid("invalid host address"));
    }

    let (first, last) = parse_range(container_port).ok_or_else(|| invalid("invalid container port"))?;
    let count = usize::from(last - first) + 1;

    let host_ports: Vec<String> = if host_port.is_empty() {
        vec![String::new(); count]
    } else {
        let (host_first, host_last) = parse_range(host_port).ok_or_else(|| invalid("invalid host port"))?;
        if usize::from(host_last - host_first) + 1 != count {
            return Err(invalid("host and container port ranges differ in size"));
        }
        (host_first..=host_last).map(|p| p.to_string()).collect()
    };

    Ok((first..=last)
        .zip(host_ports)
        .map(|(port, host_port)| PublishedPort {
            container_port: format!("{}/{}", port, proto),
            host_ip: host_ip.to_string(),
            host_port,
        })
        .collect())
}

/// `80` or `8000-8010`
fn parse_range(text: &str) -> Option<(u16, u16)> {
    let (first, last) = match text.split_once('-') {
        Some((first, last)) => (first.parse().ok()?, last.parse().ok()?),
        None => {
            let port = text.parse().ok()?;
            (port, port)
        }
    };
    (first <= last).then_some((first, last))
}
