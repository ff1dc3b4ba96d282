use serde::{Deserialize, Deserializer, Serialize};

/// The discoverable description of one running service.
/// Stored as JSON under `protocol::service_key(name)`; the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceRecord {
    /// Service name, as given to `--name`
    pub name: String,

    /// Advertising address of the host running the service
    pub host_ip: String,

    /// Published ports, in the order they were declared
    #[serde(deserialize_with = "null_as_empty")]
    pub port_bindings: Vec<PortBinding>,
}

/// One container-internal port and every host-side mapping exposing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PortBinding {
    /// Container port formatted as `<port>/<protocol>`, e.g. "5432/tcp"
    pub container_port: String,

    #[serde(deserialize_with = "null_as_empty")]
    pub public_ports: Vec<PublicPortMapping>,
}

/// A concrete externally reachable endpoint. `host_ip` is never the wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PublicPortMapping {
    pub host_ip: String,
    pub host_port: String,
}

/// A declared dependency on another service, from a `name:alias` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub service_name: String,
    pub alias: String,
}

impl PortBinding {
    /// Split `container_port` into `(port, protocol)`; a bare port is tcp.
    pub fn port_and_protocol(&self) -> (&str, &str) {
        self.container_port
            .split_once('/')
            .unwrap_or((self.container_port.as_str(), "tcp"))
    }
}

impl LinkSpec {
    /// Parse a `name:alias` token. A bare `name` links under its own name.
    pub fn parse(token: &str) -> Option<Self> {
        let (name, alias) = match token.split_once(':') {
            Some((name, alias)) => (name.trim_start_matches('/'), alias),
            None => {
                let name = token.trim_start_matches('/');
                (name, name)
            }
        };
        if name.is_empty() || alias.is_empty() {
            return None;
        }
        Some(Self {
            service_name: name.to_string(),
            alias: alias.to_string(),
        })
    }
}

/// Stored records may carry `null` lists; treat them as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_stable() {
        let record = ServiceRecord {
            name: "db".to_string(),
            host_ip: "10.0.0.5".to_string(),
            port_bindings: vec![PortBinding {
                container_port: "5432/tcp".to_string(),
                public_ports: vec![PublicPortMapping {
                    host_ip: "10.0.0.5".to_string(),
                    host_port: "32000".to_string(),
                }],
            }],
        };

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"Name":"db","HostIp":"10.0.0.5","PortBindings":[{"ContainerPort":"5432/tcp","PublicPorts":[{"HostIp":"10.0.0.5","HostPort":"32000"}]}]}"#
        );
    }

    #[test]
    fn test_null_lists_decode_as_empty() {
        let record: ServiceRecord =
            serde_json::from_str(r#"{"Name":"web","HostIp":"10.0.0.9","PortBindings":null}"#).unwrap();
        assert_eq!(record.name, "web");
        assert!(record.port_bindings.is_empty());
    }

    #[test]
    fn test_port_and_protocol() {
        let binding = PortBinding {
            container_port: "53/udp".to_string(),
            public_ports: Vec::new(),
        };
        assert_eq!(binding.port_and_protocol(), ("53", "udp"));

        let bare = PortBinding {
            container_port: "80".to_string(),
            public_ports: Vec::new(),
        };
        assert_eq!(bare.port_and_protocol(), ("80", "tcp"));
    }

    #[test]
    fn test_link_spec_parse() {
        let link = LinkSpec::parse("db:DB").unwrap();
        assert_eq!(link.service_name, "db");
        assert_eq!(link.alias, "DB");

        let bare = LinkSpec::parse("/cache").unwrap();
        assert_eq!(bare.service_name, "cache");
        assert_eq!(bare.alias, "cache");

        assert!(LinkSpec::parse(":alias").is_none());
        assert!(LinkSpec::parse("name:").is_none());
    }
}
