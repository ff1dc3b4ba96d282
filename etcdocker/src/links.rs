use std::fmt;
use serde::Deserialize;
use shared::protocol::ENV_FLAG;
use shared::types::LinkSpec;
use crate::directory::ServiceDirectory;
use crate::error::Fatal;

/// How aliases are cased and whether a dependency registered from this
/// host is skipped. Two variants of this rule have shipped; both are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkVariant {
    /// Upper-case the alias and skip dependencies advertising our own host IP
    #[default]
    UpcaseSkipSelf,
    /// Keep the alias as written and resolve every dependency
    Preserve,
}

impl LinkVariant {
    fn upcase_alias(self) -> bool {
        matches!(self, LinkVariant::UpcaseSkipSelf)
    }

    fn skip_self(self) -> bool {
        matches!(self, LinkVariant::UpcaseSkipSelf)
    }
}

/// One `NAME=value` environment variable for the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvAssignment {
    pub name: String,
    pub value: String,
}

impl EnvAssignment {
    fn new(name: String, value: String) -> Self {
        Self { name, value }
    }

    /// The flag/value token pair passing this assignment to the container client
    pub fn flag_tokens(&self) -> [String; 2] {
        [ENV_FLAG.to_string(), self.to_string()]
    }
}

impl fmt::Display for EnvAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Outcome of resolving a link list
#[derive(Debug, Default)]
pub struct Resolution {
    /// Assignments in link declaration order
    pub envs: Vec<EnvAssignment>,
    /// Links that were found and not skipped
    pub linked: usize,
}

/// Turns declared links into environment assignments using the records
/// other invocations registered.
pub struct LinkResolver {
    variant: LinkVariant,
}

impl LinkResolver {
    pub fn new(variant: LinkVariant) -> Self {
        Self { variant }
    }

    /// Resolve `links` in order. Absent or unreadable dependencies add
    /// nothing; only a structurally broken namespace is fatal.
    pub fn resolve(
        &self,
        directory: &ServiceDirectory,
        links: &[LinkSpec],
        self_host_ip: &str,
    ) -> Result<Resolution, Fatal> {
        let mut resolution = Resolution::default();

        for link in links {
            let Some(decoded) = directory.lookup(&link.service_name)? else {
                tracing::debug!("Link {} has no registration, skipping", link.service_name);
                continue;
            };
            if decoded.is_malformed() {
                tracing::debug!("Link {} has an unreadable registration", link.service_name);
            }
            let record = decoded.into_record();

            if self.variant.skip_self() && record.host_ip == self_host_ip {
                tracing::debug!("Link {} is registered from this host, skipping", link.service_name);
                continue;
            }

            resolution.linked += 1;

            let alias = if self.variant.upcase_alias() {
                link.alias.to_uppercase()
            } else {
                link.alias.clone()
            };

            for binding in &record.port_bindings {
                let (port, proto) = binding.port_and_protocol();
                for public in &binding.public_ports {
                    push_port_envs(&mut resolution.envs, &alias, port, proto, &public.host_ip, &public.host_port);
                }
            }
        }

        Ok(resolution)
    }
}

/// The five variables describing one published endpoint
fn push_port_envs(
    envs: &mut Vec<EnvAssignment>,
    alias: &str,
    port: &str,
    proto: &str,
    host_ip: &str,
    host_port: &str,
) {
    let uri = format!("{}://{}:{}", proto, host_ip, host_port);
    let prefix = format!("{}_PORT_{}_{}", alias, port, proto.to_uppercase());

    envs.push(EnvAssignment::new(format!("{}_PORT", alias), uri.clone()));
    envs.push(EnvAssignment::new(prefix.clone(), uri));
    envs.push(EnvAssignment::new(format!("{}_ADDR", prefix), host_ip.to_string()));
    envs.push(EnvAssignment::new(format!("{}_PORT", prefix), host_port.to_string()));
    envs.push(EnvAssignment::new(format!("{}_PROTO", prefix), proto.to_string()));
}
