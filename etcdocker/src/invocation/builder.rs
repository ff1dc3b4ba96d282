use std::net::{IpAddr, Ipv4Addr};
use anyhow::Result;
use shared::types::{LinkSpec, PortBinding, PublicPortMapping, ServiceRecord};
use crate::config::DirectoryConfig;
use crate::directory::{Connector, ServiceDirectory};
use crate::error::{DiscoveryError, Fatal, InvocationError};
use crate::links::{EnvAssignment, LinkResolver};
use super::args::RunArgs;
use super::ports::{parse_publish, PublishedPort};

/// Everything one `run` invocation knows about itself. Only `record` is
/// ever persisted.
pub struct RunInvocationConfig {
    pub name: String,
    pub endpoint: String,
    pub host_ip: String,
    pub image: Option<String>,
    pub record: ServiceRecord,
    pub links: Vec<LinkSpec>,
    /// Filled by link resolution
    pub envs: Vec<EnvAssignment>,
    verify_cluster: bool,
    directory: Option<ServiceDirectory>,
}

impl RunInvocationConfig {
    /// Derive the configuration from what was read off the command line.
    /// `discover` is only called when no `--peer` address was given.
    pub fn build<F>(run: &RunArgs, settings: &DirectoryConfig, discover: F) -> Result<Self, InvocationError>
    where
        F: FnOnce() -> Result<Ipv4Addr, DiscoveryError>,
    {
        let host_ip = match run.peer.as_deref().filter(|p| !p.is_empty()) {
            Some(peer) => peer.to_string(),
            None => discover()?.to_string(),
        };

        let endpoint = run
            .endpoint
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| settings.endpoint.clone());

        let name = run.name.clone().unwrap_or_default();

        let links = run
            .links
            .iter()
            .map(|token| LinkSpec::parse(token).ok_or_else(|| InvocationError::InvalidLink(token.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let mut config = Self {
            record: ServiceRecord {
                name: name.clone(),
                host_ip: host_ip.clone(),
                port_bindings: Vec::new(),
            },
            name,
            endpoint,
            host_ip,
            image: run.image.clone(),
            links,
            envs: Vec::new(),
            verify_cluster: settings.verify_cluster,
            directory: None,
        };

        for spec in &run.publish {
            for published in parse_publish(spec)? {
                config.add_published(published);
            }
        }

        Ok(config)
    }

    /// Add one mapping under its container port. Wildcard and empty host
    /// addresses become this host's advertising address.
    fn add_published(&mut self, published: PublishedPort) {
        let host_ip = if is_wildcard(&published.host_ip) {
            self.host_ip.clone()
        } else {
            published.host_ip
        };
        let mapping = PublicPortMapping {
            host_ip,
            host_port: published.host_port,
        };

        let bindings = &mut self.record.port_bindings;
        match bindings
            .iter_mut()
            .find(|b| b.container_port == published.container_port)
        {
            Some(binding) => binding.public_ports.push(mapping),
            None => bindings.push(PortBinding {
                container_port: published.container_port,
                public_ports: vec![mapping],
            }),
        }
    }

    /// A record is written only for a named service publishing ports
    pub fn should_register(&self) -> bool {
        !self.name.is_empty() && !self.record.port_bindings.is_empty()
    }

    pub fn should_resolve(&self) -> bool {
        self.image.is_some() && !self.links.is_empty()
    }

    /// Open the directory once; later calls reuse the handle
    pub fn connect(&mut self, connector: &dyn Connector) -> Result<&ServiceDirectory, Fatal> {
        let directory = self.take_directory(connector)?;
        Ok(self.directory.insert(directory))
    }

    /// Resolve the declared links into `envs`, returning how many linked
    pub fn resolve_links(&mut self, connector: &dyn Connector, resolver: &LinkResolver) -> Result<usize, Fatal> {
        let directory = self.take_directory(connector)?;
        let resolution = resolver.resolve(&directory, &self.links, &self.host_ip);
        self.directory = Some(directory);

        let resolution = resolution?;
        self.envs = resolution.envs;
        Ok(resolution.linked)
    }

    /// Publish `record` to the directory
    pub fn register(&mut self, connector: &dyn Connector) -> Result<()> {
        let directory = self.take_directory(connector)?;
        let written = directory.register(&self.record);
        self.directory = Some(directory);
        written?;
        Ok(())
    }

    fn take_directory(&mut self, connector: &dyn Connector) -> Result<ServiceDirectory, Fatal> {
        match self.directory.take() {
            Some(directory) => Ok(directory),
            None => connector.connect(&self.endpoint, self.verify_cluster),
        }
    }
}

/// Empty, `0.0.0.0` or `::`: bound on every interface, so useless to a peer
fn is_wildcard(host_ip: &str) -> bool {
    host_ip.is_empty() || host_ip.parse::<IpAddr>().is_ok_and(|ip| ip.is_unspecified())
}
