mod etcd;
#[cfg(test)]
pub mod memory;

use shared::protocol::service_key;
use shared::types::ServiceRecord;
use crate::error::{DirectoryError, Fatal};
use crate::record::{self, Decoded};

pub use etcd::EtcdConnector;

/// A node as returned by the key-value directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub key: String,
    pub value: String,
    pub dir: bool,
}

/// The opaque get/set service the directory is consumed through
pub trait KeyValueStore {
    /// Fetch `key`; `Ok(None)` when it does not exist
    fn get(&self, key: &str) -> Result<Option<Node>, DirectoryError>;

    /// Unconditionally overwrite `key`
    fn set(&self, key: &str, value: &str) -> Result<(), DirectoryError>;
}

/// Opens a [`ServiceDirectory`] for an endpoint.
pub trait Connector {
    /// An empty `endpoint` means the default loopback peer. With
    /// `verify_cluster`, an unreachable cluster is fatal.
    fn connect(&self, endpoint: &str, verify_cluster: bool) -> Result<ServiceDirectory, Fatal>;
}

/// Handle to the service namespace of the directory
pub struct ServiceDirectory {
    store: Box<dyn KeyValueStore>,
}

impl ServiceDirectory {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read a leaf value. Transport failures read as absent; a directory
    /// node where a leaf belongs is fatal.
    pub fn get(&self, key: &str) -> Result<Option<String>, Fatal> {
        match self.store.get(key) {
            Ok(Some(node)) if node.dir => {
                let key = if node.key.is_empty() { key.to_string() } else { node.key };
                Err(Fatal::DirectoryNode { key })
            }
            Ok(Some(node)) => Ok(Some(node.value)),
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::debug!("Treating {} as absent: {}", key, e);
                Ok(None)
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), DirectoryError> {
        self.store.set(key, value)
    }

    /// Fetch and decode the record registered for `service`
    pub fn lookup(&self, service: &str) -> Result<Option<Decoded>, Fatal> {
        Ok(self.get(&service_key(service))?.map(|value| record::decode(&value)))
    }

    /// Write `record` under its service key, overwriting any previous one
    pub fn register(&self, record: &ServiceRecord) -> Result<(), DirectoryError> {
        let value = record::encode(record)?;
        self.set(&service_key(&record.name), &value)?;
        tracing::info!("Registered {} at {}", record.name, record.host_ip);
        Ok(())
    }
}
