//! In-process directory used by tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use crate::error::{DirectoryError, Fatal};
use super::{Connector, KeyValueStore, Node, ServiceDirectory};

/// Shared map of nodes; clones see the same contents
#[derive(Clone, Default)]
pub struct MemoryStore {
    nodes: Rc<RefCell<BTreeMap<String, Node>>>,
    unreachable: Rc<Cell<bool>>,
    gets: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.nodes.borrow_mut().insert(
            key.to_string(),
            Node {
                key: key.to_string(),
                value: value.to_string(),
                dir: false,
            },
        );
    }

    pub fn insert_dir(&self, key: &str) {
        self.nodes.borrow_mut().insert(
            key.to_string(),
            Node {
                key: key.to_string(),
                value: String::new(),
                dir: true,
            },
        );
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.nodes.borrow().get(key).map(|node| node.value.clone())
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.set(unreachable);
    }

    /// Number of `get` calls served so far
    pub fn gets(&self) -> usize {
        self.gets.get()
    }

    fn check_reachable(&self, key: &str) -> Result<(), DirectoryError> {
        if self.unreachable.get() {
            return Err(DirectoryError::Transport {
                url: format!("memory://{}", key),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Node>, DirectoryError> {
        self.gets.set(self.gets.get() + 1);
        self.check_reachable(key)?;
        Ok(self.nodes.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DirectoryError> {
        self.check_reachable(key)?;
        self.insert(key, value);
        Ok(())
    }
}

/// Hands out directories backed by one [`MemoryStore`]
#[derive(Default)]
pub struct MemoryConnector {
    pub store: MemoryStore,
    pub cluster_down: bool,
    connects: Cell<usize>,
    endpoints: RefCell<Vec<String>>,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.get()
    }

    /// Endpoints passed to `connect`, in call order
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.borrow().clone()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, endpoint: &str, verify_cluster: bool) -> Result<ServiceDirectory, Fatal> {
        self.connects.set(self.connects.get() + 1);
        self.endpoints.borrow_mut().push(endpoint.to_string());
        if verify_cluster && self.cluster_down {
            return Err(Fatal::ClusterUnreachable {
                peers: vec![endpoint.to_string()],
            });
        }
        Ok(ServiceDirectory::new(Box::new(self.store.clone())))
    }
}
