use thiserror::Error;

/// Conditions that end the invocation. Only `main` turns these into a
/// process exit; everything below it returns them.
#[derive(Debug, Error)]
pub enum Fatal {
    #[error("cannot sync with the cluster using peers {}", peers.join(", "))]
    ClusterUnreachable { peers: Vec<String> },

    #[error("{key}: is a directory")]
    DirectoryNode { key: String },

    #[error("container runtime exited with status {code}")]
    Downstream { code: i32 },
}

impl Fatal {
    /// Exit status the process terminates with
    pub fn exit_code(&self) -> i32 {
        match self {
            Fatal::ClusterUnreachable { .. } => 255,
            Fatal::DirectoryNode { .. } => 1,
            Fatal::Downstream { code } => *code,
        }
    }
}

/// Failures talking to the key-value directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("directory answered {code} for {key}: {message}")]
    Status { code: u16, key: String, message: String },

    #[error("malformed directory response: {0}")]
    Response(String),

    #[error("failed to encode service record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures finding the address this host advertises
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to enumerate network interfaces: {0}")]
    Interfaces(#[from] std::io::Error),

    #[error("cannot find local IP address")]
    NotFound,
}

/// Failures deriving a run configuration from the command line
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("invalid publish spec {spec:?}: {reason}")]
    InvalidPublish { spec: String, reason: String },

    #[error("invalid link {0:?}, expected name:alias")]
    InvalidLink(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}
