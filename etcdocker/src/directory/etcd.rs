//! etcd v2 keys API client
//!
//! Blocking HTTP against `/v2/keys` and `/v2/machines`. Peers are tried in
//! order until one answers.

use serde::Deserialize;
use shared::protocol::DEFAULT_ENDPOINT;
use crate::error::{DirectoryError, Fatal};
use super::{Connector, KeyValueStore, Node, ServiceDirectory};

#[derive(Debug, Deserialize)]
struct KeysResponse {
    node: NodeBody,
}

#[derive(Debug, Deserialize)]
struct NodeBody {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    dir: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: String,
}

pub struct EtcdStore {
    agent: ureq::Agent,
    peers: Vec<String>,
}

impl EtcdStore {
    pub fn new<I, S>(peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            peers: peers.into_iter().map(|p| normalize_peer(p.as_ref())).collect(),
        }
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Ask the cluster for its members and use them as the peer list
    pub fn sync_cluster(&mut self) -> Result<(), DirectoryError> {
        let mut failure = None;

        for peer in self.peers.clone() {
            let url = format!("{}/v2/machines", peer);
            let body = match self.agent.get(&url).call() {
                Ok(response) => response.into_string().map_err(|e| DirectoryError::Transport {
                    url: url.clone(),
                    reason: e.to_string(),
                }),
                Err(e) => Err(DirectoryError::Transport {
                    url: url.clone(),
                    reason: e.to_string(),
                }),
            };

            match body {
                Ok(body) => {
                    let machines = parse_machines(&body);
                    if machines.is_empty() {
                        failure = Some(DirectoryError::Response(format!("{} listed no machines", url)));
                        continue;
                    }
                    tracing::debug!("Synced cluster via {}: {:?}", peer, machines);
                    self.peers = machines;
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("Cluster sync via {} failed: {}", peer, e);
                    failure = Some(e);
                }
            }
        }

        Err(failure.unwrap_or_else(|| DirectoryError::Response("no directory peers configured".to_string())))
    }

    fn call<F>(&self, key: &str, send: F) -> Result<ureq::Response, DirectoryError>
    where
        F: Fn(&str) -> Result<ureq::Response, ureq::Error>,
    {
        let mut failure = None;

        for peer in &self.peers {
            let url = keys_url(peer, key);
            match send(&url) {
                Ok(response) => return Ok(response),
                Err(ureq::Error::Status(code, response)) => {
                    return Err(status_error(code, key, response));
                }
                Err(ureq::Error::Transport(transport)) => {
                    tracing::debug!("Directory peer {} unreachable: {}", peer, transport);
                    failure = Some(DirectoryError::Transport {
                        url,
                        reason: transport.to_string(),
                    });
                }
            }
        }

        Err(failure.unwrap_or_else(|| DirectoryError::Response("no directory peers configured".to_string())))
    }
}

impl KeyValueStore for EtcdStore {
    fn get(&self, key: &str) -> Result<Option<Node>, DirectoryError> {
        let response = match self.call(key, |url| {
            self.agent
                .get(url)
                .query("recursive", "false")
                .query("sorted", "false")
                .call()
        }) {
            Ok(response) => response,
            Err(DirectoryError::Status { code: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let body = response
            .into_string()
            .map_err(|e| DirectoryError::Response(e.to_string()))?;
        let parsed: KeysResponse =
            serde_json::from_str(&body).map_err(|e| DirectoryError::Response(e.to_string()))?;

        Ok(Some(Node {
            key: parsed.node.key,
            value: parsed.node.value,
            dir: parsed.node.dir,
        }))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DirectoryError> {
        self.call(key, |url| self.agent.put(url).send_form(&[("value", value)]))?;
        Ok(())
    }
}

/// Connects to etcd over HTTP
pub struct EtcdConnector;

impl Connector for EtcdConnector {
    fn connect(&self, endpoint: &str, verify_cluster: bool) -> Result<ServiceDirectory, Fatal> {
        let peers = endpoint_peers(endpoint);
        let mut store = EtcdStore::new(&peers);

        if verify_cluster {
            if let Err(e) = store.sync_cluster() {
                tracing::debug!("Cluster verification failed: {}", e);
                return Err(Fatal::ClusterUnreachable { peers });
            }
        }

        tracing::debug!("Using directory peers {:?}", store.peers());
        Ok(ServiceDirectory::new(Box::new(store)))
    }
}

/// Comma-separated endpoint list, or the loopback default when empty
fn endpoint_peers(endpoint: &str) -> Vec<String> {
    let peers: Vec<String> = endpoint
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if peers.is_empty() {
        vec![DEFAULT_ENDPOINT.to_string()]
    } else {
        peers
    }
}

fn normalize_peer(peer: &str) -> String {
    let peer = peer.trim().trim_end_matches('/');
    if peer.contains("://") {
        peer.to_string()
    } else {
        format!("http://{}", peer)
    }
}

fn keys_url(peer: &str, key: &str) -> String {
    if key.starts_with('/') {
        format!("{}/v2/keys{}", peer, key)
    } else {
        format!("{}/v2/keys/{}", peer, key)
    }
}

fn parse_machines(body: &str) -> Vec<String> {
    body.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(normalize_peer)
        .collect()
}

fn status_error(code: u16, key: &str, response: ureq::Response) -> DirectoryError {
    let message = response
        .into_string()
        .ok()
        .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
        .map(|e| {
            if e.cause.is_empty() {
                e.message
            } else {
                format!("{} ({})", e.message, e.cause)
            }
        })
        .unwrap_or_default();

    DirectoryError::Status {
        code,
        key: key.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer one HTTP request with `status` and `body`, returning the
    /// server address and a handle yielding the raw request.
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];

            let header_end = loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if n == 0 {
                    break request.len();
                }
            };

            let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while request.len() < header_end + content_length {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (addr, handle)
    }

    fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    }

    #[test]
    fn test_normalize_peer() {
        assert_eq!(normalize_peer("127.0.0.1:4001"), "http://127.0.0.1:4001");
        assert_eq!(normalize_peer("https://etcd:4001/"), "https://etcd:4001");
    }

    #[test]
    fn test_endpoint_peers_default() {
        assert_eq!(endpoint_peers(""), vec!["127.0.0.1:4001".to_string()]);
        assert_eq!(
            endpoint_peers("10.0.0.1:4001, 10.0.0.2:4001"),
            vec!["10.0.0.1:4001".to_string(), "10.0.0.2:4001".to_string()]
        );
    }

    #[test]
    fn test_keys_url() {
        assert_eq!(
            keys_url("http://h:4001", "/_etcdocker/service/db"),
            "http://h:4001/v2/keys/_etcdocker/service/db"
        );
    }

    #[test]
    fn test_parse_machines() {
        assert_eq!(
            parse_machines("http://10.0.0.1:4001, http://10.0.0.2:4001"),
            vec!["http://10.0.0.1:4001".to_string(), "http://10.0.0.2:4001".to_string()]
        );
        assert!(parse_machines(" ").is_empty());
    }

    #[test]
    fn test_get_leaf() {
        let (addr, server) = serve_once(
            "200 OK",
            r#"{"action":"get","node":{"key":"/_etcdocker/service/db","value":"{\"Name\":\"db\"}","modifiedIndex":7,"createdIndex":7}}"#,
        );
        let store = EtcdStore::new([addr]);

        let node = store.get("/_etcdocker/service/db").unwrap().unwrap();
        assert_eq!(node.value, r#"{"Name":"db"}"#);
        assert!(!node.dir);

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /v2/keys/_etcdocker/service/db?recursive=false&sorted=false"));
    }

    #[test]
    fn test_get_directory_node() {
        let (addr, _server) = serve_once(
            "200 OK",
            r#"{"action":"get","node":{"key":"/_etcdocker/service/db","dir":true,"nodes":[]}}"#,
        );
        let store = EtcdStore::new([addr]);

        let node = store.get("/_etcdocker/service/db").unwrap().unwrap();
        assert!(node.dir);
    }

    #[test]
    fn test_get_not_found() {
        let (addr, _server) = serve_once(
            "404 Not Found",
            r#"{"errorCode":100,"message":"Key not found","cause":"/_etcdocker/service/db","index":3}"#,
        );
        let store = EtcdStore::new([addr]);

        assert_eq!(store.get("/_etcdocker/service/db").unwrap(), None);
    }

    #[test]
    fn test_set_sends_form_value() {
        let (addr, server) = serve_once("201 Created", r#"{"action":"set","node":{"key":"/k","value":"v"}}"#);
        let store = EtcdStore::new([addr]);

        store.set("/k", "v").unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("PUT /v2/keys/k"));
        assert!(request.ends_with("value=v"));
    }

    #[test]
    fn test_set_reports_status() {
        let (addr, _server) = serve_once(
            "403 Forbidden",
            r#"{"errorCode":102,"message":"Not a file","cause":"/k"}"#,
        );
        let store = EtcdStore::new([addr]);

        let err = store.set("/k", "v").unwrap_err();
        assert!(matches!(err, DirectoryError::Status { code: 403, .. }));
    }

    #[test]
    fn test_falls_through_to_next_peer() {
        let (addr, _server) = serve_once("200 OK", r#"{"node":{"key":"/k","value":"v"}}"#);
        let store = EtcdStore::new([closed_port(), addr]);

        let node = store.get("/k").unwrap().unwrap();
        assert_eq!(node.value, "v");
    }

    #[test]
    fn test_sync_cluster_replaces_peers() {
        let (addr, _server) = serve_once("200 OK", "http://10.1.0.1:4001, http://10.1.0.2:4001");
        let mut store = EtcdStore::new([addr]);

        store.sync_cluster().unwrap();
        assert_eq!(store.peers(), ["http://10.1.0.1:4001", "http://10.1.0.2:4001"]);
    }

    #[test]
    fn test_unreachable_cluster_is_fatal() {
        let peer = closed_port();
        let err = match EtcdConnector.connect(&peer, true) {
            Ok(_) => panic!("connect should fail"),
            Err(e) => e,
        };

        assert!(matches!(err, Fatal::ClusterUnreachable { ref peers } if peers == &vec![peer.clone()]));
        assert!(err.to_string().contains(&peer));
        assert_eq!(err.exit_code(), 255);
    }

    #[test]
    fn test_connect_without_verification_is_lazy() {
        assert!(EtcdConnector.connect(&closed_port(), false).is_ok());
    }
}
