/// Key prefix under which every service record is stored
pub const SERVICE_KEY_PREFIX: &str = "/_etcdocker/service/";

/// Directory endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:4001";

/// Wrapper-only flags naming the address this host advertises
pub const PEER_FLAGS: [&str; 2] = ["-peer", "--peer"];

/// Wrapper-only flags naming the directory endpoint
pub const ENDPOINT_FLAGS: [&str; 2] = ["-endpoint", "--endpoint"];

/// Flag the container client uses to pass one environment assignment
pub const ENV_FLAG: &str = "-e";

/// Directory key holding the record of `service`
pub fn service_key(service: &str) -> String {
    format!("{}{}", SERVICE_KEY_PREFIX, service)
}
