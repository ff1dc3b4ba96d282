use std::path::PathBuf;
use clap::Parser;

const DEFAULT_CA_FILE: &str = "ca.pem";
const DEFAULT_CERT_FILE: &str = "cert.pem";
const DEFAULT_KEY_FILE: &str = "key.pem";

/// Run containers that find each other through a shared etcd directory.
///
/// Global flags mirror the container client's own; everything from the
/// sub-command on is passed through after link resolution.
#[derive(Debug, Parser)]
#[command(name = "etcdocker", disable_version_flag = true)]
pub struct Cli {
    /// Daemon socket to connect to (tcp://host:port, unix://path, fd://*)
    #[arg(short = 'H', long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Enable debug mode
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Use TLS; implied by --tlsverify
    #[arg(long)]
    pub tls: bool,

    /// Use TLS and verify the remote
    #[arg(long)]
    pub tlsverify: bool,

    /// Trust only remotes providing a certificate signed by this CA
    #[arg(long, value_name = "PATH")]
    pub tlscacert: Option<PathBuf>,

    /// Path to TLS certificate file
    #[arg(long, value_name = "PATH")]
    pub tlscert: Option<PathBuf>,

    /// Path to TLS key file
    #[arg(long, value_name = "PATH")]
    pub tlskey: Option<PathBuf>,

    /// Print version information and quit
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Wrapper configuration file
    #[arg(short = 'c', long, env = "ETCDOCKER_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Container client command line, e.g. `run --link db:db app`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// CA, certificate and key paths, defaulting into `$HOME/.docker`
    pub fn tls_paths(&self) -> (PathBuf, PathBuf, PathBuf) {
        let dir = docker_conf_dir();
        let pick = |given: &Option<PathBuf>, file: &str| given.clone().unwrap_or_else(|| dir.join(file));
        (
            pick(&self.tlscacert, DEFAULT_CA_FILE),
            pick(&self.tlscert, DEFAULT_CERT_FILE),
            pick(&self.tlskey, DEFAULT_KEY_FILE),
        )
    }
}

fn docker_conf_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".docker")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_then_passthrough() {
        let cli = Cli::try_parse_from([
            "etcdocker", "-D", "-H", "tcp://10.0.0.1:2375", "run", "-it", "--peer", "10.0.0.3", "--link", "db:db",
            "ubuntu", "bash",
        ])
        .unwrap();

        assert!(cli.debug);
        assert_eq!(cli.hosts, vec!["tcp://10.0.0.1:2375"]);
        assert_eq!(
            cli.command,
            vec!["run", "-it", "--peer", "10.0.0.3", "--link", "db:db", "ubuntu", "bash"]
        );
    }

    #[test]
    fn test_version_flag() {
        let cli = Cli::try_parse_from(["etcdocker", "-v"]).unwrap();
        assert!(cli.version);
        assert!(cli.command.is_empty());
    }

    #[test]
    fn test_tls_path_overrides() {
        let cli = Cli::try_parse_from(["etcdocker", "--tlscacert", "/certs/ca.pem", "ps"]).unwrap();
        let (ca, cert, _) = cli.tls_paths();
        assert_eq!(ca, PathBuf::from("/certs/ca.pem"));
        assert!(cert.ends_with(".docker/cert.pem"));
    }
}
