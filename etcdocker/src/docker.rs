//! The container client the rewritten command line is handed to.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use anyhow::{bail, Context, Result};
use crate::error::Fatal;

pub const DEFAULT_HOST: &str = "unix:///var/run/docker.sock";

const HOST_SCHEMES: [&str; 3] = ["tcp://", "unix://", "fd://"];

/// TLS settings forwarded to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub verify: bool,
    pub ca_cert: PathBuf,
    /// Client certificate and key, sent only when both exist
    pub client_pair: Option<(PathBuf, PathBuf)>,
}

impl TlsOptions {
    /// `None` unless TLS was requested. Verification implies TLS and needs a
    /// readable CA certificate.
    pub fn resolve(tls: bool, verify: bool, ca_cert: &Path, cert: &Path, key: &Path) -> Result<Option<Self>> {
        if !tls && !verify {
            return Ok(None);
        }

        if verify {
            std::fs::File::open(ca_cert)
                .with_context(|| format!("Couldn't read ca cert {}", ca_cert.display()))?;
        }

        let client_pair = (cert.exists() && key.exists()).then(|| (cert.to_path_buf(), key.to_path_buf()));

        Ok(Some(Self {
            verify,
            ca_cert: ca_cert.to_path_buf(),
            client_pair,
        }))
    }

    fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.verify {
            args.push("--tlsverify".to_string());
            args.push(format!("--tlscacert={}", self.ca_cert.display()));
        } else {
            args.push("--tls".to_string());
        }
        if let Some((cert, key)) = &self.client_pair {
            args.push(format!("--tlscert={}", cert.display()));
            args.push(format!("--tlskey={}", key.display()));
        }
        args
    }
}

/// Pick the single daemon address: `-H`, then `DOCKER_HOST`, then the
/// local socket.
pub fn resolve_host(hosts: &[String], env_host: Option<String>) -> Result<String> {
    if hosts.len() > 1 {
        bail!("Please specify only one -H");
    }

    let host = hosts
        .first()
        .cloned()
        .or(env_host.filter(|h| !h.is_empty()))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    if host.contains("://") {
        if !HOST_SCHEMES.iter().any(|scheme| host.starts_with(scheme)) {
            bail!("Invalid bind address protocol: {}", host);
        }
        Ok(host)
    } else {
        Ok(format!("tcp://{}", host))
    }
}

pub struct DockerClient {
    binary: String,
    host: String,
    debug: bool,
    tls: Option<TlsOptions>,
}

impl DockerClient {
    pub fn new(binary: impl Into<String>, host: impl Into<String>, debug: bool, tls: Option<TlsOptions>) -> Self {
        Self {
            binary: binary.into(),
            host: host.into(),
            debug,
            tls,
        }
    }

    /// Global flags followed by `argv`
    pub fn command_line(&self, argv: &[String]) -> Vec<String> {
        let mut args = vec!["-H".to_string(), self.host.clone()];
        if self.debug {
            args.push("-D".to_string());
        }
        if let Some(tls) = &self.tls {
            args.extend(tls.args());
        }
        args.extend(argv.iter().cloned());
        args
    }

    /// Run the client to completion with inherited stdio. A failing exit
    /// status comes back as [`Fatal::Downstream`].
    pub fn run(&self, argv: &[String]) -> Result<()> {
        let args = self.command_line(argv);
        tracing::debug!("Executing {} {:?}", self.binary, args);

        let status = Command::new(&self.binary)
            .args(&args)
            .status()
            .with_context(|| format!("Failed to execute {}", self.binary))?;

        if !status.success() {
            return Err(Fatal::Downstream {
                code: exit_code(status),
            }
            .into());
        }
        Ok(())
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
