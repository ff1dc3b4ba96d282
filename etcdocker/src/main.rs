mod cli;
mod config;
mod directory;
mod docker;
mod error;
mod invocation;
mod links;
mod record;
mod rewrite;

use anyhow::{Context, Result};
use clap::Parser;
use crate::cli::Cli;
use crate::config::Config;
use crate::directory::EtcdConnector;
use crate::docker::{DockerClient, TlsOptions};
use crate::error::Fatal;
use crate::invocation::local_ip;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout belongs to the container client
    let default_filter = if cli.debug { "etcdocker=debug" } else { "etcdocker=warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    if cli.version {
        println!("etcdocker version {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(e) = run(cli) {
        let (message, code) = failure_report(&e);
        if let Some(message) = message {
            eprintln!("{}", message);
        }
        std::process::exit(code);
    }
}

/// What to print on stderr, if anything, and the exit status for `e`.
fn failure_report(e: &anyhow::Error) -> (Option<String>, i32) {
    match e.downcast_ref::<Fatal>() {
        // The client already reported its own failure
        Some(fatal) if matches!(fatal, Fatal::Downstream { .. }) => (None, fatal.exit_code()),
        Some(fatal) => (Some(fatal.to_string()), fatal.exit_code()),
        None => (Some(format!("{:#}", e)), 1),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;

    let host = docker::resolve_host(&cli.hosts, std::env::var("DOCKER_HOST").ok())?;
    let (ca_cert, cert, key) = cli.tls_paths();
    let tls = TlsOptions::resolve(cli.tls, cli.tlsverify, &ca_cert, &cert, &key)?;
    let client = DockerClient::new(config.docker.binary.clone(), host, cli.debug, tls);

    let connector = EtcdConnector;
    let mut prepared = invocation::prepare(&cli.command, &config, &connector, local_ip::advertise_address)?;

    client.run(&prepared.argv)?;

    if let Some(run) = prepared.run.as_mut() {
        invocation::complete(run, &connector)
            .with_context(|| format!("Failed to register service {}", run.name))?;
    }

    Ok(())
}
