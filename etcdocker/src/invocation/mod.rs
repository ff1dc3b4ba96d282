pub mod args;
pub mod builder;
pub mod local_ip;
pub mod ports;

use std::net::Ipv4Addr;
use anyhow::Result;
use crate::config::Config;
use crate::directory::Connector;
use crate::error::DiscoveryError;
use crate::links::LinkResolver;
use crate::rewrite::ArgRewriter;

pub use builder::RunInvocationConfig;

const RUN_SUBCOMMAND: &str = "run";

/// A command line ready for the container client
pub struct Prepared {
    pub argv: Vec<String>,
    /// Present when the command is `run`
    pub run: Option<RunInvocationConfig>,
}

/// Rewrite `argv` for the container client. For `run`, derive the
/// invocation's configuration and resolve its links first.
pub fn prepare<F>(argv: &[String], config: &Config, connector: &dyn Connector, discover: F) -> Result<Prepared>
where
    F: FnOnce() -> Result<Ipv4Addr, DiscoveryError>,
{
    if argv.first().map(String::as_str) != Some(RUN_SUBCOMMAND) {
        let rewriter = ArgRewriter::new(argv.len(), args::scan_wrapper_tokens(argv));
        return Ok(Prepared {
            argv: rewriter.rewrite(argv, &[]),
            run: None,
        });
    }

    let run_args = args::read_run_args(argv);
    let rewriter = ArgRewriter::new(argv.len(), run_args.wrapper_tokens.iter().copied());

    let mut run = RunInvocationConfig::build(&run_args, &config.directory, discover)?;
    tracing::debug!(
        "Advertising {} as {}, command line sized for {} tokens",
        run.name,
        run.host_ip,
        rewriter.expected_len()
    );

    if run.should_register() || run.should_resolve() {
        run.connect(connector)?;
    }

    if run.should_resolve() {
        let resolver = LinkResolver::new(config.links.variant);
        let linked = run.resolve_links(connector, &resolver)?;
        tracing::debug!(
            "Resolved {} of {} links into {} variables",
            linked,
            run.links.len(),
            run.envs.len()
        );
    }

    Ok(Prepared {
        argv: rewriter.rewrite(argv, &run.envs),
        run: Some(run),
    })
}

/// After the container client succeeded, publish the service if it is
/// named and exposes ports.
pub fn complete(run: &mut RunInvocationConfig, connector: &dyn Connector) -> Result<()> {
    if !run.should_register() {
        return Ok(());
    }
    run.register(connector)
}
