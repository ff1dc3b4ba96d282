//! Reads the few `run` flags the wrapper cares about.
//!
//! The container client owns the full grammar; this only needs to know
//! which flags take a value so it can find the image and pick out `--name`,
//! `-p`, `--link` and the wrapper-only `--peer`/`--endpoint`.

use shared::protocol::{ENDPOINT_FLAGS, PEER_FLAGS};

/// `run` flags that take no value. Every other flag takes exactly one.
const BOOL_FLAGS: &[&str] = &[
    "d",
    "detach",
    "i",
    "interactive",
    "t",
    "tty",
    "P",
    "publish-all",
    "rm",
    "privileged",
    "init",
    "read-only",
    "no-healthcheck",
    "oom-kill-disable",
    "disable-content-trust",
    "sig-proxy",
    "q",
    "quiet",
    "help",
];

/// Single-letter `run` flags taking a value, which may be attached: `-uroot`
const SHORT_VALUE_FLAGS: &[char] = &['a', 'c', 'e', 'h', 'l', 'm', 'p', 'u', 'v', 'w'];

/// Long value flags that begin with a short value flag's letter, so that
/// `-volume x` is not read as `-v olume`
const LONG_VALUE_FLAGS: &[&str] = &[
    "add-host",
    "annotation",
    "attach",
    "cap-add",
    "cap-drop",
    "cgroup-parent",
    "cgroupns",
    "cidfile",
    "cpu-period",
    "cpu-count",
    "cpu-percent",
    "cpu-quota",
    "cpu-rt-period",
    "cpu-rt-runtime",
    "cpu-shares",
    "cpus",
    "cpuset",
    "cpuset-cpus",
    "cpuset-mems",
    "entrypoint",
    "env",
    "env-file",
    "expose",
    "health-cmd",
    "health-interval",
    "health-retries",
    "health-start-period",
    "health-timeout",
    "hostname",
    "label",
    "label-file",
    "link-local-ip",
    "log-driver",
    "log-opt",
    "mac-address",
    "memory",
    "memory-reservation",
    "memory-swap",
    "memory-swappiness",
    "mount",
    "pid",
    "pids-limit",
    "platform",
    "pull",
    "user",
    "userns",
    "uts",
    "volume",
    "volume-driver",
    "volumes-from",
    "workdir",
];

/// What the wrapper read from a `run` command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    pub name: Option<String>,
    pub image: Option<String>,
    pub peer: Option<String>,
    pub endpoint: Option<String>,
    /// Raw `--link` values, in order
    pub links: Vec<String>,
    /// Raw `-p/--publish` values, in order
    pub publish: Vec<String>,
    /// Positions in the full argv of wrapper-only flags and their values
    pub wrapper_tokens: Vec<usize>,
}

enum Flag {
    Name,
    Link,
    Publish,
    Peer,
    Endpoint,
    Bool,
    Other,
}

fn classify(name: &str) -> Flag {
    match name {
        "name" => Flag::Name,
        "link" => Flag::Link,
        "p" | "publish" => Flag::Publish,
        "peer" => Flag::Peer,
        "endpoint" => Flag::Endpoint,
        _ if BOOL_FLAGS.contains(&name) => Flag::Bool,
        _ => Flag::Other,
    }
}

/// `-uroot`, `-v/data:/data`, `-e=FOO=bar`: a short value flag with its
/// value in the same token. Known long names never match.
fn attached_short_value(body: &str) -> Option<(char, &str)> {
    let long_name = body.split_once('=').map_or(body, |(name, _)| name);
    if !matches!(classify(long_name), Flag::Other) || LONG_VALUE_FLAGS.contains(&long_name) {
        return None;
    }

    let mut chars = body.chars();
    let short = chars.next().filter(|c| SHORT_VALUE_FLAGS.contains(c))?;
    let rest = chars.as_str();
    if rest.is_empty() {
        return None;
    }
    Some((short, rest.strip_prefix('=').unwrap_or(rest)))
}

fn is_bool_cluster(body: &str) -> bool {
    body.len() > 1
        && body
            .chars()
            .all(|c| BOOL_FLAGS.contains(&c.to_string().as_str()))
}

/// Read `argv`, whose first token is the `run` sub-command. Options end at
/// the first positional token (the image) or at `--`.
pub fn read_run_args(argv: &[String]) -> RunArgs {
    let mut run = RunArgs::default();
    let mut i = 1;

    while i < argv.len() {
        let token = argv[i].as_str();

        if token == "--" {
            run.image = argv.get(i + 1).cloned();
            break;
        }
        if !token.starts_with('-') || token == "-" {
            run.image = Some(token.to_string());
            break;
        }

        let double_dash = token.starts_with("--");
        let body = token.trim_start_matches('-');

        if !double_dash && !body.contains('=') && is_bool_cluster(body) {
            i += 1;
            continue;
        }

        if !double_dash {
            if let Some((short, value)) = attached_short_value(body) {
                if short == 'p' {
                    run.publish.push(value.to_string());
                }
                i += 1;
                continue;
            }
        }

        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };

        let flag = classify(name);
        if matches!(flag, Flag::Bool) {
            i += 1;
            continue;
        }

        let wrapper = matches!(flag, Flag::Peer | Flag::Endpoint);
        if wrapper {
            run.wrapper_tokens.push(i);
        }

        let value = match inline {
            Some(value) => value,
            None => match argv.get(i + 1) {
                Some(value) => {
                    i += 1;
                    if wrapper {
                        run.wrapper_tokens.push(i);
                    }
                    value.clone()
                }
                None => {
                    tracing::debug!("Flag {} has no value", token);
                    break;
                }
            },
        };

        match flag {
            Flag::Name => run.name = Some(value),
            Flag::Link => run.links.push(value),
            Flag::Publish => run.publish.push(value),
            Flag::Peer => run.peer = Some(value),
            Flag::Endpoint => run.endpoint = Some(value),
            Flag::Bool | Flag::Other => {}
        }
        i += 1;
    }

    run
}

/// True for a wrapper-only flag token, and whether its value is attached
fn wrapper_flag(token: &str) -> Option<bool> {
    let is_wrapper = |name: &str| PEER_FLAGS.contains(&name) || ENDPOINT_FLAGS.contains(&name);

    if is_wrapper(token) {
        return Some(false);
    }
    match token.split_once('=') {
        Some((name, _)) if is_wrapper(name) => Some(true),
        _ => None,
    }
}

/// Positions of wrapper-only flags anywhere in a non-`run` command line
pub fn scan_wrapper_tokens(argv: &[String]) -> Vec<usize> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        if let Some(attached) = wrapper_flag(&argv[i]) {
            tokens.push(i);
            if !attached && i + 1 < argv.len() {
                tokens.push(i + 1);
                i += 1;
            }
        }
        i += 1;
    }

    tokens
}
