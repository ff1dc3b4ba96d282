use std::collections::BTreeSet;
use crate::links::EnvAssignment;

/// Size of the rewritten command line before any assignment is injected:
/// the sub-command, its `run_arg_count` arguments, minus the stripped
/// wrapper-only tokens.
pub fn expected_length(run_arg_count: usize, removed_flag_tokens: usize) -> usize {
    (run_arg_count + 1).saturating_sub(removed_flag_tokens)
}

/// Produces the command line handed to the container client: wrapper-only
/// tokens removed, resolved assignments spliced in right after the
/// sub-command.
#[derive(Debug, Clone)]
pub struct ArgRewriter {
    removed: BTreeSet<usize>,
    expected_len: usize,
}

impl ArgRewriter {
    /// `removed` are positions in an `argc`-long command line to drop
    pub fn new(argc: usize, removed: impl IntoIterator<Item = usize>) -> Self {
        let removed: BTreeSet<usize> = removed.into_iter().filter(|&i| i < argc).collect();
        let expected_len = match argc {
            0 => 0,
            n => expected_length(n - 1, removed.len()),
        };
        Self { removed, expected_len }
    }

    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    pub fn rewrite(&self, original: &[String], envs: &[EnvAssignment]) -> Vec<String> {
        let mut kept = original
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.removed.contains(i))
            .map(|(_, token)| token.clone());

        let mut args = Vec::with_capacity(self.expected_len + 2 * envs.len());
        if let Some(subcommand) = kept.next() {
            args.push(subcommand);
            for env in envs {
                args.extend(env.flag_tokens());
            }
        }
        args.extend(kept);

        debug_assert_eq!(args.len(), self.expected_len + 2 * envs.len());
        args
    }
}
