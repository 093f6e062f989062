//! Repository matching and command execution for push events

use gtmpl::Value;
use std::borrow::Cow;
use tracing::{info, warn};

use crate::error::{DispatchError, Result};
use crate::runner::CommandRunner;
use crate::template;
use crate::utils::find_matching_repository;
use crate::webhook::PushEvent;
use crate::{CommandSpec, Configuration};

impl CommandSpec {
    /// Renders every argument template against `context`, then shell-escapes it.
    ///
    /// An argument that fails to render is logged and used as literal text.
    pub fn render_args(&self, context: &Value, repo: &str) -> Vec<String> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let rendered = template::render(arg, context).unwrap_or_else(|e| {
                    warn!(
                        "arg '{}' (#{}) for '{}' ({}) is not valid: {}",
                        arg, i, self.command, repo, e
                    );
                    arg.clone()
                });
                shell_escape::unix::escape(Cow::Owned(rendered)).into_owned()
            })
            .collect()
    }
}

/// Runs the commands of the first repository rule matching the event.
///
/// Returns the number of commands run (or, for a dry run, that would have run).
pub async fn dispatch(
    config: &Configuration,
    runner: &dyn CommandRunner,
    event: &PushEvent,
    dry_run: bool,
) -> Result<usize> {
    let repo = event.repository_name();
    let rule = find_matching_repository(config, repo)
        .ok_or_else(|| DispatchError::NoMatchingRepository(repo.to_string()))?;

    run_commands(runner, event, &rule.repository, &rule.commands, dry_run).await?;
    Ok(rule.commands.len())
}

/// Runs `commands` in order, stopping at the first failure.
///
/// Commands that already ran are not undone when a later one fails.
pub async fn run_commands(
    runner: &dyn CommandRunner,
    event: &PushEvent,
    repo: &str,
    commands: &[CommandSpec],
    dry_run: bool,
) -> Result<()> {
    let event = serde_json::to_value(event)
        .map_err(|e| DispatchError::EventEncoding(e.to_string()))?;
    let context = template::to_context(&event);

    for (i, spec) in commands.iter().enumerate() {
        let args = spec.render_args(&context, repo);

        if dry_run {
            info!(
                "[DRY_RUN] Would run command #{} for '{}' (cwd = '{}'): {} {}",
                i,
                repo,
                spec.cwd,
                spec.command,
                args.join(" ")
            );
            continue;
        }

        runner
            .run(&spec.command, &args, &spec.cwd)
            .await
            .map_err(|source| DispatchError::CommandExecutionFailed {
                command: spec.command.clone(),
                source,
            })?;
    }

    Ok(())
}
