/*!
cli.rs - subprocess providers (claude, codex, gemini, qwen, ollama).

Each tool is described by a `CliTemplate`; `CliProvider::build_args` turns a
(model, options) pair into the argument vector, and `invoke` runs it with
`tokio::process`, feeding the prompt on stdin or as the final argument.

Exit status != 0 -> `AiError::Provider` with the tool's trimmed stderr.
The child is spawned with `kill_on_drop`, so a timed-out task takes its
process down with it.
*/

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::command::{CommandSpec, parse_command};
use super::{InvokeOptions, Provider, ProviderName};
use crate::error::{AiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Stdin,
    Arg,
}

/// Static description of how a CLI tool is driven.
#[derive(Debug, Clone)]
pub struct CliTemplate {
    pub base: &'static [&'static str],
    /// Flag preceding the model (`--model`); empty when the model is positional.
    pub model_flag: &'static [&'static str],
    pub json_args: &'static [&'static str],
    pub auto_approve_args: &'static [&'static str],
    /// Passed only when auto-approve is off (sandboxing / tool allow-lists).
    pub default_args: &'static [&'static str],
    pub extra_args: &'static [&'static str],
    /// Model goes after all flags, right before the prompt.
    pub model_positional: bool,
    pub prompt_mode: PromptMode,
}

impl CliTemplate {
    pub fn for_provider(name: ProviderName) -> Option<Self> {
        let t = match name {
            ProviderName::Claude => CliTemplate {
                base: &["claude", "--print"],
                model_flag: &["--model"],
                json_args: &["--output-format", "json"],
                auto_approve_args: &["--dangerously-skip-permissions"],
                default_args: &[],
                extra_args: &[],
                model_positional: false,
                prompt_mode: PromptMode::Stdin,
            },
            ProviderName::Codex => CliTemplate {
                base: &["codex", "exec"],
                model_flag: &["--model"],
                json_args: &[],
                auto_approve_args: &["-s", "danger-full-access"],
                default_args: &["-s", "workspace-write"],
                extra_args: &["--skip-git-repo-check"],
                model_positional: false,
                prompt_mode: PromptMode::Arg,
            },
            ProviderName::Gemini => CliTemplate {
                base: &["gemini"],
                model_flag: &["--model"],
                json_args: &["--output-format", "json"],
                auto_approve_args: &["--yolo"],
                default_args: &[
                    "--allowed-tools",
                    "run_shell_command",
                    "read_file",
                    "list_directory",
                    "search_file_content",
                    "glob",
                ],
                extra_args: &[],
                model_positional: false,
                prompt_mode: PromptMode::Arg,
            },
            ProviderName::Qwen => CliTemplate {
                base: &["qwen"],
                model_flag: &["--model"],
                json_args: &["--output-format", "json"],
                auto_approve_args: &["--yolo"],
                default_args: &[],
                extra_args: &[],
                model_positional: false,
                prompt_mode: PromptMode::Arg,
            },
            ProviderName::Ollama => CliTemplate {
                base: &["ollama", "run"],
                model_flag: &[],
                json_args: &["--format", "json"],
                auto_approve_args: &[],
                default_args: &[],
                extra_args: &["--hidethinking"],
                model_positional: true,
                prompt_mode: PromptMode::Arg,
            },
            ProviderName::Openrouter | ProviderName::Glm => return None,
        };
        Some(t)
    }
}

pub struct CliProvider {
    name: ProviderName,
    command: CommandSpec,
    template: CliTemplate,
}

impl CliProvider {
    /// Built-in template, optionally with the base command replaced by a config override.
    pub fn builtin(name: ProviderName, override_cmd: Option<&str>) -> Result<Self> {
        let template = CliTemplate::for_provider(name)
            .ok_or_else(|| AiError::Config(format!("{name} is not a subprocess provider")))?;
        let command = match override_cmd {
            Some(raw) => parse_command(raw)?,
            None => CommandSpec::from_parts(template.base),
        };
        Ok(Self {
            name,
            command,
            template,
        })
    }

    /// Arguments after the program name (prompt excluded unless `PromptMode::Arg`).
    pub fn build_args(&self, model: &str, prompt: &str, options: InvokeOptions) -> Vec<String> {
        let t = &self.template;
        let mut args = self.command.args.clone();
        let mut push = |items: &[&str]| args.extend(items.iter().map(|s| s.to_string()));

        if !t.model_flag.is_empty() {
            push(t.model_flag);
            push(&[model]);
        }
        if options.json_mode {
            push(t.json_args);
        }
        if options.auto_approve && !t.auto_approve_args.is_empty() {
            push(t.auto_approve_args);
        } else {
            push(t.default_args);
        }
        push(t.extra_args);
        if t.model_positional {
            push(&[model]);
        }
        if t.prompt_mode == PromptMode::Arg {
            push(&[prompt]);
        }
        args
    }
}

#[async_trait]
impl Provider for CliProvider {
    fn name(&self) -> ProviderName {
        self.name
    }

    fn is_available(&self) -> bool {
        self.command.is_installed()
    }

    async fn invoke(&self, model: &str, prompt: &str, options: InvokeOptions) -> Result<String> {
        if !self.is_available() {
            return Err(AiError::provider(
                self.name,
                format!("CLI tool '{}' not found", self.command.program),
            ));
        }

        let args = self.build_args(model, prompt, options);
        tracing::debug!(provider = %self.name, program = %self.command.program, ?args, "spawning");

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.stdin(match self.template.prompt_mode {
            PromptMode::Stdin => Stdio::piped(),
            PromptMode::Arg => Stdio::null(),
        });

        let mut child = cmd
            .spawn()
            .map_err(|e| AiError::provider(self.name, format!("failed to spawn: {e}")))?;

        // Feed stdin while draining stdout/stderr; a chatty child would
        // otherwise block on a full pipe before reading the whole prompt.
        let stdin = match self.template.prompt_mode {
            PromptMode::Stdin => child.stdin.take(),
            PromptMode::Arg => None,
        };
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(prompt.as_bytes()).await?;
                // Closing stdin signals end of prompt.
                drop(stdin);
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| AiError::provider(self.name, format!("failed to wait: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(AiError::provider(self.name, message));
        }
        if let Err(e) = fed
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(AiError::provider(self.name, format!("failed to write prompt: {e}")));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
