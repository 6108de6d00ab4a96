//! Base command parsing for subprocess providers.
//!
//! parse_command -> CommandSpec { program, args }
//! Helpers: find_on_path / is_installed.
//!
//! A provider's base command comes from its built-in template unless the
//! config carries a `commands.<provider>` override such as
//! `"/opt/claude/bin/claude --print"`, which is split with shell-word rules.
use std::fmt;
use std::path::{Path, PathBuf};

use shell_words::split as shell_split;

use crate::error::{AiError, Result};

/// Program plus leading arguments of a provider invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn from_parts(parts: &[&str]) -> Self {
        let mut it = parts.iter().map(|s| s.to_string());
        let program = it.next().unwrap_or_default();
        Self {
            program,
            args: it.collect(),
        }
    }

    /// Whether the program resolves to an executable (absolute path or `$PATH` lookup).
    pub fn is_installed(&self) -> bool {
        find_on_path(&self.program).is_some()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.program)
        } else {
            write!(f, "{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Parse a user-supplied command line into a `CommandSpec`.
///
/// Examples:
/// - "claude --print" -> program=claude, args=[--print]
/// - r#"/opt/my tools/codex" exec"# -> program="/opt/my tools/codex", args=[exec]
pub fn parse_command(raw: &str) -> Result<CommandSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AiError::Config("command string is empty".into()));
    }
    let parts = shell_split(trimmed)
        .map_err(|e| AiError::Config(format!("cannot split command '{trimmed}': {e}")))?;
    let Some((program, args)) = parts.split_first() else {
        return Err(AiError::Config(format!("no tokens in command '{trimmed}'")));
    };
    if program.is_empty() {
        return Err(AiError::Config(format!("empty program name in '{trimmed}'")));
    }
    Ok(CommandSpec {
        program: program.clone(),
        args: args.to_vec(),
    })
}

/// Locate an executable the way a shell would.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
