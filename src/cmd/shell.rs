//! `--cmd` / `--run` support: ask the model for a single shell command,
//! clean up whatever it actually returned, and optionally execute it.

use std::io::{BufRead, IsTerminal, Write};
use std::process::Command;

use anyhow::{Context, Result};

use crate::cmd::format::{Role, StyleOptions, color};

/// Wrap `prompt` with the host description and the command-only instruction.
pub fn command_prompt(prompt: &str) -> String {
    let os = host_os();
    let shell = std::env::var("SHELL")
        .ok()
        .and_then(|s| s.rsplit('/').next().map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "sh".into());
    format!(
        "[SYSTEM: OS={os}, Shell={shell}. OUTPUT MODE: Your entire response will be piped \
         directly to /bin/sh for execution. Return ONLY a single shell command. Any text that \
         is not a valid command will cause an error. No prose, no markdown, no explanation.]\
         \n\n{prompt}"
    )
}

fn host_os() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

/// Reduce a model reply to one runnable line.
pub fn sanitize_command(raw: &str) -> String {
    let mut text = raw
        .trim()
        .trim_start_matches(|c: char| c.is_whitespace() || is_pictograph(c))
        .trim_start()
        .to_string();

    if text.starts_with("```") {
        text = text
            .lines()
            .skip(1)
            .filter(|l| !l.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
    }

    if text.len() >= 2 && text.starts_with('`') && text.ends_with('`') {
        text = text[1..text.len() - 1].to_string();
    }

    let first = text.trim().lines().next().unwrap_or_default().trim();
    ["$ ", "> ", "% "]
        .iter()
        .find_map(|p| first.strip_prefix(p))
        .unwrap_or(first)
        .trim()
        .to_string()
}

fn is_pictograph(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2300..=0x23FF | 0x2B00..=0x2BFF | 0xFE0F | 0x200D)
}

/// Show the command and ask before running it. A line reading `n` or `no`
/// cancels; anything else (including a bare Enter) runs.
pub fn confirm(command: &str, style: &StyleOptions) -> Result<bool> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        anyhow::bail!("refusing to run without a terminal to confirm; pass --yolo to skip");
    }
    print!("{}", color(Role::Secondary, "[Enter] run, [n] cancel: ", style));
    std::io::stdout().flush().ok();
    let mut line = String::new();
    if stdin.lock().read_line(&mut line).context("reading confirmation")? == 0 {
        return Ok(false);
    }
    let answer = line.trim().to_ascii_lowercase();
    Ok(!matches!(answer.as_str(), "n" | "no"))
}

/// Run through `sh -c`, inheriting stdio. Returns the exit code.
pub fn run_command(command: &str) -> Result<i32> {
    tracing::info!(%command, "executing generated command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .with_context(|| format!("failed to spawn sh for: {command}"))?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_command_untouched() {
        assert_eq!(sanitize_command("ls -la\n"), "ls -la");
    }

    #[test]
    fn strips_fenced_block() {
        assert_eq!(
            sanitize_command("```bash\nfind . -name '*.rs'\n```"),
            "find . -name '*.rs'"
        );
    }

    #[test]
    fn strips_inline_backticks_and_prompt() {
        assert_eq!(sanitize_command("`du -sh .`"), "du -sh .");
        assert_eq!(sanitize_command("$ git status"), "git status");
        assert_eq!(sanitize_command("> echo hi"), "echo hi");
    }

    #[test]
    fn keeps_first_line_only() {
        assert_eq!(
            sanitize_command("docker ps -a\nThis lists all containers."),
            "docker ps -a"
        );
    }

    #[test]
    fn drops_leading_emoji() {
        assert_eq!(sanitize_command("🚀 uptime"), "uptime");
    }

    #[test]
    fn prompt_carries_instruction() {
        let p = command_prompt("list files");
        assert!(p.starts_with("[SYSTEM: OS="));
        assert!(p.contains("Return ONLY a single shell command"));
        assert!(p.ends_with("]\n\nlist files"));
    }
}
