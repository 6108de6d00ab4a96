/*!
completions.rs - shell completion scripts.

The scripts are thin: each one calls the hidden `ai --completions`, which
prints one candidate word per line (subcommands, current aliases, flags), so
completions follow the catalog without regenerating the script.
*/

use std::collections::BTreeSet;
use std::fmt;

use anyhow::Result;
use clap::Args;

use ai_cli::catalog::AliasCatalog;
use ai_cli::config::Paths;

use crate::cmd::shared;

const SUBCOMMANDS: &[&str] = &["chat", "completions", "default", "init", "list", "serve"];
const FLAGS: &[&str] = &[
    "--json", "--cmd", "--run", "--yolo", "--no-chat", "--reply", "-j", "-c", "-r", "-y",
];

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
        })
    }
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell; omit for setup instructions
    #[arg(value_enum)]
    pub shell: Option<Shell>,
}

pub fn execute_completions(args: CompletionsArgs) -> Result<()> {
    match args.shell {
        Some(shell) => println!("{}", script(shell)),
        None => {
            println!("Usage: ai completions <shell>");
            println!("Shells: bash, zsh, fish");
            println!("\nSetup:");
            println!("  bash: echo 'eval \"$(ai completions bash)\"' >> ~/.bashrc");
            println!("  zsh:  echo 'eval \"$(ai completions zsh)\"' >> ~/.zshrc");
            println!("  fish: ai completions fish | source");
        }
    }
    Ok(())
}

/// Backs the hidden `--completions` flag.
pub fn print_completion_words(paths: &Paths) -> Result<()> {
    let config = shared::load_config(paths)?;
    for word in completion_words(&config.aliases) {
        println!("{word}");
    }
    Ok(())
}

fn completion_words(catalog: &AliasCatalog) -> BTreeSet<&str> {
    SUBCOMMANDS
        .iter()
        .copied()
        .chain(catalog.names())
        .chain(FLAGS.iter().copied())
        .collect()
}

fn script(shell: Shell) -> &'static str {
    match shell {
        Shell::Bash => {
            r#"# ai bash completion
# Add to ~/.bashrc: eval "$(ai completions bash)"
_ai_completions() {
    local cur="${COMP_WORDS[COMP_CWORD]}"
    local words
    words=$(ai --completions 2>/dev/null)
    COMPREPLY=($(compgen -W "$words" -- "$cur"))
}
complete -F _ai_completions ai"#
        }
        Shell::Zsh => {
            r#"# ai zsh completion
# Add to ~/.zshrc: eval "$(ai completions zsh)"
_ai_completions() {
    local words
    words=(${(f)"$(ai --completions 2>/dev/null)"})
    _describe 'ai' words
}
compdef _ai_completions ai"#
        }
        Shell::Fish => {
            r#"# ai fish completion
# Add to ~/.config/fish/config.fish: ai completions fish | source
complete -c ai -f -a "(ai --completions 2>/dev/null)""#
        }
    }
}
