use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

mod cmd;

use ai_cli::AiError;
use ai_cli::config::Paths;
use ai_cli::utils;
use cmd::{ChatArgs, CompletionsArgs, DefaultArgs, InitArgs, ListArgs, PromptArgs, ServeArgs};

/// ai - send a prompt to one or many AI models through short aliases.
///
/// Usage:
///   ai [ALIAS...] PROMPT          ask one model, or several at once
///   ai PROMPT                     ask the default model
///   ai reply PROMPT               continue the latest chat
///   ai chat <ID> [ALIAS] PROMPT   continue a specific chat
///   ai cmd|run PROMPT             generate (and optionally run) a shell command
///
/// Subcommands: init, list, default, chat, completions, serve.
///
/// Global flags / env:
///   -v / -vv          Increase verbosity (RUST_LOG overrides)
///   -q / --quiet      Errors only
///   --config PATH     Config file (or AI_CLI_CONFIG)
///   AI_CLI_HOME       Data directory (config + chats), default ~/.ai-cli
///
/// Examples:
///   ai opus "explain this stack trace" < trace.txt
///   ai opus gemini gpt "name three sorting algorithms"
///   ai default sonnet && ai "what is a monad?"
///   ai run "find files over 100MB in ~/Downloads"
#[derive(Parser, Debug)]
#[command(
    name = "ai",
    version,
    about = "Send a prompt to one or many AI models through short aliases",
    disable_help_subcommand = true,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print completion candidates, one per line
    #[arg(long, hide = true)]
    completions: bool,

    #[command(flatten)]
    prompt: PromptArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect installed tools and models, rebuild aliases
    Init(InitArgs),

    /// Show aliases, installed tools and the default model
    List(ListArgs),

    /// Show, set or clear the default model
    Default(DefaultArgs),

    /// List, show, delete or continue chat sessions
    Chat(ChatArgs),

    /// Print a shell completion script
    Completions(CompletionsArgs),

    /// Run the local HTTP server
    Serve(ServeArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = Paths::resolve(cli.config)?;
    tracing::debug!(home = %paths.home.display(), config = %paths.config.display(), "paths resolved");

    if cli.completions {
        return cmd::print_completion_words(&paths);
    }

    match cli.command {
        Some(Commands::Init(args)) => cmd::execute_init(args, &paths),
        Some(Commands::List(args)) => cmd::execute_list(args, &paths),
        Some(Commands::Default(args)) => cmd::execute_default(args, &paths),
        Some(Commands::Chat(args)) => cmd::execute_chat(args, &paths),
        Some(Commands::Completions(args)) => cmd::execute_completions(args),
        Some(Commands::Serve(args)) => cmd::execute_serve(args, &paths),
        None => {
            let args = cli.prompt;
            if args.words.is_empty() && !args.flags.reply && std::io::stdin().is_terminal() {
                Cli::command().print_help()?;
                return Ok(());
            }
            cmd::execute_prompt(args, &paths)
        }
    }
}

fn report(e: &anyhow::Error) {
    eprintln!("Error: {e:#}");
    if let Some(hint) = e.chain().find_map(|c| c.downcast_ref::<AiError>()).and_then(AiError::hint) {
        eprintln!("Tip: {hint}");
    }
}
