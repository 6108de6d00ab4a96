/*!
Subcommand modules.

Each module exposes one `execute_*` entry point returning `anyhow::Result<()>`
plus its `clap::Args` struct. Rendering helpers live in `format.rs`, wiring
shared by several commands in `shared.rs`.

  prompt.rs       default action: ai [ALIAS...] PROMPT
  chat.rs         ai chat list|show|delete|<ID>
  init.rs         ai init
  list.rs         ai list
  default.rs      ai default
  completions.rs  ai completions <shell>, hidden --completions
  serve.rs        ai serve
  shell.rs        --cmd / --run helpers
*/

pub mod chat;
pub mod completions;
pub mod default;
pub mod format;
pub mod init;
pub mod list;
pub mod prompt;
pub mod serve;
pub mod shared;
pub mod shell;

pub use chat::{ChatArgs, execute_chat};
pub use completions::{CompletionsArgs, execute_completions, print_completion_words};
pub use default::{DefaultArgs, execute_default};
pub use init::{InitArgs, execute_init};
pub use list::{ListArgs, execute_list};
pub use prompt::{PromptArgs, execute_prompt};
pub use serve::{ServeArgs, execute_serve};
