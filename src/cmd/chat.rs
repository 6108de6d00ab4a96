/*!
chat.rs - `ai chat ...`

  ai chat [list]              saved sessions, newest first
  ai chat show <ID>           full history of one session
  ai chat delete <ID>...      remove sessions
  ai chat <ID> [ALIAS] MSG    continue a session (optionally on another model)

With --json, list and show print machine-readable output.
*/

use anyhow::{Result, bail};
use clap::Args;

use ai_cli::AiError;
use ai_cli::chat::{ChatSession, ChatStore, looks_like_id};
use ai_cli::config::Paths;

use crate::cmd::format::{Role, StyleOptions, color, table, truncate_ellipsis};
use crate::cmd::prompt::{self, PromptFlags};
use crate::cmd::shared;

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub flags: PromptFlags,

    /// list | show ID | delete ID... | ID [MODEL] PROMPT
    #[arg(value_name = "ACTION")]
    pub words: Vec<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum ChatAction<'a> {
    List,
    Show(&'a str),
    Delete(&'a [String]),
    Continue { id: &'a str, rest: &'a [String] },
}

fn parse_action(words: &[String]) -> Result<ChatAction<'_>> {
    let Some((first, rest)) = words.split_first() else {
        return Ok(ChatAction::List);
    };
    match first.as_str() {
        "list" | "ls" => Ok(ChatAction::List),
        "show" => match rest {
            [id] => Ok(ChatAction::Show(id)),
            _ => bail!(AiError::Usage("usage: ai chat show <ID>".into())),
        },
        "delete" | "rm" => {
            if rest.is_empty() {
                bail!(AiError::Usage("usage: ai chat delete <ID>...".into()));
            }
            Ok(ChatAction::Delete(rest))
        }
        id if looks_like_id(id) => Ok(ChatAction::Continue { id, rest }),
        other => bail!(AiError::Usage(format!(
            "unknown chat action '{other}'. Expected list, show, delete, or a chat ID"
        ))),
    }
}

pub fn execute_chat(args: ChatArgs, paths: &Paths) -> Result<()> {
    let ChatArgs { flags, words } = args;
    let action = parse_action(&words)?;
    let style = StyleOptions::detect();
    let open_store = || -> Result<ChatStore> {
        let config = shared::load_config(paths)?;
        Ok(shared::chat_store(paths, &config))
    };
    match action {
        ChatAction::Continue { id, rest } => {
            if flags.no_chat {
                bail!(AiError::Usage("--no-chat cannot be used when continuing a chat".into()));
            }
            prompt::run(paths, flags, rest, Some(id.to_string()))
        }
        ChatAction::List => list(&open_store()?, flags.json, &style),
        ChatAction::Show(id) => show(&open_store()?.load(id)?, flags.json, &style),
        ChatAction::Delete(ids) => delete(&open_store()?, ids),
    }
}

fn list(store: &ChatStore, json: bool, style: &StyleOptions) -> Result<()> {
    let sessions = store.list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }
    if sessions.is_empty() {
        println!("No chat sessions.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = sessions
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.alias.clone(),
                s.messages.to_string(),
                s.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                s.preview.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        table(&["ID", "MODEL", "MSGS", "UPDATED", "LAST PROMPT"], &rows, style)
    );
    Ok(())
}

fn show(session: &ChatSession, json: bool, style: &StyleOptions) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(session)?);
        return Ok(());
    }
    println!(
        "{}",
        color(
            Role::Primary,
            format!(
                "Chat {} ({} -> {}:{})",
                session.id, session.alias, session.provider, session.model
            ),
            style
        )
    );
    for message in &session.messages {
        println!();
        println!(
            "{} {}",
            color(Role::Bold, format!("{}:", message.role.label()), style),
            color(
                Role::Secondary,
                message.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                style
            )
        );
        println!("{}", message.content);
    }
    Ok(())
}

fn delete(store: &ChatStore, ids: &[String]) -> Result<()> {
    let mut missing = Vec::new();
    for id in ids {
        match store.delete(id) {
            Ok(()) => println!("Deleted chat {}", id.to_ascii_uppercase()),
            Err(e @ AiError::NotFound { .. }) => {
                eprintln!("{}", truncate_ellipsis(&e.to_string(), 120));
                missing.push(id.as_str());
            }
            Err(e) => return Err(e.into()),
        }
    }
    if !missing.is_empty() && missing.len() == ids.len() {
        bail!("no chat sessions deleted");
    }
    Ok(())
}
