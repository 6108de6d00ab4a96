/*!
prompt.rs - the default action: `ai [FLAGS] [ALIAS...] PROMPT`.

Leading words are scanned before resolution:
  - bare `json`, `cmd`, `run`, `yolo`, `reply` act as the matching flags
  - `chat <ID>` continues that session
  - aliases and `provider:model` pairs pass through to the resolver
The first word that is none of these starts the prompt. Later occurrences
of the keywords are prompt text.

Single target: history-aware, recorded in the chat store unless --no-chat.
Several targets: dispatched concurrently, printed in request order under
one header each, never recorded.
*/

use anyhow::{Result, bail};
use clap::Args;

use ai_cli::AiError;
use ai_cli::catalog::AliasCatalog;
use ai_cli::chat::{ChatSession, ChatStore, looks_like_id, normalize_id};
use ai_cli::config::{Config, Paths};
use ai_cli::dispatch::{DispatchOptions, DispatchResult};
use ai_cli::providers::InvokeOptions;
use ai_cli::resolve::{Resolution, lookup, resolve};

use crate::cmd::format::{Role, StyleOptions, color, section_header};
use crate::cmd::shared::{self, block_on};
use crate::cmd::shell;

#[derive(Args, Debug, Default, Clone)]
pub struct PromptFlags {
    /// Ask the provider for JSON output
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Let the provider act without asking (agentic CLIs only)
    #[arg(short = 'y', long)]
    pub yolo: bool,

    /// Return a single shell command
    #[arg(short = 'c', long)]
    pub cmd: bool,

    /// Generate a shell command and run it after confirmation
    #[arg(short = 'r', long)]
    pub run: bool,

    /// Do not record this exchange as a chat session
    #[arg(long)]
    pub no_chat: bool,

    /// Continue the most recent chat session
    #[arg(long)]
    pub reply: bool,

    /// Per-call timeout in seconds (0 waits indefinitely)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct PromptArgs {
    #[command(flatten)]
    pub flags: PromptFlags,

    /// Model aliases (or provider:model) followed by the prompt
    #[arg(value_name = "MODEL|PROMPT")]
    pub words: Vec<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Leading {
    pub chat_id: Option<String>,
    pub words: Vec<String>,
}

pub(crate) fn scan_leading(
    words: &[String],
    catalog: &AliasCatalog,
    flags: &mut PromptFlags,
) -> Leading {
    let mut out = Leading::default();
    let mut i = 0;
    while let Some(word) = words.get(i) {
        match word.as_str() {
            "json" => flags.json = true,
            "cmd" => flags.cmd = true,
            "run" => flags.run = true,
            "yolo" => flags.yolo = true,
            "reply" => flags.reply = true,
            "chat" if out.chat_id.is_none() && words.get(i + 1).is_some_and(|n| looks_like_id(n)) => {
                out.chat_id = normalize_id(&words[i + 1]).ok();
                i += 2;
                continue;
            }
            w if lookup(w, catalog).is_some() => out.words.push(w.to_string()),
            _ => break,
        }
        i += 1;
    }
    out.words.extend(words[i..].iter().cloned());
    out
}

pub fn execute_prompt(args: PromptArgs, paths: &Paths) -> Result<()> {
    run(paths, args.flags, &args.words, None)
}

/// Shared by the bare form and `ai chat <ID> ...`.
pub(crate) fn run(
    paths: &Paths,
    mut flags: PromptFlags,
    words: &[String],
    chat_id: Option<String>,
) -> Result<()> {
    let config = shared::load_config(paths)?;
    let leading = scan_leading(words, &config.aliases, &mut flags);
    let chat_id = chat_id.or(leading.chat_id);
    let store = shared::chat_store(paths, &config);
    let style = StyleOptions::detect();

    let explicit_targets = leading
        .words
        .iter()
        .take_while(|w| lookup(w, &config.aliases).is_some())
        .count();
    let wants_session = chat_id.is_some() || flags.reply;
    let continuing = open_session(&store, chat_id.as_deref(), flags.reply, explicit_targets)?;

    let mut resolution = resolve_targets(&leading.words, &config, continuing.as_ref())?;
    if resolution.prompt.is_empty() {
        match shared::read_piped_stdin()? {
            Some(text) => resolution.prompt = text,
            None => {
                if let Some(session) = continuing.as_ref().filter(|_| flags.reply) {
                    show_last_exchange(session, &style);
                    return Ok(());
                }
                return Err(AiError::Usage("prompt required (as argument or via stdin)".into()).into());
            }
        }
    }

    let options = DispatchOptions {
        invoke: InvokeOptions {
            json_mode: flags.json,
            auto_approve: flags.yolo && !flags.run,
        },
        timeout: shared::effective_timeout(flags.timeout, &config),
    };

    if resolution.is_multi() {
        if flags.cmd || flags.run {
            bail!(AiError::Usage("--cmd and --run not supported with multiple models".into()));
        }
        if flags.yolo {
            bail!(AiError::Usage("--yolo not supported with multiple models".into()));
        }
        if wants_session {
            eprintln!(
                "{}",
                color(Role::Warning, "Note: Chat mode is disabled when using multiple models", &style)
            );
        }
        return run_many(&config, &resolution, options, flags.json, &style);
    }

    let record = if flags.no_chat { None } else { Some((&store, continuing)) };
    run_single(&config, resolution, options, &flags, record, &style)
}

/// Session being continued, if any. Several explicit targets never touch the
/// store: those runs are session-less.
fn open_session(
    store: &ChatStore,
    chat_id: Option<&str>,
    reply: bool,
    explicit_targets: usize,
) -> Result<Option<ChatSession>> {
    if explicit_targets > 1 {
        return Ok(None);
    }
    match (chat_id, reply) {
        (Some(id), _) => Ok(Some(store.load(id)?)),
        (None, true) => match store.latest()? {
            Some(session) => Ok(Some(session)),
            None => bail!("No chat sessions to reply to. Start one with 'ai <model> <msg>'"),
        },
        (None, false) => Ok(None),
    }
}

fn resolve_targets(
    words: &[String],
    config: &Config,
    continuing: Option<&ChatSession>,
) -> Result<Resolution> {
    let explicit = words.first().is_some_and(|w| lookup(w, &config.aliases).is_some());
    if let Some(session) = continuing
        && !explicit
    {
        return Ok(Resolution {
            targets: vec![session.target()],
            prompt: words.join(" "),
        });
    }
    Ok(resolve(words, &config.aliases, config.default_alias.as_deref())?)
}

fn show_last_exchange(session: &ChatSession, style: &StyleOptions) {
    println!(
        "{}",
        color(
            Role::Primary,
            format!("Chat: {} (model: {})", session.id, session.alias),
            style
        )
    );
    match session.messages.last() {
        Some(last) => println!("Last {}: {}", last.role.label(), last.content),
        None => println!("No messages yet."),
    }
}

fn run_single(
    config: &Config,
    resolution: Resolution,
    options: DispatchOptions,
    flags: &PromptFlags,
    record: Option<(&ChatStore, Option<ChatSession>)>,
    style: &StyleOptions,
) -> Result<()> {
    let Resolution {
        mut targets,
        prompt,
        ..
    } = resolution;
    let Some(target) = targets.pop() else {
        bail!(AiError::Usage("no model resolved".into()));
    };

    let mut composed = match &record {
        Some((_, Some(session))) => session.compose_prompt(&prompt),
        _ => prompt.clone(),
    };
    let command_mode = flags.cmd || flags.run;
    if command_mode {
        composed = shell::command_prompt(&composed);
    }

    let dispatcher = shared::dispatcher(config)?;
    let reply = block_on(dispatcher.invoke(&target, &composed, options))??;

    let chat_id = match record {
        Some((store, session)) => {
            let mut session = match session {
                Some(mut s) => {
                    if s.target() != target {
                        s.retarget(&target);
                    }
                    s
                }
                None => store.create(&target)?,
            };
            store.record_exchange(&mut session, &prompt, &reply)?;
            Some(session.id)
        }
        None => None,
    };

    let output = if command_mode {
        shell::sanitize_command(&reply)
    } else {
        reply
    };

    let mut footer = String::new();
    if let Some(id) = &chat_id {
        if flags.json || flags.cmd || !shared::stdout_is_tty() {
            eprintln!("[Chat: {id}]");
        } else {
            footer = format!("\n\n{}", color(Role::Dim, format!("[Chat: {id}]"), style));
        }
    }

    if !flags.run {
        println!("{output}{footer}");
        return Ok(());
    }

    println!(
        "{}{}{footer}",
        color(Role::Secondary, "$ ", style),
        color(Role::Bold, &output, style)
    );
    if output.is_empty() {
        bail!(AiError::provider(target.provider, "returned no command"));
    }
    if !flags.yolo && !shell::confirm(&output, style)? {
        println!("Cancelled.");
        return Ok(());
    }
    let code = shell::run_command(&output)?;
    std::process::exit(code);
}

fn run_many(
    config: &Config,
    resolution: &Resolution,
    options: DispatchOptions,
    json: bool,
    style: &StyleOptions,
) -> Result<()> {
    let dispatcher = shared::dispatcher(config)?;
    let results = block_on(dispatcher.dispatch_many(&resolution.targets, &resolution.prompt, options))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (i, result) in results.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_section(result, style);
        }
    }

    if results.iter().all(|r| !r.is_ok()) {
        bail!("all {} targets failed", results.len());
    }
    Ok(())
}

fn print_section(result: &DispatchResult, style: &StyleOptions) {
    println!("{}", section_header(&result.alias, &result.elapsed_label(), style));
    match &result.error {
        None => println!("{}", result.output),
        Some(failure) => {
            println!("{}", color(Role::Error, format!("Error: {}", failure.message), style));
            if let Some(hint) = failure.hint {
                println!("{}", color(Role::Dim, format!("Tip: {hint}"), style));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_cli::chat::TruncationPolicy;
    use tempfile::TempDir;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn scan(s: &str) -> (Leading, PromptFlags) {
        let mut flags = PromptFlags::default();
        let lead = scan_leading(&words(s), &AliasCatalog::builtin(), &mut flags);
        (lead, flags)
    }

    #[test]
    fn bare_keywords_become_flags() {
        let (lead, flags) = scan("json opus list three colors");
        assert!(flags.json);
        assert_eq!(lead.words, words("opus list three colors"));
    }

    #[test]
    fn keywords_inside_the_prompt_stay_text() {
        let (lead, flags) = scan("opus how do I run tests");
        assert!(!flags.run);
        assert_eq!(lead.words, words("opus how do I run tests"));
    }

    #[test]
    fn alias_then_reply() {
        let (lead, flags) = scan("opus reply and then?");
        assert!(flags.reply);
        assert_eq!(lead.words, words("opus and then?"));
    }

    #[test]
    fn alias_then_chat_id() {
        let (lead, _) = scan("sonnet chat x7k follow up");
        assert_eq!(lead.chat_id.as_deref(), Some("X7K"));
        assert_eq!(lead.words, words("sonnet follow up"));
    }

    #[test]
    fn chat_without_id_is_prompt_text() {
        let (lead, _) = scan("opus chat about rust");
        assert_eq!(lead.chat_id, None);
        assert_eq!(lead.words, words("opus chat about rust"));
    }

    #[test]
    fn run_and_cmd_keywords() {
        let (lead, flags) = scan("run stop nginx");
        assert!(flags.run);
        assert_eq!(lead.words, words("stop nginx"));
        let (_, flags) = scan("gpt cmd yolo find big files");
        assert!(flags.cmd && flags.yolo);
    }

    #[test]
    fn continuing_session_keeps_its_target() {
        let config = Config::default();
        let dir = TempDir::new().unwrap();
        let store = ChatStore::new(dir.path(), TruncationPolicy::default());
        let session = store
            .create(&lookup("haiku", &config.aliases).unwrap())
            .unwrap();
        let r = resolve_targets(&words("and more"), &config, Some(&session)).unwrap();
        assert_eq!(r.targets[0].alias, "haiku");
        assert_eq!(r.prompt, "and more");

        let r = resolve_targets(&words("opus and more"), &config, Some(&session)).unwrap();
        assert_eq!(r.targets[0].alias, "opus");
        assert_eq!(r.prompt, "and more");
    }

    #[test]
    fn reply_with_several_models_skips_session_lookup() {
        let dir = TempDir::new().unwrap();
        let store = ChatStore::new(dir.path(), TruncationPolicy::default());
        assert!(open_session(&store, None, true, 2).unwrap().is_none());
        assert!(open_session(&store, Some("ZZZ"), false, 3).unwrap().is_none());

        let err = open_session(&store, None, true, 1).unwrap_err();
        assert!(err.to_string().starts_with("No chat sessions to reply to"));
        let err = open_session(&store, Some("ZZZ"), false, 0).unwrap_err();
        assert!(matches!(err.downcast_ref::<AiError>(), Some(AiError::NotFound { .. })));
    }

    #[test]
    fn without_alias_or_default_is_unknown_alias() {
        let config = Config::default();
        let err = resolve_targets(&words("hello there"), &config, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AiError>(),
            Some(AiError::UnknownAlias(a)) if a == "hello"
        ));
    }
}
