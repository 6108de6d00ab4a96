/*!
`list.rs`

`ai list` - aliases grouped by provider, installed CLI tools, and the default.

Human output:

  Available models:

    claude: (4)
      claude               -> sonnet
      haiku                -> haiku
      ...

  Installed CLI tools: claude, codex
  Default model: opus

JSON output shape (--json):
{
  "aliases": { "<alias>": { "provider": "claude", "model": "sonnet" }, ... },
  "models": { "<provider>": ["<model id>", ...] },
  "installed_tools": ["claude", ...],
  "default_alias": "opus" | null
}
*/

use anyhow::Result;
use clap::Args;
use serde_json::json;

use ai_cli::config::{Config, Paths};

use crate::cmd::format::{Role, StyleOptions, color};
use crate::cmd::shared;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output JSON instead of human-readable text
    #[arg(short = 'j', long)]
    pub json: bool,
}

pub fn execute_list(args: ListArgs, paths: &Paths) -> Result<()> {
    let config = shared::load_config(paths)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&list_json(&config))?);
    } else {
        print!("{}", render(&config, &StyleOptions::detect()));
    }
    Ok(())
}

fn list_json(config: &Config) -> serde_json::Value {
    let aliases: serde_json::Map<String, serde_json::Value> = config
        .aliases
        .iter()
        .map(|(alias, t)| {
            (
                alias.to_string(),
                json!({ "provider": t.provider, "model": t.model }),
            )
        })
        .collect();
    json!({
        "aliases": aliases,
        "models": config.models,
        "installed_tools": config.installed_tools,
        "default_alias": config.default_alias,
    })
}

fn render(config: &Config, style: &StyleOptions) -> String {
    let mut out = String::new();
    out.push_str(&color(Role::Bold, "Available models:", style));
    out.push('\n');
    for (provider, entries) in config.aliases.by_provider() {
        out.push('\n');
        out.push_str(&format!(
            "  {}: {}\n",
            color(Role::Primary, provider.as_str(), style),
            color(Role::Secondary, format!("({})", entries.len()), style)
        ));
        for entry in entries {
            out.push_str(&format!("    {:<20} -> {}\n", entry.alias, entry.model));
        }
    }
    out.push('\n');
    let tools = if config.installed_tools.is_empty() {
        "none (run 'ai init')".to_string()
    } else {
        config
            .installed_tools
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    out.push_str(&format!("Installed CLI tools: {tools}\n"));
    match &config.default_alias {
        Some(alias) => out.push_str(&format!(
            "Default model: {}\n",
            color(Role::Success, alias, style)
        )),
        None => out.push_str("Default model: not set\n"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_cli::providers::ProviderName;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn parses_json_flag() {
        let cli = TestCli::parse_from(["test", "--json"]);
        assert!(cli.args.json);
        let cli = TestCli::parse_from(["test"]);
        assert!(!cli.args.json);
    }

    #[test]
    fn human_listing_groups_by_provider() {
        let mut config = Config::default();
        config.installed_tools = vec![ProviderName::Claude];
        config.default_alias = Some("opus".into());
        let text = render(&config, &StyleOptions::plain());
        assert!(text.starts_with("Available models:\n"));
        assert!(text.contains("  claude: (4)\n"));
        assert!(text.contains(&format!("    {:<20} -> {}\n", "opus", "opus")));
        assert!(text.contains("Installed CLI tools: claude\n"));
        assert!(text.ends_with("Default model: opus\n"));
    }

    #[test]
    fn json_listing_shape() {
        let v = list_json(&Config::default());
        assert_eq!(v["aliases"]["haiku"]["provider"], "claude");
        assert_eq!(v["aliases"]["haiku"]["model"], "haiku");
        assert!(v["default_alias"].is_null());
    }
}
