//! `ai default [ALIAS] [--clear]` - show, set, or clear the default alias.

use anyhow::{Context, Result};
use clap::Args;

use ai_cli::catalog::CatalogHandle;
use ai_cli::config::{Config, Paths};

use crate::cmd::shared::block_on;

#[derive(Args, Debug)]
pub struct DefaultArgs {
    /// Alias to use when a prompt names no model
    pub alias: Option<String>,

    /// Remove the default
    #[arg(long, conflicts_with = "alias")]
    pub clear: bool,
}

pub fn execute_default(args: DefaultArgs, paths: &Paths) -> Result<()> {
    let handle = CatalogHandle::open(&paths.config)
        .with_context(|| format!("loading config from {}", paths.config.display()))?;
    let message = if args.clear || args.alias.is_some() {
        let mut message = String::new();
        block_on(handle.update(|config| {
            message = apply(config, &args)?;
            Ok(())
        }))??;
        message
    } else {
        apply(&mut Config::clone(&handle.snapshot()), &args)?
    };
    println!("{message}");
    Ok(())
}

fn apply(config: &mut Config, args: &DefaultArgs) -> ai_cli::Result<String> {
    if args.clear {
        let had = config.default_alias.is_some();
        config.set_default(None)?;
        return Ok(if had {
            "Default model cleared.".into()
        } else {
            "No default model set.".into()
        });
    }
    if let Some(alias) = &args.alias {
        config.set_default(Some(alias))?;
        return Ok(format!("Default model set: {}", describe(config, alias)));
    }
    Ok(match &config.default_alias {
        Some(alias) => describe(config, alias),
        None => "No default model set. Use 'ai default <alias>' to set one.".into(),
    })
}

fn describe(config: &Config, alias: &str) -> String {
    match config.aliases.get(alias) {
        Some(t) => format!("{alias} -> {}:{}", t.provider, t.model),
        None => format!("{alias} -> (not in catalog; run 'ai init')"),
    }
}
