//! `ai init` - probe installed tools and providers, rebuild the alias catalog,
//! and persist the result.

use anyhow::{Context, Result};
use clap::Args;

use ai_cli::catalog::{CatalogHandle, RefreshReport, SystemSource};
use ai_cli::config::Paths;
use ai_cli::providers::ProviderRegistry;

use crate::cmd::format::{Role, StyleOptions, color};
use crate::cmd::shared::block_on;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Print the refresh report as JSON
    #[arg(short = 'j', long)]
    pub json: bool,
}

pub fn execute_init(args: InitArgs, paths: &Paths) -> Result<()> {
    let handle = CatalogHandle::open(&paths.config)
        .with_context(|| format!("loading config from {}", paths.config.display()))?;
    let registry = ProviderRegistry::from_config(&handle.snapshot())?;
    let source = SystemSource::new(registry);
    let report = block_on(handle.refresh(&source))??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print!("{}", render(&report, &paths.config.display().to_string(), &StyleOptions::detect()));
    Ok(())
}

fn render(report: &RefreshReport, config_path: &str, style: &StyleOptions) -> String {
    let mut out = String::new();
    let tools = if report.installed_tools.is_empty() {
        "none".to_string()
    } else {
        report
            .installed_tools
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    out.push_str(&format!("Detected CLI tools: {tools}\n"));
    out.push_str(&format!(
        "Catalog: {} aliases over {} models\n",
        report.aliases, report.models
    ));
    if !report.rejected.is_empty() {
        out.push_str(&color(
            Role::Secondary,
            format!(
                "Skipped {} remote models not allowed by provider policy\n",
                report.rejected.len()
            ),
            style,
        ));
    }
    if let Some(stale) = &report.cleared_default {
        out.push_str(&color(
            Role::Warning,
            format!("Warning: default '{stale}' no longer valid, cleared.\n"),
            style,
        ));
    }
    out.push_str(&format!("Config saved to {config_path}\n"));
    out
}
