//! `ai serve` - expose the catalog and dispatcher over local HTTP.
//!
//! Token precedence: --token, then AI_CLI_SERVER_TOKEN, then a generated one.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use ai_cli::AiError;
use ai_cli::catalog::{CatalogHandle, SystemSource};
use ai_cli::config::Paths;
use ai_cli::dispatch::Dispatcher;
use ai_cli::providers::ProviderRegistry;
use ai_cli::server::{self, AppState, TOKEN_ENV};

use crate::cmd::format::{Role, StyleOptions, color};
use crate::cmd::shared::{self, block_on};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (defaults to the configured host, 127.0.0.1)
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on (defaults to the configured port, 8765)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Bearer token clients must send
    #[arg(long, conflicts_with = "no_auth")]
    pub token: Option<String>,

    /// Accept unauthenticated requests
    #[arg(long)]
    pub no_auth: bool,

    /// Per-call timeout in seconds (0 waits indefinitely)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

pub fn execute_serve(args: ServeArgs, paths: &Paths) -> Result<()> {
    let catalog = CatalogHandle::open(&paths.config)
        .with_context(|| format!("loading config from {}", paths.config.display()))?;
    let config = catalog.snapshot();

    let host = match args.host {
        Some(h) => h,
        None => config
            .server
            .host
            .parse()
            .map_err(|_| AiError::Config(format!("invalid server host '{}'", config.server.host)))?,
    };
    let addr = SocketAddr::new(host, args.port.unwrap_or(config.server.port));

    let token = resolve_token(&args);
    let style = StyleOptions::detect();
    print_banner(addr, token.as_deref(), &style);

    let state = AppState {
        dispatcher: Dispatcher::new(ProviderRegistry::from_config(&config)?),
        source: Arc::new(SystemSource::new(ProviderRegistry::from_config(&config)?)),
        token: token.map(Arc::from),
        timeout: shared::effective_timeout(args.timeout, &config),
        catalog: Arc::new(catalog),
    };
    block_on(server::serve(addr, state))??;
    Ok(())
}

fn resolve_token(args: &ServeArgs) -> Option<String> {
    if args.no_auth {
        return None;
    }
    args.token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()))
        .or_else(|| Some(server::generate_token()))
}

fn print_banner(addr: SocketAddr, token: Option<&str>, style: &StyleOptions) {
    println!("ai server starting on http://{addr}");
    println!("Endpoints:");
    println!("  GET  /health    - Health check (no auth)");
    println!("  GET  /models    - List available models");
    println!("  GET  /providers - List providers");
    println!("  POST /call      - Execute prompt");
    println!("  POST /refresh   - Rediscover models and rebuild aliases");
    match token {
        Some(token) => {
            eprintln!("\nAuth token: {token}");
            eprintln!("Use: Authorization: Bearer <token>");
        }
        None => eprintln!(
            "{}",
            color(
                Role::Warning,
                "WARNING: Authentication disabled. Any local process can call this server.",
                style
            )
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: ServeArgs,
    }

    #[test]
    fn explicit_token_wins() {
        let cli = TestCli::parse_from(["t", "--token", "secret", "--port", "9000"]);
        assert_eq!(cli.args.port, Some(9000));
        assert_eq!(resolve_token(&cli.args).as_deref(), Some("secret"));
    }

    #[test]
    fn no_auth_has_no_token() {
        let cli = TestCli::parse_from(["t", "--no-auth"]);
        assert_eq!(resolve_token(&cli.args), None);
    }

    #[test]
    fn port_zero_rejected() {
        assert!(TestCli::try_parse_from(["t", "--port", "0"]).is_err());
        assert!(TestCli::try_parse_from(["t", "--no-auth", "--token", "x"]).is_err());
    }
}
