//! Turn leading argument tokens into dispatch targets plus a prompt.
//!
//! Greedy: consume tokens from the front while each one names an alias (or a
//! literal `provider:model` pair); the remaining tokens, space-joined, are the
//! prompt. A reserved command word always stops matching.

use serde::Serialize;

use crate::catalog::{AliasCatalog, is_reserved};
use crate::error::{AiError, Result};
use crate::providers::ProviderName;

/// One resolved destination. `alias` is what the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchTarget {
    pub alias: String,
    pub provider: ProviderName,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub targets: Vec<DispatchTarget>,
    pub prompt: String,
}

impl Resolution {
    pub fn is_multi(&self) -> bool {
        self.targets.len() > 1
    }
}

/// Look up a single token: alias first, then `provider:model`.
pub fn lookup(token: &str, catalog: &AliasCatalog) -> Option<DispatchTarget> {
    if token.is_empty() || is_reserved(token) {
        return None;
    }
    if let Some(t) = catalog.get(token) {
        return Some(DispatchTarget {
            alias: token.to_string(),
            provider: t.provider,
            model: t.model.clone(),
        });
    }
    let (provider, model) = token.split_once(':')?;
    let provider = ProviderName::from_str_ci(provider)?;
    if model.is_empty() {
        return None;
    }
    Some(DispatchTarget {
        alias: token.to_string(),
        provider,
        model: model.to_string(),
    })
}

pub fn resolve<S: AsRef<str>>(
    tokens: &[S],
    catalog: &AliasCatalog,
    default_alias: Option<&str>,
) -> Result<Resolution> {
    let mut targets = Vec::new();
    let mut rest = tokens;
    while let Some((first, tail)) = rest.split_first() {
        match lookup(first.as_ref(), catalog) {
            Some(t) => {
                targets.push(t);
                rest = tail;
            }
            None => break,
        }
    }

    let prompt = rest
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<&str>>()
        .join(" ");

    if !targets.is_empty() {
        return Ok(Resolution {
            targets,
            prompt,
        });
    }

    match default_alias {
        Some(default) => {
            let target =
                lookup(default, catalog).ok_or_else(|| AiError::UnknownAlias(default.to_string()))?;
            Ok(Resolution {
                targets: vec![target],
                prompt,
            })
        }
        None => match tokens.first() {
            Some(first) => Err(AiError::UnknownAlias(first.as_ref().to_string())),
            None => Err(AiError::Usage("no model or prompt given".into())),
        },
    }
}
