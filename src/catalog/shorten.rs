//! Turn machine model identifiers into short alias candidates.
//!
//! "meta-llama/llama-3.3-70b-instruct:free" -> "llama"
//! "qwen2.5-coder:7b"                       -> "qwen2.5-coder"
//!
//! Rules: keep the last path segment, drop any `:tag`, split on `-`, always
//! keep the first token, drop noise words and version/size tokens.

use std::sync::LazyLock;

use regex::Regex;

const NOISE: &[&str] = &[
    "instruct", "it", "pro", "air", "exp", "mini", "small", "nano", "flash", "plus", "chat",
    "base", "preview", "edition", "venice", "latest", "free",
];

// Version and size tokens: 3, 3.3, v2, 70b, 2512.
static VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^v?\d+(\.\d+)*[a-z]?$").ok());

/// Last path segment with any `:tag` removed.
pub fn base_name(model: &str) -> &str {
    let leaf = model.rsplit('/').next().unwrap_or(model);
    leaf.split(':').next().unwrap_or(leaf)
}

pub fn shorten(model: &str) -> String {
    let base = base_name(model);
    let mut tokens = base.split('-').filter(|t| !t.is_empty());
    let Some(first) = tokens.next() else {
        return base.to_string();
    };
    let mut kept = vec![first];
    kept.extend(tokens.filter(|t| !is_noise(t)));
    kept.join("-")
}

fn is_noise(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    NOISE.contains(&lower.as_str()) || VERSION.as_ref().is_some_and(|re| re.is_match(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_vendor_tag_noise_and_sizes() {
        assert_eq!(shorten("meta-llama/llama-3.3-70b-instruct:free"), "llama");
        assert_eq!(shorten("openai/gpt-oss-120b:free"), "gpt-oss");
        assert_eq!(shorten("mistralai/devstral-2512:free"), "devstral");
        assert_eq!(shorten("xiaomi/mimo-v2-flash:free"), "mimo");
        assert_eq!(shorten("tngtech/deepseek-r1t2-chimera:free"), "deepseek-r1t2-chimera");
    }

    #[test]
    fn local_tags_dropped() {
        assert_eq!(shorten("qwen2.5-coder:7b"), "qwen2.5-coder");
        assert_eq!(shorten("llama3.2:latest"), "llama3.2");
        assert_eq!(shorten("mistral-small:24b"), "mistral");
    }

    #[test]
    fn first_token_always_kept() {
        assert_eq!(shorten("vendor/7b-instruct"), "7b");
        assert_eq!(shorten("chat"), "chat");
    }

    #[test]
    fn stable_across_calls() {
        let a = shorten("google/gemma-3-27b-it:free");
        assert_eq!(a, "gemma");
        assert_eq!(a, shorten("google/gemma-3-27b-it:free"));
    }

    #[test]
    fn degenerate_input_falls_back() {
        assert_eq!(shorten("---"), "---");
        assert_eq!(base_name("a/b/c:x"), "c");
    }
}
