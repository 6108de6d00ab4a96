/*!
format.rs

Terminal formatting for human output paths.

  - StyleOptions::detect() -> StyleOptions   (NO_COLOR, COLUMNS, tty)
  - color(role, text, &StyleOptions)
  - section_header(alias, elapsed, &StyleOptions)   "━━━ opus (1.2s) ━━━"
  - table(headers, rows, &StyleOptions)
  - truncate_ellipsis(s, max_chars)

JSON output paths never go through here.
*/

use std::borrow::Cow;
use std::io::IsTerminal;

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let use_color = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
        let term_width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        Self {
            use_color,
            term_width,
        }
    }

    pub fn plain() -> Self {
        Self {
            use_color: false,
            term_width: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Success,
    Warning,
    Error,
    Dim,
    Bold,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "1;36",
        Role::Secondary => "0;90",
        Role::Success => "32",
        Role::Warning => "33",
        Role::Error => "31",
        Role::Dim => "2",
        Role::Bold => "1",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/// Labeled divider printed above each target's output in multi-target runs.
pub fn section_header(alias: &str, elapsed: &str, style: &StyleOptions) -> String {
    format!(
        "{} {} {}",
        color(Role::Primary, format!("━━━ {alias}"), style),
        color(Role::Secondary, format!("({elapsed})"), style),
        color(Role::Primary, "━━━", style)
    )
}

/// Left-aligned columns separated by two spaces. The last column is never padded
/// and is truncated to fit the terminal width.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let fixed: usize = widths[..cols - 1].iter().map(|w| w + 2).sum();
    let last_max = style.term_width.saturating_sub(fixed).max(8);

    let render = |cells: Vec<String>| -> String {
        let mut line = String::new();
        for (i, cell) in cells.into_iter().enumerate() {
            if i + 1 == cols {
                line.push_str(&truncate_ellipsis(&cell, last_max));
            } else {
                let pad = widths[i].saturating_sub(display_width(&cell));
                line.push_str(&cell);
                line.push_str(&" ".repeat(pad + 2));
            }
        }
        line.trim_end().to_string()
    };

    let mut out = vec![color(
        Role::Bold,
        render(headers.iter().map(|h| h.to_string()).collect()),
        style,
    )];
    for row in rows {
        let mut cells = row.clone();
        cells.resize(cols, String::new());
        out.push(render(cells));
    }
    out.join("\n")
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 1 {
        return "…".into();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for t in chars.by_ref() {
                if t.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}
