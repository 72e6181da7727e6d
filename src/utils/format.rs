/*!
format.rs

Human-output formatting shared by help screens and command output.

  - StyleOptions::detect() / plain() / for_terminal(..)
  - color(role, text, &StyleOptions)
  - table(headers, rows, TableOpts, &StyleOptions)
  - truncate_ellipsis / strip_ansi / display_width

Machine output (json / yaml) never goes through these helpers.
*/

use std::borrow::Cow;

/* ---- Style Options ---- */

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
    /// Reads NO_COLOR and COLUMNS (clamped to 40..=220, default 100).
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            term_width: width,
        }
    }

    /// Detected style, with color forced off for pipes and `--no-color`.
    pub fn for_terminal(is_terminal: bool, no_color: bool) -> Self {
        let mut style = Self::detect();
        style.use_color = style.use_color && is_terminal && !no_color;
        style
    }

    /// No color, fixed width. Deterministic output for tests and pipes.
    pub fn plain() -> Self {
        StyleOptions {
            use_color: false,
            term_width: 100,
        }
    }
}

/* ---- Color ---- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Accent,
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
        Role::Accent => "38;5;213",    // magenta/pink
        Role::Success => "38;5;82",    // green
        Role::Warning => "38;5;214",   // orange
        Role::Error => "38;5;196",     // red
        Role::Dim => "2",
        Role::Bold => "1",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/* ---- Table Rendering ---- */

#[derive(Debug, Clone)]
pub struct TableOpts {
    /// 0 -> style.term_width
    pub max_width: usize,
    pub truncate: bool,
    pub header_sep: bool,
    pub min_col_width: usize,
    /// Spaces prefixed to every rendered line.
    pub indent: usize,
}

impl Default for TableOpts {
    fn default() -> Self {
        Self {
            max_width: 0,
            truncate: true,
            header_sep: true,
            min_col_width: 4,
            indent: 0,
        }
    }
}

/// Renders an aligned table; lines are joined with '\n' (no trailing newline).
pub fn table(
    headers: &[&str],
    rows: &[Vec<String>],
    opts: TableOpts,
    style: &StyleOptions,
) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let col_count = headers.len();
    let width_limit = if opts.max_width == 0 {
        style.term_width
    } else {
        opts.max_width.min(style.term_width)
    }
    .saturating_sub(opts.indent);

    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    // Greedy shrink, widest columns first.
    let total_raw: usize = widths.iter().sum::<usize>() + (col_count - 1) * 2;
    if total_raw > width_limit {
        let mut overflow = total_raw - width_limit;
        let mut ordered: Vec<(usize, usize)> = widths.iter().copied().enumerate().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));
        for (idx, _) in ordered {
            if overflow == 0 {
                break;
            }
            let current = widths[idx];
            if current > opts.min_col_width {
                let shrink = (current - opts.min_col_width).min(overflow);
                widths[idx] -= shrink;
                overflow -= shrink;
            }
        }
    }

    let prefix = " ".repeat(opts.indent);
    let last = col_count - 1;
    let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 2);

    let mut line = prefix.clone();
    for (i, h) in headers.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let cell = fit(h, widths[i], opts.truncate, i == last);
        line.push_str(&color(Role::Accent, cell, style));
    }
    lines.push(line);

    if opts.header_sep {
        let sep = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(format!("{prefix}{}", color(Role::Dim, sep, style)));
    }

    for row in rows {
        let mut line = prefix.clone();
        for (c, width) in widths.iter().enumerate() {
            if c > 0 {
                line.push_str("  ");
            }
            let raw = row.get(c).map(|s| s.as_str()).unwrap_or("");
            line.push_str(&fit(raw, *width, opts.truncate, c == last));
        }
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}

/// Pads to `width` (except the last column) or truncates with an ellipsis.
fn fit(s: &str, width: usize, truncate: bool, last_col: bool) -> String {
    let len = display_width(s);
    if len <= width {
        if last_col {
            return s.to_string();
        }
        return format!("{s}{}", " ".repeat(width - len));
    }
    if !truncate {
        return s.to_string();
    }
    let cut = truncate_ellipsis(&strip_ansi(s), width);
    if last_col {
        cut
    } else {
        let pad = width.saturating_sub(display_width(&cut));
        format!("{cut}{}", " ".repeat(pad))
    }
}

/* ---- Text Helpers ---- */

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

/* ---- ANSI / Width Utilities ---- */

pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    // Scans for ESC '[' ... <letter>
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for n in chars.by_ref() {
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

pub fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/* ---- Tests ---- */
