//! Light markdown formatting for assistant answers.
//!
//! Only the subset the advising backend actually emits is handled: headings,
//! bullets, blank-line breaks and `**bold**` spans. Output is recomputed from
//! scratch for whatever prefix is currently revealed.

use std::sync::LazyLock;

use regex::Regex;

use crate::state::ChatRole;

/// Prefix drawn in front of bullet lines
pub const BULLET_GLYPH: &str = "• ";

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s*(.+)$").expect("valid regex"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*•]\s+(.+)$").expect("valid regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Break,
    Heading,
    Bullet,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub kind: LineKind,
    pub spans: Vec<Span>,
}

impl DisplayLine {
    fn new(kind: LineKind, text: &str) -> Self {
        Self {
            kind,
            spans: parse_bold(text),
        }
    }

    pub fn blank() -> Self {
        Self {
            kind: LineKind::Break,
            spans: Vec::new(),
        }
    }

    /// The line's text with emphasis markers removed
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A chat turn ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// User text, shown exactly as typed
    Verbatim(String),
    Lines(Vec<DisplayLine>),
}

pub fn render_turn(role: ChatRole, text: &str) -> Rendered {
    match role {
        ChatRole::User => Rendered::Verbatim(text.to_string()),
        ChatRole::Assistant => Rendered::Lines(format_block(text)),
    }
}

/// Normalizes line endings and blank runs, then classifies every line
pub fn format_block(text: &str) -> Vec<DisplayLine> {
    let unix = text.replace("\r\n", "\n");
    let collapsed = BLANK_RUN.replace_all(&unix, "\n\n");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('\n').map(classify_line).collect()
}

pub fn classify_line(line: &str) -> DisplayLine {
    let line = line.trim_end();
    if line.is_empty() {
        return DisplayLine::blank();
    }
    if let Some(caps) = HEADING.captures(line) {
        return DisplayLine::new(LineKind::Heading, &caps[1]);
    }
    if let Some(caps) = BULLET.captures(line) {
        return DisplayLine::new(LineKind::Bullet, &caps[1]);
    }
    DisplayLine::new(LineKind::Plain, line)
}

/// Splits a line into plain and bold spans, keeping the original order
pub fn parse_bold(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in BOLD.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Span::plain(&text[last..whole.start()]));
        }
        spans.push(Span::bold(inner.as_str()));
        last = whole.end();
    }
    if last < text.len() {
        spans.push(Span::plain(&text[last..]));
    }
    spans
}
