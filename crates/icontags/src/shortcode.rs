//! Icon shortcodes: `**[ICON=<name>]**`.
//!
//! A page asks for an icon by writing a shortcode in bold text. Only bold
//! (strong) spans are searched; a shortcode anywhere else is plain text.
//!
//! The host hands page content over as a flat stream of inline formatting
//! [`Token`]s. [`parse_inline`] produces such a stream from raw wiki text for
//! hosts that only have the source.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::icons::SEVERAL_ICONS;

/// Bold markup wrapped around every shortcode.
pub const STRONG_MARKUP: &str = "**";
/// Text that opens a shortcode.
pub const SHORTCODE_PREFIX: &str = "[ICON=";
/// Text that closes a shortcode.
pub const SHORTCODE_SUFFIX: &str = "]";

fn shortcode_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[ICON=([^\]\n]*)\]").ok())
        .as_ref()
}

/// Inline formatting kinds that can open and close a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Bold text. The only format searched for shortcodes.
    Strong,
    /// Italic text.
    Emphasis,
    /// Highlighted text.
    Mark,
    /// Struck-through text.
    Strike,
    /// Verbatim text; nothing inside is formatted.
    Verbatim,
    /// A link; the text is the link label.
    Link,
    /// An `@tag`.
    Tag,
}

impl Format {
    /// The wiki markup that delimits this format, if it has a symmetric one.
    pub fn markup(self) -> Option<&'static str> {
        match self {
            Format::Strong => Some("**"),
            Format::Emphasis => Some("//"),
            Format::Mark => Some("__"),
            Format::Strike => Some("~~"),
            Format::Verbatim => Some("''"),
            Format::Link | Format::Tag => None,
        }
    }

    const SYMMETRIC: [Format; 5] = [
        Format::Strong,
        Format::Emphasis,
        Format::Mark,
        Format::Strike,
        Format::Verbatim,
    ];
}

/// One element of a page's parsed inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Plain text.
    Text(String),
    /// Start of a formatted span.
    Start(Format),
    /// End of a formatted span.
    End(Format),
}

impl Token {
    /// Convenience constructor for a text token.
    pub fn text(s: impl Into<String>) -> Self {
        Token::Text(s.into())
    }
}

/// What a page's content says about its icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// No shortcode at all.
    NoIcon,
    /// Exactly one shortcode; the name is lower-cased.
    Icon(String),
    /// More than one shortcode, in one span or across several.
    Ambiguous,
}

impl Extracted {
    /// The value stored in the icon index for this result.
    ///
    /// `None` means the page must have no row.
    pub fn stored_value(&self) -> Option<&str> {
        match self {
            Extracted::NoIcon => None,
            Extracted::Icon(name) => Some(name),
            Extracted::Ambiguous => Some(SEVERAL_ICONS),
        }
    }
}

/// Find the icon shortcode of a page.
///
/// The text of each strong span is concatenated (nested formatting inside the
/// span is flattened) and searched for `[ICON=<name>]`. An empty `[ICON=]`
/// counts as a match, but a page whose only match is empty has no icon. A
/// strong span left open at the end of the stream still counts.
pub fn extract<'a, I>(tokens: I) -> Extracted
where
    I: IntoIterator<Item = &'a Token>,
{
    let mut found: Option<String> = None;
    let mut span_text = String::new();
    let mut depth = 0usize;

    let Some(pattern) = shortcode_regex() else {
        return Extracted::NoIcon;
    };
    let close_span = |text: &mut String, found: &mut Option<String>| -> bool {
        let mut matches = pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str());
        let ambiguous = match (matches.next(), matches.next()) {
            (None, _) => false,
            (Some(_), Some(_)) => true,
            (Some(name), None) => {
                if found.is_some() {
                    true
                } else {
                    *found = Some(name.to_lowercase());
                    false
                }
            }
        };
        text.clear();
        ambiguous
    };

    for token in tokens {
        match token {
            Token::Start(Format::Strong) => depth += 1,
            Token::End(Format::Strong) if depth > 0 => {
                depth -= 1;
                if depth == 0 && close_span(&mut span_text, &mut found) {
                    return Extracted::Ambiguous;
                }
            }
            Token::Text(text) if depth > 0 => span_text.push_str(text),
            _ => {}
        }
    }

    if depth > 0 && close_span(&mut span_text, &mut found) {
        return Extracted::Ambiguous;
    }

    match found {
        Some(name) if !name.is_empty() => Extracted::Icon(name),
        _ => Extracted::NoIcon,
    }
}

/// Build the shortcode markup for an icon, e.g. `**[ICON=calendar]**`.
///
/// Names are written lower-cased. Names that could not be read back
/// (containing `]` or a line break, or empty) are rejected.
pub fn icon_markup(name: &str) -> Result<String> {
    if name.is_empty() || name.contains(SHORTCODE_SUFFIX) || name.contains('\n') {
        return Err(Error::InvalidIconName(name.to_string()));
    }
    Ok(format!(
        "{STRONG_MARKUP}{SHORTCODE_PREFIX}{}{SHORTCODE_SUFFIX}{STRONG_MARKUP}",
        name.to_lowercase()
    ))
}

/// Tokenize one block of wiki text into inline formatting tokens.
///
/// Recognizes the symmetric markups (`**`, `//`, `__`, `~~`, `''`). A marker
/// only opens a span when a matching closer follows on the same line, so a
/// stray `**` stays literal text. Nothing is parsed inside verbatim spans,
/// and `//` directly after `:` (as in `https://`) is literal.
pub fn parse_inline(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    // Spans never cross a line break.
    for line in source.split_inclusive('\n') {
        parse_line(line, &mut tokens);
    }
    tokens
}

fn parse_line(line: &str, tokens: &mut Vec<Token>) {
    let mut open: Vec<Format> = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    let flush = |text: &mut String, tokens: &mut Vec<Token>| {
        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(text)));
        }
    };

    while pos < line.len() {
        let rest = &line[pos..];
        let marker = Format::SYMMETRIC.iter().copied().find(|format| {
            format
                .markup()
                .is_some_and(|markup| rest.starts_with(markup))
        });

        let Some(format) = marker else {
            let ch = rest.chars().next().map_or(1, char::len_utf8);
            text.push_str(&rest[..ch]);
            pos += ch;
            continue;
        };
        let markup_len = 2;
        let in_verbatim = open.last() == Some(&Format::Verbatim);

        if in_verbatim && format != Format::Verbatim {
            text.push_str(&rest[..markup_len]);
            pos += markup_len;
            continue;
        }

        if format == Format::Emphasis && line[..pos].ends_with(':') {
            text.push_str(&rest[..markup_len]);
            pos += markup_len;
            continue;
        }

        if let Some(index) = open.iter().rposition(|f| *f == format) {
            flush(&mut text, tokens);
            // Close anything opened inside this span first.
            while open.len() > index {
                if let Some(inner) = open.pop() {
                    tokens.push(Token::End(inner));
                }
            }
        } else if has_closer(&rest[markup_len..], format) {
            flush(&mut text, tokens);
            tokens.push(Token::Start(format));
            open.push(format);
        } else {
            text.push_str(&rest[..markup_len]);
        }
        pos += markup_len;
    }

    flush(&mut text, tokens);
    while let Some(format) = open.pop() {
        tokens.push(Token::End(format));
    }
}

fn has_closer(rest: &str, format: Format) -> bool {
    let Some(markup) = format.markup() else {
        return false;
    };
    let line_end = rest.find('\n').unwrap_or(rest.len());
    rest[..line_end].contains(markup)
}
