//! Inline citation markup.
//!
//! Callers describe replacement note content with a tiny grammar: plain
//! text, `<i>…</i>`, `<b>…</b>` and bare `http(s)://` URLs. Tags do not
//! nest: inside an open tag, further tags are dropped and the outer style
//! applies. Anything else that looks like a tag is literal text.
//! Characters XML cannot carry (C0 controls, `U+FFFE`, ...) are dropped.

use crate::note::{coalesce, HyperlinkRef, Run};
use crate::xml::is_xml_char;
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use regex::Regex;
use std::ops::Range;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhttps?://[^\s<>"]+"#).expect("valid URL pattern"));

/// Characters that end a sentence rather than a URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    Italic,
    Bold,
}

/// Tag nesting state: the outer tag decides the style
#[derive(Default)]
struct StyleState {
    outer: Option<Tag>,
    ignored: Vec<Tag>,
}

impl StyleState {
    fn open(&mut self, tag: Tag) {
        match self.outer {
            None => self.outer = Some(tag),
            Some(_) => self.ignored.push(tag),
        }
    }

    fn close(&mut self, tag: Tag) {
        if self.ignored.last() == Some(&tag) {
            self.ignored.pop();
        } else if self.outer == Some(tag) {
            self.outer = None;
            self.ignored.clear();
        }
        // anything else is an unmatched closing tag and is dropped
    }

    fn italic(&self) -> bool {
        self.outer == Some(Tag::Italic)
    }

    fn bold(&self) -> bool {
        self.outer == Some(Tag::Bold)
    }
}

/// Convert inline markup into runs
pub fn translate(markup: &str) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut state = StyleState::default();
    let mut literal = String::new();
    let mut rest = markup;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some((tag, closing, len)) = parse_tag(rest) {
                flush(&mut literal, &state, &mut runs);
                if closing {
                    state.close(tag);
                } else {
                    state.open(tag);
                }
                rest = &rest[len..];
                continue;
            }
        }
        if is_xml_char(ch) {
            literal.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }
    flush(&mut literal, &state, &mut runs);

    coalesce(runs)
}

/// Recognise `<i>`, `</i>`, `<b>`, `</b>` (any case) at the start of `s`
fn parse_tag(s: &str) -> Option<(Tag, bool, usize)> {
    let bytes = s.as_bytes();
    let closing = bytes.get(1) == Some(&b'/');
    let name_at = if closing { 2 } else { 1 };

    let tag = match bytes.get(name_at)?.to_ascii_lowercase() {
        b'i' => Tag::Italic,
        b'b' => Tag::Bold,
        _ => return None,
    };
    (bytes.get(name_at + 1) == Some(&b'>')).then_some((tag, closing, name_at + 2))
}

fn flush(literal: &mut String, state: &StyleState, runs: &mut Vec<Run>) {
    if literal.is_empty() {
        return;
    }
    let text = decode_entities(literal);
    literal.clear();

    let mut pos = 0;
    for url in find_urls(&text) {
        if url.start > pos {
            runs.push(styled(&text[pos..url.start], state));
        }
        let href = &text[url.clone()];
        runs.push(styled(href, state).with_link(HyperlinkRef::FieldCode(href.to_string())));
        pos = url.end;
    }
    if pos < text.len() {
        runs.push(styled(&text[pos..], state));
    }
}

fn styled(text: &str, state: &StyleState) -> Run {
    Run::new(text).italic(state.italic()).bold(state.bold())
}

/// Decode the predefined XML entities and numeric character references.
///
/// An `&` that does not start a well-formed reference is kept as is.
fn decode_entities(s: &str) -> String {
    const NAMED: [(&str, char); 5] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&apos;", '\''),
    ];

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];

        if let Some((name, ch)) = NAMED.iter().find(|(name, _)| rest.starts_with(name)) {
            out.push(*ch);
            rest = &rest[name.len()..];
        } else if let Some((ch, len)) = numeric_reference(rest) {
            out.push(ch);
            rest = &rest[len..];
        } else {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

fn numeric_reference(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let end = body.find(';')?;
    let digits = &body[..end];
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    let ch = char::from_u32(code).filter(|&c| is_xml_char(c))?;
    Some((ch, end + 3))
}

/// Byte ranges of the URLs in `text`, with trailing punctuation excluded
pub fn find_urls(text: &str) -> Vec<Range<usize>> {
    URL_RE
        .find_iter(text)
        .filter_map(|m| {
            let url = trim_url(m.as_str());
            let scheme_end = url.find("://").map_or(url.len(), |i| i + 3);
            (url.len() > scheme_end).then(|| m.start()..m.start() + url.len())
        })
        .collect()
}

/// Strip sentence punctuation from the end of a URL candidate.
///
/// A closing parenthesis stays when it balances an opening one inside
/// the URL (`https://en.wikipedia.org/wiki/Rust_(language)`).
fn trim_url(url: &str) -> &str {
    let mut s = url;
    loop {
        match s.chars().last() {
            Some(c) if TRAILING_PUNCTUATION.contains(&c) => s = &s[..s.len() - 1],
            Some(')') if s.matches(')').count() > s.matches('(').count() => {
                s = &s[..s.len() - 1]
            }
            _ => return s,
        }
    }
}

/// Render runs back to inline markup
pub fn to_markup(runs: &[Run]) -> String {
    let mut out = String::new();
    for run in runs {
        let text = partial_escape(&run.text);
        match (run.bold, run.italic) {
            (true, true) => {
                // No nesting in the grammar: bold wins on the way back in
                out.push_str("<b><i>");
                out.push_str(&text);
                out.push_str("</i></b>");
            }
            (true, false) => {
                out.push_str("<b>");
                out.push_str(&text);
                out.push_str("</b>");
            }
            (false, true) => {
                out.push_str("<i>");
                out.push_str(&text);
                out.push_str("</i>");
            }
            (false, false) => out.push_str(&text),
        }
    }
    out
}
