//! In-memory note representation

use crate::opc::{well_known, PartUri};
use std::fmt;

/// Which notes part a note lives in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteKind {
    Endnote,
    Footnote,
}

impl NoteKind {
    /// Both kinds, endnotes first
    pub const ALL: [NoteKind; 2] = [NoteKind::Endnote, NoteKind::Footnote];

    /// Part holding notes of this kind
    pub fn part_uri(self) -> PartUri {
        match self {
            NoteKind::Endnote => well_known::endnotes(),
            NoteKind::Footnote => well_known::footnotes(),
        }
    }

    /// Local name of the note element (`w:endnote` / `w:footnote`)
    pub fn element_name(self) -> &'static str {
        match self {
            NoteKind::Endnote => "endnote",
            NoteKind::Footnote => "footnote",
        }
    }

    /// Local name of the reference mark run content inside a note
    pub fn reference_mark(self) -> &'static str {
        match self {
            NoteKind::Endnote => "endnoteRef",
            NoteKind::Footnote => "footnoteRef",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Hyperlink attached to a run
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HyperlinkRef {
    /// `w:hyperlink r:id="..."`, resolved through the part's relationships
    Relationship(String),
    /// Self-contained `HYPERLINK "url"` field
    FieldCode(String),
}

/// A run of uniformly formatted text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Run {
    /// Text content (unescaped; the writer escapes it)
    pub text: String,
    pub italic: bool,
    pub bold: bool,
    pub hyperlink: Option<HyperlinkRef>,
}

impl Run {
    /// Create a plain run
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set italic
    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// Set bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Attach a hyperlink
    pub fn with_link(mut self, link: HyperlinkRef) -> Self {
        self.hyperlink = Some(link);
        self
    }

    /// Whether the run carries a field-code hyperlink
    pub fn is_field_link(&self) -> bool {
        matches!(self.hyperlink, Some(HyperlinkRef::FieldCode(_)))
    }

    fn same_format(&self, other: &Run) -> bool {
        self.italic == other.italic && self.bold == other.bold && self.hyperlink == other.hyperlink
    }
}

/// Merge adjacent runs with identical formatting and drop empty ones.
///
/// Word and spell-checkers split runs at arbitrary points; readers want
/// one run per formatting change.
pub fn coalesce(runs: Vec<Run>) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.same_format(&run) => last.text.push_str(&run.text),
            _ => out.push(run),
        }
    }
    out
}

/// An endnote or footnote
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub kind: NoteKind,
    pub id: u32,
    pub runs: Vec<Run>,
}

impl Note {
    /// Flattened text, for classification and search
    pub fn text(&self) -> String {
        let text: String = self.runs.iter().map(|r| r.text.as_str()).collect();
        text.trim().to_string()
    }

    /// Note content as inline markup (`<i>`, `<b>`, bare URLs)
    pub fn markup(&self) -> String {
        super::to_markup(&self.runs).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_coalesce_merges_split_runs() {
        let runs = vec![
            Run::new("Hel"),
            Run::new("lo "),
            Run::new(""),
            Run::new("Wor").italic(true),
            Run::new("ld").italic(true),
            Run::new("http://a.example").with_link(HyperlinkRef::Relationship("rId3".into())),
        ];

        let merged = coalesce(runs);
        assert_eq!(
            merged,
            vec![
                Run::new("Hello "),
                Run::new("World").italic(true),
                Run::new("http://a.example").with_link(HyperlinkRef::Relationship("rId3".into())),
            ]
        );
    }

    #[test]
    fn test_note_text_is_trimmed() {
        let note = Note {
            kind: NoteKind::Endnote,
            id: 4,
            runs: vec![Run::new(" Smith, "), Run::new("Title").italic(true), Run::new(". ")],
        };
        assert_eq!(note.text(), "Smith, Title.");
        assert_eq!(note.markup(), "Smith, <i>Title</i>.");
    }

    #[test]
    fn test_kind_parts() {
        assert_eq!(NoteKind::Endnote.part_uri().as_str(), "/word/endnotes.xml");
        assert_eq!(NoteKind::Footnote.reference_mark(), "footnoteRef");
        assert_eq!(NoteKind::Footnote.to_string(), "footnote");
    }
}
