//! Reading notes out of `endnotes.xml` / `footnotes.xml`

use crate::error::Result;
use crate::note::{coalesce, HyperlinkRef, Note, NoteKind, Run};
use crate::xml::{parse_bool, span, Element};
use log::warn;

/// Separator notes carry these `w:type` values
const RESERVED_TYPES: &[&str] = &["separator", "continuationSeparator", "continuationNotice"];

/// Parse every caller-visible note in a notes part
pub fn parse_notes(kind: NoteKind, xml: &[u8]) -> Result<Vec<Note>> {
    let root = span::parse(xml)?;

    let notes = root
        .children_named(kind.element_name())
        .filter_map(|elem| {
            let id = public_id(elem)?;
            Some(Note {
                kind,
                id,
                runs: coalesce(read_note_runs(elem)),
            })
        })
        .collect();

    Ok(notes)
}

/// The caller-visible id of a note element, `None` for separators
pub(crate) fn public_id(elem: &Element) -> Option<u32> {
    if let Some(ty) = elem.attr_local("type") {
        if RESERVED_TYPES.contains(&ty) {
            return None;
        }
    }

    let raw = elem.attr_local("id")?;
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => u32::try_from(id).ok(),
        Ok(_) => None,
        Err(_) => {
            warn!("Ignoring {} with non-numeric id '{}'", elem.name, raw);
            None
        }
    }
}

/// Open complex field (`w:fldChar` begin .. end)
#[derive(Default)]
struct FieldFrame {
    instr: String,
    separated: bool,
}

/// Walks a note's runs in order, tracking hyperlink context
#[derive(Default)]
struct RunCollector {
    runs: Vec<Run>,
    fields: Vec<FieldFrame>,
}

impl RunCollector {
    fn paragraph(&mut self, p: &Element) {
        for child in &p.children {
            self.content(child, None);
        }
    }

    fn content(&mut self, elem: &Element, link: Option<&HyperlinkRef>) {
        match elem.local_name() {
            "r" => self.run(elem, link),
            "hyperlink" => {
                let own = elem
                    .attr("r:id")
                    .map(|id| HyperlinkRef::Relationship(id.to_string()));
                let link = own.as_ref().or(link);
                for child in &elem.children {
                    self.content(child, link);
                }
            }
            "fldSimple" => {
                let own = elem
                    .attr_local("instr")
                    .and_then(hyperlink_target)
                    .map(HyperlinkRef::FieldCode);
                let link = own.as_ref().or(link);
                for child in &elem.children {
                    self.content(child, link);
                }
            }
            // Transparent wrappers
            "ins" | "smartTag" | "customXml" | "sdt" | "sdtContent" => {
                for child in &elem.children {
                    self.content(child, link);
                }
            }
            _ => {}
        }
    }

    fn run(&mut self, r: &Element, link: Option<&HyperlinkRef>) {
        let (italic, bold) = run_flags(r);

        for child in &r.children {
            match child.local_name() {
                "t" => self.text(child.text(), italic, bold, link),
                "tab" => self.text("\t", italic, bold, link),
                "br" | "cr" => self.text("\n", italic, bold, link),
                "noBreakHyphen" => self.text("-", italic, bold, link),
                "fldChar" => match child.attr_local("fldCharType") {
                    Some("begin") => self.fields.push(FieldFrame::default()),
                    Some("separate") => {
                        if let Some(frame) = self.fields.last_mut() {
                            frame.separated = true;
                        }
                    }
                    Some("end") => {
                        self.fields.pop();
                    }
                    _ => {}
                },
                "instrText" => {
                    if let Some(frame) = self.fields.last_mut() {
                        frame.instr.push_str(child.text());
                    }
                }
                _ => {}
            }
        }
    }

    fn text(&mut self, text: &str, italic: bool, bold: bool, link: Option<&HyperlinkRef>) {
        // Instruction part of a field is not visible text
        if self.fields.last().is_some_and(|f| !f.separated) {
            return;
        }

        let hyperlink = link.cloned().or_else(|| {
            self.fields
                .iter()
                .rev()
                .find_map(|f| hyperlink_target(&f.instr))
                .map(HyperlinkRef::FieldCode)
        });

        self.runs.push(Run {
            text: text.to_string(),
            italic,
            bold,
            hyperlink,
        });
    }
}

fn read_note_runs(note: &Element) -> Vec<Run> {
    let mut collector = RunCollector::default();
    for (i, p) in note.descendants_named("p").into_iter().enumerate() {
        if i > 0 {
            collector.runs.push(Run::new("\n"));
        }
        collector.paragraph(p);
    }
    collector.runs
}

/// Italic and bold flags from a run's `w:rPr`
pub(crate) fn run_flags(r: &Element) -> (bool, bool) {
    let Some(rpr) = r.child("rPr") else {
        return (false, false);
    };
    let italic = rpr.child("i").map_or(false, parse_bool);
    let bold = rpr.child("b").map_or(false, parse_bool);
    (italic, bold)
}

/// URL of a `HYPERLINK "url"` field instruction.
///
/// Local bookmark links (`\l`) are not URLs and yield `None`.
pub(crate) fn hyperlink_target(instr: &str) -> Option<String> {
    let instr = instr.trim();
    let keyword = instr.get(..9)?;
    if !keyword.eq_ignore_ascii_case("HYPERLINK") {
        return None;
    }
    let args = instr[9..].trim_start();
    if args.starts_with("\\l") {
        return None;
    }

    let target = match args.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next()?,
        None => args.split_whitespace().next()?,
    };
    (!target.is_empty()).then(|| target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ENDNOTES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:endnotes xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:endnote w:type="separator" w:id="-1"><w:p><w:r><w:separator/></w:r></w:p></w:endnote>
  <w:endnote w:type="continuationSeparator" w:id="0"><w:p><w:r><w:continuationSeparator/></w:r></w:p></w:endnote>
  <w:endnote w:id="1">
    <w:p>
      <w:pPr><w:pStyle w:val="EndnoteText"/></w:pPr>
      <w:r><w:rPr><w:rStyle w:val="EndnoteReference"/></w:rPr><w:endnoteRef/></w:r>
      <w:r><w:t xml:space="preserve"> Smith, </w:t></w:r>
      <w:r><w:rPr><w:i/></w:rPr><w:t>The Bo</w:t></w:r>
      <w:proofErr w:type="spellStart"/>
      <w:r><w:rPr><w:i/></w:rPr><w:t>ok</w:t></w:r>
      <w:r><w:t xml:space="preserve"> (2001).</w:t></w:r>
    </w:p>
  </w:endnote>
  <w:endnote w:id="2">
    <w:p>
      <w:r><w:endnoteRef/></w:r>
      <w:r><w:t xml:space="preserve"> See </w:t></w:r>
      <w:hyperlink r:id="rId5" w:history="1"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t>old text</w:t></w:r></w:hyperlink>
      <w:r><w:t>.</w:t></w:r>
    </w:p>
  </w:endnote>
</w:endnotes>"#;

    #[test]
    fn test_reserved_ids_skipped() {
        let notes = parse_notes(NoteKind::Endnote, ENDNOTES.as_bytes()).unwrap();
        let ids: Vec<u32> = notes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_split_runs_coalesced() {
        let notes = parse_notes(NoteKind::Endnote, ENDNOTES.as_bytes()).unwrap();
        assert_eq!(
            notes[0].runs,
            vec![
                Run::new(" Smith, "),
                Run::new("The Book").italic(true),
                Run::new(" (2001)."),
            ]
        );
        assert_eq!(notes[0].text(), "Smith, The Book (2001).");
    }

    #[test]
    fn test_relationship_hyperlink() {
        let notes = parse_notes(NoteKind::Endnote, ENDNOTES.as_bytes()).unwrap();
        assert_eq!(
            notes[1].runs,
            vec![
                Run::new(" See "),
                Run::new("old text").with_link(HyperlinkRef::Relationship("rId5".into())),
                Run::new("."),
            ]
        );
    }

    #[test]
    fn test_complex_field_hyperlink() {
        let xml = r#"<w:footnotes xmlns:w="w"><w:footnote w:id="3"><w:p>
            <w:r><w:t xml:space="preserve">Go to </w:t></w:r>
            <w:r><w:fldChar w:fldCharType="begin"/></w:r>
            <w:r><w:instrText xml:space="preserve"> HYPERLINK "https://a.example/x" </w:instrText></w:r>
            <w:r><w:fldChar w:fldCharType="separate"/></w:r>
            <w:r><w:rPr><w:b/></w:rPr><w:t>https://a.example/x</w:t></w:r>
            <w:r><w:fldChar w:fldCharType="end"/></w:r>
            <w:fldSimple w:instr=" HYPERLINK &quot;http://b.example&quot; "><w:r><w:t>b</w:t></w:r></w:fldSimple>
        </w:p></w:footnote></w:footnotes>"#;

        let notes = parse_notes(NoteKind::Footnote, xml.as_bytes()).unwrap();
        assert_eq!(
            notes[0].runs,
            vec![
                Run::new("Go to "),
                Run::new("https://a.example/x")
                    .bold(true)
                    .with_link(HyperlinkRef::FieldCode("https://a.example/x".into())),
                Run::new("b").with_link(HyperlinkRef::FieldCode("http://b.example".into())),
            ]
        );
    }

    #[test]
    fn test_paragraphs_joined_with_newline() {
        let xml = r#"<w:endnotes xmlns:w="w"><w:endnote w:id="7">
            <w:p><w:r><w:t>one</w:t></w:r></w:p>
            <w:p><w:r><w:t>two</w:t><w:tab/><w:t>three</w:t></w:r></w:p>
        </w:endnote></w:endnotes>"#;

        let notes = parse_notes(NoteKind::Endnote, xml.as_bytes()).unwrap();
        assert_eq!(notes[0].text(), "one\ntwo\tthree");
    }

    #[test]
    fn test_bold_off_value() {
        let xml = r#"<w:endnotes xmlns:w="w"><w:endnote w:id="1"><w:p>
            <w:r><w:rPr><w:b w:val="false"/><w:i w:val="1"/></w:rPr><w:t>x</w:t></w:r>
        </w:p></w:endnote></w:endnotes>"#;
        let notes = parse_notes(NoteKind::Endnote, xml.as_bytes()).unwrap();
        assert_eq!(notes[0].runs, vec![Run::new("x").italic(true)]);
    }

    #[test]
    fn test_hyperlink_target() {
        assert_eq!(
            hyperlink_target(r#" HYPERLINK "http://x.com/a" \o "tip" "#),
            Some("http://x.com/a".to_string())
        );
        assert_eq!(hyperlink_target("hyperlink http://y.com"), Some("http://y.com".to_string()));
        assert_eq!(hyperlink_target(r#"HYPERLINK \l "_Toc1""#), None);
        assert_eq!(hyperlink_target("PAGE"), None);
    }
}
