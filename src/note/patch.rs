//! Replacing the content of a single note in place.
//!
//! Only the bytes of the note's paragraphs change. The new paragraph is
//! assembled from the old one's start tag, properties and reference mark
//! plus freshly written runs, then spliced back between the untouched
//! bytes before and after it.

use crate::error::{Error, Result};
use crate::note::parse::public_id;
use crate::note::write::{self, LinkFormat, RunProps};
use crate::note::{HyperlinkRef, NoteKind, Run};
use crate::opc::Relationships;
use crate::options::LinkEncoding;
use crate::xml::{span, Element, R};
use log::debug;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

/// Paragraph children carried over from the old content
const KEPT_MARKERS: &[&str] = &["pPr", "bookmarkStart", "bookmarkEnd"];

/// Replace the content of note `id` with `runs` and return the new part.
///
/// Relationship edits go to `rels` only when the patch succeeds.
pub(crate) fn set_note(
    xml: &[u8],
    kind: NoteKind,
    id: u32,
    runs: &[Run],
    rels: &mut Relationships,
    link: &LinkFormat,
    encoding: LinkEncoding,
) -> Result<Vec<u8>> {
    let malformed = |reason: String| Error::MalformedNote { kind, id, reason };

    let root = span::parse(xml)?;
    let note = root
        .children_named(kind.element_name())
        .find(|n| public_id(n) == Some(id))
        .ok_or(Error::NoteNotFound { kind, id })?;

    let Some(first) = note.child("p") else {
        return Err(malformed("no w:p element".into()));
    };
    let last = note.children.last().unwrap_or(first);

    let binds_r = root.declares("r", R);
    for run in runs {
        if let Some(HyperlinkRef::Relationship(rid)) = &run.hyperlink {
            if !binds_r {
                return Err(malformed(format!(
                    "part does not bind the r prefix needed by {}",
                    rid
                )));
            }
            if rels.get(rid).is_none() {
                return Err(malformed(format!("unknown relationship {}", rid)));
            }
        }
    }

    let mut staged = rels.clone();
    let reused = reusable_hyperlink(first, rels, runs);
    let mut patch = ParagraphPatch {
        xml,
        root: &root,
        rels: &mut staged,
        link,
        use_relationships: binds_r && encoding == LinkEncoding::PreferRelationship,
        writer: Writer::new(Vec::new()),
    };
    patch.write_paragraph(kind, first, runs, reused)?;
    let paragraph = patch.writer.into_inner();

    let mut out = Vec::with_capacity(xml.len() + paragraph.len());
    out.extend_from_slice(&xml[..first.span.start]);
    out.extend_from_slice(&paragraph);
    out.extend_from_slice(&xml[last.span.end..]);

    span::parse(&out).map_err(|e| malformed(format!("patched note does not parse: {}", e)))?;

    *rels = staged;
    Ok(out)
}

/// The note's existing external hyperlink, if the new content can take it over
fn reusable_hyperlink<'e>(
    paragraph: &'e Element,
    rels: &Relationships,
    runs: &[Run],
) -> Option<&'e Element> {
    if runs.iter().filter(|r| r.is_field_link()).count() != 1 {
        return None;
    }
    paragraph.descendants_named("hyperlink").into_iter().find(|h| {
        h.attr("r:id")
            .and_then(|rid| rels.get(rid))
            .is_some_and(|rel| rel.is_external_hyperlink())
    })
}

struct ParagraphPatch<'a> {
    xml: &'a [u8],
    root: &'a Element,
    rels: &'a mut Relationships,
    link: &'a LinkFormat,
    use_relationships: bool,
    writer: Writer<Vec<u8>>,
}

impl ParagraphPatch<'_> {
    fn write_paragraph(
        &mut self,
        kind: NoteKind,
        p: &Element,
        runs: &[Run],
        reused: Option<&Element>,
    ) -> Result<()> {
        if p.is_self_closing() {
            self.writer.get_mut().extend_from_slice(&open_tag(p.raw(self.xml)));
        } else {
            self.writer.get_mut().extend_from_slice(p.start_tag(self.xml));
        }

        let mut kept_mark = false;
        for child in &p.children {
            let is_mark = child.is("r") && child.child(kind.reference_mark()).is_some();
            if is_mark || KEPT_MARKERS.contains(&child.local_name()) {
                kept_mark |= is_mark;
                self.writer.get_mut().extend_from_slice(child.raw(self.xml));
            }
        }

        let starts_with_space = runs
            .first()
            .is_some_and(|r| r.text.starts_with(char::is_whitespace));
        if kept_mark && !runs.is_empty() && !starts_with_space {
            write::write_text_run(
                &mut self.writer,
                &RunProps::Flags {
                    italic: false,
                    bold: false,
                },
                None,
                " ",
            )?;
        }

        match reused {
            Some(hyperlink) => debug!(
                "Reusing hyperlink {:?} in {} content",
                hyperlink.attr("r:id"),
                kind
            ),
            None => debug!("Substituting {} content ({} runs)", kind, runs.len()),
        }

        for run in runs {
            match (&run.hyperlink, reused) {
                (Some(HyperlinkRef::FieldCode(url)), Some(hyperlink)) => {
                    self.write_reused_link(hyperlink, url, &run.text)?;
                }
                (Some(HyperlinkRef::FieldCode(url)), None) if self.use_relationships => {
                    let rid = self.rels.hyperlink_for(url);
                    let props = RunProps::Flags {
                        italic: run.italic,
                        bold: run.bold,
                    };
                    write::write_hyperlink(&mut self.writer, &rid, &props, self.link, &run.text)?;
                }
                _ => write::write_run(&mut self.writer, run, self.link)?,
            }
        }

        if p.is_self_closing() {
            self.writer
                .write_event(Event::End(BytesEnd::new(p.name.as_str())))?;
        } else {
            self.writer.get_mut().extend_from_slice(p.end_tag(self.xml));
        }
        Ok(())
    }

    /// Write `hyperlink` pointing at `url` with new display text.
    ///
    /// The relationship is retargeted when this is its only reference in the
    /// part; otherwise a fresh one is minted and only this link moves.
    fn write_reused_link(&mut self, hyperlink: &Element, url: &str, text: &str) -> Result<()> {
        let rid = hyperlink.attr("r:id").unwrap_or_default();

        if count_references(self.root, rid) == 1 {
            self.rels.set_target(rid, url);
            if hyperlink.is_self_closing() {
                self.writer.get_mut().extend_from_slice(&open_tag(hyperlink.raw(self.xml)));
            } else {
                self.writer.get_mut().extend_from_slice(hyperlink.start_tag(self.xml));
            }
        } else {
            let new_id = self.rels.add_hyperlink(url);
            debug!("Relationship {} is shared, minted {} for {}", rid, new_id, url);
            let mut start = BytesStart::new(hyperlink.name.as_str());
            for (key, value) in &hyperlink.attributes {
                let value = if key == "r:id" { new_id.as_str() } else { value.as_str() };
                start.push_attribute((key.as_str(), value));
            }
            self.writer.write_event(Event::Start(start))?;
        }

        match hyperlink.descendants_named("r").first().copied() {
            Some(run) => write::write_text_run(
                &mut self.writer,
                &RunProps::Template { xml: self.xml, run },
                None,
                text,
            )?,
            None => write::write_text_run(
                &mut self.writer,
                &RunProps::Flags {
                    italic: false,
                    bold: false,
                },
                Some(self.link),
                text,
            )?,
        }

        self.writer
            .write_event(Event::End(BytesEnd::new(hyperlink.name.as_str())))?;
        Ok(())
    }
}

/// Start tag equivalent of a self-closing element (`<w:p a="1"/>` -> `<w:p a="1">`)
fn open_tag(raw: &[u8]) -> Vec<u8> {
    let mut tag = raw.strip_suffix(b"/>").unwrap_or(raw).to_vec();
    while tag.last().is_some_and(|b| b.is_ascii_whitespace()) {
        tag.pop();
    }
    tag.push(b'>');
    tag
}

/// Number of elements under `elem` referencing relationship `rid`
fn count_references(elem: &Element, rid: &str) -> usize {
    let own = usize::from(elem.attr("r:id") == Some(rid));
    own + elem
        .children
        .iter()
        .map(|c| count_references(c, rid))
        .sum::<usize>()
}
