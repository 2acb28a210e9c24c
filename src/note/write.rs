//! Run serialization to WordprocessingML

use crate::error::Result;
use crate::note::{HyperlinkRef, Run};
use crate::xml::{is_xml_char, Element};
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;

/// Colour Word uses for its built-in Hyperlink style
const HYPERLINK_COLOR: &str = "0563C1";

/// How hyperlink runs are formatted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkFormat {
    /// Apply a character style defined in `styles.xml`
    Style(String),
    /// Blue underline as direct formatting (no style available)
    Direct,
}

impl LinkFormat {
    /// Whether this format supersedes an existing `w:rPr` child
    fn replaces(&self, local: &str) -> bool {
        match self {
            LinkFormat::Style(_) => local == "rStyle",
            LinkFormat::Direct => matches!(local, "color" | "u"),
        }
    }

    fn entries(&self) -> Vec<(usize, Cow<'static, [u8]>)> {
        match self {
            LinkFormat::Style(style) => {
                let tag = format!(r#"<w:rStyle w:val="{}"/>"#, escape(style.as_str()));
                vec![(rpr_rank("rStyle"), Cow::Owned(tag.into_bytes()))]
            }
            LinkFormat::Direct => {
                let color = format!(r#"<w:color w:val="{}"/>"#, HYPERLINK_COLOR);
                vec![
                    (rpr_rank("color"), Cow::Owned(color.into_bytes())),
                    (rpr_rank("u"), Cow::Borrowed(&br#"<w:u w:val="single"/>"#[..])),
                ]
            }
        }
    }
}

/// Where a written run takes its formatting from
pub(crate) enum RunProps<'a> {
    /// Fresh run with italic/bold flags
    Flags { italic: bool, bold: bool },
    /// Copy of an existing run: its start tag and `w:rPr` are reused
    Template { xml: &'a [u8], run: &'a Element },
}

impl RunProps<'_> {
    fn of(run: &Run) -> RunProps<'static> {
        RunProps::Flags {
            italic: run.italic,
            bold: run.bold,
        }
    }
}

/// Schema order of `w:rPr` children (CT_RPr sequence)
const RPR_ORDER: &[&str] = &[
    "rStyle",
    "rFonts",
    "b",
    "bCs",
    "i",
    "iCs",
    "caps",
    "smallCaps",
    "strike",
    "dstrike",
    "outline",
    "shadow",
    "emboss",
    "imprint",
    "noProof",
    "snapToGrid",
    "vanish",
    "webHidden",
    "color",
    "spacing",
    "w",
    "kern",
    "position",
    "sz",
    "szCs",
    "highlight",
    "u",
    "effect",
    "bdr",
    "shd",
    "fitText",
    "vertAlign",
    "rtl",
    "cs",
    "em",
    "lang",
    "eastAsianLayout",
    "specVanish",
    "oMath",
];

fn rpr_rank(local: &str) -> usize {
    RPR_ORDER
        .iter()
        .position(|name| *name == local)
        .unwrap_or(RPR_ORDER.len())
}

/// Serialize runs, each hyperlink in the encoding its `HyperlinkRef` names
pub(crate) fn write_runs(runs: &[Run], link: &LinkFormat) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    for run in runs {
        write_run(&mut writer, run, link)?;
    }
    Ok(writer.into_inner())
}

/// Write one run
pub(crate) fn write_run(w: &mut Writer<Vec<u8>>, run: &Run, link: &LinkFormat) -> Result<()> {
    let props = RunProps::of(run);
    match &run.hyperlink {
        None => write_text_run(w, &props, None, &run.text),
        Some(HyperlinkRef::Relationship(id)) => write_hyperlink(w, id, &props, link, &run.text),
        Some(HyperlinkRef::FieldCode(url)) => write_field_link(w, url, &props, link, &run.text),
    }
}

/// Write `<w:r>` holding `text`
pub(crate) fn write_text_run(
    w: &mut Writer<Vec<u8>>,
    props: &RunProps,
    link: Option<&LinkFormat>,
    text: &str,
) -> Result<()> {
    open_run(w, props)?;
    write_rpr(w, props, link)?;
    write_text(w, text)?;
    w.write_event(Event::End(BytesEnd::new("w:r")))?;
    Ok(())
}

/// Write a relationship-backed `<w:hyperlink r:id>` around one run
pub(crate) fn write_hyperlink(
    w: &mut Writer<Vec<u8>>,
    r_id: &str,
    props: &RunProps,
    link: &LinkFormat,
    text: &str,
) -> Result<()> {
    let mut start = BytesStart::new("w:hyperlink");
    start.push_attribute(("r:id", r_id));
    start.push_attribute(("w:history", "1"));
    w.write_event(Event::Start(start))?;
    write_text_run(w, props, Some(link), text)?;
    w.write_event(Event::End(BytesEnd::new("w:hyperlink")))?;
    Ok(())
}

/// Write a complex `HYPERLINK` field: begin, instruction, separate, display text, end
pub(crate) fn write_field_link(
    w: &mut Writer<Vec<u8>>,
    url: &str,
    props: &RunProps,
    link: &LinkFormat,
    text: &str,
) -> Result<()> {
    write_field_char(w, props, "begin")?;

    open_run(w, props)?;
    write_rpr(w, props, None)?;
    let mut instr = BytesStart::new("w:instrText");
    instr.push_attribute(("xml:space", "preserve"));
    w.write_event(Event::Start(instr))?;
    let url: String = url.chars().filter(|&c| is_xml_char(c)).collect();
    let code = format!(" HYPERLINK \"{}\" ", url.replace('"', "%22"));
    w.write_event(Event::Text(BytesText::new(&code)))?;
    w.write_event(Event::End(BytesEnd::new("w:instrText")))?;
    w.write_event(Event::End(BytesEnd::new("w:r")))?;

    write_field_char(w, props, "separate")?;
    write_text_run(w, props, Some(link), text)?;
    write_field_char(w, props, "end")?;
    Ok(())
}

fn write_field_char(w: &mut Writer<Vec<u8>>, props: &RunProps, kind: &str) -> Result<()> {
    open_run(w, props)?;
    write_rpr(w, props, None)?;
    let mut fld = BytesStart::new("w:fldChar");
    fld.push_attribute(("w:fldCharType", kind));
    w.write_event(Event::Empty(fld))?;
    w.write_event(Event::End(BytesEnd::new("w:r")))?;
    Ok(())
}

fn open_run(w: &mut Writer<Vec<u8>>, props: &RunProps) -> Result<()> {
    match props {
        RunProps::Template { xml, run } if !run.is_self_closing() => {
            w.get_mut().extend_from_slice(run.start_tag(xml));
        }
        _ => w.write_event(Event::Start(BytesStart::new("w:r")))?,
    }
    Ok(())
}

/// Write `w:rPr`, merging hyperlink formatting in schema order
fn write_rpr(w: &mut Writer<Vec<u8>>, props: &RunProps, link: Option<&LinkFormat>) -> Result<()> {
    let mut entries: Vec<(usize, Cow<[u8]>)> = Vec::new();

    match props {
        RunProps::Flags { italic, bold } => {
            if *bold {
                entries.push((rpr_rank("b"), Cow::Borrowed(&b"<w:b/>"[..])));
            }
            if *italic {
                entries.push((rpr_rank("i"), Cow::Borrowed(&b"<w:i/>"[..])));
            }
        }
        RunProps::Template { xml, run } => {
            if let Some(rpr) = run.child("rPr") {
                if link.is_none() {
                    w.get_mut().extend_from_slice(rpr.raw(xml));
                    return Ok(());
                }
                for child in &rpr.children {
                    if link.is_some_and(|l| l.replaces(child.local_name())) {
                        continue;
                    }
                    entries.push((rpr_rank(child.local_name()), Cow::Borrowed(child.raw(xml))));
                }
            }
        }
    }

    if let Some(link) = link {
        entries.extend(link.entries());
    }
    if entries.is_empty() {
        return Ok(());
    }

    entries.sort_by_key(|(rank, _)| *rank);
    let out = w.get_mut();
    out.extend_from_slice(b"<w:rPr>");
    for (_, bytes) in &entries {
        out.extend_from_slice(bytes);
    }
    out.extend_from_slice(b"</w:rPr>");
    Ok(())
}

/// Write text as `w:t`, with `w:br` for newlines and `w:tab` for tabs.
///
/// Characters that are not legal in XML are skipped.
fn write_text(w: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    let mut piece = String::new();
    for ch in text.chars() {
        match ch {
            _ if !is_xml_char(ch) => {}
            '\n' | '\t' => {
                write_t(w, &piece)?;
                piece.clear();
                let name = if ch == '\n' { "w:br" } else { "w:tab" };
                w.write_event(Event::Empty(BytesStart::new(name)))?;
            }
            _ => piece.push(ch),
        }
    }
    write_t(w, &piece)
}

fn write_t(w: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }

    let mut start = BytesStart::new("w:t");
    if text.trim() != text || text.contains("  ") {
        start.push_attribute(("xml:space", "preserve"));
    }
    w.write_event(Event::Start(start))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new("w:t")))?;
    Ok(())
}
