//! Hyperlink activation: bare URLs in body text become live links.
//!
//! Only simple runs (nothing but `w:rPr` and `w:t`) that sit directly in a
//! paragraph and outside any existing hyperlink or field are rewritten, so
//! a second pass finds nothing left to do. Adjacent simple runs are read as
//! one text, with proofing and bookmark markers between them ignored, so a
//! URL that Word split over several runs is linked whole.

use crate::error::Result;
use crate::note::find_urls;
use crate::note::write::{self, LinkFormat, RunProps};
use crate::opc::{PartUri, Relationships};
use crate::options::LinkEncoding;
use crate::xml::{span, Element, R};
use log::debug;
use quick_xml::Writer;
use std::ops::Range;

/// Links created in one part
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartActivation {
    pub part: PartUri,
    /// Links written as `w:hyperlink r:id`
    pub relationship_links: usize,
    /// Links written as `HYPERLINK` field codes
    pub field_code_links: usize,
}

impl PartActivation {
    fn new(part: PartUri) -> Self {
        Self {
            part,
            relationship_links: 0,
            field_code_links: 0,
        }
    }

    /// All links created in this part
    pub fn total(&self) -> usize {
        self.relationship_links + self.field_code_links
    }
}

/// Result of `Document::activate_links`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub parts: Vec<PartActivation>,
}

impl ActivationReport {
    pub fn relationship_links(&self) -> usize {
        self.parts.iter().map(|p| p.relationship_links).sum()
    }

    pub fn field_code_links(&self) -> usize {
        self.parts.iter().map(|p| p.field_code_links).sum()
    }

    /// All links created
    pub fn total(&self) -> usize {
        self.parts.iter().map(PartActivation::total).sum()
    }
}

/// Scan one part for bare URLs.
///
/// Returns the rewritten part, or `None` when nothing changed.
pub(crate) fn activate_part(
    part: &PartUri,
    xml: &[u8],
    rels: &mut Relationships,
    encoding: LinkEncoding,
    link: &LinkFormat,
) -> Result<(Option<Vec<u8>>, PartActivation)> {
    let root = span::parse(xml)?;
    let mut report = PartActivation::new(part.clone());

    let use_relationships = encoding == LinkEncoding::PreferRelationship && root.declares("r", R);
    if !use_relationships {
        debug!("Using field codes for links in {}", part);
    }

    let mut scan = RunScan::default();
    scan.visit(&root, false, false);
    scan.close_group();

    let mut staged = rels.clone();
    let mut edits: Vec<(Range<usize>, Vec<u8>)> = Vec::new();

    for group in &scan.groups {
        let mut text = String::new();
        let mut bounds = Vec::with_capacity(group.len());
        for run in group {
            let start = text.len();
            text.extend(run.children_named("t").map(Element::text));
            bounds.push(start..text.len());
        }

        let urls = find_urls(&text);
        if urls.is_empty() {
            continue;
        }

        for (&run, bound) in group.iter().zip(&bounds) {
            let touching: Vec<&Range<usize>> = urls
                .iter()
                .filter(|u| u.start < bound.end && u.end > bound.start)
                .collect();
            if touching.is_empty() {
                continue;
            }

            let props = RunProps::Template { xml, run };
            let mut w = Writer::new(Vec::new());
            let mut pos = bound.start;
            for url in touching {
                if url.start > pos {
                    write::write_text_run(&mut w, &props, None, &text[pos..url.start])?;
                }
                // A URL continued from an earlier run was written there in full
                if url.start >= bound.start {
                    let href = &text[url.clone()];
                    if use_relationships {
                        let rid = staged.hyperlink_for(href);
                        write::write_hyperlink(&mut w, &rid, &props, link, href)?;
                        report.relationship_links += 1;
                    } else {
                        write::write_field_link(&mut w, href, &props, link, href)?;
                        report.field_code_links += 1;
                    }
                }
                pos = url.end.min(bound.end);
            }
            if pos < bound.end {
                write::write_text_run(&mut w, &props, None, &text[pos..bound.end])?;
            }

            edits.push((run.span.clone(), w.into_inner()));
        }
    }

    if edits.is_empty() {
        return Ok((None, report));
    }

    let mut out = Vec::with_capacity(xml.len() + edits.iter().map(|(_, b)| b.len()).sum::<usize>());
    let mut pos = 0;
    for (span, bytes) in &edits {
        out.extend_from_slice(&xml[pos..span.start]);
        out.extend_from_slice(bytes);
        pos = span.end;
    }
    out.extend_from_slice(&xml[pos..]);

    span::parse(&out)?;
    *rels = staged;

    debug!("Activated {} links in {}", report.total(), part);
    Ok((Some(out), report))
}

/// Zero-width markers that may sit between the runs of one word
const TRANSPARENT: &[&str] = &[
    "proofErr",
    "bookmarkStart",
    "bookmarkEnd",
    "commentRangeStart",
    "commentRangeEnd",
    "permStart",
    "permEnd",
];

/// Collects rewritable runs in document order, grouped by adjacency
#[derive(Default)]
struct RunScan<'a> {
    groups: Vec<Vec<&'a Element>>,
    current: Vec<&'a Element>,
    /// Open complex fields (`fldChar` begin without end yet)
    field_depth: usize,
}

impl<'a> RunScan<'a> {
    fn visit(&mut self, elem: &'a Element, in_paragraph: bool, linked: bool) {
        for child in &elem.children {
            match child.local_name() {
                "r" => {
                    if in_paragraph && !linked && self.field_depth == 0 && is_simple_run(child) {
                        self.current.push(child);
                        continue;
                    }
                    self.close_group();
                    for fld in child.children_named("fldChar") {
                        match fld.attr_local("fldCharType") {
                            Some("begin") => self.field_depth += 1,
                            Some("end") => self.field_depth = self.field_depth.saturating_sub(1),
                            _ => {}
                        }
                    }
                    // Text boxes nest paragraphs inside runs
                    self.visit(child, false, linked);
                }
                name if in_paragraph && TRANSPARENT.contains(&name) => {}
                "hyperlink" | "fldSimple" => {
                    self.close_group();
                    self.visit(child, false, true);
                }
                "p" => {
                    self.close_group();
                    self.visit(child, true, linked);
                    self.close_group();
                }
                _ => {
                    self.close_group();
                    self.visit(child, false, linked);
                }
            }
        }
    }

    fn close_group(&mut self) {
        if !self.current.is_empty() {
            self.groups.push(std::mem::take(&mut self.current));
        }
    }
}

fn is_simple_run(r: &Element) -> bool {
    r.children.iter().all(|c| c.is("rPr") || c.is("t")) && r.child("t").is_some()
}
