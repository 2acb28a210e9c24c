//! Document - high-level API for note surgery on DOCX files

use crate::activate::{self, ActivationReport};
use crate::error::{Error, Result};
use crate::note::{self, patch, LinkFormat, Note, NoteKind, Run};
use crate::opc::{well_known, Package, PartUri, Relationships};
use crate::options::EngineOptions;
use crate::xml::span;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::Path;

/// A DOCX document opened for editing
#[derive(Debug)]
pub struct Document {
    /// Underlying OPC package
    package: Package,
    /// Relationship tables loaded so far, keyed by source part
    relationships: BTreeMap<PartUri, Relationships>,
    options: EngineOptions,
}

/// One requested note replacement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteEdit {
    pub kind: NoteKind,
    pub id: u32,
    /// Inline markup (`<i>`, `<b>`, bare URLs)
    pub markup: String,
}

impl NoteEdit {
    pub fn new(kind: NoteKind, id: u32, markup: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            markup: markup.into(),
        }
    }
}

/// Outcome of one edit in a batch
#[derive(Debug)]
pub struct NoteOutcome {
    pub kind: NoteKind,
    pub id: u32,
    pub result: Result<()>,
}

/// Per-note results of `Document::apply`
#[derive(Debug, Default)]
pub struct PatchReport {
    pub outcomes: Vec<NoteOutcome>,
}

impl PatchReport {
    /// Number of notes rewritten
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Edits that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = &NoteOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Check whether every edit succeeded
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

impl Document {
    /// Open a document from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, EngineOptions::default())
    }

    /// Open a document from a file path with custom options
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: EngineOptions) -> Result<Self> {
        let package = Package::open(path)?;
        Self::from_package(package, options)
    }

    /// Open a document from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)?;
        Self::from_package(package, EngineOptions::default())
    }

    /// Wrap an OPC package
    pub fn from_package(package: Package, options: EngineOptions) -> Result<Self> {
        let main = well_known::document();
        if !package.contains(&main) {
            return Err(Error::PartNotFound(main.to_string()));
        }

        Ok(Self {
            package,
            relationships: BTreeMap::new(),
            options,
        })
    }

    /// Current options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Replace the options used by later edits
    pub fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
    }

    /// Underlying package
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Check whether any part or relationship table changed since opening
    pub fn is_modified(&self) -> bool {
        self.package.parts().any(|p| p.is_modified())
            || self.relationships.values().any(Relationships::is_modified)
    }

    /// All endnotes, then all footnotes, in document order
    pub fn notes(&self) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        for kind in NoteKind::ALL {
            notes.extend(self.notes_of(kind)?);
        }
        Ok(notes)
    }

    /// Notes of one kind; empty when the document has no such part
    pub fn notes_of(&self, kind: NoteKind) -> Result<Vec<Note>> {
        match self.package.part(&kind.part_uri()) {
            Some(part) => note::parse_notes(kind, part.data()),
            None => Ok(Vec::new()),
        }
    }

    /// Look up a single note
    pub fn note(&self, kind: NoteKind, id: u32) -> Result<Note> {
        self.notes_of(kind)?
            .into_iter()
            .find(|n| n.id == id)
            .ok_or(Error::NoteNotFound { kind, id })
    }

    /// Replace a note's content with inline markup
    pub fn set_note(&mut self, kind: NoteKind, id: u32, markup: &str) -> Result<()> {
        let runs = note::translate(markup);
        self.set_note_runs(kind, id, &runs)
    }

    /// Replace a note's content with prepared runs
    pub fn set_note_runs(&mut self, kind: NoteKind, id: u32, runs: &[Run]) -> Result<()> {
        let uri = kind.part_uri();
        let link = self.link_format()?;

        let patched = {
            let part = self
                .package
                .part(&uri)
                .ok_or(Error::NoteNotFound { kind, id })?;
            let rels = load_rels(&self.package, &mut self.relationships, &uri)?;
            patch::set_note(
                part.data(),
                kind,
                id,
                runs,
                rels,
                &link,
                self.options.link_encoding,
            )?
        };

        self.package.set_part_data(&uri, patched);
        debug!("Rewrote {} {}", kind, id);
        Ok(())
    }

    /// Apply a batch of edits, collecting one result per edit
    pub fn apply<I>(&mut self, edits: I) -> PatchReport
    where
        I: IntoIterator<Item = NoteEdit>,
    {
        let mut report = PatchReport::default();
        for edit in edits {
            let result = self.set_note(edit.kind, edit.id, &edit.markup);
            if let Err(e) = &result {
                warn!("Skipping {} {}: {}", edit.kind, edit.id, e);
            }
            report.outcomes.push(NoteOutcome {
                kind: edit.kind,
                id: edit.id,
                result,
            });
        }
        info!(
            "Applied {} of {} note edits",
            report.applied(),
            report.outcomes.len()
        );
        report
    }

    /// Turn bare URLs into hyperlinks in the configured parts
    pub fn activate_links(&mut self) -> Result<ActivationReport> {
        let link = self.link_format()?;
        let mut report = ActivationReport::default();

        for uri in self.options.activate_parts.clone() {
            let activated = {
                let Some(part) = self.package.part(&uri) else {
                    continue;
                };
                let rels = load_rels(&self.package, &mut self.relationships, &uri)?;
                activate::activate_part(
                    &uri,
                    part.data(),
                    rels,
                    self.options.link_encoding,
                    &link,
                )?
            };

            let (data, part_report) = activated;
            if let Some(data) = data {
                self.package.set_part_data(&uri, data);
            }
            report.parts.push(part_report);
        }

        info!(
            "Activated {} links ({} relationship, {} field code)",
            report.total(),
            report.relationship_links(),
            report.field_code_links()
        );
        Ok(report)
    }

    /// Save the document to a file, replacing it atomically
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.flush_relationships()?;
        self.package.save(path)
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_relationships()?;
        self.package.to_bytes()
    }

    /// Write modified relationship tables back to their parts
    fn flush_relationships(&mut self) -> Result<()> {
        for (source, rels) in &self.relationships {
            if !rels.is_modified() {
                continue;
            }
            let rels_uri = source.relationships_uri();
            let created = !self.package.contains(&rels_uri);
            self.package.set_part_data(&rels_uri, rels.to_xml()?);
            if created {
                debug!("Created {}", rels_uri);
                self.package.ensure_rels_content_type()?;
            }
        }
        Ok(())
    }

    /// Formatting for new hyperlink runs, based on the styles part
    fn link_format(&self) -> Result<LinkFormat> {
        let style = &self.options.hyperlink_style;
        let Some(part) = self.package.part(&well_known::styles()) else {
            warn!("No styles part, using direct hyperlink formatting");
            return Ok(LinkFormat::Direct);
        };

        let root = span::parse(part.data())?;
        let defined = root
            .children_named("style")
            .any(|s| s.attr_local("styleId") == Some(style.as_str()));

        if defined {
            Ok(LinkFormat::Style(style.clone()))
        } else {
            debug!("Style '{}' not defined, using direct formatting", style);
            Ok(LinkFormat::Direct)
        }
    }
}

/// Relationship table for `source`, loaded on first use
fn load_rels<'a>(
    package: &Package,
    cache: &'a mut BTreeMap<PartUri, Relationships>,
    source: &PartUri,
) -> Result<&'a mut Relationships> {
    if !cache.contains_key(source) {
        let rels = match package.part(&source.relationships_uri()) {
            Some(part) => Relationships::from_xml(part.data())?,
            None => Relationships::new(),
        };
        cache.insert(source.clone(), rels);
    }
    cache
        .get_mut(source)
        .ok_or_else(|| Error::PartNotFound(source.relationships_uri().to_string()))
}
