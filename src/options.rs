//! Engine configuration

use crate::opc::{well_known, PartUri};

/// How new hyperlinks are encoded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkEncoding {
    /// `w:hyperlink r:id` backed by a relationship, falling back to field
    /// codes only where the part does not bind the `r` prefix
    #[default]
    PreferRelationship,
    /// Always `HYPERLINK` field codes
    FieldCode,
}

/// Options controlling how notes are patched and links activated
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Character style applied to hyperlink runs when `styles.xml` defines it
    pub hyperlink_style: String,
    pub link_encoding: LinkEncoding,
    /// Parts scanned by `Document::activate_links`
    pub activate_parts: Vec<PartUri>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            hyperlink_style: "Hyperlink".to_string(),
            link_encoding: LinkEncoding::default(),
            activate_parts: vec![
                well_known::document(),
                well_known::footnotes(),
                well_known::endnotes(),
            ],
        }
    }
}

impl EngineOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hyperlink character style ID
    pub fn with_hyperlink_style(mut self, style: impl Into<String>) -> Self {
        self.hyperlink_style = style.into();
        self
    }

    /// Set the hyperlink encoding
    pub fn with_link_encoding(mut self, encoding: LinkEncoding) -> Self {
        self.link_encoding = encoding;
        self
    }

    /// Set the parts scanned for bare URLs
    pub fn with_activate_parts(mut self, parts: Vec<PartUri>) -> Self {
        self.activate_parts = parts;
        self
    }
}
