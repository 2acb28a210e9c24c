//! Part URI handling for OPC packages

use crate::error::{Error, Result};
use std::fmt;

/// Represents a URI to a part within an OPC package.
///
/// Part URIs are always absolute paths starting with '/'.
/// Example: `/word/endnotes.xml`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartUri {
    path: String,
}

impl PartUri {
    /// Create a new PartUri from a string.
    ///
    /// The path will be normalized (leading '/' ensured, no trailing '/').
    pub fn new(path: &str) -> Result<Self> {
        let path = path.trim();

        if path.is_empty() {
            return Err(Error::InvalidPartUri("empty path".into()));
        }

        let normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let normalized = normalized.trim_end_matches('/').to_string();

        if normalized.is_empty() || normalized.contains("//") {
            return Err(Error::InvalidPartUri(format!(
                "invalid path '{}': empty segment",
                path
            )));
        }

        Ok(Self { path: normalized })
    }

    /// Create PartUri without validation (for internal use)
    pub(crate) fn from_string_unchecked(path: String) -> Self {
        Self { path }
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Name of the matching ZIP entry (no leading '/')
    pub fn zip_name(&self) -> &str {
        &self.path[1..]
    }

    /// Get the file name portion
    pub fn file_name(&self) -> Option<&str> {
        self.path.rsplit('/').next()
    }

    /// Get the parent directory path ("" for parts at the package root)
    fn parent_path(&self) -> &str {
        match self.path.rfind('/') {
            Some(pos) => &self.path[..pos],
            None => "",
        }
    }

    /// Get the relationships URI for this part.
    ///
    /// For `/word/endnotes.xml`, returns `/word/_rels/endnotes.xml.rels`
    pub fn relationships_uri(&self) -> PartUri {
        let file_name = self.file_name().unwrap_or("");
        let rels_path = format!("{}/_rels/{}.rels", self.parent_path(), file_name);
        PartUri { path: rels_path }
    }
}

impl fmt::Display for PartUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl std::str::FromStr for PartUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PartUri::new(s)
    }
}

/// Well-known part URIs
pub mod well_known {
    use super::PartUri;

    pub fn content_types() -> PartUri {
        PartUri::from_string_unchecked("/[Content_Types].xml".into())
    }

    pub fn document() -> PartUri {
        PartUri::from_string_unchecked("/word/document.xml".into())
    }

    pub fn endnotes() -> PartUri {
        PartUri::from_string_unchecked("/word/endnotes.xml".into())
    }

    pub fn footnotes() -> PartUri {
        PartUri::from_string_unchecked("/word/footnotes.xml".into())
    }

    pub fn styles() -> PartUri {
        PartUri::from_string_unchecked("/word/styles.xml".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_without_leading_slash() {
        let uri = PartUri::new("word/endnotes.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/endnotes.xml");
        assert_eq!(uri.zip_name(), "word/endnotes.xml");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(PartUri::new("  ").is_err());
        assert!(PartUri::new("/").is_err());
        assert!(PartUri::new("word//x.xml").is_err());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(well_known::footnotes().file_name(), Some("footnotes.xml"));
        assert_eq!(well_known::content_types().file_name(), Some("[Content_Types].xml"));
    }

    #[test]
    fn test_relationships_uri() {
        assert_eq!(
            well_known::endnotes().relationships_uri().as_str(),
            "/word/_rels/endnotes.xml.rels"
        );
        assert_eq!(
            PartUri::new("/root.xml").unwrap().relationships_uri().as_str(),
            "/_rels/root.xml.rels"
        );
    }
}
