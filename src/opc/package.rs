//! OPC Package implementation
//!
//! Reads a DOCX archive into memory part by part and writes it back. Entry
//! order and the bytes of every untouched part survive a round trip.

use crate::error::{Error, Result};
use crate::opc::{well_known, ContentTypes, Part, PartUri};
use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::read::ZipArchive;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Largest up-front buffer reserved for one entry
const MAX_SIZE_HINT: u64 = 1 << 20;

/// An OPC package (ZIP-based container for DOCX)
#[derive(Debug, Default)]
pub struct Package {
    /// Parts in archive order
    parts: Vec<Part>,
    /// Index into `parts` by URI
    index: HashMap<PartUri, usize>,
}

impl Package {
    /// Create a new empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a package from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Open a package from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Open a package from a reader.
    ///
    /// Any failure to read the central directory or to inflate an entry
    /// (including a CRC mismatch) is reported as [`Error::CorruptArchive`].
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::CorruptArchive(e.to_string()))?;
        let mut package = Self::new();

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::CorruptArchive(e.to_string()))?;

            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            let uri = PartUri::new(&name)
                .map_err(|_| Error::CorruptArchive(format!("invalid entry name '{}'", name)))?;
            if package.contains(&uri) {
                return Err(Error::CorruptArchive(format!("duplicate entry '{}'", name)));
            }

            // Declared sizes are untrusted until the CRC has been checked
            let mut data = Vec::with_capacity(file.size().min(MAX_SIZE_HINT) as usize);
            // read_to_end verifies the CRC once the entry is fully inflated
            file.read_to_end(&mut data)
                .map_err(|e| Error::CorruptArchive(format!("{}: {}", name, e)))?;

            package.push_part(Part::new(uri, data));
        }

        debug!("Read package with {} parts", package.parts.len());
        Ok(package)
    }

    /// Save the package to a file.
    ///
    /// The archive is written to a temporary file next to `path` and renamed
    /// over it, so the destination never holds a half-written archive.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        self.write_to(temp.as_file_mut())?;
        temp.as_file_mut().flush()?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        info!("Saved package ({} parts) to {}", self.parts.len(), path.display());
        Ok(())
    }

    /// Save the package to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write the package to a writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options: FileOptions<()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            zip.start_file(part.uri().zip_name(), options)?;
            zip.write_all(part.data())?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Get a part by URI
    pub fn part(&self, uri: &PartUri) -> Option<&Part> {
        self.index.get(uri).map(|&i| &self.parts[i])
    }

    /// Get a mutable part by URI
    pub fn part_mut(&mut self, uri: &PartUri) -> Option<&mut Part> {
        let i = *self.index.get(uri)?;
        Some(&mut self.parts[i])
    }

    /// Check whether a part exists
    pub fn contains(&self, uri: &PartUri) -> bool {
        self.index.contains_key(uri)
    }

    /// Replace the data of a part, appending a new part if it does not exist
    pub fn set_part_data(&mut self, uri: &PartUri, data: Vec<u8>) {
        match self.part_mut(uri) {
            Some(part) => part.set_data(data),
            None => {
                debug!("Adding new part {}", uri);
                let mut part = Part::new(uri.clone(), Vec::new());
                part.set_data(data);
                self.push_part(part);
            }
        }
    }

    /// Make sure `[Content_Types].xml` maps the `rels` extension.
    ///
    /// Only rewrites the content types part when the mapping is missing.
    pub fn ensure_rels_content_type(&mut self) -> Result<()> {
        let uri = well_known::content_types();
        let Some(part) = self.part(&uri) else {
            return Err(Error::PartNotFound(uri.to_string()));
        };

        let mut ct = ContentTypes::from_xml(part.data())?;
        if ct.has_default("rels") {
            return Ok(());
        }

        debug!("Registering rels content type in {}", uri);
        ct.add_default("rels", crate::opc::RELATIONSHIPS);
        let xml = ct.to_xml()?;
        self.set_part_data(&uri, xml);
        Ok(())
    }

    /// Get all part URIs in archive order
    pub fn part_uris(&self) -> impl Iterator<Item = &PartUri> {
        self.parts.iter().map(|p| p.uri())
    }

    /// Get all parts in archive order
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    /// Append a part whose URI is not in the package yet
    fn push_part(&mut self, part: Part) {
        self.index.insert(part.uri().clone(), self.parts.len());
        self.parts.push(part);
    }
}
