//! Part representation for OPC packages

use crate::opc::PartUri;

/// A part within an OPC package
#[derive(Clone, Debug)]
pub struct Part {
    /// Part URI
    uri: PartUri,
    /// Part data (uncompressed)
    data: Vec<u8>,
    /// Whether this part has been modified since it was read
    modified: bool,
}

impl Part {
    /// Create a new part
    pub fn new(uri: PartUri, data: Vec<u8>) -> Self {
        Self {
            uri,
            data,
            modified: false,
        }
    }

    /// Get the part URI
    pub fn uri(&self) -> &PartUri {
        &self.uri
    }

    /// Get the raw data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the data and mark the part modified
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.modified = true;
    }

    /// Check if the part has been modified
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}
