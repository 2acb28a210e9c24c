//! # citefix-docx
//!
//! In-place surgery on the endnotes and footnotes of DOCX files.
//!
//! ## Features
//!
//! - Read notes as runs, plain text or inline markup
//! - Replace a note's content from `<i>`/`<b>`/URL markup, touching no
//!   other byte of the package
//! - Keep existing hyperlinks and their relationships when a note is rewritten
//! - Turn bare URLs into live hyperlinks across the document
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use citefix_docx::{Document, NoteKind};
//!
//! let mut doc = Document::open("thesis.docx")?;
//!
//! for note in doc.notes()? {
//!     println!("{} {}: {}", note.kind, note.id, note.text());
//! }
//!
//! doc.set_note(NoteKind::Endnote, 3, "Smith, <i>The Book</i> (2001), https://example.com/book.")?;
//! doc.activate_links()?;
//! doc.save_as("thesis.docx")?;
//! ```

pub mod activate;
pub mod document;
pub mod error;
pub mod note;
pub mod opc;
pub mod options;
pub mod store;
pub mod xml;

pub use activate::{ActivationReport, PartActivation};
pub use document::{Document, NoteEdit, NoteOutcome, PatchReport};
pub use error::{Error, Result};
pub use note::{HyperlinkRef, LinkFormat, Note, NoteKind, Run};
pub use opc::{Package, Part, PartUri};
pub use options::{EngineOptions, LinkEncoding};
pub use store::DocumentStore;
