//! Endnotes and footnotes: model, parsing, inline markup and patching

pub mod markup;
mod model;
mod parse;
pub(crate) mod patch;
pub(crate) mod write;

pub use markup::{find_urls, to_markup, translate};
pub use model::{coalesce, HyperlinkRef, Note, NoteKind, Run};
pub use parse::parse_notes;
pub use write::LinkFormat;
