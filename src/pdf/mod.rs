//! PDF manipulation module

pub mod body;
pub mod form;
pub(crate) mod import;
pub mod metadata;
pub mod overlay;
pub(crate) mod page;
pub mod source;

// Re-export commonly used items
pub use body::{BodyStyle, ParagraphRenderer};
pub use form::FormField;
pub use metadata::{extract_metadata, extract_metadata_from_bytes, PdfMetadata};
pub use overlay::{OverlayPlacement, OverlayTemplate};
pub use source::{DocumentSource, PageHandle, PageSource, SourcePages};
