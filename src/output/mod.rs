//! Output module: composition of redacted spans into a new document

pub mod composer;
pub mod compression;
pub mod font_registry;

pub use composer::{encode_win_ansi, PageComposer};
pub use compression::{content_stream, deflate};
pub use font_registry::{is_standard_font, normalize_font_name, FontRegistry, UnknownFont, STANDARD_FONTS};
