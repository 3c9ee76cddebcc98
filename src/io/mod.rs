//! External endpoints: line-oriented text files, optionally globbed and gzip
//! compressed.

pub mod compression;
pub mod glob;
pub mod text;

pub use compression::Compression;
pub use text::{TextSink, TextSource, read_text, read_text_with};
