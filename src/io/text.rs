//! Line-oriented text source and sink.
//!
//! The source yields one `String` per line (trailing `\n` or `\r\n` removed)
//! across every file its pattern matches, in sorted path order. Bytes that are
//! not valid UTF-8 are replaced with U+FFFD rather than failing the read. The sink
//! writes one line per element to a single file, creating parent directories
//! as needed and truncating any previous contents.
//!
//! ```no_run
//! use beamlet::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let p = Pipeline::new();
//! let lines = read_text(&p, "read", "data/*.txt")?;
//! lines
//!     .map("upper", |l: &String| l.to_uppercase())?
//!     .write_text("write", "out/upper.txt")?;
//! p.run()?;
//! # Ok(())
//! # }
//! ```

use super::compression::{Compression, open_reader, write_lines};
use super::glob::{display_paths, expand_pattern};
use crate::collection::PCollection;
use crate::error::{PipelineError, Result};
use crate::node::{ExecContext, NodeKind, SinkOp, SourceOp};
use crate::pipeline::Pipeline;
use crate::type_token::{Partition, downcast_vec};
use std::fs;
use std::io::BufRead;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Where a text source reads from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSource {
    /// A file path or a glob pattern.
    pub pattern: String,
    pub compression: Compression,
}

impl TextSource {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            compression: Compression::Auto,
        }
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Read every line of every matching file.
    ///
    /// # Errors
    /// `SourceNotFound` if the pattern matches nothing or a file cannot be read.
    pub fn read_lines(&self) -> Result<Vec<String>> {
        let paths = expand_pattern(&self.pattern)?;
        debug!(files = %display_paths(&paths), "reading text source");
        let mut lines = Vec::new();
        for path in &paths {
            read_file(path, self.compression, &mut lines)?;
        }
        Ok(lines)
    }
}

fn read_file(path: &Path, compression: Compression, out: &mut Vec<String>) -> Result<()> {
    let unreadable = |source| PipelineError::SourceNotFound {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = open_reader(path, compression).map_err(unreadable)?;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(unreadable)? == 0 {
            return Ok(());
        }
        out.push(decode_line(&buf));
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8 with U+FFFD.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

impl SourceOp for TextSource {
    fn read(&self, _ctx: &ExecContext<'_>) -> Result<Partition> {
        Ok(Arc::new(self.read_lines()?) as Partition)
    }
}

/// Where a text sink writes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSink {
    pub path: PathBuf,
    pub compression: Compression,
}

impl TextSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compression: Compression::Auto,
        }
    }

    /// Write `lines` to the sink's file, replacing its contents.
    ///
    /// # Errors
    /// `SinkWrite` if the directory or file cannot be created or written.
    pub fn write_lines(&self, lines: &[String]) -> Result<()> {
        let failed = |source| PipelineError::SinkWrite {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(failed)?;
        }
        write_lines(&self.path, self.compression, lines).map_err(failed)?;
        debug!(path = %self.path.display(), lines = lines.len(), "wrote text sink");
        Ok(())
    }
}

impl SinkOp for TextSink {
    fn consume(&self, input: &Partition, ctx: &ExecContext<'_>) -> Result<()> {
        self.write_lines(downcast_vec::<String>(input, ctx.transform())?)
    }
}

/// Add a source node reading lines from `pattern` (a path or glob).
///
/// Nothing is read until the pipeline runs; every run re-reads the files.
///
/// # Errors
/// `DuplicateName` if `name` is already used.
pub fn read_text(p: &Pipeline, name: &str, pattern: impl Into<String>) -> Result<PCollection<String>> {
    read_text_with(p, name, TextSource::new(pattern))
}

/// Like [`read_text`] with explicit source settings.
///
/// # Errors
/// `DuplicateName` if `name` is already used.
pub fn read_text_with(p: &Pipeline, name: &str, source: TextSource) -> Result<PCollection<String>> {
    let id = p.insert_node::<String>(name, Vec::new(), NodeKind::Source(Arc::new(source)))?;
    Ok(PCollection {
        pipeline: p.clone(),
        id,
        _t: PhantomData,
    })
}

impl PCollection<String> {
    /// Write each element as one line of the file at `path` when the pipeline runs.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn write_text(&self, name: &str, path: impl Into<PathBuf>) -> Result<()> {
        self.write_text_with(name, TextSink::new(path))
    }

    /// Like [`write_text`](Self::write_text) with explicit sink settings.
    ///
    /// # Errors
    /// `DuplicateName` if `name` is already used.
    pub fn write_text_with(&self, name: &str, sink: TextSink) -> Result<()> {
        self.pipeline
            .insert_terminal(name, vec![self.id], NodeKind::Sink(Arc::new(sink)))?;
        Ok(())
    }
}
