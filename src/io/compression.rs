//! Transparent compression for text endpoints.
//!
//! [`Compression::Auto`] looks at the file extension first (`.gz`, `.gzip`) and,
//! for readers only, falls back to the gzip magic bytes. Gzip support lives
//! behind the `compression-gzip` feature (on by default, via `flate2`); asking
//! for it with the feature disabled yields an `Unsupported` I/O error.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const GZIP_EXTENSIONS: &[&str] = &[".gz", ".gzip"];
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// How a text endpoint's bytes are encoded on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    /// Gzip for `.gz`/`.gzip` paths (or gzip magic bytes when reading), plain otherwise.
    #[default]
    Auto,
    Uncompressed,
    Gzip,
}

impl Compression {
    /// Resolve `Auto` from the path's extension alone.
    pub fn for_path(self, path: &Path) -> Self {
        match self {
            Self::Auto => {
                let lower = path.to_string_lossy().to_lowercase();
                if GZIP_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                    Self::Gzip
                } else {
                    Self::Uncompressed
                }
            }
            other => other,
        }
    }
}

/// Open `path` for line-wise reading, decompressing as `compression` says.
pub(crate) fn open_reader(path: &Path, compression: Compression) -> io::Result<Box<dyn BufRead>> {
    let mut reader = BufReader::new(File::open(path)?);
    let resolved = match compression.for_path(path) {
        Compression::Uncompressed if compression == Compression::Auto => {
            if reader.fill_buf()?.starts_with(GZIP_MAGIC) {
                Compression::Gzip
            } else {
                Compression::Uncompressed
            }
        }
        other => other,
    };
    match resolved {
        Compression::Gzip => gzip_reader(reader),
        _ => Ok(Box::new(reader)),
    }
}

/// Create or truncate `path` and write one line per element.
pub(crate) fn write_lines(path: &Path, compression: Compression, lines: &[String]) -> io::Result<()> {
    let file = BufWriter::new(File::create(path)?);
    match compression.for_path(path) {
        Compression::Gzip => write_gzip(file, lines),
        _ => {
            let mut w = file;
            write_all_lines(&mut w, lines)?;
            w.flush()
        }
    }
}

fn write_all_lines<W: Write>(w: &mut W, lines: &[String]) -> io::Result<()> {
    for line in lines {
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(feature = "compression-gzip")]
fn gzip_reader(reader: BufReader<File>) -> io::Result<Box<dyn BufRead>> {
    use flate2::bufread::MultiGzDecoder;
    Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
}

#[cfg(not(feature = "compression-gzip"))]
fn gzip_reader(_reader: BufReader<File>) -> io::Result<Box<dyn BufRead>> {
    Err(gzip_disabled())
}

#[cfg(feature = "compression-gzip")]
fn write_gzip(file: BufWriter<File>, lines: &[String]) -> io::Result<()> {
    use flate2::write::GzEncoder;
    let mut enc = GzEncoder::new(file, flate2::Compression::default());
    write_all_lines(&mut enc, lines)?;
    enc.finish()?.flush()
}

#[cfg(not(feature = "compression-gzip"))]
fn write_gzip(_file: BufWriter<File>, _lines: &[String]) -> io::Result<()> {
    Err(gzip_disabled())
}

#[cfg(not(feature = "compression-gzip"))]
fn gzip_disabled() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "gzip support requires the `compression-gzip` feature",
    )
}
