// File- and stream-level helpers.
//
// `compress_file()` / `decompress_file()` wrap the adapters with buffered
// file I/O; `compress_stream()` / `decompress_stream()` do the same over any
// `Read`/`Write` pair (used by the CLI for stdin/stdout). With the `file-io`
// feature a SHA-256 of the uncompressed side is computed on the fly.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::config::{DecoderConfig, EncoderConfig};
use crate::error::Result;
use crate::stream::{XzReader, XzWriter};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `compress_file()` / `compress_stream()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressStats {
    /// Uncompressed bytes read.
    pub input_size: u64,
    /// Compressed bytes written.
    pub output_size: u64,
    /// SHA-256 of the uncompressed input (if `file-io` feature is enabled).
    pub input_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `decompress_file()` / `decompress_stream()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressStats {
    /// Compressed bytes consumed.
    pub input_size: u64,
    /// Decompressed bytes written.
    pub output_size: u64,
    /// SHA-256 of the decompressed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

/// How the output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Create or truncate.
    #[default]
    Create,
    /// Fail if the file already exists.
    CreateNew,
    /// Create or append. Appending `.xz` streams yields a concatenated stream.
    Append,
}

impl OutputMode {
    /// Open `path` for writing according to the mode.
    pub fn open(self, path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        match self {
            Self::Create => options.write(true).create(true).truncate(true),
            Self::CreateNew => options.write(true).create_new(true),
            Self::Append => options.append(true).create(true),
        };
        options.open(path)
    }
}

const BUF_SIZE: usize = 1024 * 1024; // 1 MiB

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Compress `input_path` into `output_path`.
pub fn compress_file(
    input_path: &Path,
    output_path: &Path,
    mode: OutputMode,
    config: &EncoderConfig,
) -> Result<CompressStats> {
    let input = File::open(input_path)?;
    let output = mode.open(output_path)?;
    let stats = compress_stream(input, BufWriter::with_capacity(BUF_SIZE, output), config)?;
    log::debug!(
        "compressed {} -> {}: {} -> {} bytes",
        input_path.display(),
        output_path.display(),
        stats.input_size,
        stats.output_size
    );
    Ok(stats)
}

/// Compress everything `reader` yields into `writer`.
pub fn compress_stream<R: Read, W: Write>(
    mut reader: R,
    writer: W,
    config: &EncoderConfig,
) -> Result<CompressStats> {
    let mut encoder = XzWriter::with_config(writer, config)?;

    #[cfg(feature = "file-io")]
    let mut hasher = sha2::Sha256::new();

    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        #[cfg(feature = "file-io")]
        hasher.update(&buf[..n]);
        encoder.write_all(&buf[..n])?;
    }

    encoder.try_finish()?;
    let input_size = encoder.total_in();
    let output_size = encoder.total_out();
    encoder.finish()?;

    #[cfg(feature = "file-io")]
    let input_sha256 = Some(hasher.finalize().into());
    #[cfg(not(feature = "file-io"))]
    let input_sha256: Option<[u8; 32]> = None;

    Ok(CompressStats {
        input_size,
        output_size,
        input_sha256,
    })
}

// ---------------------------------------------------------------------------
// Decompression
// ---------------------------------------------------------------------------

/// Decompress `input_path` into `output_path`.
pub fn decompress_file(
    input_path: &Path,
    output_path: &Path,
    mode: OutputMode,
    config: &DecoderConfig,
) -> Result<DecompressStats> {
    let input = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let output = mode.open(output_path)?;
    let stats = decompress_stream(input, output, config)?;
    log::debug!(
        "decompressed {} -> {}: {} -> {} bytes",
        input_path.display(),
        output_path.display(),
        stats.input_size,
        stats.output_size
    );
    Ok(stats)
}

/// Decompress everything `reader` yields into `writer`.
pub fn decompress_stream<R: Read, W: Write>(
    reader: R,
    writer: W,
    config: &DecoderConfig,
) -> Result<DecompressStats> {
    let mut decoder = XzReader::with_config(reader, config)?;
    let mut output = BufWriter::with_capacity(BUF_SIZE, writer);

    #[cfg(feature = "file-io")]
    let mut hasher = sha2::Sha256::new();

    let mut buf = vec![0u8; BUF_SIZE];

    #[cfg(feature = "file-io")]
    let output_size = {
        let mut hashing = HashingWriter {
            inner: &mut output,
            hasher: &mut hasher,
        };
        transfer(&mut decoder, &mut hashing, &mut buf)?
    };
    #[cfg(not(feature = "file-io"))]
    let output_size = transfer(&mut decoder, &mut output, &mut buf)?;

    output.flush()?;

    #[cfg(feature = "file-io")]
    let output_sha256 = Some(hasher.finalize().into());
    #[cfg(not(feature = "file-io"))]
    let output_sha256: Option<[u8; 32]> = None;

    Ok(DecompressStats {
        input_size: decoder.total_in(),
        output_size,
        output_sha256,
    })
}

fn transfer<R: Read, W: Write>(reader: &mut R, writer: &mut W, buf: &mut [u8]) -> io::Result<u64> {
    let mut total = 0u64;
    loop {
        let n = match reader.read(buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
