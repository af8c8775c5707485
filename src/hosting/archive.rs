// Tar archive written through a gzip encoder at maximum compression.
//
// The builder and the encoder both write their trailers when dropped, so
// an `ArchiveWriter` abandoned after a failed `write_entry` still leaves
// a complete gzip stream behind. Callers that succeed use
// `ArchiveWriter::finish` to get errors from the trailers too.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, BufWriter, Read, Write};
use tar::{EntryType, Header};

/// One file inside an archive.
#[derive(Debug)]
pub struct ArchiveEntry<R> {
    /// Slash-separated path relative to the archive root.
    pub path: String,
    /// Exact number of bytes `content` yields.
    pub size: u64,
    /// Permission bits.
    pub mode: u32,
    /// Seconds since the Unix epoch.
    pub mtime: u64,
    pub content: R,
}

/// Writes entries one after another. Once a `write_entry` fails after
/// its header reached the stream, the archive holds a broken entry and
/// the writer refuses further entries and `finish`.
pub struct ArchiveWriter<W: Write> {
    builder: tar::Builder<GzEncoder<BufWriter<W>>>,
    entries: usize,
    failed: bool,
}

impl<W: Write> ArchiveWriter<W> {
    /// Start a new archive on `sink`.
    pub fn open(sink: W) -> Self {
        let encoder = GzEncoder::new(BufWriter::new(sink), Compression::best());
        ArchiveWriter {
            builder: tar::Builder::new(encoder),
            entries: 0,
            failed: false,
        }
    }

    /// Entries written so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Append a header for `entry` followed by exactly `entry.size` bytes
    /// of its content. Entries are written in call order and repeated
    /// paths are written again.
    ///
    /// Content that ends early fails with `UnexpectedEof` and content that
    /// runs past `size` fails with `InvalidData`, in both cases before the
    /// entry is complete. A malformed path fails with `InvalidInput`
    /// before anything is written and leaves the writer usable.
    pub fn write_entry<R: Read>(&mut self, entry: ArchiveEntry<R>) -> io::Result<()> {
        self.check_usable()?;
        validate_path(&entry.path)?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(entry.size);
        header.set_mode(entry.mode);
        header.set_mtime(entry.mtime);

        let mut content = SizedReader {
            inner: entry.content,
            remaining: entry.size,
            path: &entry.path,
        };
        if let Err(e) = self
            .builder
            .append_data(&mut header, &entry.path, &mut content)
        {
            self.failed = true;
            return Err(e);
        }

        self.entries += 1;
        Ok(())
    }

    /// Write the tar and gzip trailers, flush, and hand back the sink.
    pub fn finish(self) -> io::Result<W> {
        self.check_usable()?;
        let encoder = self.builder.into_inner()?;
        let buffered = encoder.finish()?;
        buffered.into_inner().map_err(|e| e.into_error())
    }

    fn check_usable(&self) -> io::Result<()> {
        if self.failed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "archive holds a partially written entry",
            ));
        }
        Ok(())
    }
}

fn validate_path(path: &str) -> io::Result<()> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|c| c.is_empty() || c == "." || c == "..");
    if bad {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid archive path {:?}", path),
        ));
    }
    Ok(())
}

/// Yields exactly `remaining` bytes of `inner`. An early end is an error,
/// and so is a byte past the end, checked before the last chunk is handed
/// out so an oversized entry never completes.
struct SizedReader<'a, R> {
    inner: R,
    remaining: u64,
    path: &'a str,
}

impl<R: Read> SizedReader<'_, R> {
    fn check_end(&mut self) -> io::Result<()> {
        let mut extra = [0u8; 1];
        loop {
            match self.inner.read(&mut extra) {
                Ok(0) => return Ok(()),
                Ok(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("{} is larger than its recorded size", self.path),
                    ))
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for SizedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remaining == 0 {
            self.check_end()?;
            return Ok(0);
        }
        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} ended {} bytes short", self.path, self.remaining),
            ));
        }
        self.remaining -= n as u64;
        if self.remaining == 0 {
            self.check_end()?;
        }
        Ok(n)
    }
}
