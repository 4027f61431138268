//! Buffered file reader
//!
//! Serves a file as a sequence of fixed-size chunks. Reads go through a
//! large read-ahead buffer (4 MiB by default) so small chunk sizes do not
//! turn into one syscall each; chunks at least as large as the buffer
//! bypass it and read straight into the caller's memory.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use dstream_core::{kdebug, StreamError, StreamResult, StreamSource};

use crate::config::FileConfig;

/// Oversized intermediate buffer in front of the file handle.
///
/// Allocated fallibly: an oversized request is a construction error,
/// not an abort.
struct ReadAhead {
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
}

impl ReadAhead {
    fn with_capacity(cap: usize) -> io::Result<Self> {
        let mut v: Vec<u8> = Vec::new();
        v.try_reserve_exact(cap)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        v.resize(cap, 0);
        Ok(Self {
            buf: v.into_boxed_slice(),
            pos: 0,
            filled: 0,
        })
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn discard(&mut self) {
        self.pos = 0;
        self.filled = 0;
    }

    /// One `read()`-style step: at most one underlying read, returns 0 only
    /// at end of file.
    fn read(&mut self, file: &mut File, dst: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.filled {
            if dst.len() >= self.capacity() {
                return file.read(dst);
            }
            self.filled = file.read(&mut self.buf)?;
            self.pos = 0;
        }
        let n = dst.len().min(self.filled - self.pos);
        dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Sequential fixed-size chunk reader over a local file.
pub struct FileReader {
    path: PathBuf,
    file: File,
    read_ahead: Option<ReadAhead>,
    chunk_size: usize,
    file_size: u64,
    chunk_count: u64,
    position: u64,
}

impl FileReader {
    /// Open `path` and position the cursor at byte 0.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> StreamResult<Self> {
        Self::with_config(&FileConfig::from_env(path, chunk_size))
    }

    /// Open a file reader from a full configuration.
    pub fn with_config(config: &FileConfig) -> StreamResult<Self> {
        config.validate()?;
        let path = config.path.clone();

        let file = File::open(&path).map_err(|e| {
            StreamError::resource(format!("failed to open file {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| StreamError::resource(format!("failed to stat {}", path.display()), e))?
            .len();

        let read_ahead = match config.read_ahead {
            0 => None,
            cap => Some(ReadAhead::with_capacity(cap).map_err(|e| {
                StreamError::resource(format!("failed to allocate {} byte read-ahead buffer", cap), e)
            })?),
        };

        let chunk_count = file_size.div_ceil(config.chunk_size as u64);

        let mut reader = Self {
            path,
            file,
            read_ahead,
            chunk_size: config.chunk_size,
            file_size,
            chunk_count,
            position: 0,
        };
        reader.jump_to(config.offset)?;

        kdebug!(
            "opened {} ({} bytes, {} chunks of {}, read-ahead {})",
            reader.path.display(),
            file_size,
            chunk_count,
            reader.chunk_size,
            config.read_ahead
        );
        Ok(reader)
    }

    /// Reposition the cursor to an absolute byte offset.
    ///
    /// Offsets past the end are allowed; subsequent reads return 0.
    pub fn jump_to(&mut self, offset: u64) -> StreamResult<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| StreamError::resource(format!("failed to seek to offset {}", offset), e))?;
        if let Some(ra) = self.read_ahead.as_mut() {
            ra.discard();
        }
        self.position = offset;
        Ok(())
    }

    /// File size in bytes, captured at open
    pub fn size(&self) -> u64 {
        self.file_size
    }

    /// `ceil(size / chunk_size)`
    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Path the reader was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current read offset
    pub fn position(&self) -> u64 {
        self.position
    }

    fn read_once(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        match self.read_ahead.as_mut() {
            Some(ra) => ra.read(&mut self.file, dst),
            None => self.file.read(dst),
        }
    }
}

impl StreamSource for FileReader {
    fn read_into(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let dst = &mut buf[..self.chunk_size];
        let mut done = 0;
        while done < dst.len() {
            match self.read_once(&mut dst[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::Read(e)),
            }
        }
        self.position += done as u64;
        Ok(done)
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn type_tag(&self) -> String {
        format!("file reader: {}", self.path.display())
    }
}
