// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    Result,
    StateError,
    ValidationError,
};

/// The capability a file handle was opened with. Files are always seekable;
/// read and write follow the open mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    #[must_use]
    pub fn readable(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    #[must_use]
    pub fn writable(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::ReadWrite => "r+",
        }
    }
}

/// The byte-sequence handle underneath a [`Stream`].
///
/// A handle is owned by exactly one stream until [`Stream::detach`]
/// transfers that ownership back out.
#[derive(Debug)]
pub enum Handle {
    Buffer(Cursor<Vec<u8>>),
    File { file: fs::File, mode: OpenMode },
}

impl Handle {
    fn position(&mut self) -> io::Result<u64> {
        match self {
            Self::Buffer(cursor) => Ok(cursor.position()),
            Self::File { file, .. } => file.stream_position(),
        }
    }

    fn len(&self) -> io::Result<u64> {
        match self {
            Self::Buffer(cursor) => Ok(cursor.get_ref().len() as u64),
            Self::File { file, .. } => Ok(file.metadata()?.len()),
        }
    }
}

impl Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Buffer(cursor) => cursor.read(buf),
            Self::File { file, .. } => file.read(buf),
        }
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Buffer(cursor) => cursor.write(buf),
            Self::File { file, .. } => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Buffer(cursor) => cursor.flush(),
            Self::File { file, .. } => file.flush(),
        }
    }
}

impl Seek for Handle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Buffer(cursor) => cursor.seek(pos),
            Self::File { file, .. } => file.seek(pos),
        }
    }
}

/// A snapshot of the descriptive properties of an attached stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamMetadata {
    pub mode: &'static str,
    pub seekable: bool,
    pub stream_type: &'static str,
}

#[derive(Debug)]
struct Inner {
    handle: Option<Handle>,
    size: Option<u64>,
    seekable: bool,
    readable: bool,
    writable: bool,
}

/// A byte stream with an explicit `attached` → `detached` lifecycle.
///
/// Cloning is cheap and yields the *same* logical stream: all clones view
/// one handle, one cursor, one lifecycle state. Capability flags are fixed
/// when the handle is attached and forced to `false`, permanently, by
/// [`Stream::detach`] or [`Stream::close`].
///
/// The interior mutex only provides interior mutability for the handle;
/// values are used single-threaded and the lock is never contended.
#[derive(Clone, Debug)]
pub struct Stream {
    inner: Arc<Mutex<Inner>>,
}

impl Stream {
    /// A fully capable in-memory stream pre-populated with `content`, with
    /// the cursor at position 0.
    #[must_use]
    pub fn create(content: impl Into<Vec<u8>>) -> Stream {
        let content = content.into();
        let size = content.len() as u64;

        Stream {
            inner: Arc::new(Mutex::new(Inner {
                handle: Some(Handle::Buffer(Cursor::new(content))),
                size: Some(size),
                seekable: true,
                readable: true,
                writable: true,
            })),
        }
    }

    /// Wrap an already-opened handle. Capabilities derive from the handle
    /// kind and its open mode.
    #[must_use]
    pub fn from_handle(handle: Handle) -> Stream {
        let (seekable, readable, writable) = match &handle {
            Handle::Buffer(_) => (true, true, true),
            Handle::File { mode, .. } => (true, mode.readable(), mode.writable()),
        };

        Stream {
            inner: Arc::new(Mutex::new(Inner {
                handle: Some(handle),
                size: None,
                seekable,
                readable,
                writable,
            })),
        }
    }

    /// Open `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Stream> {
        let file = fs::File::open(path)?;
        Ok(Stream::from_handle(Handle::File { file, mode: OpenMode::Read }))
    }

    /// Create (or truncate) `path` and open it write-only.
    pub fn create_file(path: impl AsRef<Path>) -> Result<Stream> {
        let file = fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        Ok(Stream::from_handle(Handle::File { file, mode: OpenMode::Write }))
    }

    /// Whether two `Stream` values view the same underlying instance.
    #[must_use]
    pub fn same_instance(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[must_use]
    pub fn is_seekable(&self) -> bool {
        self.lock().seekable
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.lock().readable
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.lock().writable
    }

    /// Read up to `length` bytes from the current cursor; fewer only at the
    /// end of the data. Zero-length reads are a contract violation.
    pub fn read(&self, length: usize) -> Result<Vec<u8>> {
        if length == 0 {
            return Err(ValidationError::ZeroReadLength.into());
        }

        let mut inner = self.lock();
        let readable = inner.readable;
        let handle = match inner.handle.as_mut() {
            Some(handle) => handle,
            None => return Err(StateError::StreamDetached.into()),
        };

        if !readable {
            return Err(StateError::StreamNotReadable.into());
        }

        let mut buffer = vec![0u8; length];
        let count = handle.read(&mut buffer)?;
        buffer.truncate(count);

        Ok(buffer)
    }

    /// Write `data` at the current cursor, returning the number of bytes
    /// accepted. Invalidates the cached size.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut inner = self.lock();
        let writable = inner.writable;
        let handle = match inner.handle.as_mut() {
            Some(handle) => handle,
            None => return Err(StateError::StreamDetached.into()),
        };

        if !writable {
            return Err(StateError::StreamNotWritable.into());
        }

        let count = handle.write(data)?;
        inner.size = None;

        Ok(count)
    }

    /// Reposition the cursor. Invalidates the cached size.
    pub fn seek(&self, pos: SeekFrom) -> Result<()> {
        let mut inner = self.lock();
        let seekable = inner.seekable;
        let handle = match inner.handle.as_mut() {
            Some(handle) => handle,
            None => return Err(StateError::StreamDetached.into()),
        };

        if !seekable {
            return Err(StateError::StreamNotSeekable.into());
        }

        handle.seek(pos)?;
        inner.size = None;

        Ok(())
    }

    pub fn rewind(&self) -> Result<()> {
        self.seek(SeekFrom::Start(0))
    }

    /// The current cursor position.
    pub fn tell(&self) -> Result<u64> {
        let mut inner = self.lock();
        match inner.handle.as_mut() {
            Some(handle) => Ok(handle.position()?),
            None => Err(StateError::StreamDetached.into()),
        }
    }

    /// True when detached, or when the cursor sits at or past the end of
    /// the data.
    #[must_use]
    pub fn eof(&self) -> bool {
        let mut inner = self.lock();
        match inner.handle.as_mut() {
            None => true,
            Some(handle) => match (handle.position(), handle.len()) {
                (Ok(position), Ok(length)) => position >= length,
                _ => false,
            },
        }
    }

    /// The total size of the underlying data, cached until the next write
    /// or seek. `None` once detached or when the size cannot be determined.
    #[must_use]
    pub fn get_size(&self) -> Option<u64> {
        let mut inner = self.lock();

        if let Some(size) = inner.size {
            return Some(size);
        }

        let size = inner.handle.as_ref()?.len().ok();
        inner.size = size;
        size
    }

    /// Everything from the current cursor to the end of the data, without
    /// rewinding first.
    pub fn get_contents(&self) -> Result<Vec<u8>> {
        let mut inner = self.lock();
        let readable = inner.readable;
        let handle = match inner.handle.as_mut() {
            Some(handle) => handle,
            None => return Err(StateError::StreamDetached.into()),
        };

        if !readable {
            return Err(StateError::StreamNotReadable.into());
        }

        let mut contents = Vec::new();
        handle.read_to_end(&mut contents)?;

        Ok(contents)
    }

    /// Descriptive properties of the attached handle; `None` once detached.
    #[must_use]
    pub fn metadata(&self) -> Option<StreamMetadata> {
        let inner = self.lock();
        let handle = inner.handle.as_ref()?;

        Some(match handle {
            Handle::Buffer(_) => StreamMetadata {
                mode: "w+b",
                seekable: inner.seekable,
                stream_type: "memory",
            },
            Handle::File { mode, .. } => StreamMetadata {
                mode: mode.as_str(),
                seekable: inner.seekable,
                stream_type: "file",
            },
        })
    }

    /// Transfer the handle's ownership back to the caller and enter the
    /// terminal detached state. A second call returns `None`.
    pub fn detach(&self) -> Option<Handle> {
        let mut inner = self.lock();
        inner.size = None;
        inner.seekable = false;
        inner.readable = false;
        inner.writable = false;
        inner.handle.take()
    }

    /// Detach and drop the handle. Safe to call repeatedly.
    pub fn close(&self) {
        drop(self.detach());
    }
}

/// Best-effort string conversion: rewinds when seekable, reads everything,
/// and renders nothing at all on any failure. Never errors.
impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inner = self.lock();
        let seekable = inner.seekable;
        let handle = match inner.handle.as_mut() {
            Some(handle) => handle,
            None => return Ok(()),
        };

        if seekable {
            let _ = handle.seek(SeekFrom::Start(0));
        }

        let mut contents = Vec::new();
        if handle.read_to_end(&mut contents).is_err() {
            return Ok(());
        }

        f.write_str(&String::from_utf8_lossy(&contents))
    }
}
