// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::{
    Result,
    StateError,
    Stream,
    ValidationError,
};

/// The outcome code attached to an upload descriptor: the success sentinel
/// or one of the fixed failure set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, strum_macros::AsRefStr)]
pub enum UploadError {
    #[default]
    Ok,
    /// The upload exceeded the server-side size limit.
    IniSize,
    /// The upload exceeded the size limit declared by the submitting form.
    FormSize,
    /// Only part of the file arrived.
    Partial,
    /// No file was submitted for this field.
    NoFile,
    /// No scratch directory was available to receive the file.
    NoTmpDir,
    /// Writing the received file to disk failed.
    CantWrite,
    /// An extension interrupted the upload.
    Extension,
}

impl UploadError {
    /// The conventional numeric code for this outcome.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::IniSize => 1,
            Self::FormSize => 2,
            Self::Partial => 3,
            Self::NoFile => 4,
            Self::NoTmpDir => 6,
            Self::CantWrite => 7,
            Self::Extension => 8,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<UploadError> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::IniSize),
            2 => Some(Self::FormSize),
            3 => Some(Self::Partial),
            4 => Some(Self::NoFile),
            6 => Some(Self::NoTmpDir),
            7 => Some(Self::CantWrite),
            8 => Some(Self::Extension),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// One uploaded file, backed by either a live stream or a filesystem path.
///
/// The backing is fixed at construction and dropped entirely when the error
/// code is a failure. Moving the file is one-shot: after a successful
/// [`UploadedFile::move_to`], both the stream and further moves are
/// permanently refused. Client-supplied filename and media type are
/// untrusted request data and are never validated here.
#[derive(Debug)]
pub struct UploadedFile {
    stream: Option<Stream>,
    file: Option<PathBuf>,
    size: Option<u64>,
    error: UploadError,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    moved: AtomicBool,
    /// Stream lazily opened from `file`, cached across accesses.
    opened: OnceCell<Stream>,
}

const MOVE_CHUNK_SIZE: usize = 8192;

impl UploadedFile {
    #[must_use]
    pub fn from_stream(
        stream: Stream,
        size: Option<u64>,
        error: UploadError,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> UploadedFile {
        UploadedFile {
            stream: error.is_ok().then_some(stream),
            file: None,
            size,
            error,
            client_filename,
            client_media_type,
            moved: AtomicBool::new(false),
            opened: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_path(
        path: impl Into<PathBuf>,
        size: Option<u64>,
        error: UploadError,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> UploadedFile {
        UploadedFile {
            stream: None,
            file: error.is_ok().then(|| path.into()),
            size,
            error,
            client_filename,
            client_media_type,
            moved: AtomicBool::new(false),
            opened: OnceCell::new(),
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.error.is_ok() {
            return Err(StateError::UploadFailed.into());
        }

        if self.moved.load(Ordering::SeqCst) {
            return Err(StateError::UploadAlreadyMoved.into());
        }

        Ok(())
    }

    /// The upload's byte stream: the owned one when present, otherwise the
    /// backing path opened read-only (and cached).
    pub fn stream(&self) -> Result<Stream> {
        self.ensure_active()?;

        if let Some(stream) = &self.stream {
            return Ok(stream.clone());
        }

        if let Some(path) = &self.file {
            let stream = self.opened.get_or_try_init(|| Stream::open(path))?;
            return Ok(stream.clone());
        }

        Err(StateError::UploadUnavailable.into())
    }

    /// Move the upload to `target`. A backing path is renamed directly;
    /// otherwise the stream's full contents are copied in fixed-size
    /// chunks. Success marks the upload moved, permanently.
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<()> {
        self.ensure_active()?;

        let target = target.as_ref();
        if target.as_os_str().is_empty() {
            return Err(ValidationError::EmptyMoveTarget.into());
        }

        if let Some(path) = &self.file {
            if let Err(error) = fs::rename(path, target) {
                warn!(source = %path.display(), target = %target.display(), "failed to move uploaded file");
                return Err(error.into());
            }
        } else {
            let stream = self.stream()?;
            let sink = Stream::create_file(target)?;

            if stream.is_seekable() {
                stream.rewind()?;
            }

            while !stream.eof() {
                let chunk = stream.read(MOVE_CHUNK_SIZE)?;
                if chunk.is_empty() {
                    break;
                }
                sink.write(&chunk)?;
            }

            sink.close();
        }

        self.moved.store(true, Ordering::SeqCst);
        debug!(target = %target.display(), "moved uploaded file");

        Ok(())
    }

    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    #[must_use]
    pub fn error(&self) -> UploadError {
        self.error
    }

    #[must_use]
    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    #[must_use]
    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    use std::io::Write as _;

    fn stream_upload(content: &str) -> UploadedFile {
        UploadedFile::from_stream(
            Stream::create(content),
            Some(content.len() as u64),
            UploadError::Ok,
            Some("upload.txt".to_string()),
            Some("text/plain".to_string()),
        )
    }

    #[test]
    fn test_construct_from_stream() {
        let upload = stream_upload("contents");

        assert_eq!(upload.size(), Some(8));
        assert_eq!(upload.error(), UploadError::Ok);
        assert_eq!(upload.client_filename(), Some("upload.txt"));
        assert_eq!(upload.client_media_type(), Some("text/plain"));
        assert_eq!(upload.stream().unwrap().to_string(), "contents");
    }

    #[test]
    fn test_metadata_may_be_absent() {
        let upload = UploadedFile::from_stream(Stream::create(""), None, UploadError::Ok, None, None);

        assert_eq!(upload.size(), None);
        assert_eq!(upload.client_filename(), None);
        assert_eq!(upload.client_media_type(), None);
    }

    #[test]
    fn test_construct_from_path_opens_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        fs::File::create(&path).unwrap().write_all(b"from disk").unwrap();

        let upload = UploadedFile::from_path(&path, Some(9), UploadError::Ok, None, None);

        let first = upload.stream().unwrap();
        let second = upload.stream().unwrap();
        assert!(first.same_instance(&second));
        assert_eq!(first.get_contents().unwrap(), b"from disk");
    }

    #[test]
    fn test_stream_refused_on_error_code() {
        let upload = UploadedFile::from_stream(Stream::create("x"), None, UploadError::Partial, None, None);

        assert!(matches!(upload.stream(), Err(Error::State(StateError::UploadFailed))));
        assert!(matches!(upload.move_to("/tmp/nope"), Err(Error::State(StateError::UploadFailed))));
    }

    #[test]
    fn test_move_from_stream_copies_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("moved.txt");

        let upload = stream_upload("stream contents");
        upload.stream().unwrap().read(4).unwrap();

        upload.move_to(&target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"stream contents");
    }

    #[test]
    fn test_move_from_path_renames() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        let target = dir.path().join("target.txt");
        fs::File::create(&source).unwrap().write_all(b"payload").unwrap();

        let upload = UploadedFile::from_path(&source, Some(7), UploadError::Ok, None, None);
        upload.move_to(&target).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(&target).unwrap(), b"payload");
    }

    #[test]
    fn test_move_is_one_shot() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("first.txt");

        let upload = stream_upload("once");
        upload.move_to(&target).unwrap();

        let again = dir.path().join("second.txt");
        assert!(matches!(upload.move_to(&again), Err(Error::State(StateError::UploadAlreadyMoved))));
        assert!(matches!(upload.stream(), Err(Error::State(StateError::UploadAlreadyMoved))));
    }

    #[test]
    fn test_move_to_empty_target_is_rejected() {
        let upload = stream_upload("x");

        assert!(matches!(upload.move_to(""), Err(Error::Validation(ValidationError::EmptyMoveTarget))));
        assert!(upload.stream().is_ok());
    }

    #[test]
    fn test_failed_rename_is_not_marked_moved() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-existed.txt");

        let upload = UploadedFile::from_path(&missing, None, UploadError::Ok, None, None);
        assert!(matches!(upload.move_to(dir.path().join("out.txt")), Err(Error::Io(_))));

        // The failure is terminal for the attempt, not for the value.
        assert!(matches!(upload.stream(), Err(Error::Io(_))));
    }

    #[test]
    fn test_error_code_round_trip() {
        for error in [
            UploadError::Ok,
            UploadError::IniSize,
            UploadError::FormSize,
            UploadError::Partial,
            UploadError::NoFile,
            UploadError::NoTmpDir,
            UploadError::CantWrite,
            UploadError::Extension,
        ] {
            assert_eq!(UploadError::from_code(error.code()), Some(error));
        }

        assert_eq!(UploadError::from_code(5), None);
        assert_eq!(UploadError::from_code(9), None);
    }
}
