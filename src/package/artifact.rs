// ABOUTME: Temporary tarball produced for one deployment.
// ABOUTME: Removed on drop unless explicitly kept for debugging.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use snafu::ResultExt;
use tempfile::TempPath;

use super::archive::build;
use super::collect::FileManifest;
use super::error::{CreateTempSnafu, FinishSnafu, MetadataSnafu, PackageError};
use crate::cancel::AbortFlag;

/// A packed application archive on disk.
///
/// The file lives in a temp directory and is deleted when the
/// `Artifact` is dropped, on every exit path, unless [`Artifact::keep`]
/// was called first.
#[derive(Debug)]
pub struct Artifact {
    file: File,
    path: PathBuf,
    temp: Option<TempPath>,
    size: u64,
}

impl Artifact {
    /// Archive `manifest` into a fresh file in the system temp directory.
    ///
    /// # Errors
    ///
    /// Returns any `PackageError` from creating the file or building the archive.
    pub fn pack(manifest: &FileManifest) -> Result<Self, PackageError> {
        Self::pack_in(manifest, None, &AbortFlag::default())
    }

    /// Archive `manifest` into a fresh file under `dir`, stopping early once
    /// `abort` is raised.
    ///
    /// A partially written archive is removed before this returns.
    ///
    /// # Errors
    ///
    /// Returns any `PackageError` from creating the file or building the
    /// archive, including the write failure caused by cancellation.
    pub fn pack_in(
        manifest: &FileManifest,
        dir: Option<&Path>,
        abort: &AbortFlag,
    ) -> Result<Self, PackageError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sectionctl-deploy.").suffix(".tar.gz");
        let temp = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .context(CreateTempSnafu)?;
        let (file, temp) = temp.into_parts();
        let path = temp.to_path_buf();

        let sink = AbortableWriter {
            inner: BufWriter::new(file),
            abort: abort.clone(),
        };
        let writer = build(manifest, sink)?.inner;
        let file = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context(FinishSnafu)?;
        let size = file.metadata().context(MetadataSnafu { path: &path })?.len();

        Ok(Self {
            file,
            path,
            temp: Some(temp),
            size,
        })
    }

    /// Size of the finished archive in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name used as the upload filename.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app.tar.gz".to_string())
    }

    /// Seek back to the first byte so the archive can be read for upload.
    pub fn rewind(&mut self) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// A second handle onto the archive, sharing the current offset.
    pub fn reader(&self) -> std::io::Result<File> {
        self.file.try_clone()
    }

    /// Disable deletion so the archive outlives this process.
    pub fn keep(&mut self) -> std::io::Result<&Path> {
        if let Some(temp) = self.temp.take() {
            temp.keep().map_err(|e| e.error)?;
        }
        Ok(&self.path)
    }

    pub fn is_kept(&self) -> bool {
        self.temp.is_none()
    }

    /// Delete the archive now, reporting failures that drop would swallow.
    pub fn close(mut self) -> std::io::Result<()> {
        match self.temp.take() {
            Some(temp) => temp.close(),
            None => Ok(()),
        }
    }
}

/// Fails every write once the flag is raised, ending the archive early.
struct AbortableWriter<W> {
    inner: W,
    abort: AbortFlag,
}

impl<W: Write> Write for AbortableWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.abort.is_raised() {
            return Err(io::Error::other("packing cancelled"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
