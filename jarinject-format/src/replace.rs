//! Swapping a finished archive into place.
//!
//! The output is written to a [`TempArchive`] and renamed over the target.
//! The guard removes the temporary file whenever it is dropped, so an error
//! anywhere before the swap leaves nothing behind.

use std::fs::{File, OpenOptions, Permissions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, PersistError};

use crate::file::copy_stream;

const TEMP_PREFIX: &str = ".jarinject-";
const TEMP_SUFFIX: &str = ".jar";

#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    #[error("Flushing temporary archive failed. Path: '{}'", .1.display())]
    Sync(#[source] std::io::Error, PathBuf),

    #[error("Removing target archive failed. Path: '{}'", .1.display())]
    Remove(#[source] std::io::Error, PathBuf),

    #[error("Copying temporary archive over target failed. Path: '{}'", .1.display())]
    Copy(#[source] std::io::Error, PathBuf),

    #[error(
        "Target archive was truncated: copied {copied} of {expected} bytes. Path: '{}'",
        .path.display()
    )]
    Truncated {
        path: PathBuf,
        copied: u64,
        expected: u64,
    },
}

/// A temporary output archive that is deleted unless it replaces its target.
#[derive(Debug)]
pub struct TempArchive {
    file: NamedTempFile,
    /// Permissions of the target when the temporary file was created.
    permissions: Option<Permissions>,
}

impl TempArchive {
    /// Create the temporary file in the same directory as `target`, so the
    /// final rename stays on one filesystem. Falls back to the system
    /// temporary directory when that directory is not writable.
    ///
    /// The temporary file takes the target's permissions, so the replaced
    /// archive keeps its mode.
    pub fn beside(target: &Path) -> std::io::Result<TempArchive> {
        let mut builder = Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);

        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let file = match builder.tempfile_in(dir) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "cannot create temporary archive beside target, \
                     using the system temporary directory"
                );
                builder.tempfile()?
            }
        };

        let permissions = std::fs::metadata(target).ok().map(|m| m.permissions());
        if let Some(permissions) = &permissions {
            file.as_file().set_permissions(permissions.clone())?;
        }

        tracing::debug!(path = %file.path().display(), "created temporary archive");
        Ok(TempArchive { file, permissions })
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    #[inline(always)]
    pub fn as_file(&self) -> &File {
        self.file.as_file()
    }

    #[inline(always)]
    pub fn as_file_mut(&mut self) -> &mut File {
        self.file.as_file_mut()
    }

    /// Move the temporary archive over `target`.
    ///
    /// A rename is tried first; the target is never removed before it. When
    /// the rename is refused (e.g. across filesystems) the contents are
    /// copied over the target instead. The temporary file is gone after this
    /// returns, whatever the outcome.
    pub fn replace(self, target: &Path) -> Result<(), ReplaceError> {
        self.replace_with(target, |file, target| file.persist(target).map(drop))
    }

    fn replace_with<F>(self, target: &Path, rename: F) -> Result<(), ReplaceError>
    where
        F: FnOnce(NamedTempFile, &Path) -> Result<(), PersistError>,
    {
        let temp_path = self.path().to_path_buf();
        self.as_file()
            .sync_all()
            .map_err(|e| ReplaceError::Sync(e, temp_path.clone()))?;

        let expected = self
            .as_file()
            .metadata()
            .map_err(|e| ReplaceError::Sync(e, temp_path.clone()))?
            .len();

        let file = match rename(self.file, target) {
            Ok(()) => {
                tracing::debug!(
                    target = %target.display(),
                    bytes = expected,
                    "renamed archive into place"
                );
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    target = %target.display(),
                    error = %e.error,
                    "rename failed, copying archive over target"
                );
                e.file
            }
        };

        copy_over(file.path(), target, expected, self.permissions.as_ref())?;

        if let Err(e) = file.close() {
            tracing::warn!(
                path = %temp_path.display(),
                error = %e,
                "could not remove temporary archive"
            );
        }
        Ok(())
    }
}

/// Replace `target` with the contents of `source`, verifying the byte count.
/// The new file is given `permissions` when they are known.
pub(crate) fn copy_over(
    source: &Path,
    target: &Path,
    expected: u64,
    permissions: Option<&Permissions>,
) -> Result<(), ReplaceError> {
    match std::fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(ReplaceError::Remove(e, target.to_path_buf())),
    }

    let copy_err = |e| ReplaceError::Copy(e, target.to_path_buf());

    let mut reader = BufReader::new(File::open(source).map_err(copy_err)?);
    let out = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map_err(copy_err)?;
    let mut writer = BufWriter::new(out);

    let copied = copy_stream(&mut reader, &mut writer).map_err(copy_err)?;
    writer.flush().map_err(copy_err)?;
    let out = writer.into_inner().map_err(|e| copy_err(e.into_error()))?;
    if let Some(permissions) = permissions {
        out.set_permissions(permissions.clone()).map_err(copy_err)?;
    }
    out.sync_all().map_err(copy_err)?;

    if copied != expected {
        return Err(ReplaceError::Truncated {
            path: target.to_path_buf(),
            copied,
            expected,
        });
    }

    tracing::debug!(target = %target.display(), bytes = copied, "copied archive into place");
    Ok(())
}
