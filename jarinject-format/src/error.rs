use std::path::PathBuf;

use crate::{replace::ReplaceError, resolve::Coordinate, resolve::ResolveError};

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("Target archive does not exist or is not a file. Path: '{}'", .0.display())]
    Precondition(PathBuf),

    #[error("Could not resolve the runtime loader `{}`", .1)]
    Resolution(#[source] ResolveError, Coordinate),

    #[error("Target archive has no manifest. Path: '{}'", .0.display())]
    NoManifest(PathBuf),

    #[error("Could not determine the application entry point. Path: '{}'", .0.display())]
    MissingEntryPoint(PathBuf),

    #[error("Unable to inject loader into archive")]
    ArchiveIo(#[source] std::io::Error),

    #[error("Could not create a temporary archive next to '{}'", .1.display())]
    TempFile(#[source] std::io::Error, PathBuf),

    #[error("Could not replace the target archive")]
    Replace(#[source] ReplaceError),
}

impl From<ReplaceError> for InjectError {
    fn from(e: ReplaceError) -> Self {
        InjectError::Replace(e)
    }
}

impl InjectError {
    /// Whether the target archive could have been left in a partial state.
    ///
    /// Only a failed copy fallback can get that far; every earlier failure
    /// leaves the target untouched.
    pub fn target_may_be_damaged(&self) -> bool {
        matches!(
            self,
            InjectError::Replace(ReplaceError::Copy(..) | ReplaceError::Truncated { .. })
        )
    }
}
