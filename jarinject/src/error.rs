use std::path::PathBuf;

use jarinject_format::{InjectError, ResolveError};
use miette::Diagnostic;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("Cannot inject loader into `{}`", .path.display())]
    Inject {
        path: PathBuf,
        #[source]
        source: InjectError,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid loader coordinate")]
    #[diagnostic(help("Use group:name:version or group:name:type:version"))]
    Coordinate(#[source] ResolveError),

    #[error("No home directory found to locate the local repository")]
    #[diagnostic(help("Pass --repository or set JARINJECT_REPOSITORY"))]
    NoRepository,

    #[error("Cannot open archive `{}`", .path.display())]
    #[diagnostic(help("Is this a valid JAR or ZIP file?"))]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read manifest of `{}`", .path.display())]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{}` has no manifest", .path.display())]
    NoManifest { path: PathBuf },

    #[error("Cannot serialize output")]
    Json(#[source] serde_json::Error),
}

impl Error {
    pub fn inject(path: PathBuf, source: InjectError) -> Error {
        let help = match &source {
            InjectError::Precondition(_) => {
                Some("Build the archive first; the target must be an existing file".to_string())
            }
            InjectError::Resolution(..) => Some(
                "Install the loader into the repository, or pass --loader with a path to it"
                    .to_string(),
            ),
            InjectError::NoManifest(_) => {
                Some("Only archives with a META-INF/MANIFEST.MF can be injected".to_string())
            }
            InjectError::MissingEntryPoint(_) => {
                Some("Add a Main-Class to the manifest, or pass --main-class".to_string())
            }
            e if e.target_may_be_damaged() => Some(format!(
                "The copy over `{}` did not complete; rebuild the archive before retrying",
                path.display()
            )),
            _ => None,
        };

        Error::Inject { path, source, help }
    }
}
