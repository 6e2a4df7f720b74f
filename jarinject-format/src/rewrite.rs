use crate::{manifest::Manifest, MAIN_CLASS, REAL_MAIN_CLASS};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("manifest has no `Main-Class` and no entry point was given")]
    MissingEntryPoint,
}

/// Outcome of [`redirect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// The application's own entry point, now stored under `Real-Main-Class`.
    pub real_main_class: String,
    /// The manifest already launched the loader before this call.
    pub already_redirected: bool,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Point the manifest's `Main-Class` at `loader_main_class`, moving the
/// application entry point to `Real-Main-Class`.
///
/// A non-empty `explicit` entry point wins over whatever the manifest says.
/// A manifest that already launches the loader keeps its recorded
/// `Real-Main-Class` rather than being wrapped a second time. Every other
/// attribute and section is left as it was.
pub fn redirect(
    manifest: &mut Manifest,
    explicit: Option<&str>,
    loader_main_class: &str,
) -> Result<Redirect, RewriteError> {
    let current = non_empty(manifest.main_attr(MAIN_CLASS));
    let already_redirected = current == Some(loader_main_class);

    let real_main_class = match non_empty(explicit) {
        Some(explicit) => explicit,
        None if already_redirected => {
            non_empty(manifest.main_attr(REAL_MAIN_CLASS)).ok_or(RewriteError::MissingEntryPoint)?
        }
        None => current.ok_or(RewriteError::MissingEntryPoint)?,
    }
    .to_string();

    if already_redirected {
        tracing::debug!(%real_main_class, "manifest already launches the loader");
    }

    manifest.set_main_attr(REAL_MAIN_CLASS, real_main_class.as_str());
    manifest.set_main_attr(MAIN_CLASS, loader_main_class);

    Ok(Redirect {
        real_main_class,
        already_redirected,
    })
}
