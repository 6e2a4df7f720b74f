use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{
    error::InjectError,
    file::{reader::ArchiveReader, writer::ArchiveWriter},
    merge::{merge, MergeStats},
    replace::TempArchive,
    resolve::{Coordinate, Resolve, RELEASE},
    rewrite::{redirect, RewriteError},
    LOADER_MAIN_CLASS,
};

/// Inputs of a single [`inject`] run.
#[derive(Debug, Clone)]
pub struct InjectOptions {
    /// The packaged archive to rewrite in place.
    pub target: PathBuf,
    /// Which loader artifact to merge in.
    pub loader: Coordinate,
    /// Entry point to record instead of the manifest's `Main-Class`.
    pub main_class: Option<String>,
    /// Class the merged archive launches.
    pub loader_main_class: String,
}

impl InjectOptions {
    pub fn new<P: Into<PathBuf>>(target: P) -> InjectOptions {
        InjectOptions {
            target: target.into(),
            loader: Coordinate::loader(RELEASE),
            main_class: None,
            loader_main_class: LOADER_MAIN_CLASS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectReport {
    pub target: PathBuf,
    pub loader: PathBuf,
    pub real_main_class: String,
    pub already_redirected: bool,
    pub stats: MergeStats,
}

fn check_target(target: &Path) -> Result<(), InjectError> {
    if target.is_file() {
        Ok(())
    } else {
        Err(InjectError::Precondition(target.to_path_buf()))
    }
}

/// Merge the loader into `options.target` and redirect its entry point.
///
/// The target is replaced only once the merged archive is complete. On any
/// error it is left as it was and no temporary file remains.
pub fn inject(
    options: &InjectOptions,
    resolver: &dyn Resolve,
) -> Result<InjectReport, InjectError> {
    let target_path = options.target.as_path();
    check_target(target_path)?;

    let loader_path = resolver
        .resolve(&options.loader)
        .map_err(|e| InjectError::Resolution(e, options.loader.clone()))?;
    tracing::info!(loader = %loader_path.display(), "resolved runtime loader {}", options.loader);

    let mut target = ArchiveReader::open(target_path).map_err(InjectError::ArchiveIo)?;
    let mut manifest = target
        .manifest()
        .map_err(InjectError::ArchiveIo)?
        .ok_or_else(|| InjectError::NoManifest(target_path.to_path_buf()))?;

    let redirected = redirect(
        &mut manifest,
        options.main_class.as_deref(),
        &options.loader_main_class,
    )
    .map_err(|e| match e {
        RewriteError::MissingEntryPoint => {
            InjectError::MissingEntryPoint(target_path.to_path_buf())
        }
    })?;
    tracing::info!(
        real_main_class = %redirected.real_main_class,
        already_redirected = redirected.already_redirected,
        "rewrote manifest"
    );

    let mut temp = TempArchive::beside(target_path)
        .map_err(|e| InjectError::TempFile(e, target_path.to_path_buf()))?;

    let stats = {
        let mut loader = ArchiveReader::open(&loader_path).map_err(InjectError::ArchiveIo)?;
        let writer = ArchiveWriter::new(BufWriter::new(temp.as_file_mut()));
        let (stats, out) = merge(&mut target, &mut loader, &manifest, writer)?;
        out.into_inner()
            .map_err(|e| InjectError::ArchiveIo(e.into_error()))?
            .flush()
            .map_err(InjectError::ArchiveIo)?;
        stats
    };
    // Both sources are closed before the target is swapped out.
    drop(target);

    tracing::info!(
        from_target = stats.from_target,
        from_loader = stats.from_loader,
        skipped = stats.skipped,
        "merged archives"
    );

    temp.replace(target_path)?;
    tracing::info!(target = %target_path.display(), "replaced target archive");

    Ok(InjectReport {
        target: options.target.clone(),
        loader: loader_path,
        real_main_class: redirected.real_main_class,
        already_redirected: redirected.already_redirected,
        stats,
    })
}
