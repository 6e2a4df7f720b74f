//! Herein lies the brains of `jarinject`.
//!
//! A packaged JAR is merged with a small runtime-loader archive. The merged
//! archive launches the loader, which finds the application's real entry point
//! under the [`REAL_MAIN_CLASS`] manifest attribute.
//!
//! Use [`inject`] for the whole pipeline, or the pieces directly:
//! [`ArchiveReader`], [`ArchiveWriter`], [`redirect`], [`merge`] and
//! [`TempArchive`].

mod compression;
mod counting;
mod de;
mod error;
mod file;
mod hashing;
mod header;
mod inject;
pub mod manifest;
mod merge;
mod record;
mod replace;
pub mod resolve;
mod rewrite;
mod ser;

pub use compression::Compression;
pub use error::InjectError;
pub use file::{reader::ArchiveReader, reader::RawEntry, writer::ArchiveWriter};
pub use inject::{inject, InjectOptions, InjectReport};
pub use manifest::{Attributes, Manifest, ManifestError, Section};
pub use merge::{merge, MergeStats};
pub use record::{DosDateTime, EntryRecord};
pub use replace::{ReplaceError, TempArchive};
pub use resolve::{Coordinate, FileResolver, LocalRepository, Resolve, ResolveError};
pub use rewrite::{redirect, Redirect, RewriteError};

/// Path of the manifest entry inside an archive.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Directory entry that precedes the manifest.
pub const META_INF_DIR: &str = "META-INF/";

/// Manifest attribute naming the class launched when the archive is executed.
pub const MAIN_CLASS: &str = "Main-Class";

/// Manifest attribute holding the application's own entry point after redirection.
pub const REAL_MAIN_CLASS: &str = "Real-Main-Class";

/// Launch class of the runtime loader.
pub const LOADER_MAIN_CLASS: &str = "com.github.zachdeibert.mavendependencyruntime.Main";

/// Group of the runtime loader artifact.
pub const LOADER_GROUP: &str = "com.github.zachdeibert";

/// Name of the runtime loader artifact.
pub const LOADER_ARTIFACT: &str = "maven-dependency-runtime";

/// Size of the fixed buffer used when streaming payloads.
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// Returns true for the manifest entry and its parent directory, in any case.
pub(crate) fn is_manifest_entry(name: &str) -> bool {
    name.eq_ignore_ascii_case(MANIFEST_PATH) || name.eq_ignore_ascii_case(META_INF_DIR)
}
