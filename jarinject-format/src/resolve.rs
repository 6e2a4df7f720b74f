//! Locating the runtime loader archive.
//!
//! The loader is named by a Maven [`Coordinate`]. A [`Resolve`]
//! implementation turns it into a path on disk: [`LocalRepository`] looks it
//! up in a Maven-layout directory, [`FileResolver`] always answers with a
//! fixed file.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{LOADER_ARTIFACT, LOADER_GROUP};

/// Version placeholder for the highest non-snapshot version available.
pub const RELEASE: &str = "RELEASE";

/// Version placeholder for the highest version available, snapshots included.
pub const LATEST: &str = "LATEST";

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Artifact not found. Path: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("No versions of `{}` found. Path: '{}'", .0, .1.display())]
    NoVersions(String, PathBuf),

    #[error("Invalid coordinate `{0}` (expected `group:name:version` or `group:name:type:version`)")]
    InvalidCoordinate(String),

    #[error("Reading repository failed. Path: '{}'", .1.display())]
    Io(#[source] std::io::Error, PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub group: String,
    pub name: String,
    pub version: String,
    pub scope: String,
    pub kind: String,
}

impl Coordinate {
    pub fn new(group: &str, name: &str, version: &str) -> Coordinate {
        Coordinate {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            scope: "runtime".to_string(),
            kind: "jar".to_string(),
        }
    }

    /// The runtime loader artifact at `version`.
    pub fn loader(version: &str) -> Coordinate {
        Coordinate::new(LOADER_GROUP, LOADER_ARTIFACT, version)
    }

    /// A placeholder version that has to be looked up before use.
    pub fn is_meta_version(&self) -> bool {
        self.version == RELEASE || self.version == LATEST
    }

    pub fn with_version(&self, version: &str) -> Coordinate {
        Coordinate {
            version: version.to_string(),
            ..self.clone()
        }
    }

    /// File name of the artifact in a repository, e.g. `loader-1.0.jar`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.name, self.version, self.kind)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.group, self.name, self.kind, self.version)
    }
}

impl FromStr for Coordinate {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ResolveError::InvalidCoordinate(s.to_string()));
        }

        match parts[..] {
            [group, name, version] => Ok(Coordinate::new(group, name, version)),
            [group, name, kind, version] => Ok(Coordinate {
                kind: kind.to_string(),
                ..Coordinate::new(group, name, version)
            }),
            _ => Err(ResolveError::InvalidCoordinate(s.to_string())),
        }
    }
}

/// Turns a coordinate into the path of a readable archive.
pub trait Resolve {
    fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolveError>;
}

/// Resolves every coordinate to the same file.
#[derive(Debug, Clone)]
pub struct FileResolver(pub PathBuf);

impl Resolve for FileResolver {
    fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolveError> {
        if !self.0.is_file() {
            return Err(ResolveError::NotFound(self.0.clone()));
        }
        tracing::debug!(%coordinate, path = %self.0.display(), "using loader file");
        Ok(self.0.clone())
    }
}

/// A directory laid out like a local Maven repository:
/// `<root>/<group as dirs>/<name>/<version>/<name>-<version>.<type>`.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new<P: Into<PathBuf>>(root: P) -> LocalRepository {
        LocalRepository { root: root.into() }
    }

    /// `~/.m2/repository`, if a home directory can be found.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".m2").join("repository"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, coordinate: &Coordinate) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(coordinate.group.split('.'));
        path.push(&coordinate.name);
        path
    }

    fn artifact_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.artifact_dir(coordinate)
            .join(&coordinate.version)
            .join(coordinate.file_name())
    }

    /// Every version directory of `coordinate` that holds its artifact file.
    pub fn versions(&self, coordinate: &Coordinate) -> Result<Vec<String>, ResolveError> {
        let dir = self.artifact_dir(coordinate);
        let read_dir = match std::fs::read_dir(&dir) {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ResolveError::Io(e, dir)),
        };

        let mut versions = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| ResolveError::Io(e, dir.clone()))?;
            let version = match entry.file_name().into_string() {
                Ok(v) => v,
                Err(_) => continue,
            };
            if self.artifact_path(&coordinate.with_version(&version)).is_file() {
                versions.push(version);
            }
        }

        versions.sort_by(|a, b| compare_versions(a, b));
        Ok(versions)
    }
}

impl Resolve for LocalRepository {
    fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolveError> {
        let coordinate = if coordinate.is_meta_version() {
            let include_snapshots = coordinate.version == LATEST;
            let version = self
                .versions(coordinate)?
                .into_iter()
                .filter(|v| include_snapshots || !is_snapshot(v))
                .last()
                .ok_or_else(|| {
                    ResolveError::NoVersions(
                        format!("{}:{}", coordinate.group, coordinate.name),
                        self.artifact_dir(coordinate),
                    )
                })?;
            tracing::debug!(requested = %coordinate.version, %version, "picked loader version");
            coordinate.with_version(&version)
        } else {
            coordinate.clone()
        };

        let path = self.artifact_path(&coordinate);
        if !path.is_file() {
            return Err(ResolveError::NotFound(path));
        }

        tracing::debug!(%coordinate, path = %path.display(), "resolved loader");
        Ok(path)
    }
}

fn is_snapshot(version: &str) -> bool {
    version.to_ascii_uppercase().ends_with(SNAPSHOT_SUFFIX)
}

#[derive(Debug, PartialEq, Eq)]
enum Component<'a> {
    Number(u64),
    Qualifier(&'a str),
}

fn components(version: &str) -> impl Iterator<Item = Component<'_>> {
    version
        .split(|c| c == '.' || c == '-')
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(n) => Component::Number(n),
            Err(_) => Component::Qualifier(s),
        })
}

/// Orders version strings component by component.
///
/// Numbers compare numerically and rank above qualifiers; qualifiers compare
/// without regard to case. When one version runs out of components, a
/// trailing number makes the other one newer and a trailing qualifier makes
/// it older, so `1.0 < 1.0.1` and `1.0-beta < 1.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut a = components(a);
    let mut b = components(b);

    loop {
        let ord = match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (Some(Component::Number(_)), None) => Ordering::Greater,
            (Some(Component::Qualifier(_)), None) => Ordering::Less,
            (None, Some(Component::Number(_))) => Ordering::Less,
            (None, Some(Component::Qualifier(_))) => Ordering::Greater,
            (Some(Component::Number(x)), Some(Component::Number(y))) => x.cmp(&y),
            (Some(Component::Number(_)), Some(Component::Qualifier(_))) => Ordering::Greater,
            (Some(Component::Qualifier(_)), Some(Component::Number(_))) => Ordering::Less,
            (Some(Component::Qualifier(x)), Some(Component::Qualifier(y))) => {
                x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase())
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}
