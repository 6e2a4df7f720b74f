use std::collections::HashSet;
use std::io::{Read, Seek, Write};

use crate::{
    error::InjectError,
    file::{reader::ArchiveReader, writer::ArchiveWriter},
    is_manifest_entry,
    manifest::Manifest,
    record::DosDateTime,
    MANIFEST_PATH, META_INF_DIR,
};

/// Entry counts from a [`merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entries copied from the target archive, excluding its manifest.
    pub from_target: u64,
    /// Entries copied from the loader archive, excluding its manifest.
    pub from_loader: u64,
    /// Entries dropped because an earlier one had the same name.
    pub skipped: u64,
}

impl MergeStats {
    /// Entries in the merged archive, counting the manifest and its directory.
    pub fn total(&self) -> u64 {
        self.from_target + self.from_loader + 2
    }
}

fn is_signature_file(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    match upper.strip_prefix(META_INF_DIR) {
        Some(rest) if !rest.contains('/') => [".SF", ".RSA", ".DSA", ".EC"]
            .iter()
            .any(|ext| rest.ends_with(ext)),
        _ => false,
    }
}

fn copy_entries<R: Read + Seek, W: Write>(
    source: &mut ArchiveReader<R>,
    origin: &'static str,
    seen: &mut HashSet<String>,
    writer: &mut ArchiveWriter<W>,
) -> std::io::Result<(u64, u64)> {
    let mut copied = 0;
    let mut skipped = 0;

    // Entry records are cloned so the reader can be borrowed mutably below.
    for entry in source.entries().to_vec() {
        if is_manifest_entry(&entry.name) || !seen.insert(entry.name.clone()) {
            tracing::debug!(name = %entry.name, origin, "skipping duplicate entry");
            skipped += 1;
            continue;
        }

        let raw = source.open_raw(&entry)?;
        let bytes = writer.raw_copy(&entry, raw)?;
        tracing::debug!(name = %entry.name, origin, bytes, "copied entry");
        copied += 1;
    }

    Ok((copied, skipped))
}

/// Combine `target` and `loader` into `writer`, with `manifest` as the
/// manifest of the result.
///
/// The manifest is written first. Then every entry of the target and
/// then every entry of the loader is copied without recompression, in
/// storage order. The first entry with a given name wins; later ones are
/// dropped. Neither source's own manifest is copied.
pub fn merge<T, L, W>(
    target: &mut ArchiveReader<T>,
    loader: &mut ArchiveReader<L>,
    manifest: &Manifest,
    mut writer: ArchiveWriter<W>,
) -> Result<(MergeStats, W), InjectError>
where
    T: Read + Seek,
    L: Read + Seek,
    W: Write,
{
    let modified = target
        .manifest_entry()
        .map(|e| e.modified)
        .unwrap_or_else(DosDateTime::now);

    for name in target.entries().iter().map(|e| &e.name) {
        if is_signature_file(name) {
            tracing::warn!(
                name = %name,
                "target archive is signed; the rewritten manifest will invalidate its signature"
            );
        }
    }

    let mut seen: HashSet<String> = [META_INF_DIR, MANIFEST_PATH]
        .iter()
        .map(|s| s.to_string())
        .collect();

    writer
        .write_manifest(manifest, modified)
        .map_err(InjectError::ArchiveIo)?;

    let (from_target, target_skipped) =
        copy_entries(target, "target", &mut seen, &mut writer).map_err(InjectError::ArchiveIo)?;
    let (from_loader, loader_skipped) =
        copy_entries(loader, "loader", &mut seen, &mut writer).map_err(InjectError::ArchiveIo)?;

    let inner = writer.finish().map_err(InjectError::ArchiveIo)?;

    let stats = MergeStats {
        from_target,
        from_loader,
        skipped: target_skipped + loader_skipped,
    };
    tracing::debug!(?stats, "merged archives");
    Ok((stats, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compression;
    use std::io::Cursor;

    fn archive(entries: &[(&str, &[u8])], manifest: Option<&Manifest>) -> Vec<u8> {
        let mut writer = ArchiveWriter::new(Vec::new());
        if let Some(m) = manifest {
            writer.write_manifest(m, DosDateTime::now()).unwrap();
        }
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.mkdir(name).unwrap();
            } else {
                writer
                    .insert(name, Compression::Deflate, &mut Cursor::new(*data))
                    .unwrap();
            }
        }
        writer.finish().unwrap()
    }

    #[test]
    fn signature_files() {
        assert!(is_signature_file("META-INF/APP.SF"));
        assert!(is_signature_file("meta-inf/app.rsa"));
        assert!(is_signature_file("META-INF/KEY.EC"));
        assert!(!is_signature_file("META-INF/services/x.SF"));
        assert!(!is_signature_file("App.SF"));
        assert!(!is_signature_file("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn first_writer_wins() {
        let mut manifest = Manifest::new();
        manifest.set_main_attr("Main-Class", "Loader");

        let target = archive(
            &[
                ("com/", &b""[..]),
                ("com/A.class", &b"target A"[..]),
                ("shared.txt", &b"target"[..]),
            ],
            Some(&Manifest::new()),
        );
        let loader = archive(
            &[
                ("com/", &b""[..]),
                ("com/L.class", &b"loader L"[..]),
                ("shared.txt", &b"loader"[..]),
            ],
            Some(&Manifest::new()),
        );

        let mut target = ArchiveReader::new(Cursor::new(target)).unwrap();
        let mut loader = ArchiveReader::new(Cursor::new(loader)).unwrap();
        let (stats, bytes) = merge(
            &mut target,
            &mut loader,
            &manifest,
            ArchiveWriter::new(Vec::new()),
        )
        .unwrap();

        assert_eq!(
            stats,
            MergeStats {
                from_target: 3,
                from_loader: 1,
                // Both manifests, both META-INF/ dirs, the loader's com/ and shared.txt.
                skipped: 6,
            }
        );

        let mut merged = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(merged.len() as u64, stats.total());
        let names: Vec<_> = merged.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "META-INF/",
                "META-INF/MANIFEST.MF",
                "com/",
                "com/A.class",
                "shared.txt",
                "com/L.class"
            ]
        );

        let shared = merged.find("shared.txt").unwrap().clone();
        assert_eq!(merged.read_to_vec(&shared).unwrap(), b"target");
        assert_eq!(merged.manifest().unwrap(), Some(manifest));
    }

    #[test]
    fn manifest_keeps_target_timestamp() {
        let target = {
            let mut writer = ArchiveWriter::new(Vec::new());
            let stamp = DosDateTime { time: 0, date: 0x21 };
            writer.write_manifest(&Manifest::new(), stamp).unwrap();
            writer.finish().unwrap()
        };
        let loader = archive(&[("L.class", &b"l"[..])], None);

        let mut target = ArchiveReader::new(Cursor::new(target)).unwrap();
        let mut loader = ArchiveReader::new(Cursor::new(loader)).unwrap();
        let (_, bytes) = merge(
            &mut target,
            &mut loader,
            &Manifest::new(),
            ArchiveWriter::new(Vec::new()),
        )
        .unwrap();

        let merged = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        let entry = merged.manifest_entry().unwrap();
        assert_eq!(entry.modified, DosDateTime { time: 0, date: 0x21 });
    }
}
