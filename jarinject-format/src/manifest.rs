//! JAR manifest codec.
//!
//! A manifest is a main section followed by optional per-entry sections, each
//! a block of `Name: value` lines separated by a blank line. Long values are
//! folded onto continuation lines that start with a single space.

use std::fmt;
use std::io::Write;

/// Attribute naming the manifest format version; always written first.
pub const MANIFEST_VERSION: &str = "Manifest-Version";

/// Attribute that opens every per-entry section.
pub const SECTION_NAME: &str = "Name";

/// Maximum encoded line length, in bytes, excluding the line break.
const LINE_LIMIT: usize = 72;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8")]
    InvalidUtf8,

    #[error("line {0}: expected `Name: value`")]
    MissingSeparator(usize),

    #[error("line {0}: continuation line without a preceding attribute")]
    BadContinuation(usize),

    #[error("line {0}: section does not start with a `Name` attribute")]
    MissingSectionName(usize),
}

/// An ordered attribute map with case-insensitive names.
///
/// Replacing a value keeps the attribute's original position and spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.0[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set `name` to `value`, returning the previous value if there was one.
    pub fn insert<K, V>(&mut self, name: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(i) => Some(std::mem::replace(&mut self.0[i].1, value)),
            None => {
                self.0.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.0.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A per-entry section, keyed by the value of its `Name` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    sections: Vec<Section>,
}

impl Manifest {
    pub fn new() -> Self {
        let mut main = Attributes::new();
        main.insert(MANIFEST_VERSION, "1.0");
        Manifest {
            main,
            sections: Vec::new(),
        }
    }

    pub fn main_attributes(&self) -> &Attributes {
        &self.main
    }

    pub fn main_attributes_mut(&mut self) -> &mut Attributes {
        &mut self.main
    }

    pub fn main_attr(&self, name: &str) -> Option<&str> {
        self.main.get(name)
    }

    pub fn set_main_attr<K, V>(&mut self, name: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.main.insert(name, value)
    }

    pub fn remove_main_attr(&mut self, name: &str) -> Option<String> {
        self.main.remove(name)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn parse(bytes: &[u8]) -> Result<Manifest, ManifestError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ManifestError::InvalidUtf8)?;

        let mut blocks: Vec<Vec<(usize, String, String)>> = vec![Vec::new()];
        for (index, line) in split_lines(text).enumerate() {
            let line_no = index + 1;
            let block = blocks.last_mut().ok_or(ManifestError::MissingSeparator(line_no))?;

            if line.is_empty() {
                if !block.is_empty() {
                    blocks.push(Vec::new());
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                match block.last_mut() {
                    Some((_, _, value)) => value.push_str(rest),
                    None => return Err(ManifestError::BadContinuation(line_no)),
                }
                continue;
            }

            let (name, value) = line
                .split_once(": ")
                .or_else(|| line.strip_suffix(':').map(|name| (name, "")))
                .ok_or(ManifestError::MissingSeparator(line_no))?;
            if name.is_empty() {
                return Err(ManifestError::MissingSeparator(line_no));
            }
            block.push((line_no, name.to_string(), value.to_string()));
        }

        let mut blocks = blocks.into_iter().filter(|b| !b.is_empty());
        let mut manifest = Manifest::default();

        // A manifest that starts with a blank line has an empty main section.
        let first_is_main = text
            .chars()
            .next()
            .map(|c| c != '\r' && c != '\n')
            .unwrap_or(false);
        if first_is_main {
            if let Some(block) = blocks.next() {
                for (_, name, value) in block {
                    manifest.main.insert(name, value);
                }
            }
        }

        for block in blocks {
            let mut attrs = block.into_iter();
            let section_name = match attrs.next() {
                Some((_, name, value)) if name.eq_ignore_ascii_case(SECTION_NAME) => value,
                Some((line_no, _, _)) => return Err(ManifestError::MissingSectionName(line_no)),
                None => continue,
            };

            let mut attributes = Attributes::new();
            for (_, name, value) in attrs {
                attributes.insert(name, value);
            }
            manifest.sections.push(Section {
                name: section_name,
                attributes,
            });
        }

        Ok(manifest)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        if let Some(version) = self.main.get(MANIFEST_VERSION) {
            write_attr(writer, MANIFEST_VERSION, version)?;
        }
        for (name, value) in self.main.iter() {
            if !name.eq_ignore_ascii_case(MANIFEST_VERSION) {
                write_attr(writer, name, value)?;
            }
        }
        writer.write_all(b"\r\n")?;

        for section in &self.sections {
            write_attr(writer, SECTION_NAME, &section.name)?;
            for (name, value) in section.attributes.iter() {
                write_attr(writer, name, value)?;
            }
            writer.write_all(b"\r\n")?;
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write(&mut buf);
        buf
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// Split on CRLF, LF or CR. A trailing line without a terminator is kept.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(|c| c == '\r' || c == '\n') {
            Some(i) => {
                let line = &rest[..i];
                let skip = if rest[i..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[i + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

/// Write one attribute, folding it into 72-byte lines.
fn write_attr<W: Write>(writer: &mut W, name: &str, value: &str) -> std::io::Result<()> {
    let line = format!("{}: {}", name, value);
    let mut rest = line.as_str();
    let mut limit = LINE_LIMIT;

    loop {
        if rest.len() <= limit {
            writer.write_all(rest.as_bytes())?;
            writer.write_all(b"\r\n")?;
            return Ok(());
        }

        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        writer.write_all(rest[..split].as_bytes())?;
        writer.write_all(b"\r\n ")?;
        rest = &rest[split..];
        // The leading space of a continuation line counts towards the limit.
        limit = LINE_LIMIT - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_main_section() {
        let manifest =
            Manifest::parse(b"Manifest-Version: 1.0\r\nMain-Class: App.Main\r\nCreated-By: hand\r\n\r\n")
                .unwrap();
        assert_eq!(manifest.main_attr("Manifest-Version"), Some("1.0"));
        assert_eq!(manifest.main_attr("main-class"), Some("App.Main"));
        assert_eq!(manifest.main_attributes().len(), 3);
        assert!(manifest.sections().is_empty());
    }

    #[test]
    fn parse_mixed_line_endings_and_missing_final_newline() {
        let manifest = Manifest::parse(b"Manifest-Version: 1.0\nA: 1\rB: 2").unwrap();
        assert_eq!(manifest.main_attr("A"), Some("1"));
        assert_eq!(manifest.main_attr("B"), Some("2"));
    }

    #[test]
    fn parse_continuation_lines() {
        let manifest =
            Manifest::parse(b"Manifest-Version: 1.0\r\nClass-Path: lib/a.jar lib/\r\n b.jar\r\n\r\n")
                .unwrap();
        assert_eq!(manifest.main_attr("Class-Path"), Some("lib/a.jar lib/b.jar"));
    }

    #[test]
    fn parse_sections() {
        let manifest = Manifest::parse(
            b"Manifest-Version: 1.0\r\n\r\nName: com/example/\r\nSealed: true\r\n\r\nName: App.class\r\nSHA-256-Digest: abc\r\n\r\n",
        )
        .unwrap();
        assert_eq!(manifest.sections().len(), 2);
        assert_eq!(
            manifest.section("com/example/").unwrap().attributes.get("sealed"),
            Some("true")
        );
        assert_eq!(manifest.sections()[1].name, "App.class");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            Manifest::parse(b"Manifest-Version 1.0\r\n"),
            Err(ManifestError::MissingSeparator(1))
        );
        assert_eq!(
            Manifest::parse(b" orphan\r\n"),
            Err(ManifestError::BadContinuation(1))
        );
        assert_eq!(
            Manifest::parse(b"Manifest-Version: 1.0\r\n\r\nSealed: true\r\n"),
            Err(ManifestError::MissingSectionName(3))
        );
        assert_eq!(Manifest::parse(&[0xff, 0xfe]), Err(ManifestError::InvalidUtf8));
    }

    #[test]
    fn insert_keeps_position_and_spelling() {
        let mut attrs = Attributes::new();
        attrs.insert("Manifest-Version", "1.0");
        attrs.insert("main-class", "App.Main");
        attrs.insert("Built-By", "ci");

        assert_eq!(attrs.insert("Main-Class", "Loader"), Some("App.Main".into()));
        let names: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["Manifest-Version", "main-class", "Built-By"]);
        assert_eq!(attrs.get("MAIN-CLASS"), Some("Loader"));
    }

    #[test]
    fn write_puts_version_first() {
        let mut manifest = Manifest::default();
        manifest.set_main_attr("Main-Class", "App.Main");
        manifest.set_main_attr("Manifest-Version", "1.0");
        assert_eq!(
            manifest.to_bytes(),
            b"Manifest-Version: 1.0\r\nMain-Class: App.Main\r\n\r\n"
        );
    }

    #[test]
    fn write_folds_long_lines() {
        let mut manifest = Manifest::default();
        let value = "x".repeat(200);
        manifest.set_main_attr("Class-Path", value.clone());

        let bytes = manifest.to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap();
        for line in text.split("\r\n") {
            assert!(line.len() <= LINE_LIMIT, "line too long: {}", line.len());
        }

        let reparsed = Manifest::parse(&bytes).unwrap();
        assert_eq!(reparsed.main_attr("Class-Path"), Some(value.as_str()));
    }

    #[test]
    fn write_folds_on_char_boundaries() {
        let mut manifest = Manifest::default();
        let value = "é".repeat(60);
        manifest.set_main_attr("Implementation-Title", value.clone());

        let reparsed = Manifest::parse(&manifest.to_bytes()).unwrap();
        assert_eq!(reparsed.main_attr("Implementation-Title"), Some(value.as_str()));
    }

    #[test]
    fn sections_survive_rewrite() {
        let source = b"Manifest-Version: 1.0\r\nMain-Class: App.Main\r\n\r\nName: App.class\r\nSHA-256-Digest: abc\r\n\r\n";
        let manifest = Manifest::parse(source).unwrap();
        assert_eq!(manifest.to_bytes(), source.to_vec());
    }
}
