//! ZIP container abstraction for OOXML packages.
//!
//! A [`Package`] is the whole archive held in memory: an ordered list of
//! entries that can be replaced or removed, then written out once.

use crate::error::{Error, Result};
use crate::rels::Relationships;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Options for writing a package back to a ZIP archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Deflate level, 0 (store) to 9. `None` uses the library default.
    pub compression_level: Option<i64>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compression_level: Some(9),
        }
    }
}

#[derive(Debug, Clone)]
enum EntryData {
    Directory,
    File(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Entry {
    path: String,
    data: EntryData,
}

/// Fix the XML encoding declaration after a UTF-16 decode.
///
/// Once decoded into a Rust `String` the text is UTF-8, but the declaration
/// still says UTF-16 and quick-xml would try to honor it.
fn fix_xml_encoding_declaration(content: String) -> String {
    if !content.starts_with("<?xml") {
        return content;
    }
    let Some(end_decl) = content.find("?>") else {
        return content;
    };
    let (decl, rest) = content.split_at(end_decl + 2);
    let lowered = decl.to_ascii_lowercase();
    let Some(pos) = lowered
        .find("encoding=\"utf-16")
        .or_else(|| lowered.find("encoding='utf-16"))
    else {
        return content;
    };
    let quote = &decl[pos + 9..pos + 10];
    let Some(close) = decl[pos + 10..].find(quote) else {
        return content;
    };
    format!(
        "{}encoding={quote}UTF-8{quote}{}{}",
        &decl[..pos],
        &decl[pos + 10 + close + 1..],
        rest
    )
}

/// Decode XML bytes handling different encodings (UTF-8, UTF-16 LE/BE).
///
/// OOXML parts are normally UTF-8, but some producers write UTF-16.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    if let Some(body) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8(body.to_vec()).map_err(|e| Error::Encoding(e.to_string()));
    }

    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16_le(body).map(fix_xml_encoding_declaration);
    }

    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16_be(body).map(fix_xml_encoding_declaration);
    }

    // No BOM: UTF-8 first, then sniff UTF-16 from the null bytes around ASCII
    match String::from_utf8(bytes.to_vec()) {
        Ok(s) => Ok(s),
        Err(_) if bytes.len() >= 4 && bytes[1] == 0 && bytes[3] == 0 => {
            decode_utf16_le(bytes).map(fix_xml_encoding_declaration)
        }
        Err(_) if bytes.len() >= 4 && bytes[0] == 0 && bytes[2] == 0 => {
            decode_utf16_be(bytes).map(fix_xml_encoding_declaration)
        }
        Err(e) => Err(Error::Encoding(e.to_string())),
    }
}

fn decode_utf16_le(bytes: &[u8]) -> Result<String> {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::Encoding(e.to_string()))
}

fn decode_utf16_be(bytes: &[u8]) -> Result<String> {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::Encoding(e.to_string()))
}

/// In-memory OOXML package.
#[derive(Clone, Default)]
pub struct Package {
    entries: Vec<Option<Entry>>,
    index: HashMap<String, usize>,
}

impl Package {
    /// Open a package from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pptslim::container::Package;
    ///
    /// let package = Package::open("deck.pptx")?;
    /// assert!(package.exists("ppt/presentation.xml"));
    /// # Ok::<(), pptslim::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a package from a reader.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Load a package from the bytes of a ZIP archive.
    ///
    /// Fails with [`Error::CorruptContainer`] when the bytes are not a ZIP
    /// archive, an entry cannot be read, or two entries share a path.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| Error::CorruptContainer(e.to_string()))?;

        let mut package = Package::default();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::CorruptContainer(e.to_string()))?;
            let path = file.name().to_string();
            if package.index.contains_key(&path) {
                return Err(Error::CorruptContainer(format!("duplicate entry {path}")));
            }

            let data = if file.is_dir() {
                EntryData::Directory
            } else {
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)
                    .map_err(|e| Error::CorruptContainer(format!("{path}: {e}")))?;
                EntryData::File(bytes)
            };
            package.push(Entry { path, data });
        }

        tracing::debug!(entries = package.index.len(), "package loaded");
        Ok(package)
    }

    fn push(&mut self, entry: Entry) {
        self.index.insert(entry.path.clone(), self.entries.len());
        self.entries.push(Some(entry));
    }

    fn live(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().flatten()
    }

    fn file(&self, path: &str) -> Option<&[u8]> {
        let idx = *self.index.get(path)?;
        match self.entries[idx].as_ref().map(|e| &e.data) {
            Some(EntryData::File(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Read an XML part as text, `None` when absent.
    ///
    /// Handles UTF-8 (with or without BOM) and UTF-16 LE/BE. A part that
    /// cannot be decoded is reported as [`Error::MalformedXml`].
    pub fn read_text(&self, path: &str) -> Result<Option<String>> {
        match self.file(path) {
            Some(bytes) => decode_xml_bytes(bytes).map(Some).map_err(|e| e.in_part(path)),
            None => Ok(None),
        }
    }

    /// Read the raw bytes of a file entry.
    pub fn read_binary(&self, path: &str) -> Option<&[u8]> {
        self.file(path)
    }

    /// Replace or create a file entry.
    pub fn write(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        let data = EntryData::File(bytes.into());
        match self.index.get(path) {
            Some(&idx) => {
                self.entries[idx] = Some(Entry {
                    path: path.to_string(),
                    data,
                });
            }
            None => self.push(Entry {
                path: path.to_string(),
                data,
            }),
        }
    }

    /// Delete an entry. Returns whether it existed.
    pub fn remove(&mut self, path: &str) -> bool {
        match self.index.remove(path) {
            Some(idx) => {
                self.entries[idx] = None;
                true
            }
            None => false,
        }
    }

    /// Check if a file exists in the package.
    pub fn exists(&self, path: &str) -> bool {
        self.file(path).is_some()
    }

    /// Find a file entry matching `path` exactly or, failing that, ignoring
    /// ASCII case (OPC part names are case-insensitive).
    pub fn resolve_entry(&self, path: &str) -> Option<&str> {
        if self.exists(path) {
            return self.index.get_key_value(path).map(|(k, _)| k.as_str());
        }
        self.live()
            .filter(|e| matches!(e.data, EntryData::File(_)))
            .find(|e| e.path.eq_ignore_ascii_case(path))
            .map(|e| e.path.as_str())
    }

    /// List all files in the package, in archive order.
    pub fn list_files(&self) -> Vec<String> {
        self.live()
            .filter(|e| matches!(e.data, EntryData::File(_)))
            .map(|e| e.path.clone())
            .collect()
    }

    /// List files matching a prefix.
    pub fn list_files_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.live()
            .filter(|e| matches!(e.data, EntryData::File(_)) && e.path.starts_with(prefix))
            .map(|e| e.path.clone())
            .collect()
    }

    /// Number of file entries.
    pub fn len(&self) -> usize {
        self.live()
            .filter(|e| matches!(e.data, EntryData::File(_)))
            .count()
    }

    /// Whether the package has no file entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read and parse the relationships of a part.
    ///
    /// A part without a `.rels` sibling has no relationships. A `.rels` part
    /// that does not parse is [`Error::MalformedXml`] for the `.rels` path.
    pub fn read_relationships(&self, part_path: &str) -> Result<Relationships> {
        let rels_path = Self::rels_path_for(part_path);
        match self.read_text(&rels_path)? {
            Some(xml) if !xml.trim().is_empty() => {
                Relationships::parse(&xml).map_err(|e| e.in_part(&rels_path))
            }
            _ => Ok(Relationships::default()),
        }
    }

    /// Path of the `.rels` part for `part_path`.
    pub fn rels_path_for(part_path: &str) -> String {
        let part_path = part_path.trim_start_matches('/');
        match part_path.rsplit_once('/') {
            _ if part_path.is_empty() => "_rels/.rels".to_string(),
            Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
            None => format!("_rels/{part_path}.rels"),
        }
    }

    /// Owner part of a `.rels` path; the empty string is the package root.
    pub fn part_for_rels(rels_path: &str) -> Option<String> {
        let file = rels_path.strip_suffix(".rels")?;
        let (dir, name) = match file.rsplit_once("/_rels/") {
            Some((dir, name)) => (Some(dir), name),
            None => (None, file.strip_prefix("_rels/")?),
        };
        if name.contains('/') {
            return None;
        }
        Some(match dir {
            Some(dir) => format!("{dir}/{name}"),
            None => name.to_string(),
        })
    }

    /// Resolve a relative path from a base path.
    ///
    /// `relative` is resolved against the directory of `base`; a leading `/`
    /// makes it package-absolute.
    pub fn resolve_path(base: &str, relative: &str) -> String {
        if let Some(stripped) = relative.strip_prefix('/') {
            return stripped.to_string();
        }

        let mut segments: Vec<&str> = match base.rsplit_once('/') {
            Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
            None => Vec::new(),
        };
        for component in relative.split(['/', '\\']) {
            match component {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                name => segments.push(name),
            }
        }
        segments.join("/")
    }

    /// Write every live entry, in original order, to a new ZIP archive.
    pub fn serialize(&self, options: &ArchiveOptions) -> Result<Vec<u8>> {
        let file_options = match options.compression_level {
            Some(0) => SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
            level => SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(level),
        };

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for entry in self.live() {
            match &entry.data {
                EntryData::Directory => writer.add_directory(entry.path.as_str(), file_options)?,
                EntryData::File(bytes) => {
                    writer.start_file(entry.path.as_str(), file_options)?;
                    writer.write_all(bytes)?;
                }
            }
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("files", &self.len())
            .finish()
    }
}
