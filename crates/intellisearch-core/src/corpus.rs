//! Corpus loading.
//!
//! Accepts a single JSON file (an array of records or one record), or a
//! directory walked recursively for `.json` and `.txt` files. Plain text
//! files become one document each: the title is the file stem and the
//! category is the parent directory relative to the root (or `misc`).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Document;

const DEFAULT_SOURCE: &str = "Local Knowledge Base";
const DEFAULT_CATEGORY: &str = "misc";

/// Article record. Both the flat layout and the `{content, metadata}` layout
/// are accepted; `topics` is read as an alias of `keywords`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusRecord {
    Nested { content: String, metadata: RecordMetadata, id: Option<String> },
    Flat(FlatRecord),
}

#[derive(Debug, Deserialize)]
struct RecordMetadata {
    title: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, alias = "topics")]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FlatRecord {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "topics")]
    keywords: Vec<String>,
    #[serde(default, alias = "source")]
    source_label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Many(Vec<CorpusRecord>),
    One(CorpusRecord),
}

#[derive(Debug, Clone)]
pub struct CorpusLoader {
    default_source: String,
}

impl Default for CorpusLoader {
    fn default() -> Self {
        Self { default_source: DEFAULT_SOURCE.to_string() }
    }
}

impl CorpusLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source label used for records that do not carry one.
    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.default_source = label.into();
        self
    }

    pub fn load(&self, path: &Path) -> Result<Vec<Document>> {
        if path.is_dir() {
            self.load_directory(path)
        } else if path.is_file() {
            match extension(path) {
                Some("json") => self.load_json_file(path, None),
                Some("txt") => Ok(self.load_txt_file(path, path.parent().unwrap_or(path))?.into_iter().collect()),
                _ => Err(Error::Corpus(format!("unsupported corpus file: {}", path.display()))),
            }
        } else {
            Err(Error::Corpus(format!("corpus path not found: {}", path.display())))
        }
    }

    pub fn load_directory(&self, root: &Path) -> Result<Vec<Document>> {
        let files = list_corpus_files(root);
        if files.is_empty() {
            tracing::warn!(root = %root.display(), "no .json or .txt files found");
            return Ok(vec![]);
        }
        let mut documents = Vec::new();
        for (i, file) in files.iter().enumerate() {
            tracing::debug!(file = %file.display(), n = i + 1, of = files.len(), "loading corpus file");
            match extension(file) {
                Some("json") => documents.extend(self.load_json_file(file, Some(root))?),
                Some("txt") => documents.extend(self.load_txt_file(file, root)?),
                _ => {}
            }
        }
        tracing::info!(files = files.len(), documents = documents.len(), "corpus loaded");
        Ok(documents)
    }

    /// Parse JSON corpus text. Records without an id get `{stem}-{n}`
    /// (1-based position in the file). Directory walks pass the stem with its
    /// relative directory (`astronomy/articles`) so generated ids stay unique
    /// across same-named files.
    pub fn parse_json(&self, text: &str, stem: &str, category_hint: Option<&str>) -> Result<Vec<Document>> {
        let file: CorpusFile =
            serde_json::from_str(text).map_err(|e| Error::Corpus(format!("{stem}: {e}")))?;
        let records = match file {
            CorpusFile::Many(records) => records,
            CorpusFile::One(record) => vec![record],
        };
        Ok(records
            .into_iter()
            .enumerate()
            .map(|(i, record)| self.to_document(record, &format!("{stem}-{}", i + 1), category_hint))
            .collect())
    }

    fn load_json_file(&self, path: &Path, root: Option<&Path>) -> Result<Vec<Document>> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Corpus(format!("read {}: {e}", path.display())))?;
        let category = root.and_then(|r| facet_from_path(path, r));
        let stem = match &category {
            Some(dir) => format!("{dir}/{}", file_stem(path)),
            None => file_stem(path),
        };
        self.parse_json(&text, &stem, category.as_deref())
    }

    fn load_txt_file(&self, path: &Path, root: &Path) -> Result<Option<Document>> {
        let bytes =
            fs::read(path).map_err(|e| Error::Corpus(format!("read {}: {e}", path.display())))?;
        let content = String::from_utf8_lossy(&bytes).trim().to_string();
        if content.is_empty() {
            tracing::debug!(file = %path.display(), "skipping empty text file");
            return Ok(None);
        }
        let stem = file_stem(path);
        let category = facet_from_path(path, root).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        Ok(Some(Document {
            id: format!("{category}/{stem}"),
            title: stem,
            content,
            category,
            keywords: Vec::new(),
            source_label: self.default_source.clone(),
        }))
    }

    fn to_document(&self, record: CorpusRecord, fallback_id: &str, category_hint: Option<&str>) -> Document {
        let category_or = |c: Option<String>| {
            c.filter(|c| !c.trim().is_empty())
                .or_else(|| category_hint.map(str::to_string))
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
        };
        match record {
            CorpusRecord::Nested { content, metadata, id } => Document {
                id: id.unwrap_or_else(|| fallback_id.to_string()),
                title: metadata.title,
                content,
                category: category_or(metadata.category),
                keywords: metadata.keywords,
                source_label: metadata.source.unwrap_or_else(|| self.default_source.clone()),
            },
            CorpusRecord::Flat(r) => {
                let content = if r.content.trim().is_empty() { r.summary.unwrap_or_default() } else { r.content };
                Document {
                    id: r.id.unwrap_or_else(|| fallback_id.to_string()),
                    title: r.title,
                    content,
                    category: category_or(r.category),
                    keywords: r.keywords,
                    source_label: r.source_label.unwrap_or_else(|| self.default_source.clone()),
                }
            }
        }
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map_or_else(|| "corpus".to_string(), |s| s.to_string_lossy().to_string())
}

fn facet_from_path(file: &Path, root: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .parent()
        .and_then(|p| p.to_str())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

fn list_corpus_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| matches!(extension(p), Some("json" | "txt")))
        .collect();
    files.sort();
    files
}
