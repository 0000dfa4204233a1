//! Evidence input types: modalities, file metadata, extracted text, and entity sets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ── Modality ──

/// Evidence modality. Each requires a different text-extraction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Document,
    Pdf,
    Image,
    Audio,
    Video,
}

impl Modality {
    /// Processing order used by the evidence stage.
    pub const ALL: [Modality; 5] = [
        Modality::Document,
        Modality::Pdf,
        Modality::Image,
        Modality::Audio,
        Modality::Video,
    ];

    /// Key used in the evidence-file input mapping (`documents`, `images`, ...).
    pub fn input_key(&self) -> &'static str {
        match self {
            Self::Document => "documents",
            Self::Pdf => "pdf",
            Self::Image => "images",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Prefix for generated source labels (`document_0`, `pdf_1`, ...).
    pub fn label_prefix(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    pub fn from_input_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.input_key() == key)
    }

    /// Map a stored evidence-file category onto a modality.
    ///
    /// Input keys map directly; `text`/`doc` and anything unknown fall back to
    /// documents, `image`/`photo` to images.
    pub fn from_category(category: &str) -> Self {
        if let Some(m) = Self::from_input_key(category) {
            return m;
        }
        match category {
            "image" | "photo" => Self::Image,
            _ => Self::Document,
        }
    }
}

// ── Input contract ──

/// Evidence files for one analysis run, keyed by modality.
///
/// Deserializes from `{"documents": [...], "pdf": [...], ...}`; unknown keys
/// are ignored and missing keys default to empty lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceFiles {
    #[serde(default)]
    pub documents: Vec<PathBuf>,
    #[serde(default)]
    pub pdf: Vec<PathBuf>,
    #[serde(default)]
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub audio: Vec<PathBuf>,
    #[serde(default)]
    pub video: Vec<PathBuf>,
}

impl EvidenceFiles {
    pub fn paths(&self, modality: Modality) -> &[PathBuf] {
        match modality {
            Modality::Document => &self.documents,
            Modality::Pdf => &self.pdf,
            Modality::Image => &self.images,
            Modality::Audio => &self.audio,
            Modality::Video => &self.video,
        }
    }

    pub fn push(&mut self, modality: Modality, path: impl Into<PathBuf>) {
        let list = match modality {
            Modality::Document => &mut self.documents,
            Modality::Pdf => &mut self.pdf,
            Modality::Image => &mut self.images,
            Modality::Audio => &mut self.audio,
            Modality::Video => &mut self.video,
        };
        list.push(path.into());
    }

    pub fn is_empty(&self) -> bool {
        Modality::ALL.iter().all(|m| self.paths(*m).is_empty())
    }

    pub fn total(&self) -> usize {
        Modality::ALL.iter().map(|m| self.paths(*m).len()).sum()
    }

    /// Build from stored evidence-file descriptors on a case record.
    ///
    /// Each descriptor carries `category` (or `type`) and `absolute_path`
    /// (or `path`). Descriptors without a path are skipped.
    pub fn from_descriptors(descriptors: &[Value]) -> Self {
        let mut files = Self::default();
        for d in descriptors {
            let category = d
                .get("category")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| d.get("type").and_then(Value::as_str))
                .unwrap_or("documents");
            let path = d
                .get("absolute_path")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| d.get("path").and_then(Value::as_str))
                .filter(|s| !s.is_empty());
            if let Some(path) = path {
                files.push(Modality::from_category(category), path);
            }
        }
        files
    }
}

// ── File metadata ──

/// Extension table used to classify evidence files.
const SUPPORTED_TYPES: &[(&str, &[&str])] = &[
    ("text", &[".txt", ".md", ".doc", ".docx"]),
    ("pdf", &[".pdf"]),
    ("image", &[".jpg", ".jpeg", ".png", ".gif", ".bmp"]),
    ("audio", &[".mp3", ".wav", ".m4a", ".ogg", ".flac"]),
    ("video", &[".mp4", ".avi", ".mov", ".mkv", ".webm"]),
];

/// Classify a file by extension: `text`, `pdf`, `image`, `audio`, `video`, or `unknown`.
pub fn file_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    SUPPORTED_TYPES
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(t, _)| *t)
        .unwrap_or("unknown")
}

/// Validation record for one evidence file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub valid: bool,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl FileMetadata {
    /// Record for a path that does not exist.
    pub fn missing(path: &Path) -> Self {
        Self {
            valid: false,
            file_path: path.display().to_string(),
            error: Some("File not found".to_string()),
            file_name: None,
            file_type: None,
            file_size_bytes: None,
            file_hash: None,
            timestamp: None,
        }
    }
}

// ── Extraction results ──

/// Why text could not be extracted from an evidence file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("error reading {path}: {message}")]
    Read { path: String, message: String },

    #[error("{0}")]
    Unavailable(String),

    #[error("error extracting {modality:?} text: {message}")]
    Failed { modality: Modality, message: String },
}

/// Text extracted from one evidence file, tagged by a generated source label.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub label: String,
    pub modality: Modality,
    pub outcome: Result<String, ExtractionError>,
}

impl ExtractedText {
    /// Extracted text, or `None` when extraction failed.
    pub fn text(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }
}

/// Per-case aggregate of extracted text, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceBundle {
    entries: Vec<ExtractedText>,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an extraction outcome, labelling it `{prefix}_{n}` where `n`
    /// counts the entries already present.
    pub fn push(
        &mut self,
        modality: Modality,
        outcome: Result<String, ExtractionError>,
    ) -> &ExtractedText {
        let label = format!("{}_{}", modality.label_prefix(), self.entries.len());
        self.entries.push(ExtractedText {
            label,
            modality,
            outcome,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ExtractedText] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Successful, non-empty extractions as `(label, text)` pairs.
    pub fn successful(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|e| e.text().map(|t| (e.label.as_str(), t)))
            .filter(|(_, t)| !t.is_empty())
    }
}

// ── Entities ──

/// A structured timeline entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
}

impl TimelineEvent {
    /// Coerce a model-produced value into a timeline entry.
    ///
    /// Objects read `date` and `description` (or `event`); bare strings become
    /// a description with no date. Nulls are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(obj) => Some(Self {
                date: obj.get("date").and_then(value_as_text).unwrap_or_default(),
                description: obj
                    .get("description")
                    .or_else(|| obj.get("event"))
                    .and_then(value_as_text)
                    .unwrap_or_default(),
            }),
            other => value_as_text(other).map(|description| Self {
                date: String::new(),
                description,
            }),
        }
    }
}

/// Entities extracted from case evidence, by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    #[serde(default)]
    pub persons: Vec<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub legal_references: Vec<String>,
    #[serde(default)]
    pub money_amounts: Vec<String>,
    #[serde(default)]
    pub numbers: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub witness_statements: Vec<String>,
    #[serde(default)]
    pub timeline_events: Vec<TimelineEvent>,
}

impl EntitySet {
    /// Categories holding plain strings (deduplicated after accumulation).
    pub const SCALAR_CATEGORIES: [&'static str; 8] = [
        "persons",
        "dates",
        "locations",
        "legal_references",
        "money_amounts",
        "numbers",
        "organizations",
        "witness_statements",
    ];

    /// Build from a parsed model response. Only keys whose value is a list
    /// are taken; everything else keeps its empty default.
    pub fn from_json(parsed: &Map<String, Value>) -> Self {
        let mut set = Self::default();
        for category in Self::SCALAR_CATEGORIES {
            if let Some(Value::Array(items)) = parsed.get(category)
                && let Some(list) = set.scalar_mut(category)
            {
                *list = items.iter().filter_map(value_as_text).collect();
            }
        }
        if let Some(Value::Array(items)) = parsed.get("timeline_events") {
            set.timeline_events = items.iter().filter_map(TimelineEvent::from_value).collect();
        }
        set
    }

    pub fn scalar(&self, category: &str) -> Option<&[String]> {
        let list = match category {
            "persons" => &self.persons,
            "dates" => &self.dates,
            "locations" => &self.locations,
            "legal_references" => &self.legal_references,
            "money_amounts" => &self.money_amounts,
            "numbers" => &self.numbers,
            "organizations" => &self.organizations,
            "witness_statements" => &self.witness_statements,
            _ => return None,
        };
        Some(list)
    }

    fn scalar_mut(&mut self, category: &str) -> Option<&mut Vec<String>> {
        let list = match category {
            "persons" => &mut self.persons,
            "dates" => &mut self.dates,
            "locations" => &mut self.locations,
            "legal_references" => &mut self.legal_references,
            "money_amounts" => &mut self.money_amounts,
            "numbers" => &mut self.numbers,
            "organizations" => &mut self.organizations,
            "witness_statements" => &mut self.witness_statements,
            _ => return None,
        };
        Some(list)
    }

    /// Append every category of `other` onto this set.
    pub fn extend(&mut self, other: EntitySet) {
        self.persons.extend(other.persons);
        self.dates.extend(other.dates);
        self.locations.extend(other.locations);
        self.legal_references.extend(other.legal_references);
        self.money_amounts.extend(other.money_amounts);
        self.numbers.extend(other.numbers);
        self.organizations.extend(other.organizations);
        self.witness_statements.extend(other.witness_statements);
        self.timeline_events.extend(other.timeline_events);
    }

    /// Deduplicate scalar categories into sorted lists.
    ///
    /// Timeline events keep their order and duplicates.
    pub fn dedup(&mut self) {
        for category in Self::SCALAR_CATEGORIES {
            if let Some(list) = self.scalar_mut(category) {
                *list = dedup_sorted(std::mem::take(list));
            }
        }
    }

    /// Total number of extracted entries across all categories.
    pub fn total(&self) -> usize {
        Self::SCALAR_CATEGORIES
            .iter()
            .filter_map(|c| self.scalar(c))
            .map(|l| l.len())
            .sum::<usize>()
            + self.timeline_events.len()
    }
}

/// Sorted, duplicate-free copy of a string list.
pub fn dedup_sorted(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Render a JSON value as plain text: strings verbatim, nulls dropped,
/// everything else as compact JSON.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Coerce a JSON list into strings. Non-list values yield an empty list.
pub fn coerce_strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_as_text).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedup_scalar_category() {
        let mut set = EntitySet {
            persons: vec!["a".into(), "a".into(), "b".into()],
            ..Default::default()
        };
        set.dedup();
        assert_eq!(set.persons, vec!["a", "b"]);
    }

    #[test]
    fn dedup_sorts_lexicographically() {
        let out = dedup_sorted(vec!["Ravi".into(), "Anita".into(), "Ravi".into()]);
        assert_eq!(out, vec!["Anita", "Ravi"]);
    }

    #[test]
    fn dedup_keeps_timeline_duplicates() {
        let ev = TimelineEvent {
            date: "2023-01-01".into(),
            description: "notice sent".into(),
        };
        let mut set = EntitySet {
            timeline_events: vec![ev.clone(), ev.clone()],
            ..Default::default()
        };
        set.dedup();
        assert_eq!(set.timeline_events.len(), 2);
    }

    #[test]
    fn from_json_takes_only_lists() {
        let parsed = json!({
            "persons": ["Ravi Kumar", 42, null],
            "dates": "12 March 2023",
            "timeline_events": [
                {"date": "2023-03-12", "description": "sale agreement signed"},
                "payment withheld"
            ],
            "unrelated": [1, 2]
        });
        let set = EntitySet::from_json(parsed.as_object().unwrap());
        assert_eq!(set.persons, vec!["Ravi Kumar", "42"]);
        assert!(set.dates.is_empty());
        assert_eq!(set.timeline_events.len(), 2);
        assert_eq!(set.timeline_events[1].date, "");
        assert_eq!(set.timeline_events[1].description, "payment withheld");
    }

    #[test]
    fn extend_accumulates_across_files() {
        let mut all = EntitySet::default();
        all.extend(EntitySet {
            persons: vec!["a".into()],
            ..Default::default()
        });
        all.extend(EntitySet {
            persons: vec!["a".into(), "c".into()],
            dates: vec!["d".into()],
            ..Default::default()
        });
        assert_eq!(all.persons.len(), 3);
        assert_eq!(all.total(), 4);
    }

    #[test]
    fn bundle_labels_count_existing_entries() {
        let mut bundle = EvidenceBundle::new();
        bundle.push(Modality::Document, Ok("a".into()));
        bundle.push(
            Modality::Pdf,
            Err(ExtractionError::Unavailable("no pdf".into())),
        );
        let last = bundle.push(Modality::Image, Ok("c".into()));
        assert_eq!(last.label, "image_2");
        let ok: Vec<_> = bundle.successful().map(|(l, _)| l).collect();
        assert_eq!(ok, vec!["document_0", "image_2"]);
    }

    #[test]
    fn evidence_files_ignore_unknown_keys() {
        let files: EvidenceFiles = serde_json::from_value(json!({
            "documents": ["/tmp/a.txt"],
            "holograms": ["/tmp/b.holo"]
        }))
        .unwrap();
        assert_eq!(files.documents.len(), 1);
        assert!(files.pdf.is_empty());
        assert_eq!(files.total(), 1);
    }

    #[test]
    fn descriptors_map_categories() {
        let files = EvidenceFiles::from_descriptors(&[
            json!({"category": "photo", "absolute_path": "/e/p.jpg"}),
            json!({"type": "text", "path": "/e/a.txt"}),
            json!({"category": "spreadsheet", "path": "/e/s.xls"}),
            json!({"category": "pdf"}),
        ]);
        assert_eq!(files.images, vec![PathBuf::from("/e/p.jpg")]);
        assert_eq!(files.documents.len(), 2);
        assert!(files.pdf.is_empty());
    }

    #[test]
    fn file_types_by_extension() {
        assert_eq!(file_type_for(Path::new("a/b/Statement.TXT")), "text");
        assert_eq!(file_type_for(Path::new("x.pdf")), "pdf");
        assert_eq!(file_type_for(Path::new("x.webm")), "video");
        assert_eq!(file_type_for(Path::new("x")), "unknown");
    }
}
