//! # Data Model
//!
//! Two logical records are persisted:
//!
//! - [`ContentStore`]: the editable copy of the four documentation pages, each a
//!   [`ContentDocument`] made of ordered [`Section`]s.
//! - [`RoadmapData`]: quarters of roadmap [`Task`]s.
//!
//! Field names serialize in camelCase so exported files keep the shape the site
//! has always used (`technicalWhitepaper`, `lastUpdated`, ...).
//!
//! ## Ordering
//!
//! `sections`, `quarters` and `tasks` are display order. Nothing in the crate
//! sorts them; they round-trip through storage untouched.
//!
//! ## Images
//!
//! A section does not carry image bytes. [`Image::blob`] is the SHA-256 of the
//! decoded payload, which lives in the blob store (see [`crate::blobs`]).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocId {
    TechnicalWhitepaper,
    ArchitectureOverview,
    XandeumIntegration,
    FinancialFeatures,
}

impl DocId {
    pub const ALL: [DocId; 4] = [
        DocId::TechnicalWhitepaper,
        DocId::ArchitectureOverview,
        DocId::XandeumIntegration,
        DocId::FinancialFeatures,
    ];

    /// The field name used for this document in the persisted record.
    pub fn key(&self) -> &'static str {
        match self {
            DocId::TechnicalWhitepaper => "technicalWhitepaper",
            DocId::ArchitectureOverview => "architectureOverview",
            DocId::XandeumIntegration => "xandeumIntegration",
            DocId::FinancialFeatures => "financialFeatures",
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DocId {
    type Err = String;

    /// Accepts the record key (`technicalWhitepaper`) or a short page name
    /// (`whitepaper`, `architecture`, `integration`, `features`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "technicalwhitepaper" | "whitepaper" => Ok(DocId::TechnicalWhitepaper),
            "architectureoverview" | "architecture" => Ok(DocId::ArchitectureOverview),
            "xandeumintegration" | "integration" => Ok(DocId::XandeumIntegration),
            "financialfeatures" | "features" => Ok(DocId::FinancialFeatures),
            _ => Err(format!("Unknown document: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Timestamp-derived id, unique within the owning section.
    pub id: i64,
    /// Hex SHA-256 of the image bytes.
    pub blob: String,
    /// Original file name.
    pub name: String,
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// Paragraphs separated by a blank line.
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
}

pub const PARAGRAPH_DELIMITER: &str = "\n\n";

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content
            .split(PARAGRAPH_DELIMITER)
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub title: String,
    pub subtitle: String,
    pub sections: Vec<Section>,
}

impl ContentDocument {
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn has_section(&self, id: &str) -> bool {
        self.section(id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStore {
    pub technical_whitepaper: ContentDocument,
    pub architecture_overview: ContentDocument,
    pub xandeum_integration: ContentDocument,
    pub financial_features: ContentDocument,
}

impl ContentStore {
    pub fn doc(&self, id: DocId) -> &ContentDocument {
        match id {
            DocId::TechnicalWhitepaper => &self.technical_whitepaper,
            DocId::ArchitectureOverview => &self.architecture_overview,
            DocId::XandeumIntegration => &self.xandeum_integration,
            DocId::FinancialFeatures => &self.financial_features,
        }
    }

    pub fn doc_mut(&mut self, id: DocId) -> &mut ContentDocument {
        match id {
            DocId::TechnicalWhitepaper => &mut self.technical_whitepaper,
            DocId::ArchitectureOverview => &mut self.architecture_overview,
            DocId::XandeumIntegration => &mut self.xandeum_integration,
            DocId::FinancialFeatures => &mut self.financial_features,
        }
    }

    pub fn documents(&self) -> impl Iterator<Item = (DocId, &ContentDocument)> {
        DocId::ALL.into_iter().map(move |id| (id, self.doc(id)))
    }

    /// Every blob hash referenced by any section of any document.
    pub fn referenced_blobs(&self) -> HashSet<&str> {
        self.documents()
            .flat_map(|(_, doc)| doc.sections.iter())
            .flat_map(|s| s.images.iter())
            .map(|img| img.blob.as_str())
            .collect()
    }

    /// First section id that appears twice within one document.
    pub fn duplicate_section_id(&self) -> Option<(DocId, String)> {
        for (id, doc) in self.documents() {
            let mut seen = HashSet::new();
            for section in &doc.sections {
                if !seen.insert(section.id.as_str()) {
                    return Some((id, section.id.clone()));
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Foundation,
    Financial,
    Frontend,
    Analytics,
    Security,
    Xandeum,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Foundation,
        Category::Financial,
        Category::Frontend,
        Category::Analytics,
        Category::Security,
        Category::Xandeum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Foundation => "Foundation",
            Category::Financial => "Financial",
            Category::Frontend => "Frontend",
            Category::Analytics => "Analytics",
            Category::Security => "Security",
            Category::Xandeum => "Xandeum",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown category: {} (expected one of {})",
                    s,
                    Category::ALL.map(|c| c.name()).join(", ")
                )
            })
    }
}

/// Clamps any integer into the 0..=100 progress range.
pub fn clamp_progress(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_progress(raw.round() as i64))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(deserialize_with = "deserialize_progress")]
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quarter {
    pub id: String,
    pub name: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapData {
    /// Calendar date (`YYYY-MM-DD`) of the last roadmap edit.
    pub last_updated: String,
    pub quarters: Vec<Quarter>,
}

impl RoadmapData {
    pub fn quarter(&self, id: &str) -> Option<&Quarter> {
        self.quarters.iter().find(|q| q.id == id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.quarters.iter().flat_map(|q| q.tasks.iter())
    }

    pub fn has_task_id(&self, id: &str) -> bool {
        self.tasks().any(|t| t.id == id)
    }

    pub fn duplicate_task_id(&self) -> Option<String> {
        let mut seen = HashSet::new();
        self.tasks()
            .find(|t| !seen.insert(t.id.as_str()))
            .map(|t| t.id.clone())
    }

    pub fn duplicate_quarter_id(&self) -> Option<String> {
        let mut seen = HashSet::new();
        self.quarters
            .iter()
            .find(|q| !seen.insert(q.id.as_str()))
            .map(|q| q.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_parses_keys_and_short_names() {
        assert_eq!(
            "technicalWhitepaper".parse::<DocId>().unwrap(),
            DocId::TechnicalWhitepaper
        );
        assert_eq!("features".parse::<DocId>().unwrap(), DocId::FinancialFeatures);
        assert_eq!(
            "Architecture".parse::<DocId>().unwrap(),
            DocId::ArchitectureOverview
        );
        assert!("roadmap".parse::<DocId>().is_err());
    }

    #[test]
    fn section_paragraphs_split_on_blank_lines() {
        let section = Section::new("s", "T", "First.\n\nSecond.\n\n\n\nThird.");
        let paragraphs: Vec<_> = section.paragraphs().collect();
        assert_eq!(paragraphs, vec!["First.", "Second.", "Third."]);
    }

    #[test]
    fn section_without_images_omits_field() {
        let json = serde_json::to_value(Section::new("a", "b", "c")).unwrap();
        assert!(json.get("images").is_none());

        let parsed: Section =
            serde_json::from_str(r#"{"id":"a","title":"b","content":"c"}"#).unwrap();
        assert!(parsed.images.is_empty());
    }

    #[test]
    fn task_progress_is_clamped_on_deserialize() {
        let high: Task = serde_json::from_str(
            r#"{"id":"x","title":"X","description":"","category":"Security","progress":150}"#,
        )
        .unwrap();
        assert_eq!(high.progress, 100);

        let low: Task = serde_json::from_str(
            r#"{"id":"x","title":"X","description":"","category":"Security","progress":-5}"#,
        )
        .unwrap();
        assert_eq!(low.progress, 0);
    }

    #[test]
    fn unknown_category_fails_to_deserialize() {
        let res: Result<Task, _> = serde_json::from_str(
            r#"{"id":"x","title":"X","description":"","category":"Marketing","progress":5}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!("xandeum".parse::<Category>().unwrap(), Category::Xandeum);
        assert!("nope".parse::<Category>().is_err());
    }

    #[test]
    fn roadmap_reports_duplicate_task_ids_across_quarters() {
        let task = |id: &str| Task {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            category: Category::Foundation,
            progress: 0,
        };
        let roadmap = RoadmapData {
            last_updated: "2026-01-01".into(),
            quarters: vec![
                Quarter {
                    id: "q1".into(),
                    name: "Q1".into(),
                    tasks: vec![task("a")],
                },
                Quarter {
                    id: "q2".into(),
                    name: "Q2".into(),
                    tasks: vec![task("b"), task("a")],
                },
            ],
        };
        assert_eq!(roadmap.duplicate_task_id(), Some("a".to_string()));
        assert_eq!(roadmap.duplicate_quarter_id(), None);
    }
}
