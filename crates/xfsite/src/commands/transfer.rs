//! Export and import of whole records as pretty-printed JSON files.
//!
//! Imports are all-or-nothing: the text is parsed, shape-checked and
//! deserialized in full before the current state is replaced, so any failure
//! leaves the state exactly as it was.

use crate::commands::{CmdMessage, CmdResult, ExportFile};
use crate::error::{Result, SiteError};
use crate::model::{ContentStore, RoadmapData};
use crate::schema::{content_schema, roadmap_schema, validate, Schema};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub fn content_file_name(now: DateTime<Utc>) -> String {
    format!("xandeum-content-export-{}.json", now.format("%Y-%m-%d"))
}

pub fn roadmap_file_name(now: DateTime<Utc>) -> String {
    format!("xandeum-roadmap-config-{}.json", now.format("%Y-%m-%d"))
}

fn export<T: Serialize>(value: &T, file_name: String) -> Result<CmdResult> {
    let contents = serde_json::to_string_pretty(value)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Exported {}", file_name)));
    result.export = Some(ExportFile {
        file_name,
        contents,
    });
    Ok(result)
}

pub fn export_content(store: &ContentStore, now: DateTime<Utc>) -> Result<CmdResult> {
    export(store, content_file_name(now))
}

pub fn export_roadmap(roadmap: &RoadmapData, now: DateTime<Utc>) -> Result<CmdResult> {
    export(roadmap, roadmap_file_name(now))
}

fn parse<T: DeserializeOwned>(raw: &str, schema: &Schema, what: &str) -> Result<T> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| SiteError::Parse(format!("{} is not valid JSON: {}", what, e)))?;
    if !validate(&value, Some(schema)) {
        return Err(SiteError::Parse(format!(
            "{} is missing required fields",
            what
        )));
    }
    serde_json::from_value(value).map_err(|e| SiteError::Parse(format!("{}: {}", what, e)))
}

/// Check a content store for id collisions.
pub fn check_content(store: &ContentStore) -> Result<()> {
    if let Some((doc, id)) = store.duplicate_section_id() {
        return Err(SiteError::Parse(format!(
            "duplicate section id in {}: {}",
            doc, id
        )));
    }
    Ok(())
}

/// Check a roadmap for id collisions.
pub fn check_roadmap(roadmap: &RoadmapData) -> Result<()> {
    if let Some(id) = roadmap.duplicate_quarter_id() {
        return Err(SiteError::Parse(format!("duplicate quarter id: {}", id)));
    }
    if let Some(id) = roadmap.duplicate_task_id() {
        return Err(SiteError::Parse(format!("duplicate task id: {}", id)));
    }
    Ok(())
}

pub fn parse_content(raw: &str) -> Result<ContentStore> {
    let store: ContentStore = parse(raw, content_schema(), "content file")?;
    check_content(&store)?;
    Ok(store)
}

pub fn parse_roadmap(raw: &str) -> Result<RoadmapData> {
    let roadmap: RoadmapData = parse(raw, roadmap_schema(), "roadmap file")?;
    check_roadmap(&roadmap)?;
    Ok(roadmap)
}

/// Replace the whole content store with the one in `raw`.
pub fn import_content(store: &mut ContentStore, raw: &str) -> Result<CmdResult> {
    let imported = parse_content(raw)?;
    let sections: usize = imported.documents().map(|(_, d)| d.sections.len()).sum();
    *store = imported;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Content imported ({} sections)",
        sections
    )));
    Ok(result)
}

/// Replace the roadmap with the one in `raw`, stamping `lastUpdated`.
pub fn import_roadmap(
    roadmap: &mut RoadmapData,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let mut imported = parse_roadmap(raw)?;
    imported.last_updated = now.format("%Y-%m-%d").to_string();
    let tasks = imported.tasks().count();
    *roadmap = imported;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Roadmap imported ({} quarters, {} tasks)",
        roadmap.quarters.len(),
        tasks
    )));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocId, Section};
    use crate::seed::{default_content, default_roadmap};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 8, 30, 0).unwrap()
    }

    #[test]
    fn export_names_files_by_date() {
        let result = export_content(&default_content(), now()).unwrap();
        let file = result.export.unwrap();
        assert_eq!(file.file_name, "xandeum-content-export-2026-03-09.json");
        assert!(file.contents.contains("\n  \"technicalWhitepaper\""));

        let result = export_roadmap(&default_roadmap("2026-01-01"), now()).unwrap();
        assert_eq!(
            result.export.unwrap().file_name,
            "xandeum-roadmap-config-2026-03-09.json"
        );
    }

    #[test]
    fn content_export_then_import_restores_state() {
        let mut store = default_content();
        store
            .doc_mut(DocId::FinancialFeatures)
            .sections
            .push(Section::new("section-1", "New", "Body"));
        let exported = export_content(&store, now()).unwrap().export.unwrap();

        let mut target = default_content();
        import_content(&mut target, &exported.contents).unwrap();
        assert_eq!(target, store);
    }

    #[test]
    fn malformed_import_leaves_state_untouched() {
        let mut store = default_content();
        store.technical_whitepaper.title = "Edited".into();
        let before = store.clone();

        for raw in [
            "{ not json",
            "[]",
            r#"{"technicalWhitepaper": {}}"#,
            r#"{"technicalWhitepaper": {}, "architectureOverview": {}, "xandeumIntegration": {}, "financialFeatures": {}}"#,
        ] {
            assert!(
                matches!(import_content(&mut store, raw), Err(SiteError::Parse(_))),
                "accepted {}",
                raw
            );
            assert_eq!(store, before);
        }
    }

    #[test]
    fn import_rejects_duplicate_section_ids() {
        let mut source = default_content();
        let dup = source.technical_whitepaper.sections[0].clone();
        source.technical_whitepaper.sections.push(dup);
        let raw = serde_json::to_string(&source).unwrap();

        let mut store = default_content();
        assert!(matches!(
            import_content(&mut store, &raw),
            Err(SiteError::Parse(_))
        ));
        assert_eq!(store, default_content());
    }

    #[test]
    fn roadmap_import_stamps_date_and_rejects_duplicates() {
        let mut roadmap = default_roadmap("2026-01-01");
        let source = default_roadmap("2025-06-01");
        let raw = serde_json::to_string(&source).unwrap();
        import_roadmap(&mut roadmap, &raw, now()).unwrap();
        assert_eq!(roadmap.last_updated, "2026-03-09");
        assert_eq!(roadmap.quarters, source.quarters);

        let mut dup = source.clone();
        let task = dup.quarters[0].tasks[0].clone();
        dup.quarters[1].tasks.push(task);
        let before = roadmap.clone();
        assert!(import_roadmap(&mut roadmap, &serde_json::to_string(&dup).unwrap(), now()).is_err());
        assert_eq!(roadmap, before);
    }

    #[test]
    fn roadmap_import_clamps_progress() {
        let raw = r#"{
            "lastUpdated": "2025-01-01",
            "quarters": [{"id": "q1", "name": "Q1", "tasks": [
                {"id": "a", "title": "A", "description": "", "category": "Frontend", "progress": 250}
            ]}]
        }"#;
        let mut roadmap = default_roadmap("2026-01-01");
        import_roadmap(&mut roadmap, raw, now()).unwrap();
        assert_eq!(roadmap.quarters[0].tasks[0].progress, 100);
    }
}
