use crate::clock::Clock;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, SiteError};
use crate::model::{ContentDocument, ContentStore, DocId, Image, Section};
use crate::seed::default_content;

/// Fields of a section to add. Without an id, one is generated.
#[derive(Debug, Clone, Default)]
pub struct NewSection {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
}

/// Fields to merge into an existing section. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<Image>>,
}

impl SectionPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.images.is_none()
    }
}

/// `section-<unix millis>`, with `-2`, `-3`... appended while taken.
pub fn next_section_id(doc: &ContentDocument, clock: &dyn Clock) -> String {
    let base = format!("section-{}", clock.now().timestamp_millis());
    if !doc.has_section(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !doc.has_section(candidate))
        .unwrap_or(base)
}

pub fn update_meta(
    store: &mut ContentStore,
    doc: DocId,
    title: Option<String>,
    subtitle: Option<String>,
) -> Result<CmdResult> {
    if title.is_none() && subtitle.is_none() {
        return Err(SiteError::Api(
            "Nothing to update: give a title or a subtitle".to_string(),
        ));
    }
    let document = store.doc_mut(doc);
    if let Some(title) = title {
        document.title = title;
    }
    if let Some(subtitle) = subtitle {
        document.subtitle = subtitle;
    }

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Updated {}", doc)));
    Ok(result)
}

/// Append a section to the end of `doc`.
pub fn add_section(
    store: &mut ContentStore,
    doc: DocId,
    new: NewSection,
    clock: &dyn Clock,
) -> Result<CmdResult> {
    let document = store.doc_mut(doc);
    let id = match new.id {
        Some(id) if id.trim().is_empty() => {
            return Err(SiteError::Validation("Section id must not be empty".to_string()))
        }
        Some(id) if document.has_section(&id) => {
            return Err(SiteError::Validation(format!(
                "Section id already exists in {}: {}",
                doc, id
            )))
        }
        Some(id) => id,
        None => next_section_id(document, clock),
    };

    let section = Section::new(id, new.title, new.content);
    document.sections.push(section.clone());

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Section added to {}: {}",
        doc, section.id
    )));
    result.affected_sections.push(section);
    Ok(result)
}

pub fn update_section(
    store: &mut ContentStore,
    doc: DocId,
    section_id: &str,
    patch: SectionPatch,
) -> Result<CmdResult> {
    let section = store
        .doc_mut(doc)
        .sections
        .iter_mut()
        .find(|s| s.id == section_id)
        .ok_or_else(|| section_not_found(doc, section_id))?;

    if let Some(title) = patch.title {
        section.title = title;
    }
    if let Some(content) = patch.content {
        section.content = content;
    }
    if let Some(images) = patch.images {
        section.images = images;
    }

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Section updated: {}",
        section_id
    )));
    result.affected_sections.push(section.clone());
    Ok(result)
}

/// Remove a section and its images. There is no undo.
pub fn delete_section(store: &mut ContentStore, doc: DocId, section_id: &str) -> Result<CmdResult> {
    let sections = &mut store.doc_mut(doc).sections;
    let position = sections
        .iter()
        .position(|s| s.id == section_id)
        .ok_or_else(|| section_not_found(doc, section_id))?;
    let removed = sections.remove(position);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Section deleted: {}",
        removed.title
    )));
    result.affected_sections.push(removed);
    Ok(result)
}

/// Replace `doc`, or every document, with the seed content.
pub fn reset(store: &mut ContentStore, doc: Option<DocId>) -> CmdResult {
    let seed = default_content();
    let mut result = CmdResult::default();
    match doc {
        Some(id) => {
            *store.doc_mut(id) = seed.doc(id).clone();
            result.add_message(CmdMessage::success(format!("{} reset to default", id)));
        }
        None => {
            *store = seed;
            result.add_message(CmdMessage::success("All content reset to default"));
        }
    }
    result
}

pub fn section_images(store: &ContentStore, doc: DocId, section_id: &str) -> Result<CmdResult> {
    let section = store
        .doc(doc)
        .section(section_id)
        .ok_or_else(|| section_not_found(doc, section_id))?;
    let mut result = CmdResult::default();
    if section.images.is_empty() {
        result.add_message(CmdMessage::info("No images."));
    }
    result.images = section.images.clone();
    Ok(result)
}

pub(crate) fn section_not_found(doc: DocId, section_id: &str) -> SiteError {
    SiteError::NotFound(format!("section {} in {}", section_id, doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn update_meta_merges_fields() {
        let mut store = default_content();
        let sections_before = store.technical_whitepaper.sections.clone();
        update_meta(
            &mut store,
            DocId::TechnicalWhitepaper,
            None,
            Some("New subtitle".into()),
        )
        .unwrap();

        let doc = &store.technical_whitepaper;
        assert_eq!(doc.title, "Technical Whitepaper");
        assert_eq!(doc.subtitle, "New subtitle");
        assert_eq!(doc.sections, sections_before);
    }

    #[test]
    fn update_meta_requires_a_field() {
        let mut store = default_content();
        assert!(matches!(
            update_meta(&mut store, DocId::FinancialFeatures, None, None),
            Err(SiteError::Api(_))
        ));
    }

    #[test]
    fn add_section_appends_with_generated_id() {
        let mut store = default_content();
        let clock = clock();
        let result = add_section(
            &mut store,
            DocId::TechnicalWhitepaper,
            NewSection {
                title: "New".into(),
                content: "Body".into(),
                ..Default::default()
            },
            &clock,
        )
        .unwrap();

        let last = store.technical_whitepaper.sections.last().unwrap();
        assert_eq!(last.title, "New");
        assert_eq!(last.id, format!("section-{}", clock.now().timestamp_millis()));
        assert_eq!(result.affected_sections[0].id, last.id);
    }

    #[test]
    fn generated_ids_never_collide() {
        let mut store = default_content();
        let clock = clock();
        for _ in 0..3 {
            add_section(
                &mut store,
                DocId::XandeumIntegration,
                NewSection::default(),
                &clock,
            )
            .unwrap();
        }
        assert!(store.duplicate_section_id().is_none());
        let ids: Vec<_> = store
            .xandeum_integration
            .sections
            .iter()
            .rev()
            .take(3)
            .map(|s| s.id.clone())
            .collect();
        let base = format!("section-{}", clock.now().timestamp_millis());
        assert_eq!(ids, vec![format!("{}-3", base), format!("{}-2", base), base]);
    }

    #[test]
    fn add_section_rejects_taken_id() {
        let mut store = default_content();
        let before = store.clone();
        let result = add_section(
            &mut store,
            DocId::TechnicalWhitepaper,
            NewSection {
                id: Some("executive-summary".into()),
                ..Default::default()
            },
            &clock(),
        );
        assert!(matches!(result, Err(SiteError::Validation(_))));
        assert_eq!(store, before);
    }

    #[test]
    fn update_section_merges_patch() {
        let mut store = default_content();
        update_section(
            &mut store,
            DocId::TechnicalWhitepaper,
            "executive-summary",
            SectionPatch {
                content: Some("Short.".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let section = store
            .technical_whitepaper
            .section("executive-summary")
            .unwrap();
        assert_eq!(section.title, "Executive Summary");
        assert_eq!(section.content, "Short.");
    }

    #[test]
    fn update_missing_section_is_not_found() {
        let mut store = default_content();
        let before = store.clone();
        let result = update_section(
            &mut store,
            DocId::TechnicalWhitepaper,
            "nope",
            SectionPatch::default(),
        );
        assert!(matches!(result, Err(SiteError::NotFound(_))));
        assert_eq!(store, before);
    }

    #[test]
    fn delete_section_removes_only_that_section() {
        let mut store = default_content();
        let count = store.architecture_overview.sections.len();
        delete_section(&mut store, DocId::ArchitectureOverview, "system-architecture").unwrap();
        assert_eq!(store.architecture_overview.sections.len(), count - 1);
        assert!(!store.architecture_overview.has_section("system-architecture"));
        assert!(matches!(
            delete_section(&mut store, DocId::ArchitectureOverview, "system-architecture"),
            Err(SiteError::NotFound(_))
        ));
    }

    #[test]
    fn reset_single_document_keeps_others() {
        let mut store = default_content();
        store.technical_whitepaper.title = "Changed".into();
        store.financial_features.title = "Changed too".into();

        reset(&mut store, Some(DocId::TechnicalWhitepaper));
        assert_eq!(store.technical_whitepaper.title, "Technical Whitepaper");
        assert_eq!(store.financial_features.title, "Changed too");

        reset(&mut store, None);
        assert_eq!(store, default_content());
    }
}
