//! Per-section edit session.
//!
//! At most one section is open for editing at a time. Opening a section copies
//! its title, content and images into a [`Draft`]; the draft changes freely
//! without touching the document until [`EditSession::save`] commits it.
//! [`EditSession::cancel`] throws it away.
//!
//! ```text
//! Viewing --start--> Editing { draft } --save--> Viewing (draft committed)
//!                                      --cancel--> Viewing (draft dropped)
//! ```

use crate::clock::Clock;
use crate::commands::content::{section_not_found, update_section, SectionPatch};
use crate::commands::CmdResult;
use crate::error::{Result, SiteError};
use crate::model::{ContentStore, DocId, Image};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub images: Vec<Image>,
}

impl Draft {
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Attach an image, giving it an id derived from the clock.
    pub fn attach_image(
        &mut self,
        blob: String,
        name: String,
        media_type: String,
        clock: &dyn Clock,
    ) -> Image {
        let mut id = clock.now().timestamp_millis();
        while self.images.iter().any(|img| img.id == id) {
            id += 1;
        }
        let image = Image {
            id,
            blob,
            name,
            media_type,
        };
        self.images.push(image.clone());
        image
    }

    pub fn remove_image(&mut self, image_id: i64) -> Result<Image> {
        let position = self
            .images
            .iter()
            .position(|img| img.id == image_id)
            .ok_or_else(|| SiteError::NotFound(format!("image {}", image_id)))?;
        Ok(self.images.remove(position))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditSession {
    #[default]
    Viewing,
    Editing {
        doc: DocId,
        section: String,
        draft: Draft,
    },
}

impl EditSession {
    pub fn is_editing(&self) -> bool {
        matches!(self, EditSession::Editing { .. })
    }

    /// The open section, if any.
    pub fn target(&self) -> Option<(DocId, &str)> {
        match self {
            EditSession::Viewing => None,
            EditSession::Editing { doc, section, .. } => Some((*doc, section.as_str())),
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        match self {
            EditSession::Viewing => None,
            EditSession::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn draft_mut(&mut self) -> Result<&mut Draft> {
        match self {
            EditSession::Viewing => Err(no_edit_in_progress()),
            EditSession::Editing { draft, .. } => Ok(draft),
        }
    }

    /// Open `section_id` for editing. Fails while another edit is open.
    pub fn start(&mut self, store: &ContentStore, doc: DocId, section_id: &str) -> Result<&Draft> {
        if let Some((open_doc, open_section)) = self.target() {
            return Err(SiteError::Api(format!(
                "Already editing section {} in {}",
                open_section, open_doc
            )));
        }
        let section = store
            .doc(doc)
            .section(section_id)
            .ok_or_else(|| section_not_found(doc, section_id))?;

        *self = EditSession::Editing {
            doc,
            section: section_id.to_string(),
            draft: Draft {
                title: section.title.clone(),
                content: section.content.clone(),
                images: section.images.clone(),
            },
        };
        self.draft().ok_or_else(no_edit_in_progress)
    }

    /// Commit the draft to `store` and return to viewing.
    ///
    /// If the section is gone the session stays open and `NotFound` is
    /// returned, so the draft is not lost.
    pub fn save(&mut self, store: &mut ContentStore) -> Result<CmdResult> {
        let EditSession::Editing {
            doc,
            section,
            draft,
        } = self
        else {
            return Err(no_edit_in_progress());
        };

        let patch = SectionPatch {
            title: Some(draft.title.clone()),
            content: Some(draft.content.clone()),
            images: Some(draft.images.clone()),
        };
        let result = update_section(store, *doc, section, patch)?;
        *self = EditSession::Viewing;
        Ok(result)
    }

    /// Drop the draft and return to viewing.
    pub fn cancel(&mut self) -> Result<Draft> {
        match std::mem::take(self) {
            EditSession::Viewing => Err(no_edit_in_progress()),
            EditSession::Editing { draft, .. } => Ok(draft),
        }
    }
}

fn no_edit_in_progress() -> SiteError {
    SiteError::Api("No section is being edited".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::seed::default_content;
    use chrono::{TimeZone, Utc};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn save_commits_draft() {
        let mut store = default_content();
        let mut session = EditSession::default();
        session
            .start(&store, DocId::TechnicalWhitepaper, "executive-summary")
            .unwrap();
        session.draft_mut().unwrap().set_title("Summary");

        // Document untouched until save
        assert_eq!(
            store
                .technical_whitepaper
                .section("executive-summary")
                .unwrap()
                .title,
            "Executive Summary"
        );

        session.save(&mut store).unwrap();
        assert!(!session.is_editing());
        assert_eq!(
            store
                .technical_whitepaper
                .section("executive-summary")
                .unwrap()
                .title,
            "Summary"
        );
    }

    #[test]
    fn cancel_discards_draft() {
        let mut store = default_content();
        let before = store.clone();
        let mut session = EditSession::default();
        session
            .start(&store, DocId::TechnicalWhitepaper, "executive-summary")
            .unwrap();
        session.draft_mut().unwrap().set_content("scratch");

        let dropped = session.cancel().unwrap();
        assert_eq!(dropped.content, "scratch");
        assert_eq!(session, EditSession::Viewing);
        assert!(session.save(&mut store).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn only_one_section_at_a_time() {
        let store = default_content();
        let mut session = EditSession::default();
        session
            .start(&store, DocId::TechnicalWhitepaper, "executive-summary")
            .unwrap();
        let second = session.start(&store, DocId::ArchitectureOverview, "system-architecture");
        assert!(matches!(second, Err(SiteError::Api(_))));
        assert_eq!(
            session.target(),
            Some((DocId::TechnicalWhitepaper, "executive-summary"))
        );
    }

    #[test]
    fn start_on_missing_section_stays_viewing() {
        let store = default_content();
        let mut session = EditSession::default();
        assert!(matches!(
            session.start(&store, DocId::TechnicalWhitepaper, "missing"),
            Err(SiteError::NotFound(_))
        ));
        assert!(!session.is_editing());
    }

    #[test]
    fn save_after_section_deleted_keeps_draft() {
        let mut store = default_content();
        let mut session = EditSession::default();
        session
            .start(&store, DocId::TechnicalWhitepaper, "executive-summary")
            .unwrap();
        store.technical_whitepaper.sections.clear();

        assert!(matches!(
            session.save(&mut store),
            Err(SiteError::NotFound(_))
        ));
        assert!(session.is_editing());
    }

    #[test]
    fn draft_images_get_distinct_ids() {
        let clock = clock();
        let mut draft = Draft {
            title: String::new(),
            content: String::new(),
            images: Vec::new(),
        };
        let a = draft.attach_image("h1".into(), "a.png".into(), "image/png".into(), &clock);
        let b = draft.attach_image("h2".into(), "b.png".into(), "image/png".into(), &clock);
        assert_ne!(a.id, b.id);

        draft.remove_image(a.id).unwrap();
        assert_eq!(draft.images, vec![b]);
        assert!(matches!(
            draft.remove_image(a.id),
            Err(SiteError::NotFound(_))
        ));
    }
}
