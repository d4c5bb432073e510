//! # API Facade
//!
//! [`SiteApi`] is the single entry point for every client (the CLI today). It
//! owns the in-memory state and decides when that state is written:
//!
//! - the [`ContentStore`] and [`RoadmapData`] being edited
//! - the [`EditSession`] for the one section that may be open
//! - the [`PersistenceService`] that reads and writes records
//! - a [`DebouncedWriter`] of record snapshots waiting to be written
//!
//! ## Write Path
//!
//! Every mutation runs the matching command on the in-memory state, then
//! schedules a snapshot of the whole record. Bursts of edits coalesce into one
//! write per record once the debounce delay has passed. Clients call
//! [`SiteApi::tick`] when they get control and [`SiteApi::flush`] before they
//! exit. Saving an edit and importing a file write at once.
//!
//! ## Image Blobs
//!
//! Blobs are stored when an image is attached. A blob that stops being
//! referenced (section deleted, image dropped from a saved draft, reset) is
//! queued and removed only after a content record without it has been
//! written. Blobs attached to a draft that is cancelled are removed straight
//! away, since no written record ever referred to them.
//!
//! ## Loading
//!
//! [`SiteApi::open`] adopts a legacy roadmap record, then loads both records,
//! falling back to the seed content when a record is absent or cannot be
//! decoded. Storage failures are returned as errors.

use crate::blobs::{self, BlobPayload};
use crate::clock::Clock;
use crate::commands::content::{NewSection, SectionPatch};
use crate::commands::editing::{Draft, EditSession};
use crate::commands::roadmap::{NewQuarter, NewTask, QuarterPatch, TaskPatch};
use crate::commands::{self, CmdMessage, CmdResult};
use crate::debounce::{DebouncedWriter, WriteOutcome};
use crate::error::{Result, SiteError};
use crate::keys::{self, blob_key, CONTENT_KEY, ROADMAP_KEY};
use crate::model::{ContentStore, DocId, Image, RoadmapData};
use crate::schema::{content_schema, roadmap_schema, Schema};
use crate::seed::{default_content, default_roadmap};
use crate::service::{Backup, PersistenceService, SaveOptions};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct SiteApi {
    service: PersistenceService,
    clock: Rc<dyn Clock>,
    user_id: String,
    content: ContentStore,
    roadmap: RoadmapData,
    session: EditSession,
    writer: DebouncedWriter<Value>,
    unreferenced_blobs: BTreeSet<String>,
}

fn schema_for(key: &str) -> Option<&'static Schema> {
    match key {
        CONTENT_KEY => Some(content_schema()),
        ROADMAP_KEY => Some(roadmap_schema()),
        _ => None,
    }
}

fn write_record(service: &PersistenceService, user_id: &str, key: &str, payload: Value) -> Result<()> {
    let opts = SaveOptions {
        schema: schema_for(key),
        ..Default::default()
    }
    .for_user(user_id);
    service.save(key, payload, &opts)
}

fn load_or_seed<T: DeserializeOwned>(
    service: &PersistenceService,
    key: &str,
    user_id: &str,
    seed: impl FnOnce() -> T,
) -> Result<T> {
    match service.load_as::<T>(key, user_id) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(seed()),
        Err(SiteError::Serialization(e)) => {
            warn!(key, error = %e, "stored record is unreadable, using defaults");
            Ok(seed())
        }
        Err(e) => Err(e),
    }
}

/// First error among `outcomes`, after logging every failure.
fn first_failure(outcomes: Vec<WriteOutcome>) -> Result<Vec<String>> {
    let mut written = Vec::new();
    let mut failure = None;
    for (key, outcome) in outcomes {
        match outcome {
            Ok(()) => written.push(key),
            Err(e) => {
                warn!(key = %key, error = %e, "pending write failed");
                failure.get_or_insert(e);
            }
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(written),
    }
}

impl SiteApi {
    pub fn open(
        service: PersistenceService,
        clock: Rc<dyn Clock>,
        debounce: Duration,
        user_id: impl Into<String>,
    ) -> Result<Self> {
        let user_id = user_id.into();
        keys::adopt_legacy_roadmap(&service, &user_id)?;

        let content = load_or_seed(&service, CONTENT_KEY, &user_id, default_content)?;
        let today = clock.now().format("%Y-%m-%d").to_string();
        let roadmap = load_or_seed(&service, ROADMAP_KEY, &user_id, || default_roadmap(&today))?;

        Ok(Self {
            writer: DebouncedWriter::new(debounce, clock.clone()),
            service,
            clock,
            user_id,
            content,
            roadmap,
            session: EditSession::default(),
            unreferenced_blobs: BTreeSet::new(),
        })
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn roadmap(&self) -> &RoadmapData {
        &self.roadmap
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn service(&self) -> &PersistenceService {
        &self.service
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn has_pending_writes(&self) -> bool {
        self.writer.has_pending()
    }

    // --- write path -------------------------------------------------------

    /// Write every record whose debounce delay has passed.
    pub fn tick(&mut self) -> Result<usize> {
        let service = &self.service;
        let user_id = &self.user_id;
        let outcomes = self
            .writer
            .fire_due(|key, payload| write_record(service, user_id, key, payload));
        self.after_writes(outcomes)
    }

    /// Write every pending record now.
    pub fn flush(&mut self) -> Result<usize> {
        let service = &self.service;
        let user_id = &self.user_id;
        let outcomes = self
            .writer
            .flush_all(|key, payload| write_record(service, user_id, key, payload));
        self.after_writes(outcomes)
    }

    fn flush_key(&mut self, key: &str) -> Result<()> {
        let service = &self.service;
        let user_id = &self.user_id;
        let outcome = self
            .writer
            .flush(key, |key, payload| write_record(service, user_id, key, payload));
        match outcome {
            Some(outcome) => self.after_writes(vec![(key.to_string(), outcome)]).map(|_| ()),
            None => Ok(()),
        }
    }

    fn after_writes(&mut self, outcomes: Vec<WriteOutcome>) -> Result<usize> {
        let written = first_failure(outcomes)?;
        if written.iter().any(|k| k == CONTENT_KEY) {
            self.sweep_blobs();
        }
        Ok(written.len())
    }

    fn schedule(&mut self, key: &str) -> Result<()> {
        let snapshot = match key {
            CONTENT_KEY => serde_json::to_value(&self.content)?,
            _ => serde_json::to_value(&self.roadmap)?,
        };
        self.writer.schedule(key, snapshot);
        self.tick().map(|_| ())
    }

    fn content_changed(&mut self) -> Result<()> {
        self.schedule(CONTENT_KEY)
    }

    fn roadmap_changed(&mut self) -> Result<()> {
        self.schedule(ROADMAP_KEY)
    }

    // --- blobs ------------------------------------------------------------

    fn referenced_blobs(&self) -> BTreeSet<String> {
        let mut refs: BTreeSet<String> = self
            .content
            .referenced_blobs()
            .into_iter()
            .map(str::to_string)
            .collect();
        if let Some(draft) = self.session.draft() {
            refs.extend(draft.images.iter().map(|img| img.blob.clone()));
        }
        refs
    }

    /// Queue blobs in `before` that are no longer referenced.
    fn release_blobs(&mut self, before: BTreeSet<String>) {
        let now = self.referenced_blobs();
        self.unreferenced_blobs
            .extend(before.into_iter().filter(|h| !now.contains(h)));
    }

    /// Remove queued blobs that are still unreferenced.
    fn sweep_blobs(&mut self) {
        let live = self.referenced_blobs();
        for hash in std::mem::take(&mut self.unreferenced_blobs) {
            if live.contains(&hash) {
                continue;
            }
            if let Err(e) = blobs::remove(&self.service, &hash, &self.user_id) {
                warn!(hash = %hash, error = %e, "unreferenced blob not removed");
            }
        }
    }

    pub fn image(&self, hash: &str) -> Result<Option<BlobPayload>> {
        blobs::get(&self.service, hash, &self.user_id)
    }

    // --- content ----------------------------------------------------------

    pub fn show_content(&self, doc: Option<DocId>) -> CmdResult {
        commands::show_content(&self.content, doc)
    }

    pub fn update_document_meta(
        &mut self,
        doc: DocId,
        title: Option<String>,
        subtitle: Option<String>,
    ) -> Result<CmdResult> {
        let result = commands::content::update_meta(&mut self.content, doc, title, subtitle)?;
        self.content_changed()?;
        Ok(result)
    }

    pub fn add_section(&mut self, doc: DocId, new: NewSection) -> Result<CmdResult> {
        let result =
            commands::content::add_section(&mut self.content, doc, new, self.clock.as_ref())?;
        self.content_changed()?;
        Ok(result)
    }

    pub fn update_section(
        &mut self,
        doc: DocId,
        section_id: &str,
        patch: SectionPatch,
    ) -> Result<CmdResult> {
        let before = self.referenced_blobs();
        let result =
            commands::content::update_section(&mut self.content, doc, section_id, patch)?;
        self.release_blobs(before);
        self.content_changed()?;
        Ok(result)
    }

    /// Delete a section and release its images. Refused while that section is
    /// open for editing.
    pub fn delete_section(&mut self, doc: DocId, section_id: &str) -> Result<CmdResult> {
        if self.session.target() == Some((doc, section_id)) {
            return Err(SiteError::Api(format!(
                "Section {} is being edited; save or cancel first",
                section_id
            )));
        }
        let before = self.referenced_blobs();
        let result = commands::content::delete_section(&mut self.content, doc, section_id)?;
        self.release_blobs(before);
        self.content_changed()?;
        Ok(result)
    }

    pub fn section_images(&self, doc: DocId, section_id: &str) -> Result<CmdResult> {
        commands::content::section_images(&self.content, doc, section_id)
    }

    /// Restore seed content for `doc`, or for everything.
    ///
    /// A whole-store reset also removes the persisted content record; the next
    /// write recreates it. Any open edit is discarded.
    pub fn reset_content(&mut self, doc: Option<DocId>) -> Result<CmdResult> {
        if self.session.is_editing() {
            self.cancel_edit()?;
        }
        let before = self.referenced_blobs();
        let result = commands::content::reset(&mut self.content, doc);
        self.release_blobs(before);

        match doc {
            Some(_) => self.content_changed()?,
            None => {
                self.writer.cancel(CONTENT_KEY);
                self.service.remove(CONTENT_KEY, &self.user_id)?;
                self.sweep_blobs();
            }
        }
        Ok(result)
    }

    // --- editing ----------------------------------------------------------

    pub fn start_edit(&mut self, doc: DocId, section_id: &str) -> Result<Draft> {
        let draft = self.session.start(&self.content, doc, section_id)?;
        debug!(doc = %doc, section = section_id, "edit started");
        Ok(draft.clone())
    }

    pub fn edit_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.session.draft_mut()?.set_title(title);
        Ok(())
    }

    pub fn edit_content(&mut self, content: impl Into<String>) -> Result<()> {
        self.session.draft_mut()?.set_content(content);
        Ok(())
    }

    /// Store `payload` as a blob and attach it to the open draft.
    pub fn attach_image(&mut self, payload: &BlobPayload, name: &str) -> Result<Image> {
        // Fail before storing anything when no edit is open
        self.session.draft_mut()?;
        let hash = blobs::put(&self.service, payload, &self.user_id)?;
        let draft = self.session.draft_mut()?;
        Ok(draft.attach_image(
            hash,
            name.to_string(),
            payload.media_type.clone(),
            self.clock.as_ref(),
        ))
    }

    pub fn remove_image(&mut self, image_id: i64) -> Result<Image> {
        self.session.draft_mut()?.remove_image(image_id)
    }

    /// Commit the draft and write the content record immediately.
    pub fn save_edit(&mut self) -> Result<CmdResult> {
        let before = self.referenced_blobs();
        let result = self.session.save(&mut self.content)?;
        self.release_blobs(before);
        self.content_changed()?;
        self.flush_key(CONTENT_KEY)?;
        Ok(result)
    }

    pub fn cancel_edit(&mut self) -> Result<CmdResult> {
        let draft = self.session.cancel()?;
        let live = self.referenced_blobs();
        for image in draft.images.iter().filter(|img| !live.contains(&img.blob)) {
            if let Err(e) = blobs::remove(&self.service, &image.blob, &self.user_id) {
                warn!(hash = %image.blob, error = %e, "draft blob not removed");
            }
        }

        let mut result = CmdResult::default();
        result.add_message(CmdMessage::info("Edit cancelled"));
        Ok(result)
    }

    // --- roadmap ----------------------------------------------------------

    pub fn show_roadmap(&self) -> CmdResult {
        commands::roadmap::show(&self.roadmap)
    }

    pub fn add_task(&mut self, quarter_id: &str, new: NewTask) -> Result<CmdResult> {
        let now = self.clock.now();
        let result = commands::roadmap::add_task(&mut self.roadmap, quarter_id, new, now)?;
        self.roadmap_changed()?;
        Ok(result)
    }

    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> Result<CmdResult> {
        let now = self.clock.now();
        let result = commands::roadmap::update_task(&mut self.roadmap, task_id, patch, now)?;
        self.roadmap_changed()?;
        Ok(result)
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<CmdResult> {
        let now = self.clock.now();
        let result = commands::roadmap::delete_task(&mut self.roadmap, task_id, now)?;
        self.roadmap_changed()?;
        Ok(result)
    }

    pub fn add_quarter(&mut self, new: NewQuarter) -> Result<CmdResult> {
        let now = self.clock.now();
        let result = commands::roadmap::add_quarter(&mut self.roadmap, new, now)?;
        self.roadmap_changed()?;
        Ok(result)
    }

    pub fn update_quarter(&mut self, quarter_id: &str, patch: QuarterPatch) -> Result<CmdResult> {
        let now = self.clock.now();
        let result = commands::roadmap::update_quarter(&mut self.roadmap, quarter_id, patch, now)?;
        self.roadmap_changed()?;
        Ok(result)
    }

    pub fn delete_quarter(&mut self, quarter_id: &str) -> Result<CmdResult> {
        let now = self.clock.now();
        let result = commands::roadmap::delete_quarter(&mut self.roadmap, quarter_id, now)?;
        self.roadmap_changed()?;
        Ok(result)
    }

    /// Restore the seed roadmap and remove the persisted roadmap record.
    pub fn reset_roadmap(&mut self) -> Result<CmdResult> {
        self.writer.cancel(ROADMAP_KEY);
        self.service.remove(ROADMAP_KEY, &self.user_id)?;
        let today = self.clock.now().format("%Y-%m-%d").to_string();
        self.roadmap = default_roadmap(&today);

        let mut result = CmdResult::default();
        result.add_message(CmdMessage::success("Roadmap reset to default"));
        Ok(result)
    }

    // --- transfer ---------------------------------------------------------

    pub fn export_content(&self) -> Result<CmdResult> {
        commands::transfer::export_content(&self.content, self.clock.now())
    }

    pub fn export_roadmap(&self) -> Result<CmdResult> {
        commands::transfer::export_roadmap(&self.roadmap, self.clock.now())
    }

    /// Replace all content with `raw` and write it at once. On any error the
    /// current content, its pending write and its stored record are left as
    /// they were.
    pub fn import_content(&mut self, raw: &str) -> Result<CmdResult> {
        if self.session.is_editing() {
            return Err(SiteError::Api(
                "Finish the open edit before importing".to_string(),
            ));
        }
        let mut imported = self.content.clone();
        let mut result = commands::transfer::import_content(&mut imported, raw)?;
        write_record(
            &self.service,
            &self.user_id,
            CONTENT_KEY,
            serde_json::to_value(&imported)?,
        )?;
        self.writer.cancel(CONTENT_KEY);

        let before = self.referenced_blobs();
        self.content = imported;
        self.release_blobs(before);
        self.sweep_blobs();

        let missing = self
            .content
            .referenced_blobs()
            .into_iter()
            .filter(|hash| matches!(self.image(hash), Ok(None)))
            .count();
        if missing > 0 {
            result.add_message(CmdMessage::warning(format!(
                "{} referenced images are not in this store",
                missing
            )));
        }
        Ok(result)
    }

    /// Replace the roadmap with `raw` and write it at once. Nothing changes
    /// when parsing or the write fails.
    pub fn import_roadmap(&mut self, raw: &str) -> Result<CmdResult> {
        let mut imported = self.roadmap.clone();
        let result = commands::transfer::import_roadmap(&mut imported, raw, self.clock.now())?;
        write_record(
            &self.service,
            &self.user_id,
            ROADMAP_KEY,
            serde_json::to_value(&imported)?,
        )?;
        self.writer.cancel(ROADMAP_KEY);
        self.roadmap = imported;
        Ok(result)
    }

    // --- storage ----------------------------------------------------------

    /// The content and roadmap records plus every image blob content refers to.
    pub fn record_keys(&self) -> Vec<String> {
        let mut keys = vec![CONTENT_KEY.to_string(), ROADMAP_KEY.to_string()];
        let hashes: BTreeSet<&str> = self.content.referenced_blobs().into_iter().collect();
        keys.extend(hashes.into_iter().map(blob_key));
        keys
    }

    pub fn backup(&mut self) -> Result<CmdResult> {
        self.flush()?;
        let keys = self.record_keys();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        Ok(commands::storage::backup(&self.service, &key_refs, &self.user_id))
    }

    /// Write every record of `backup`, then reload state from storage.
    pub fn restore(&mut self, backup: &Backup) -> Result<CmdResult> {
        if self.session.is_editing() {
            return Err(SiteError::Api(
                "Finish the open edit before restoring".to_string(),
            ));
        }
        let result = commands::storage::restore(&self.service, backup, &self.user_id)?;
        self.writer.cancel(CONTENT_KEY);
        self.writer.cancel(ROADMAP_KEY);
        self.reload()?;
        Ok(result)
    }

    fn reload(&mut self) -> Result<()> {
        self.content = load_or_seed(&self.service, CONTENT_KEY, &self.user_id, default_content)?;
        let today = self.clock.now().format("%Y-%m-%d").to_string();
        self.roadmap = load_or_seed(&self.service, ROADMAP_KEY, &self.user_id, || {
            default_roadmap(&today)
        })?;
        Ok(())
    }

    pub fn migrate(&mut self) -> Result<CmdResult> {
        self.flush()?;
        let keys = self.record_keys();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        commands::storage::migrate(&self.service, &key_refs, &self.user_id)
    }

    pub fn health(&self) -> CmdResult {
        commands::storage::health(&self.service)
    }
}
