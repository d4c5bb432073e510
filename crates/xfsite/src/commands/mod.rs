//! # Command Layer
//!
//! This module contains the **editing logic** of xfsite. Each group of
//! operations lives in its own submodule as plain functions over the in-memory
//! [`ContentStore`] and [`RoadmapData`].
//!
//! ## Role and Responsibilities
//!
//! Commands:
//! - Implement the mutations (sections, documents, tasks, quarters, imports)
//! - Enforce the model invariants (unique ids, clamped progress)
//! - Return a structured [`CmdResult`] with affected items and messages
//! - Are completely UI-agnostic
//!
//! ## What Commands Do NOT Do
//!
//! - **Scheduling writes**: the [`crate::api`] facade decides when state is
//!   persisted; commands only change state
//! - **Printing**: no stdout, stderr or terminal concerns
//! - **Confirmation**: deletes are single irreversible calls; asking the user
//!   first is the caller's job
//!
//! A failed command leaves the state it was given untouched.
//!
//! ## Testing Strategy
//!
//! Most of the crate's tests live here. They build state from the seeds or by
//! hand and drive time with [`crate::clock::ManualClock`].
//!
//! ## Command Modules
//!
//! - [`content`]: document meta and section operations, reset
//! - [`editing`]: the per-section edit session and its draft
//! - [`roadmap`]: task and quarter operations
//! - [`transfer`]: export and import of both records
//! - [`storage`]: backup, restore, migration and health reports

use crate::model::{ContentDocument, ContentStore, DocId, Image, RoadmapData, Section, Task};
use crate::service::{Backup, Health};
use serde::Serialize;

pub mod content;
pub mod editing;
pub mod roadmap;
pub mod storage;
pub mod transfer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// A file produced by an export, ready to be written wherever the caller likes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub messages: Vec<CmdMessage>,
    pub documents: Vec<(DocId, ContentDocument)>,
    pub affected_sections: Vec<Section>,
    pub images: Vec<Image>,
    pub affected_tasks: Vec<Task>,
    pub roadmap: Option<RoadmapData>,
    pub export: Option<ExportFile>,
    pub backup: Option<Backup>,
    pub health: Option<Health>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_documents(mut self, documents: Vec<(DocId, ContentDocument)>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_roadmap(mut self, roadmap: RoadmapData) -> Self {
        self.roadmap = Some(roadmap);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.level == MessageLevel::Error)
    }
}

/// Documents of `store`, or just `doc` when given.
pub fn show_content(store: &ContentStore, doc: Option<DocId>) -> CmdResult {
    let documents = match doc {
        Some(id) => vec![(id, store.doc(id).clone())],
        None => store
            .documents()
            .map(|(id, d)| (id, d.clone()))
            .collect(),
    };
    CmdResult::default().with_documents(documents)
}
