use crate::commands::transfer::{check_content, check_roadmap};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, SiteError};
use crate::keys::{CONTENT_KEY, ROADMAP_KEY};
use crate::model::{ContentStore, RoadmapData};
use crate::service::{Backup, PersistenceService};
use serde_json::Value;

pub fn backup(service: &PersistenceService, keys: &[&str], user_id: &str) -> CmdResult {
    let backup = service.backup(keys, user_id);
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Backed up {} of {} records from {} storage",
        backup.data.len(),
        keys.len(),
        backup.storage_type
    )));
    result.backup = Some(backup);
    result
}

pub fn parse_backup(raw: &str) -> Result<Backup> {
    serde_json::from_str(raw).map_err(|e| SiteError::Parse(format!("invalid backup file: {}", e)))
}

fn check_record<T: serde::de::DeserializeOwned>(key: &str, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| SiteError::Parse(format!("backup record {} is malformed: {}", key, e)))
}

/// Write every record of `backup`.
///
/// The content and roadmap records are checked first; if either is
/// malformed nothing is written.
pub fn restore(service: &PersistenceService, backup: &Backup, user_id: &str) -> Result<CmdResult> {
    if let Some(value) = backup.data.get(CONTENT_KEY) {
        check_content(&check_record::<ContentStore>(CONTENT_KEY, value)?)?;
    }
    if let Some(value) = backup.data.get(ROADMAP_KEY) {
        check_roadmap(&check_record::<RoadmapData>(ROADMAP_KEY, value)?)?;
    }

    let mut result = CmdResult::default();
    for (key, outcome) in service.restore(backup, user_id) {
        match outcome {
            Ok(()) => result.add_message(CmdMessage::success(format!("Restored {}", key))),
            Err(e) => result.add_message(CmdMessage::error(format!(
                "Failed to restore {}: {}",
                key, e
            ))),
        }
    }
    if backup.data.is_empty() {
        result.add_message(CmdMessage::info("Backup holds no records."));
    }
    Ok(result)
}

pub fn migrate(service: &PersistenceService, keys: &[&str], user_id: &str) -> Result<CmdResult> {
    let outcomes = service.migrate_to_remote(keys, user_id)?;
    let mut result = CmdResult::default();
    if outcomes.is_empty() {
        result.add_message(CmdMessage::info("Nothing stored locally to migrate."));
    }
    for (key, outcome) in outcomes {
        match outcome {
            Ok(()) => result.add_message(CmdMessage::success(format!("Migrated {}", key))),
            Err(e) => result.add_message(CmdMessage::error(format!(
                "Failed to migrate {}: {}",
                key, e
            ))),
        }
    }
    Ok(result)
}

pub fn health(service: &PersistenceService) -> CmdResult {
    let health = service.health_check();
    let mut result = CmdResult::default();

    result.add_message(CmdMessage::info(format!(
        "Active storage: {}",
        health.storage_type
    )));
    if let Some(reason) = service.downgrade() {
        result.add_message(CmdMessage::warning(format!(
            "Remote storage requested but unavailable: {}",
            reason
        )));
    }
    result.add_message(if health.local {
        CmdMessage::success("Local storage: ok")
    } else {
        CmdMessage::error("Local storage: unavailable")
    });
    match health.remote {
        Some(true) => result.add_message(CmdMessage::success("Remote storage: ok")),
        Some(false) => result.add_message(CmdMessage::error("Remote storage: unreachable")),
        None => result.add_message(CmdMessage::info("Remote storage: not configured")),
    }
    result.health = Some(health);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::seed::default_content;
    use crate::service::SaveOptions;
    use crate::store::mem_backend::MemBackend;
    use crate::store::remote::{MemRowStore, RemoteBackend};
    use crate::store::BackendKind;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn service() -> (MemBackend, PersistenceService) {
        let backend = MemBackend::new();
        let service = PersistenceService::local(Box::new(backend.clone()), Rc::new(SystemClock));
        (backend, service)
    }

    #[test]
    fn backup_counts_records() {
        let (_backend, service) = service();
        service
            .save_as(CONTENT_KEY, &default_content(), &SaveOptions::default())
            .unwrap();
        let result = backup(&service, &[CONTENT_KEY, ROADMAP_KEY], "anonymous");
        assert_eq!(result.backup.unwrap().data.len(), 1);
        assert!(result.messages[0].content.contains("1 of 2"));
    }

    #[test]
    fn restore_refuses_malformed_known_records() {
        let (backend, service) = service();
        let mut data = BTreeMap::new();
        data.insert(CONTENT_KEY.to_string(), json!({"technicalWhitepaper": 1}));
        data.insert("other".to_string(), json!({"v": 1}));
        let bad = Backup {
            timestamp: Utc::now(),
            storage_type: BackendKind::Local,
            data,
        };
        assert!(matches!(restore(&service, &bad, "anonymous"), Err(SiteError::Parse(_))));
        assert!(backend.snapshot().is_empty());
    }

    #[test]
    fn parse_backup_rejects_garbage() {
        assert!(matches!(parse_backup("{}"), Err(SiteError::Parse(_))));
    }

    #[test]
    fn health_reports_unreachable_remote_without_failing() {
        let local = MemBackend::new();
        let rows = MemRowStore::new();
        rows.set_unreachable(true);
        let clock = Rc::new(SystemClock);
        let service = PersistenceService::with_remote(
            Box::new(local),
            Box::new(RemoteBackend::new(rows, clock.clone())),
            clock,
        );
        let result = health(&service);
        let health = result.health.unwrap();
        assert!(health.local);
        assert_eq!(health.remote, Some(false));
        assert!(result.has_errors());
    }

    #[test]
    fn migrate_without_local_records() {
        let local = MemBackend::new();
        let clock = Rc::new(SystemClock);
        let service = PersistenceService::with_remote(
            Box::new(local),
            Box::new(RemoteBackend::new(MemRowStore::new(), clock.clone())),
            clock,
        )
        .prefer_local();
        let result = migrate(&service, &[CONTENT_KEY], "anonymous").unwrap();
        assert_eq!(result.messages.len(), 1);
    }
}
