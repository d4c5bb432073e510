use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, SiteError};
use crate::model::{clamp_progress, Category, Quarter, RoadmapData, Task};
use chrono::{DateTime, Datelike, Utc};

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub progress: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    /// Clamped into 0..=100.
    pub progress: Option<i64>,
    /// Move the task to the end of this quarter.
    pub quarter: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewQuarter {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuarterPatch {
    /// New id; must not be taken by another quarter.
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Lowercase; runs of anything but ASCII letters and digits become one `-`;
/// no leading or trailing `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Slug of `title`, suffixed `-2`, `-3`... until no task in the roadmap has it.
pub fn unique_task_id(roadmap: &RoadmapData, title: &str) -> String {
    let mut base = slugify(title);
    if base.is_empty() {
        base = "task".to_string();
    }
    if !roadmap.has_task_id(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !roadmap.has_task_id(candidate))
        .unwrap_or(base)
}

fn touch(roadmap: &mut RoadmapData, now: DateTime<Utc>) {
    roadmap.last_updated = now.format("%Y-%m-%d").to_string();
}

fn quarter_mut<'a>(roadmap: &'a mut RoadmapData, id: &str) -> Result<&'a mut Quarter> {
    roadmap
        .quarters
        .iter_mut()
        .find(|q| q.id == id)
        .ok_or_else(|| SiteError::NotFound(format!("quarter {}", id)))
}

fn locate_task(roadmap: &RoadmapData, task_id: &str) -> Result<(usize, usize)> {
    roadmap
        .quarters
        .iter()
        .enumerate()
        .find_map(|(qi, q)| {
            q.tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|ti| (qi, ti))
        })
        .ok_or_else(|| SiteError::NotFound(format!("task {}", task_id)))
}

pub fn show(roadmap: &RoadmapData) -> CmdResult {
    CmdResult::default().with_roadmap(roadmap.clone())
}

pub fn add_task(
    roadmap: &mut RoadmapData,
    quarter_id: &str,
    new: NewTask,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let id = unique_task_id(roadmap, &new.title);
    let task = Task {
        id,
        title: new.title,
        description: new.description,
        category: new.category,
        progress: clamp_progress(new.progress),
    };
    quarter_mut(roadmap, quarter_id)?.tasks.push(task.clone());
    touch(roadmap, now);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Task added to {}: {}",
        quarter_id, task.id
    )));
    result.affected_tasks.push(task);
    Ok(result)
}

/// Merge `patch` into a task. The task id never changes.
pub fn update_task(
    roadmap: &mut RoadmapData,
    task_id: &str,
    patch: TaskPatch,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let (qi, ti) = locate_task(roadmap, task_id)?;
    let target_quarter = match &patch.quarter {
        Some(id) => Some(
            roadmap
                .quarters
                .iter()
                .position(|q| &q.id == id)
                .ok_or_else(|| SiteError::NotFound(format!("quarter {}", id)))?,
        ),
        None => None,
    };

    let mut task = roadmap.quarters[qi].tasks[ti].clone();
    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(category) = patch.category {
        task.category = category;
    }
    if let Some(progress) = patch.progress {
        task.progress = clamp_progress(progress);
    }

    match target_quarter {
        Some(to) if to != qi => {
            roadmap.quarters[qi].tasks.remove(ti);
            roadmap.quarters[to].tasks.push(task.clone());
        }
        _ => roadmap.quarters[qi].tasks[ti] = task.clone(),
    }
    touch(roadmap, now);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Task updated: {}", task.id)));
    result.affected_tasks.push(task);
    Ok(result)
}

pub fn delete_task(
    roadmap: &mut RoadmapData,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let (qi, ti) = locate_task(roadmap, task_id)?;
    let removed = roadmap.quarters[qi].tasks.remove(ti);
    touch(roadmap, now);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Task deleted: {}",
        removed.title
    )));
    result.affected_tasks.push(removed);
    Ok(result)
}

/// Append a quarter. Without an id, `q<n>-<year>` is generated from the
/// quarter count and the current year.
pub fn add_quarter(
    roadmap: &mut RoadmapData,
    new: NewQuarter,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let (id, generated_name) = match new.id {
        Some(id) if id.trim().is_empty() => {
            return Err(SiteError::Validation("Quarter id must not be empty".to_string()))
        }
        Some(id) if roadmap.quarter(&id).is_some() => {
            return Err(SiteError::Validation(format!(
                "Quarter already exists: {}",
                id
            )))
        }
        Some(id) => {
            let name = id.replace('-', " ").to_uppercase();
            (id, name)
        }
        None => {
            let year = now.year();
            let n = (roadmap.quarters.len() + 1..)
                .find(|n| roadmap.quarter(&format!("q{}-{}", n, year)).is_none())
                .unwrap_or(roadmap.quarters.len() + 1);
            (format!("q{}-{}", n, year), format!("Q{} {}", n, year))
        }
    };

    let quarter = Quarter {
        id,
        name: new.name.unwrap_or(generated_name),
        tasks: Vec::new(),
    };
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Quarter added: {} ({})",
        quarter.name, quarter.id
    )));
    roadmap.quarters.push(quarter);
    touch(roadmap, now);
    Ok(result)
}

pub fn update_quarter(
    roadmap: &mut RoadmapData,
    quarter_id: &str,
    patch: QuarterPatch,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    if patch.id.is_none() && patch.name.is_none() {
        return Err(SiteError::Validation("Nothing to change".to_string()));
    }
    if roadmap.quarter(quarter_id).is_none() {
        return Err(SiteError::NotFound(format!("quarter {}", quarter_id)));
    }
    match &patch.id {
        Some(id) if id.trim().is_empty() => {
            return Err(SiteError::Validation("Quarter id must not be empty".to_string()))
        }
        Some(id) if id != quarter_id && roadmap.quarter(id).is_some() => {
            return Err(SiteError::Validation(format!(
                "Quarter already exists: {}",
                id
            )))
        }
        _ => {}
    }

    let quarter = quarter_mut(roadmap, quarter_id)?;
    if let Some(id) = patch.id {
        quarter.id = id;
    }
    if let Some(name) = patch.name {
        quarter.name = name;
    }
    let message = format!("Quarter updated: {} -> {} ({})", quarter_id, quarter.name, quarter.id);
    touch(roadmap, now);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(message));
    Ok(result)
}

/// Remove a quarter together with all of its tasks.
pub fn delete_quarter(
    roadmap: &mut RoadmapData,
    quarter_id: &str,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let position = roadmap
        .quarters
        .iter()
        .position(|q| q.id == quarter_id)
        .ok_or_else(|| SiteError::NotFound(format!("quarter {}", quarter_id)))?;
    let removed = roadmap.quarters.remove(position);
    touch(roadmap, now);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Quarter deleted: {} ({} tasks)",
        removed.name,
        removed.tasks.len()
    )));
    result.affected_tasks = removed.tasks;
    Ok(result)
}
