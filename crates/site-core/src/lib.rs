pub mod board;
pub mod comments;
pub mod dates;
pub mod drafts;
pub mod filter;
pub mod format;
pub mod grouping;
pub mod ids;
pub mod progress;
pub mod records;
pub mod taxonomy;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use board::{BoardColumn, MoveRequest, SectionChange};
pub use comments::CommentThread;
pub use drafts::{
    ChecklistItemDraft, ChecklistItemPatch, CommentDraft, TaskDraft, TaskPatch, ValidationError,
};
pub use filter::TaskFilter;
pub use grouping::{group_by_category, group_tasks, CategoryGroups, TaskGroups};
pub use ids::{EntityId, IdError};
pub use records::{
    ChecklistItem, ChecklistItemComment, Contact, Labor, Material, Project, ProjectCategory,
};
pub use taxonomy::{CategoryColor, CategoryResolver, ResolvedCategory, ThemeSlot};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "not-started")]
    NotStarted,
    #[serde(alias = "in-progress")]
    InProgress,
    Completed,
    #[serde(alias = "on-hold")]
    OnHold,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::OnHold => "on_hold",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::OnHold => "On Hold",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Status after the "mark complete" checkbox is flipped.
    pub fn toggled(&self) -> Self {
        if self.is_completed() {
            TaskStatus::NotStarted
        } else {
            TaskStatus::Completed
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase().replace(&['-', ' '][..], "_");
        match normalized.as_str() {
            "not_started" | "notstarted" | "todo" => Ok(TaskStatus::NotStarted),
            "in_progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "completed" | "complete" | "done" => Ok(TaskStatus::Completed),
            "on_hold" | "onhold" => Ok(TaskStatus::OnHold),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

/// A scheduled unit of work inside a project.
///
/// Completion is derived from `status`. The wire format still carries a
/// separate `completed` flag; on the way in, a record where either side says
/// "completed" is read as completed, and on the way out the flag is written
/// from the status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub project_id: EntityId,
    pub tier1_category: Option<String>,
    pub tier2_category: Option<String>,
    pub status: TaskStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub assigned_to: Option<String>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub contact_ids: Vec<EntityId>,
    pub material_ids: Vec<EntityId>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.status = if completed {
            TaskStatus::Completed
        } else if self.status.is_completed() {
            TaskStatus::NotStarted
        } else {
            self.status
        };
    }

    pub fn progress(&self, now: DateTime<Utc>) -> u8 {
        progress::task_progress(self.status, self.start_date, self.end_date, now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: EntityId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    project_id: EntityId,
    #[serde(default)]
    tier1_category: Option<String>,
    #[serde(default)]
    tier2_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    status: TaskStatus,
    #[serde(default)]
    completed: bool,
    #[serde(with = "dates::lenient")]
    start_date: DateTime<Utc>,
    #[serde(with = "dates::lenient")]
    end_date: DateTime<Utc>,
    #[serde(default)]
    assigned_to: Option<String>,
    #[serde(default)]
    estimated_cost: Option<f64>,
    #[serde(default)]
    actual_cost: Option<f64>,
    #[serde(default, deserialize_with = "ids::deserialize_list")]
    contact_ids: Vec<EntityId>,
    #[serde(default, deserialize_with = "ids::deserialize_list")]
    material_ids: Vec<EntityId>,
}

/// Statuses this client does not know read as not started, so one odd record
/// never sinks a whole list.
fn lenient_status<'de, D>(deserializer: D) -> Result<TaskStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| value.parse().ok())
        .unwrap_or_default())
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let status = if record.completed {
            TaskStatus::Completed
        } else {
            record.status
        };
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            project_id: record.project_id,
            tier1_category: record.tier1_category,
            tier2_category: record.tier2_category,
            status,
            start_date: record.start_date,
            end_date: record.end_date,
            assigned_to: record.assigned_to,
            estimated_cost: record.estimated_cost,
            actual_cost: record.actual_cost,
            contact_ids: record.contact_ids,
            material_ids: record.material_ids,
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            project_id: task.project_id,
            tier1_category: task.tier1_category,
            tier2_category: task.tier2_category,
            completed: task.status.is_completed(),
            status: task.status,
            start_date: task.start_date,
            end_date: task.end_date,
            assigned_to: task.assigned_to,
            estimated_cost: task.estimated_cost,
            actual_cost: task.actual_cost,
            contact_ids: task.contact_ids,
            material_ids: task.material_ids,
        }
    }
}
