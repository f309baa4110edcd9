use crate::board::BoardColumn;
use crate::ids::EntityId;
use crate::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < 0.0 => Err(ValidationError::Negative { field }),
        _ => Ok(()),
    }
}

/// Body of a task create request.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
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

impl TaskDraft {
    pub fn new(
        project_id: EntityId,
        title: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            project_id,
            tier1_category: None,
            tier2_category: None,
            status: TaskStatus::NotStarted,
            start_date,
            end_date,
            assigned_to: None,
            estimated_cost: None,
            actual_cost: None,
            contact_ids: Vec::new(),
            material_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        if self.end_date < self.start_date {
            return Err(ValidationError::EndBeforeStart {
                start: self.start_date,
                end: self.end_date,
            });
        }
        non_negative("estimated cost", self.estimated_cost)?;
        non_negative("actual cost", self.actual_cost)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskDraftBody<'a> {
    title: &'a str,
    description: Option<&'a str>,
    project_id: EntityId,
    tier1_category: Option<&'a str>,
    tier2_category: Option<&'a str>,
    status: TaskStatus,
    completed: bool,
    start_date: String,
    end_date: String,
    assigned_to: Option<&'a str>,
    estimated_cost: Option<f64>,
    actual_cost: Option<f64>,
    contact_ids: &'a [EntityId],
    material_ids: &'a [EntityId],
}

impl Serialize for TaskDraft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TaskDraftBody {
            title: self.title.trim(),
            description: self.description.as_deref(),
            project_id: self.project_id,
            tier1_category: self.tier1_category.as_deref(),
            tier2_category: self.tier2_category.as_deref(),
            status: self.status,
            completed: self.status.is_completed(),
            start_date: self.start_date.to_rfc3339(),
            end_date: self.end_date.to_rfc3339(),
            assigned_to: self.assigned_to.as_deref(),
            estimated_cost: self.estimated_cost,
            actual_cost: self.actual_cost,
            contact_ids: &self.contact_ids,
            material_ids: &self.material_ids,
        }
        .serialize(serializer)
    }
}

/// Partial task update; absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tier1_category: Option<String>,
    pub tier2_category: Option<String>,
    pub status: Option<TaskStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::EndBeforeStart { start, end });
            }
        }
        non_negative("estimated cost", self.estimated_cost)?;
        non_negative("actual cost", self.actual_cost)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskPatchBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier1_category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier2_category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimated_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_cost: Option<f64>,
}

impl Serialize for TaskPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TaskPatchBody {
            title: self.title.as_deref().map(str::trim),
            description: self.description.as_deref(),
            tier1_category: self.tier1_category.as_deref(),
            tier2_category: self.tier2_category.as_deref(),
            status: self.status,
            completed: self.status.map(|status| status.is_completed()),
            start_date: self.start_date.map(|ts| ts.to_rfc3339()),
            end_date: self.end_date.map(|ts| ts.to_rfc3339()),
            assigned_to: self.assigned_to.as_deref(),
            estimated_cost: self.estimated_cost,
            actual_cost: self.actual_cost,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemDraft {
    pub task_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub section: BoardColumn,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub sort_order: i64,
    pub contact_ids: Vec<EntityId>,
}

impl ChecklistItemDraft {
    pub fn new(task_id: EntityId, title: impl Into<String>) -> Self {
        Self {
            task_id,
            title: title.into(),
            description: None,
            section: BoardColumn::ToDo,
            assigned_to: None,
            due_date: None,
            completed: false,
            sort_order: 0,
            contact_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl ChecklistItemPatch {
    pub fn section(column: BoardColumn) -> Self {
        Self {
            section: Some(column.id().to_string()),
            ..Self::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    pub checklist_item_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    pub author_name: String,
    pub content: String,
}

impl CommentDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("author name", &self.author_name)?;
        require("comment", &self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::day;
    use serde_json::json;

    #[test]
    fn task_draft_requires_title_and_ordered_dates() {
        let mut draft = TaskDraft::new(EntityId::new(1), "  ", day(2024, 1, 1), day(2024, 1, 2));
        assert_eq!(
            draft.validate(),
            Err(ValidationError::Required { field: "title" })
        );

        draft.title = "Pour footings".to_string();
        assert_eq!(draft.validate(), Ok(()));

        draft.end_date = day(2023, 12, 31);
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::EndBeforeStart { .. })
        ));

        draft.end_date = day(2024, 1, 2);
        draft.estimated_cost = Some(-5.0);
        assert_eq!(
            draft.validate(),
            Err(ValidationError::Negative {
                field: "estimated cost"
            })
        );
    }

    #[test]
    fn task_draft_body_carries_derived_completed_flag() {
        let mut draft = TaskDraft::new(
            EntityId::new(4),
            " Set trusses ",
            day(2024, 1, 1),
            day(2024, 1, 2),
        );
        draft.status = TaskStatus::Completed;
        let body = serde_json::to_value(&draft).expect("serialize draft");
        assert_eq!(body["title"], json!("Set trusses"));
        assert_eq!(body["projectId"], json!(4));
        assert_eq!(body["completed"], json!(true));
        assert_eq!(body["status"], json!("completed"));
    }

    #[test]
    fn task_patch_only_sends_present_fields() {
        let body = serde_json::to_value(TaskPatch::status(TaskStatus::InProgress))
            .expect("serialize patch");
        assert_eq!(
            body,
            json!({"status": "in_progress", "completed": false})
        );
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn section_patch_touches_only_section() {
        let body = serde_json::to_value(ChecklistItemPatch::section(BoardColumn::ToDo))
            .expect("serialize patch");
        assert_eq!(body, json!({"section": "To Do"}));
    }

    #[test]
    fn comment_needs_author_and_content() {
        let mut draft = CommentDraft {
            checklist_item_id: EntityId::new(1),
            parent_id: None,
            author_name: "Dana".to_string(),
            content: "\n".to_string(),
        };
        assert_eq!(
            draft.validate(),
            Err(ValidationError::Required { field: "comment" })
        );
        draft.content = "Inspector moved to Friday".to_string();
        assert_eq!(draft.validate(), Ok(()));
        let body = serde_json::to_value(&draft).expect("serialize comment");
        assert!(body.get("parentId").is_none());
    }
}
