use crate::dates;
use crate::ids::{self, EntityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, with = "dates::lenient_option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "dates::lenient_option")]
    pub end_date: Option<DateTime<Utc>>,
}

/// Kanban card hanging off a task.
///
/// `section` is kept exactly as stored. Display grouping maps missing or
/// unknown values to "To Do" without rewriting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: EntityId,
    pub task_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default, with = "dates::lenient_option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default, deserialize_with = "ids::deserialize_list")]
    pub contact_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemComment {
    pub id: EntityId,
    pub checklist_item_id: EntityId,
    #[serde(default, deserialize_with = "ids::deserialize_optional")]
    pub parent_id: Option<EntityId>,
    pub author_name: String,
    pub content: String,
    #[serde(with = "dates::lenient")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "dates::lenient_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Category defined for one project; overrides the built-in table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCategory {
    pub id: EntityId,
    pub project_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default, deserialize_with = "ids::deserialize_optional")]
    pub parent_id: Option<EntityId>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Labor {
    pub id: EntityId,
    #[serde(default, deserialize_with = "ids::deserialize_optional")]
    pub project_id: Option<EntityId>,
    #[serde(default, deserialize_with = "ids::deserialize_optional")]
    pub task_id: Option<EntityId>,
    #[serde(default, deserialize_with = "ids::deserialize_optional")]
    pub contact_id: Option<EntityId>,
    pub full_name: String,
    #[serde(default)]
    pub tier1_category: Option<String>,
    #[serde(default)]
    pub tier2_category: Option<String>,
    #[serde(default, with = "dates::lenient_option")]
    pub work_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub labor_cost: Option<f64>,
    #[serde(default)]
    pub task_description: Option<String>,
}

impl Labor {
    /// Explicit cost when the backend recorded one, hours at rate otherwise.
    pub fn cost(&self) -> f64 {
        self.labor_cost
            .unwrap_or_else(|| self.total_hours * self.hourly_rate.unwrap_or(0.0))
    }

    pub fn belongs_to_task(&self, task_id: EntityId) -> bool {
        self.task_id == Some(task_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: EntityId,
    #[serde(default, deserialize_with = "ids::deserialize_optional")]
    pub project_id: Option<EntityId>,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub tier1_category: Option<String>,
    #[serde(default)]
    pub tier2_category: Option<String>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub unit_cost: Option<f64>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "ids::deserialize_list")]
    pub task_ids: Vec<EntityId>,
    #[serde(default, deserialize_with = "ids::deserialize_list")]
    pub contact_ids: Vec<EntityId>,
}

impl Material {
    pub fn total_cost(&self) -> f64 {
        self.cost
            .unwrap_or_else(|| self.quantity * self.unit_cost.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, alias = "category")]
    pub tier1_category: Option<String>,
    #[serde(default)]
    pub tier2_category: Option<String>,
}
