use crate::error::ApiError;
use async_trait::async_trait;
use site_core::{
    ChecklistItem, ChecklistItemComment, ChecklistItemDraft, ChecklistItemPatch, CommentDraft,
    Contact, EntityId, Labor, Material, Project, ProjectCategory, Task, TaskDraft, TaskPatch,
};

/// The REST surface the client consumes.
///
/// Every call is one request. Implementations map a missing record to
/// [`ApiError::NotFound`] and never retry on their own.
#[async_trait]
pub trait SiteApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;
    async fn get_project(&self, id: EntityId) -> Result<Project, ApiError>;

    async fn list_tasks(&self, project_id: Option<EntityId>) -> Result<Vec<Task>, ApiError>;
    async fn get_task(&self, id: EntityId) -> Result<Task, ApiError>;
    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ApiError>;
    async fn update_task(&self, id: EntityId, patch: &TaskPatch) -> Result<Task, ApiError>;
    async fn delete_task(&self, id: EntityId) -> Result<(), ApiError>;

    async fn list_checklist_items(&self, task_id: EntityId)
        -> Result<Vec<ChecklistItem>, ApiError>;
    async fn create_checklist_item(
        &self,
        draft: &ChecklistItemDraft,
    ) -> Result<ChecklistItem, ApiError>;
    async fn update_checklist_item(
        &self,
        id: EntityId,
        patch: &ChecklistItemPatch,
    ) -> Result<ChecklistItem, ApiError>;
    async fn delete_checklist_item(&self, id: EntityId) -> Result<(), ApiError>;

    async fn list_comments(&self, item_id: EntityId)
        -> Result<Vec<ChecklistItemComment>, ApiError>;
    async fn create_comment(&self, draft: &CommentDraft)
        -> Result<ChecklistItemComment, ApiError>;
    async fn delete_comment(&self, item_id: EntityId, comment_id: EntityId)
        -> Result<(), ApiError>;

    async fn list_project_categories(
        &self,
        project_id: EntityId,
    ) -> Result<Vec<ProjectCategory>, ApiError>;
    async fn list_labor(&self, project_id: Option<EntityId>) -> Result<Vec<Labor>, ApiError>;
    async fn list_task_labor(&self, task_id: EntityId) -> Result<Vec<Labor>, ApiError>;
    async fn list_materials(&self, project_id: Option<EntityId>)
        -> Result<Vec<Material>, ApiError>;
    async fn list_contacts(&self) -> Result<Vec<Contact>, ApiError>;
}
