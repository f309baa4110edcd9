use crate::api::SiteApi;
use crate::error::ApiError;
use crate::notify::{Confirmer, Notice, Notifier};
use async_trait::async_trait;
use site_core::{
    ChecklistItem, ChecklistItemComment, ChecklistItemDraft, ChecklistItemPatch, CommentDraft,
    Contact, EntityId, Labor, Material, Project, ProjectCategory, Task, TaskDraft, TaskPatch,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// In-memory API with scripted failures, for session tests.
#[derive(Default)]
pub struct FakeApi {
    pub tasks: Mutex<Vec<Task>>,
    pub items: Mutex<Vec<ChecklistItem>>,
    pub comments: Mutex<Vec<ChecklistItemComment>>,
    pub categories: Mutex<HashMap<EntityId, Vec<ProjectCategory>>>,
    pub calls: Mutex<Vec<String>>,
    pub failing: Mutex<HashMap<&'static str, ApiError>>,
    pub failing_deletes: Mutex<HashSet<EntityId>>,
    pub gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeApi {
    pub fn fail(&self, op: &'static str, err: ApiError) {
        self.failing.lock().expect("failing").insert(op, err);
    }

    pub fn hold_updates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().expect("gate") = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    fn record(&self, op: &'static str, id: Option<EntityId>) -> Result<(), ApiError> {
        let call = match id {
            Some(id) => format!("{op} {id}"),
            None => op.to_string(),
        };
        self.calls.lock().expect("calls").push(call);
        match self.failing.lock().expect("failing").get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_id<T>(records: &[T], id: impl Fn(&T) -> EntityId) -> EntityId {
        EntityId::new(records.iter().map(|r| id(r).get()).max().unwrap_or(0) + 1)
    }

    fn not_found(resource: String) -> ApiError {
        ApiError::NotFound { resource }
    }
}

#[async_trait]
impl SiteApi for FakeApi {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.record("list_projects", None)?;
        Ok(Vec::new())
    }

    async fn get_project(&self, id: EntityId) -> Result<Project, ApiError> {
        self.record("get_project", Some(id))?;
        Err(Self::not_found(format!("project {id}")))
    }

    async fn list_tasks(&self, project_id: Option<EntityId>) -> Result<Vec<Task>, ApiError> {
        self.record("list_tasks", project_id)?;
        let tasks = self.tasks.lock().expect("tasks");
        Ok(tasks
            .iter()
            .filter(|task| project_id.map_or(true, |id| task.project_id == id))
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: EntityId) -> Result<Task, ApiError> {
        self.record("get_task", Some(id))?;
        let tasks = self.tasks.lock().expect("tasks");
        tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("task {id}")))
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        self.record("create_task", None)?;
        let mut tasks = self.tasks.lock().expect("tasks");
        let task = Task {
            id: Self::next_id(&tasks, |t| t.id),
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            project_id: draft.project_id,
            tier1_category: draft.tier1_category.clone(),
            tier2_category: draft.tier2_category.clone(),
            status: draft.status,
            start_date: draft.start_date,
            end_date: draft.end_date,
            assigned_to: draft.assigned_to.clone(),
            estimated_cost: draft.estimated_cost,
            actual_cost: draft.actual_cost,
            contact_ids: draft.contact_ids.clone(),
            material_ids: draft.material_ids.clone(),
        };
        tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: EntityId, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.record("update_task", Some(id))?;
        let mut tasks = self.tasks.lock().expect("tasks");
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Self::not_found(format!("task {id}")))?;
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, id: EntityId) -> Result<(), ApiError> {
        self.record("delete_task", Some(id))?;
        if self.failing_deletes.lock().expect("deletes").contains(&id) {
            return Err(ApiError::Status {
                status: 500,
                body: "constraint".to_string(),
            });
        }
        let mut tasks = self.tasks.lock().expect("tasks");
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        if tasks.len() == before {
            return Err(Self::not_found(format!("task {id}")));
        }
        Ok(())
    }

    async fn list_checklist_items(
        &self,
        task_id: EntityId,
    ) -> Result<Vec<ChecklistItem>, ApiError> {
        self.record("list_checklist_items", Some(task_id))?;
        let items = self.items.lock().expect("items");
        Ok(items
            .iter()
            .filter(|item| item.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn create_checklist_item(
        &self,
        draft: &ChecklistItemDraft,
    ) -> Result<ChecklistItem, ApiError> {
        self.record("create_checklist_item", Some(draft.task_id))?;
        let mut items = self.items.lock().expect("items");
        let item = ChecklistItem {
            id: Self::next_id(&items, |i| i.id),
            task_id: draft.task_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            section: Some(draft.section.id().to_string()),
            assigned_to: draft.assigned_to.clone(),
            due_date: draft.due_date,
            completed: draft.completed,
            sort_order: draft.sort_order,
            contact_ids: draft.contact_ids.clone(),
        };
        items.push(item.clone());
        Ok(item)
    }

    async fn update_checklist_item(
        &self,
        id: EntityId,
        patch: &ChecklistItemPatch,
    ) -> Result<ChecklistItem, ApiError> {
        let gate = self.gate.lock().expect("gate").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record("update_checklist_item", Some(id))?;
        let mut items = self.items.lock().expect("items");
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Self::not_found(format!("checklist item {id}")))?;
        if let Some(section) = &patch.section {
            item.section = Some(section.clone());
        }
        if let Some(completed) = patch.completed {
            item.completed = completed;
        }
        if let Some(title) = &patch.title {
            item.title = title.clone();
        }
        item.sort_order += 100;
        Ok(item.clone())
    }

    async fn delete_checklist_item(&self, id: EntityId) -> Result<(), ApiError> {
        self.record("delete_checklist_item", Some(id))?;
        self.items.lock().expect("items").retain(|item| item.id != id);
        Ok(())
    }

    async fn list_comments(
        &self,
        item_id: EntityId,
    ) -> Result<Vec<ChecklistItemComment>, ApiError> {
        self.record("list_comments", Some(item_id))?;
        let comments = self.comments.lock().expect("comments");
        Ok(comments
            .iter()
            .filter(|c| c.checklist_item_id == item_id)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        draft: &CommentDraft,
    ) -> Result<ChecklistItemComment, ApiError> {
        self.record("create_comment", Some(draft.checklist_item_id))?;
        let mut comments = self.comments.lock().expect("comments");
        let comment = ChecklistItemComment {
            id: Self::next_id(&comments, |c| c.id),
            checklist_item_id: draft.checklist_item_id,
            parent_id: draft.parent_id,
            author_name: draft.author_name.clone(),
            content: draft.content.clone(),
            created_at: chrono::Utc::now(),
            updated_at: None,
        };
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn delete_comment(
        &self,
        _item_id: EntityId,
        comment_id: EntityId,
    ) -> Result<(), ApiError> {
        self.record("delete_comment", Some(comment_id))?;
        self.comments
            .lock()
            .expect("comments")
            .retain(|c| c.id != comment_id);
        Ok(())
    }

    async fn list_project_categories(
        &self,
        project_id: EntityId,
    ) -> Result<Vec<ProjectCategory>, ApiError> {
        self.record("list_project_categories", Some(project_id))?;
        let categories = self.categories.lock().expect("categories");
        categories
            .get(&project_id)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("project {project_id}")))
    }

    async fn list_labor(&self, project_id: Option<EntityId>) -> Result<Vec<Labor>, ApiError> {
        self.record("list_labor", project_id)?;
        Ok(Vec::new())
    }

    async fn list_task_labor(&self, task_id: EntityId) -> Result<Vec<Labor>, ApiError> {
        self.record("list_task_labor", Some(task_id))?;
        Ok(Vec::new())
    }

    async fn list_materials(
        &self,
        project_id: Option<EntityId>,
    ) -> Result<Vec<Material>, ApiError> {
        self.record("list_materials", project_id)?;
        Ok(Vec::new())
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, ApiError> {
        self.record("list_contacts", None)?;
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.notices
            .lock()
            .expect("notices")
            .iter()
            .map(|notice| notice.to_string())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("notices").push(notice);
    }
}

/// Answers every prompt with the stored value and counts the prompts.
#[derive(Default)]
pub struct ScriptedConfirmer {
    pub answer: AtomicBool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: AtomicBool::new(answer),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().expect("prompts").push(prompt.to_string());
        self.answer.load(Ordering::SeqCst)
    }
}
