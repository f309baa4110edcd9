use crate::api::SiteApi;
use crate::cache::{QueryCache, QueryKey};
use crate::error::{ApiError, MutationError};
use crate::notify::{Confirmer, Notifier};
use futures_util::future::join_all;
use site_core::board::{apply_section_change, plan_move, revert_section_change};
use site_core::{
    CategoryResolver, ChecklistItem, ChecklistItemComment, ChecklistItemDraft, ChecklistItemPatch,
    CommentDraft, Contact, EntityId, Labor, Material, MoveRequest, Project, ProjectCategory, Task,
    TaskDraft, TaskPatch, TaskStatus, ValidationError,
};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// The entity a mutation is serialized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Task(EntityId),
    ChecklistItem(EntityId),
    Comment(EntityId),
    /// Creating a task inside a project.
    NewTask(EntityId),
    /// Creating a checklist item under a task.
    NewChecklistItem(EntityId),
    /// Posting a comment on a checklist item.
    NewComment(EntityId),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Task(id) => write!(f, "task {id}"),
            EntityKey::ChecklistItem(id) => write!(f, "checklist item {id}"),
            EntityKey::Comment(id) => write!(f, "comment {id}"),
            EntityKey::NewTask(project) => write!(f, "new task in project {project}"),
            EntityKey::NewChecklistItem(task) => write!(f, "new checklist item on task {task}"),
            EntityKey::NewComment(item) => write!(f, "new comment on item {item}"),
        }
    }
}

type PendingSet = Arc<Mutex<HashSet<EntityKey>>>;

fn lock_pending(pending: &PendingSet) -> MutexGuard<'_, HashSet<EntityKey>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Held while a mutation on one entity is outstanding.
#[derive(Debug)]
pub struct InFlightGuard {
    pending: PendingSet,
    key: EntityKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock_pending(&self.pending).remove(&self.key);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Dropped on its own column or outside the board; nothing was sent.
    Unchanged,
    Moved(ChecklistItem),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    pub succeeded: Vec<EntityId>,
    pub failed: Vec<(EntityId, MutationError)>,
}

impl BulkOutcome {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self, noun: &str) -> String {
        format!(
            "Deleted {} of {} {noun}",
            self.succeeded.len(),
            self.attempted()
        )
    }
}

/// Cached reads and guarded writes against one site API.
///
/// Mutations share one shape: validate, take the entity's in-flight guard,
/// send, notify, then invalidate whatever queries the change touched.
#[derive(Clone)]
pub struct Session {
    api: Arc<dyn SiteApi>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    confirmer: Arc<dyn Confirmer>,
    pending: PendingSet,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cache", &self.cache)
            .field("pending", &lock_pending(&self.pending).len())
            .finish()
    }
}

impl Session {
    pub fn new(
        api: Arc<dyn SiteApi>,
        cache: Arc<QueryCache>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self {
            api,
            cache,
            notifier,
            confirmer,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn is_pending(&self, key: EntityKey) -> bool {
        lock_pending(&self.pending).contains(&key)
    }

    pub fn pending(&self) -> Vec<EntityKey> {
        lock_pending(&self.pending).iter().copied().collect()
    }

    /// Claims `key`, or reports it busy if a mutation on it is already running.
    pub fn begin(&self, key: EntityKey) -> Result<InFlightGuard, MutationError> {
        let mut pending = lock_pending(&self.pending);
        if !pending.insert(key) {
            return Err(MutationError::Busy { entity: key });
        }
        Ok(InFlightGuard {
            pending: Arc::clone(&self.pending),
            key,
        })
    }

    // Reads

    async fn load<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.cache.get::<T>(&key) {
            return Ok(value);
        }
        let value = fetch().await?;
        self.cache.set(key, value.clone());
        Ok(value)
    }

    /// Lists whose parent is gone read as empty.
    async fn load_list<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<Vec<T>, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ApiError>>,
    {
        match self.load(key, fetch).await {
            Err(err) if err.is_not_found() => {
                info!(event = "query_not_found", key = %key);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.load_list(QueryKey::Projects, || self.api.list_projects())
            .await
    }

    pub async fn project(&self, id: EntityId) -> Result<Option<Project>, ApiError> {
        match self.api.get_project(id).await {
            Ok(project) => Ok(Some(project)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn tasks(&self, project_id: Option<EntityId>) -> Result<Vec<Task>, ApiError> {
        self.load_list(QueryKey::Tasks { project_id }, || {
            self.api.list_tasks(project_id)
        })
        .await
    }

    pub async fn task(&self, id: EntityId) -> Result<Option<Task>, ApiError> {
        match self.load(QueryKey::Task(id), || self.api.get_task(id)).await {
            Ok(task) => Ok(Some(task)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn checklist(&self, task_id: EntityId) -> Result<Vec<ChecklistItem>, ApiError> {
        self.load_list(QueryKey::Checklist(task_id), || {
            self.api.list_checklist_items(task_id)
        })
        .await
    }

    pub async fn comments(
        &self,
        item_id: EntityId,
    ) -> Result<Vec<ChecklistItemComment>, ApiError> {
        self.load_list(QueryKey::Comments(item_id), || {
            self.api.list_comments(item_id)
        })
        .await
    }

    pub async fn categories(&self, project_id: EntityId) -> Result<Vec<ProjectCategory>, ApiError> {
        self.load_list(QueryKey::Categories(project_id), || {
            self.api.list_project_categories(project_id)
        })
        .await
    }

    /// Resolver seeded with each project's category records. A project whose
    /// records fail to load falls back to the builtin table.
    pub async fn category_resolver(&self, project_ids: &[EntityId]) -> CategoryResolver {
        let mut resolver = CategoryResolver::new();
        for &project_id in project_ids {
            match self.categories(project_id).await {
                Ok(categories) => resolver.set_project_categories(project_id, categories),
                Err(err) => {
                    warn!(event = "categories_unavailable", project_id = %project_id, error = %err)
                }
            }
        }
        resolver
    }

    pub async fn labor(&self, project_id: Option<EntityId>) -> Result<Vec<Labor>, ApiError> {
        self.load_list(QueryKey::Labor { project_id }, || {
            self.api.list_labor(project_id)
        })
        .await
    }

    pub async fn task_labor(&self, task_id: EntityId) -> Result<Vec<Labor>, ApiError> {
        self.load_list(QueryKey::TaskLabor(task_id), || {
            self.api.list_task_labor(task_id)
        })
        .await
    }

    pub async fn materials(&self, project_id: Option<EntityId>) -> Result<Vec<Material>, ApiError> {
        self.load_list(QueryKey::Materials { project_id }, || {
            self.api.list_materials(project_id)
        })
        .await
    }

    pub async fn contacts(&self) -> Result<Vec<Contact>, ApiError> {
        self.load_list(QueryKey::Contacts, || self.api.list_contacts())
            .await
    }

    // Writes

    fn rejected(&self, err: ValidationError) -> MutationError {
        self.notifier.error(&err.to_string());
        MutationError::Validation(err)
    }

    async fn send<T, Fut>(
        &self,
        key: EntityKey,
        failure: &str,
        request: Fut,
    ) -> Result<T, MutationError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let _guard = self.begin(key)?;
        match request.await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(event = "mutation_failed", entity = %key, error = %err, transient = err.is_transient());
                self.notifier.error(&format!("{failure}: {err}"));
                Err(err.into())
            }
        }
    }

    fn invalidate_tasks(&self, id: Option<EntityId>) {
        self.cache.invalidate_where(QueryKey::is_task_list);
        if let Some(id) = id {
            self.cache.invalidate(&QueryKey::Task(id));
        }
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, MutationError> {
        draft.validate().map_err(|err| self.rejected(err))?;
        let task = self
            .send(
                EntityKey::NewTask(draft.project_id),
                "Failed to create task",
                self.api.create_task(draft),
            )
            .await?;
        info!(event = "task_created", task_id = %task.id);
        self.notifier.success("Task created");
        self.invalidate_tasks(None);
        Ok(task)
    }

    pub async fn update_task(&self, id: EntityId, patch: &TaskPatch) -> Result<Task, MutationError> {
        patch.validate().map_err(|err| self.rejected(err))?;
        let task = self
            .send(
                EntityKey::Task(id),
                "Failed to update task",
                self.api.update_task(id, patch),
            )
            .await?;
        info!(event = "task_updated", task_id = %id, status = %task.status);
        self.notifier.success("Task updated");
        self.invalidate_tasks(Some(id));
        Ok(task)
    }

    pub async fn set_task_status(
        &self,
        id: EntityId,
        status: TaskStatus,
    ) -> Result<Task, MutationError> {
        self.update_task(id, &TaskPatch::status(status)).await
    }

    /// The "mark complete" checkbox.
    pub async fn toggle_task(&self, task: &Task) -> Result<Task, MutationError> {
        self.set_task_status(task.id, task.status.toggled()).await
    }

    pub async fn delete_task(&self, id: EntityId) -> Result<(), MutationError> {
        if !self
            .confirmer
            .confirm("Delete this task? This cannot be undone.")
            .await
        {
            return Err(MutationError::Cancelled);
        }
        self.send(
            EntityKey::Task(id),
            "Failed to delete task",
            self.api.delete_task(id),
        )
        .await?;
        info!(event = "task_deleted", task_id = %id);
        self.notifier.success("Task deleted");
        self.invalidate_tasks(Some(id));
        Ok(())
    }

    /// Deletes every id concurrently after one confirmation. Failures do not
    /// stop the rest; the outcome lists both sides.
    pub async fn bulk_delete_tasks(&self, ids: &[EntityId]) -> Result<BulkOutcome, MutationError> {
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let prompt = format!("Delete {} selected tasks? This cannot be undone.", ids.len());
        if !self.confirmer.confirm(&prompt).await {
            return Err(MutationError::Cancelled);
        }

        let results = join_all(ids.iter().map(|&id| async move {
            let result = match self.begin(EntityKey::Task(id)) {
                Ok(_guard) => self.api.delete_task(id).await.map_err(MutationError::from),
                Err(busy) => Err(busy),
            };
            (id, result)
        }))
        .await;

        let mut outcome = BulkOutcome::default();
        for (id, result) in results {
            match result {
                Ok(()) => outcome.succeeded.push(id),
                Err(err) => {
                    warn!(event = "bulk_delete_item_failed", task_id = %id, error = %err);
                    outcome.failed.push((id, err));
                }
            }
        }
        for id in &outcome.succeeded {
            self.cache.invalidate(&QueryKey::Task(*id));
        }
        self.cache.invalidate_where(QueryKey::is_task_list);

        let message = outcome.summary("tasks");
        info!(event = "bulk_delete", succeeded = outcome.succeeded.len(), failed = outcome.failed.len());
        if outcome.all_succeeded() {
            self.notifier.success(&message);
        } else {
            self.notifier.error(&message);
        }
        Ok(outcome)
    }

    pub async fn create_checklist_item(
        &self,
        draft: &ChecklistItemDraft,
    ) -> Result<ChecklistItem, MutationError> {
        draft.validate().map_err(|err| self.rejected(err))?;
        let item = self
            .send(
                EntityKey::NewChecklistItem(draft.task_id),
                "Failed to add checklist item",
                self.api.create_checklist_item(draft),
            )
            .await?;
        info!(event = "checklist_item_created", item_id = %item.id, task_id = %item.task_id);
        self.notifier.success("Checklist item added");
        self.cache.invalidate(&QueryKey::Checklist(draft.task_id));
        Ok(item)
    }

    pub async fn update_checklist_item(
        &self,
        task_id: EntityId,
        id: EntityId,
        patch: &ChecklistItemPatch,
    ) -> Result<ChecklistItem, MutationError> {
        patch.validate().map_err(|err| self.rejected(err))?;
        let item = self
            .send(
                EntityKey::ChecklistItem(id),
                "Failed to update checklist item",
                self.api.update_checklist_item(id, patch),
            )
            .await?;
        self.notifier.success("Checklist item updated");
        self.cache.invalidate(&QueryKey::Checklist(task_id));
        Ok(item)
    }

    pub async fn toggle_checklist_item(
        &self,
        item: &ChecklistItem,
    ) -> Result<ChecklistItem, MutationError> {
        self.update_checklist_item(
            item.task_id,
            item.id,
            &ChecklistItemPatch::completed(!item.completed),
        )
        .await
    }

    pub async fn delete_checklist_item(
        &self,
        task_id: EntityId,
        id: EntityId,
    ) -> Result<(), MutationError> {
        if !self.confirmer.confirm("Delete this checklist item?").await {
            return Err(MutationError::Cancelled);
        }
        self.send(
            EntityKey::ChecklistItem(id),
            "Failed to delete checklist item",
            self.api.delete_checklist_item(id),
        )
        .await?;
        self.notifier.success("Checklist item deleted");
        self.cache.invalidate(&QueryKey::Checklist(task_id));
        self.cache.remove(&QueryKey::Comments(id));
        Ok(())
    }

    /// Moves a checklist item between board columns.
    ///
    /// The cached checklist is rewritten before the request goes out. On
    /// success the server's copy replaces the optimistic one. On failure only
    /// this item's section is put back, so writes that landed in the meantime
    /// survive. Either way the query is invalidated.
    pub async fn move_checklist_item(
        &self,
        task_id: EntityId,
        request: MoveRequest,
    ) -> Result<MoveOutcome, MutationError> {
        let Some(change) = plan_move(&request) else {
            return Ok(MoveOutcome::Unchanged);
        };
        let _guard = self.begin(EntityKey::ChecklistItem(change.item_id))?;

        let key = QueryKey::Checklist(task_id);
        let previous = self
            .cache
            .update::<Vec<ChecklistItem>, _>(&key, |items| {
                let previous = items
                    .iter()
                    .find(|item| item.id == change.item_id)
                    .map(|item| item.section.clone());
                apply_section_change(items, &change);
                previous
            })
            .flatten();

        let patch = ChecklistItemPatch::section(change.to);
        match self.api.update_checklist_item(change.item_id, &patch).await {
            Ok(saved) => {
                self.cache.update::<Vec<ChecklistItem>, _>(&key, |items| {
                    if let Some(slot) = items.iter_mut().find(|item| item.id == saved.id) {
                        *slot = saved.clone();
                    }
                });
                self.cache.invalidate(&key);
                info!(event = "checklist_item_moved", item_id = %change.item_id, from = %change.from, to = %change.to);
                self.notifier
                    .success(&format!("Moved to {}", change.to));
                Ok(MoveOutcome::Moved(saved))
            }
            Err(err) => {
                if let Some(section) = previous {
                    self.cache.update::<Vec<ChecklistItem>, _>(&key, |items| {
                        revert_section_change(items, &change, section)
                    });
                }
                self.cache.invalidate(&key);
                warn!(event = "checklist_move_failed", item_id = %change.item_id, error = %err);
                self.notifier.error(&format!("Failed to move item: {err}"));
                Err(err.into())
            }
        }
    }

    pub async fn add_comment(
        &self,
        draft: &CommentDraft,
    ) -> Result<ChecklistItemComment, MutationError> {
        draft.validate().map_err(|err| self.rejected(err))?;
        let comment = self
            .send(
                EntityKey::NewComment(draft.checklist_item_id),
                "Failed to add comment",
                self.api.create_comment(draft),
            )
            .await?;
        self.notifier.success("Comment added");
        self.cache
            .invalidate(&QueryKey::Comments(draft.checklist_item_id));
        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        item_id: EntityId,
        comment_id: EntityId,
    ) -> Result<(), MutationError> {
        if !self.confirmer.confirm("Delete this comment?").await {
            return Err(MutationError::Cancelled);
        }
        self.send(
            EntityKey::Comment(comment_id),
            "Failed to delete comment",
            self.api.delete_comment(item_id, comment_id),
        )
        .await?;
        self.notifier.success("Comment deleted");
        self.cache.invalidate(&QueryKey::Comments(item_id));
        Ok(())
    }
}
