use crate::state::{Command, Update};
use site_client::{MutationError, Session};
use tokio::sync::mpsc;
use tracing::debug;

/// Runs one command against the session on its own task and reports back.
///
/// Mutations run concurrently; the session's per-entity guard keeps two
/// writes to the same record from overlapping.
pub fn spawn(session: Session, updates: mpsc::UnboundedSender<Update>, command: Command) {
    tokio::spawn(async move {
        debug!(event = "board_command", command = ?command);
        for update in run(&session, command).await {
            if updates.send(update).is_err() {
                break;
            }
        }
    });
}

async fn run(session: &Session, command: Command) -> Vec<Update> {
    let keys = command.keys();
    let finished = |outcome: Result<(), MutationError>| Update::Finished {
        keys: keys.clone(),
        outcome,
    };

    match command {
        Command::LoadTasks { project_id } => vec![load_tasks(session, project_id).await],
        Command::Refresh { project_id } => {
            session.cache().invalidate_where(|_| true);
            vec![load_tasks(session, project_id).await]
        }
        Command::LoadCategories(project_ids) => {
            vec![Update::Resolver(session.category_resolver(&project_ids).await)]
        }
        Command::LoadChecklist(task_id) => vec![Update::Checklist {
            task_id,
            result: session
                .checklist(task_id)
                .await
                .map_err(|err| err.to_string()),
        }],
        Command::LoadComments(item_id) => vec![Update::Comments {
            item_id,
            result: session
                .comments(item_id)
                .await
                .map_err(|err| err.to_string()),
        }],
        Command::ToggleTask(task) => {
            vec![finished(session.toggle_task(&task).await.map(drop))]
        }
        Command::DeleteTask(id) => vec![finished(session.delete_task(id).await)],
        Command::BulkDelete(ids) => {
            let outcome = session.bulk_delete_tasks(&ids).await.map(drop);
            vec![finished(outcome)]
        }
        Command::MoveItem { task_id, request } => {
            let outcome = session
                .move_checklist_item(task_id, request)
                .await
                .map(drop);
            vec![finished(outcome)]
        }
        Command::ToggleItem(item) => {
            vec![finished(session.toggle_checklist_item(&item).await.map(drop))]
        }
        Command::DeleteItem { task_id, item_id } => {
            vec![finished(session.delete_checklist_item(task_id, item_id).await)]
        }
        Command::AddComment(draft) => {
            vec![finished(session.add_comment(&draft).await.map(drop))]
        }
        Command::DeleteComment {
            item_id,
            comment_id,
        } => vec![finished(session.delete_comment(item_id, comment_id).await)],
    }
}

async fn load_tasks(session: &Session, project_id: Option<site_core::EntityId>) -> Update {
    Update::Tasks(
        session
            .tasks(project_id)
            .await
            .map_err(|err| err.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use site_client::{
        ApiError, ConfirmRequest, ChannelConfirmer, Notifier, Notice, QueryCache, SiteApi,
    };
    use site_core::{
        ChecklistItem, ChecklistItemComment, ChecklistItemDraft, ChecklistItemPatch, CommentDraft,
        Contact, EntityId, Labor, Material, Project, ProjectCategory, Task, TaskDraft, TaskPatch,
    };
    use std::sync::Arc;

    /// Reads return one empty list; every write fails the same way.
    struct OfflineApi;

    fn offline() -> ApiError {
        ApiError::Transport("connection refused".to_string())
    }

    #[async_trait]
    impl SiteApi for OfflineApi {
        async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
            Ok(Vec::new())
        }
        async fn get_project(&self, _id: EntityId) -> Result<Project, ApiError> {
            Err(offline())
        }
        async fn list_tasks(&self, _project_id: Option<EntityId>) -> Result<Vec<Task>, ApiError> {
            Ok(Vec::new())
        }
        async fn get_task(&self, _id: EntityId) -> Result<Task, ApiError> {
            Err(offline())
        }
        async fn create_task(&self, _draft: &TaskDraft) -> Result<Task, ApiError> {
            Err(offline())
        }
        async fn update_task(&self, _id: EntityId, _patch: &TaskPatch) -> Result<Task, ApiError> {
            Err(offline())
        }
        async fn delete_task(&self, _id: EntityId) -> Result<(), ApiError> {
            Err(offline())
        }
        async fn list_checklist_items(
            &self,
            _task_id: EntityId,
        ) -> Result<Vec<ChecklistItem>, ApiError> {
            Ok(Vec::new())
        }
        async fn create_checklist_item(
            &self,
            _draft: &ChecklistItemDraft,
        ) -> Result<ChecklistItem, ApiError> {
            Err(offline())
        }
        async fn update_checklist_item(
            &self,
            _id: EntityId,
            _patch: &ChecklistItemPatch,
        ) -> Result<ChecklistItem, ApiError> {
            Err(offline())
        }
        async fn delete_checklist_item(&self, _id: EntityId) -> Result<(), ApiError> {
            Err(offline())
        }
        async fn list_comments(
            &self,
            _item_id: EntityId,
        ) -> Result<Vec<ChecklistItemComment>, ApiError> {
            Ok(Vec::new())
        }
        async fn create_comment(
            &self,
            _draft: &CommentDraft,
        ) -> Result<ChecklistItemComment, ApiError> {
            Err(offline())
        }
        async fn delete_comment(
            &self,
            _item_id: EntityId,
            _comment_id: EntityId,
        ) -> Result<(), ApiError> {
            Err(offline())
        }
        async fn list_project_categories(
            &self,
            _project_id: EntityId,
        ) -> Result<Vec<ProjectCategory>, ApiError> {
            Ok(Vec::new())
        }
        async fn list_labor(&self, _project_id: Option<EntityId>) -> Result<Vec<Labor>, ApiError> {
            Ok(Vec::new())
        }
        async fn list_task_labor(&self, _task_id: EntityId) -> Result<Vec<Labor>, ApiError> {
            Ok(Vec::new())
        }
        async fn list_materials(
            &self,
            _project_id: Option<EntityId>,
        ) -> Result<Vec<Material>, ApiError> {
            Ok(Vec::new())
        }
        async fn list_contacts(&self) -> Result<Vec<Contact>, ApiError> {
            Ok(Vec::new())
        }
    }

    struct Silent;

    impl Notifier for Silent {
        fn notify(&self, _notice: Notice) {}
    }

    fn session(confirm_tx: mpsc::Sender<ConfirmRequest>) -> Session {
        Session::new(
            Arc::new(OfflineApi),
            Arc::new(QueryCache::new()),
            Arc::new(Silent),
            Arc::new(ChannelConfirmer::new(confirm_tx)),
        )
    }

    #[tokio::test]
    async fn delete_waits_for_the_prompt_and_reports_the_failure() {
        let (confirm_tx, mut confirm_rx) = mpsc::channel(1);
        let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
        spawn(session(confirm_tx), updates_tx, Command::DeleteTask(EntityId::new(4)));

        let request = confirm_rx.recv().await.expect("prompt");
        assert!(request.prompt.starts_with("Delete this task?"));
        request.reply.send(true).expect("reply");

        match updates_rx.recv().await.expect("update") {
            Update::Finished { keys, outcome } => {
                assert_eq!(keys, vec![site_client::EntityKey::Task(EntityId::new(4))]);
                assert_eq!(outcome, Err(MutationError::Api(offline())));
            }
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[tokio::test]
    async fn loads_report_their_lists() {
        let (confirm_tx, _confirm_rx) = mpsc::channel(1);
        let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
        spawn(
            session(confirm_tx),
            updates_tx,
            Command::LoadChecklist(EntityId::new(9)),
        );
        match updates_rx.recv().await.expect("update") {
            Update::Checklist { task_id, result } => {
                assert_eq!(task_id, EntityId::new(9));
                assert_eq!(result, Ok(Vec::new()));
            }
            other => panic!("unexpected update {other:?}"),
        }
    }
}
