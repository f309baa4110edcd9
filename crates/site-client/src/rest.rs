use crate::api::SiteApi;
use crate::config::ClientConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use site_core::{
    ChecklistItem, ChecklistItemComment, ChecklistItemDraft, ChecklistItemPatch, CommentDraft,
    Contact, EntityId, Labor, Material, Project, ProjectCategory, Task, TaskDraft, TaskPatch,
};
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-over-HTTP implementation of [`SiteApi`].
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else {
            ApiError::Transport(error.to_string())
        }
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<Response, ApiError> {
        let response = request.timeout(self.timeout).send().await.map_err(|err| {
            let err = self.transport_error(err);
            warn!(event = "api_request_failed", resource, error = %err);
            err
        })?;

        let status = response.status();
        debug!(event = "api_response", resource, status = status.as_u16());
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: resource.to_string(),
            });
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                debug!(event = "api_error_body_unreadable", resource, error = %err);
                String::new()
            }
        };
        warn!(event = "api_status", resource, status = status.as_u16(), body = %body);
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(request, resource).await?;
        response.json::<T>().await.map_err(|err| {
            if err.is_timeout() {
                ApiError::Timeout(self.timeout)
            } else {
                ApiError::Decode(format!("{resource}: {err}"))
            }
        })
    }

    async fn discard(&self, request: RequestBuilder, resource: &str) -> Result<(), ApiError> {
        self.send(request, resource).await.map(|_| ())
    }
}

fn project_query(path: &str, project_id: Option<EntityId>) -> String {
    match project_id {
        Some(id) => format!("{path}?projectId={id}"),
        None => path.to_string(),
    }
}

#[async_trait]
impl SiteApi for RestClient {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let request = self.client.get(self.url("/api/projects"));
        self.fetch(request, "projects").await
    }

    async fn get_project(&self, id: EntityId) -> Result<Project, ApiError> {
        let request = self.client.get(self.url(&format!("/api/projects/{id}")));
        self.fetch(request, &format!("project {id}")).await
    }

    async fn list_tasks(&self, project_id: Option<EntityId>) -> Result<Vec<Task>, ApiError> {
        let request = self
            .client
            .get(self.url(&project_query("/api/tasks", project_id)));
        self.fetch(request, "tasks").await
    }

    async fn get_task(&self, id: EntityId) -> Result<Task, ApiError> {
        let request = self.client.get(self.url(&format!("/api/tasks/{id}")));
        self.fetch(request, &format!("task {id}")).await
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let request = self.client.post(self.url("/api/tasks")).json(draft);
        self.fetch(request, "tasks").await
    }

    async fn update_task(&self, id: EntityId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let request = self
            .client
            .put(self.url(&format!("/api/tasks/{id}")))
            .json(patch);
        self.fetch(request, &format!("task {id}")).await
    }

    async fn delete_task(&self, id: EntityId) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!("/api/tasks/{id}")));
        self.discard(request, &format!("task {id}")).await
    }

    async fn list_checklist_items(
        &self,
        task_id: EntityId,
    ) -> Result<Vec<ChecklistItem>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/api/tasks/{task_id}/checklist")));
        self.fetch(request, &format!("checklist for task {task_id}"))
            .await
    }

    async fn create_checklist_item(
        &self,
        draft: &ChecklistItemDraft,
    ) -> Result<ChecklistItem, ApiError> {
        let task_id = draft.task_id;
        let request = self
            .client
            .post(self.url(&format!("/api/tasks/{task_id}/checklist")))
            .json(draft);
        self.fetch(request, &format!("checklist for task {task_id}"))
            .await
    }

    async fn update_checklist_item(
        &self,
        id: EntityId,
        patch: &ChecklistItemPatch,
    ) -> Result<ChecklistItem, ApiError> {
        let request = self
            .client
            .put(self.url(&format!("/api/checklist/{id}")))
            .json(patch);
        self.fetch(request, &format!("checklist item {id}")).await
    }

    async fn delete_checklist_item(&self, id: EntityId) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(&format!("/api/checklist/{id}")));
        self.discard(request, &format!("checklist item {id}")).await
    }

    async fn list_comments(
        &self,
        item_id: EntityId,
    ) -> Result<Vec<ChecklistItemComment>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/api/checklist/{item_id}/comments")));
        self.fetch(request, &format!("comments for item {item_id}"))
            .await
    }

    async fn create_comment(
        &self,
        draft: &CommentDraft,
    ) -> Result<ChecklistItemComment, ApiError> {
        let item_id = draft.checklist_item_id;
        let request = self
            .client
            .post(self.url(&format!("/api/checklist/{item_id}/comments")))
            .json(draft);
        self.fetch(request, &format!("checklist item {item_id}"))
            .await
    }

    async fn delete_comment(
        &self,
        item_id: EntityId,
        comment_id: EntityId,
    ) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!(
            "/api/checklist/{item_id}/comments/{comment_id}"
        )));
        self.discard(request, &format!("comment {comment_id}")).await
    }

    async fn list_project_categories(
        &self,
        project_id: EntityId,
    ) -> Result<Vec<ProjectCategory>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/api/projects/{project_id}/categories")));
        self.fetch(request, &format!("categories for project {project_id}"))
            .await
    }

    async fn list_labor(&self, project_id: Option<EntityId>) -> Result<Vec<Labor>, ApiError> {
        let request = self
            .client
            .get(self.url(&project_query("/api/labor", project_id)));
        self.fetch(request, "labor").await
    }

    async fn list_task_labor(&self, task_id: EntityId) -> Result<Vec<Labor>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/api/tasks/{task_id}/labor")));
        self.fetch(request, &format!("labor for task {task_id}"))
            .await
    }

    async fn list_materials(
        &self,
        project_id: Option<EntityId>,
    ) -> Result<Vec<Material>, ApiError> {
        let request = self
            .client
            .get(self.url(&project_query("/api/materials", project_id)));
        self.fetch(request, "materials").await
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, ApiError> {
        let request = self.client.get(self.url("/api/contacts"));
        self.fetch(request, "contacts").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = RestClient::new("http://site.local:5000/", Duration::from_secs(3));
        assert_eq!(client.base_url(), "http://site.local:5000");
        assert_eq!(client.url("/api/tasks"), "http://site.local:5000/api/tasks");
    }

    #[test]
    fn project_filter_is_a_query_parameter() {
        assert_eq!(
            project_query("/api/labor", Some(EntityId::new(7))),
            "/api/labor?projectId=7"
        );
        assert_eq!(project_query("/api/labor", None), "/api/labor");
    }
}
