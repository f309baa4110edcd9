use crate::ids::EntityId;
use crate::{Task, TaskStatus};

/// Upstream filtering applied before grouping: project, status and free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: Option<EntityId>,
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project_id) = self.project_id {
            if task.project_id != project_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => task_matches(task, &query.to_lowercase()),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }

    pub fn apply_owned(&self, tasks: &[Task]) -> Vec<Task> {
        tasks
            .iter()
            .filter(|task| self.matches(task))
            .cloned()
            .collect()
    }
}

fn task_matches(task: &Task, query: &str) -> bool {
    let fields = [
        Some(task.title.as_str()),
        task.description.as_deref(),
        task.assigned_to.as_deref(),
        task.tier1_category.as_deref(),
        task.tier2_category.as_deref(),
    ];
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::task;

    #[test]
    fn combines_status_project_and_search() {
        let mut roof = task(1, Some("structural"), Some("roofing"), TaskStatus::InProgress);
        roof.title = "Install roof trusses".to_string();
        let mut wiring = task(2, Some("systems"), Some("electrical"), TaskStatus::InProgress);
        wiring.assigned_to = Some("Sparks LLC".to_string());
        let mut other_project = task(3, Some("structural"), None, TaskStatus::InProgress);
        other_project.project_id = EntityId::new(99);
        let tasks = vec![roof, wiring, other_project];

        let filter = TaskFilter {
            project_id: Some(EntityId::new(1)),
            status: Some(TaskStatus::InProgress),
            search: Some("SPARKS".to_string()),
        };
        let matched: Vec<u64> = filter.apply(&tasks).iter().map(|t| t.id.get()).collect();
        assert_eq!(matched, vec![2]);

        let by_category = TaskFilter {
            search: Some("structural".to_string()),
            ..TaskFilter::default()
        };
        assert_eq!(by_category.apply(&tasks).len(), 2);
        assert_eq!(TaskFilter::default().apply_owned(&tasks).len(), 3);
    }
}
