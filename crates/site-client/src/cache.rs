use site_core::EntityId;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Projects,
    Tasks { project_id: Option<EntityId> },
    Task(EntityId),
    /// Checklist items of one task.
    Checklist(EntityId),
    /// Comments of one checklist item.
    Comments(EntityId),
    /// Category records of one project.
    Categories(EntityId),
    Labor { project_id: Option<EntityId> },
    TaskLabor(EntityId),
    Materials { project_id: Option<EntityId> },
    Contacts,
}

impl QueryKey {
    /// Every task list, whatever its project filter.
    pub fn is_task_list(&self) -> bool {
        matches!(self, QueryKey::Tasks { .. })
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Projects => f.write_str("projects"),
            QueryKey::Tasks { project_id: None } => f.write_str("tasks"),
            QueryKey::Tasks {
                project_id: Some(id),
            } => write!(f, "tasks?project={id}"),
            QueryKey::Task(id) => write!(f, "task/{id}"),
            QueryKey::Checklist(id) => write!(f, "task/{id}/checklist"),
            QueryKey::Comments(id) => write!(f, "checklist/{id}/comments"),
            QueryKey::Categories(id) => write!(f, "project/{id}/categories"),
            QueryKey::Labor { project_id: None } => f.write_str("labor"),
            QueryKey::Labor {
                project_id: Some(id),
            } => write!(f, "labor?project={id}"),
            QueryKey::TaskLabor(id) => write!(f, "task/{id}/labor"),
            QueryKey::Materials { project_id: None } => f.write_str("materials"),
            QueryKey::Materials {
                project_id: Some(id),
            } => write!(f, "materials?project={id}"),
            QueryKey::Contacts => f.write_str("contacts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Invalidated(QueryKey),
}

#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    stale: bool,
}

/// Query results keyed by [`QueryKey`], shared by every view.
///
/// Values are stored type-erased; readers ask for the type they stored.
/// Subscribers learn about writes and invalidations through [`CacheEvent`]s.
/// The lock is never held across an await point.
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries().len())
            .finish()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CacheEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Fresh value for `key`; stale or missing entries return `None`.
    pub fn get<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries();
        let entry = entries.get(key).filter(|entry| !entry.stale)?;
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Value for `key` even when it has been invalidated.
    pub fn peek<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries();
        entries.get(key)?.value.downcast_ref::<T>().cloned()
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.entries().get(key).is_some_and(|entry| !entry.stale)
    }

    pub fn set<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.entries().insert(
            key,
            Entry {
                value: Arc::new(value),
                stale: false,
            },
        );
        self.emit(CacheEvent::Updated(key));
    }

    /// Edits the stored value in place. Returns `None` when nothing of type `T` is cached.
    pub fn update<T, R>(&self, key: &QueryKey, edit: impl FnOnce(&mut T) -> R) -> Option<R>
    where
        T: Clone + Send + Sync + 'static,
    {
        let result = {
            let mut entries = self.entries();
            let entry = entries.get_mut(key)?;
            let mut value = entry.value.downcast_ref::<T>()?.clone();
            let result = edit(&mut value);
            entry.value = Arc::new(value);
            result
        };
        self.emit(CacheEvent::Updated(*key));
        Some(result)
    }

    /// Marks `key` stale so the next read refetches. Returns whether it was cached.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let found = match self.entries().get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        };
        debug!(event = "cache_invalidate", key = %key, found);
        self.emit(CacheEvent::Invalidated(*key));
        found
    }

    pub fn invalidate_where(&self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let keys: Vec<QueryKey> = {
            let mut entries = self.entries();
            entries
                .iter_mut()
                .filter(|(key, _)| predicate(key))
                .map(|(key, entry)| {
                    entry.stale = true;
                    *key
                })
                .collect()
        };
        for key in &keys {
            debug!(event = "cache_invalidate", key = %key, found = true);
            self.emit(CacheEvent::Invalidated(*key));
        }
        keys.len()
    }

    pub fn remove(&self, key: &QueryKey) {
        self.entries().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> QueryKey {
        QueryKey::Checklist(EntityId::new(4))
    }

    #[test]
    fn invalidated_entries_are_not_fresh_but_still_peekable() {
        let cache = QueryCache::new();
        cache.set(key(), vec![1_u32, 2]);
        assert_eq!(cache.get::<Vec<u32>>(&key()), Some(vec![1, 2]));

        assert!(cache.invalidate(&key()));
        assert_eq!(cache.get::<Vec<u32>>(&key()), None);
        assert_eq!(cache.peek::<Vec<u32>>(&key()), Some(vec![1, 2]));
        assert!(!cache.invalidate(&QueryKey::Contacts));
    }

    #[test]
    fn wrong_type_reads_as_missing() {
        let cache = QueryCache::new();
        cache.set(key(), "text".to_string());
        assert_eq!(cache.get::<Vec<u32>>(&key()), None);
        assert_eq!(cache.update::<Vec<u32>, _>(&key(), |v| v.len()), None);
    }

    #[test]
    fn invalidate_where_matches_every_task_list() {
        let cache = QueryCache::new();
        cache.set(QueryKey::Tasks { project_id: None }, 1_u8);
        cache.set(
            QueryKey::Tasks {
                project_id: Some(EntityId::new(2)),
            },
            2_u8,
        );
        cache.set(QueryKey::Contacts, 3_u8);
        assert_eq!(cache.invalidate_where(QueryKey::is_task_list), 2);
        assert!(cache.is_fresh(&QueryKey::Contacts));
    }

    #[tokio::test]
    async fn subscribers_see_invalidations() {
        let cache = QueryCache::new();
        let mut events = cache.subscribe();
        cache.set(key(), 1_u8);
        cache.invalidate(&key());

        assert_eq!(
            events.recv().await.expect("event"),
            CacheEvent::Updated(key())
        );
        assert_eq!(
            events.recv().await.expect("event"),
            CacheEvent::Invalidated(key())
        );
    }
}
