use super::{AppError, AppResult};
use crate::domain::{Task, TaskDraft, TaskId};
use crate::ports::{Clock, KeyValueStore, StoreError, SystemClock};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store key holding the serialized task list.
pub const TASKS_KEY: &str = "taskList";

/// Where unparsable task data is copied before the list starts over empty.
pub const CORRUPT_TASKS_KEY: &str = "taskList.corrupt";

/// Outcome of [`TaskRepository::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReport {
    /// Nothing was stored yet.
    Empty,
    /// Stored tasks were restored.
    Restored(usize),
    /// Stored tasks were restored, but some shared an id and were given
    /// new ones.
    Renumbered { restored: usize, renumbered: usize },
    /// Stored data could not be read; the list starts empty.
    Recovered(String),
}

#[derive(Debug, Default)]
struct TaskList {
    tasks: Vec<Task>,
    last_id: i64,
}

impl TaskList {
    fn replace(&mut self, tasks: Vec<Task>) {
        self.last_id = tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        self.tasks = tasks;
    }

    /// Millisecond timestamps, bumped past every id handed out so far.
    fn next_id(&mut self, now_millis: i64) -> TaskId {
        let id = now_millis.max(self.last_id.saturating_add(1));
        self.last_id = id;
        TaskId(id)
    }

    /// Keeps the first task with each id and gives later duplicates fresh
    /// ids. Returns how many were changed.
    fn renumber_duplicates(&mut self, now_millis: i64) -> usize {
        let mut seen = HashSet::new();
        let mut renumbered = 0;
        for index in 0..self.tasks.len() {
            if !seen.insert(self.tasks[index].id) {
                let id = self.next_id(now_millis);
                self.tasks[index].id = id;
                seen.insert(id);
                renumbered += 1;
            }
        }
        renumbered
    }

    fn position(&self, id: TaskId) -> AppResult<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(AppError::NotFound(id))
    }
}

/// Owns the ordered task list and writes all of it to the store after
/// every change.
///
/// Each mutation holds the write lock across both the in-memory change and
/// the store write, so callers never observe one without the other being
/// attempted. When the write fails the in-memory change is kept and the
/// error is returned; the next successful write persists it.
pub struct TaskRepository {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<TaskList>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            state: RwLock::new(TaskList::default()),
        }
    }

    /// Replaces the in-memory list with what the store holds.
    pub async fn load(&self) -> LoadReport {
        let mut state = self.state.write().await;

        let raw = match self.store.get(TASKS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                state.replace(Vec::new());
                tracing::info!("No stored tasks, starting empty");
                return LoadReport::Empty;
            }
            Err(e) => {
                state.replace(Vec::new());
                tracing::warn!("Failed to read stored tasks: {}", e);
                return LoadReport::Recovered(e.to_string());
            }
        };

        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                let count = tasks.len();
                state.replace(tasks);
                tracing::info!("Loaded {} tasks", count);

                let renumbered = state.renumber_duplicates(self.clock.now_millis());
                if renumbered > 0 {
                    tracing::warn!("Gave {} tasks with duplicate ids new ids", renumbered);
                    return LoadReport::Renumbered {
                        restored: count,
                        renumbered,
                    };
                }

                LoadReport::Restored(count)
            }
            Err(e) => {
                tracing::warn!("Stored tasks are unreadable: {}", e);
                if let Err(backup_err) = self.store.set(CORRUPT_TASKS_KEY, &raw).await {
                    tracing::warn!("Failed to keep a copy of unreadable tasks: {}", backup_err);
                }
                state.replace(Vec::new());
                LoadReport::Recovered(StoreError::Serialization(e.to_string()).to_string())
            }
        }
    }

    /// Current tasks in display order.
    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    pub async fn get(&self, id: TaskId) -> AppResult<Task> {
        let state = self.state.read().await;
        let index = state.position(id)?;
        Ok(state.tasks[index].clone())
    }

    pub async fn create(&self, draft: TaskDraft) -> AppResult<Task> {
        draft.validate()?;

        let mut state = self.state.write().await;
        let id = state.next_id(self.clock.now_millis());
        let task = Task::new(id, draft);
        state.tasks.insert(0, task.clone());
        tracing::info!("Created task {}", id);

        self.persist(&state.tasks).await?;
        Ok(task)
    }

    pub async fn update(&self, id: TaskId, draft: TaskDraft) -> AppResult<Task> {
        draft.validate()?;

        let mut state = self.state.write().await;
        let index = state.position(id)?;
        state.tasks[index].apply(draft);
        let task = state.tasks[index].clone();
        tracing::info!("Updated task {}", id);

        self.persist(&state.tasks).await?;
        Ok(task)
    }

    pub async fn toggle(&self, id: TaskId, is_done: bool) -> AppResult<Task> {
        let mut state = self.state.write().await;
        let index = state.position(id)?;
        state.tasks[index].is_done = is_done;
        let task = state.tasks[index].clone();
        tracing::info!("Marked task {} done={}", id, is_done);

        self.persist(&state.tasks).await?;
        Ok(task)
    }

    pub async fn delete(&self, id: TaskId) -> AppResult<Task> {
        let mut state = self.state.write().await;
        let index = state.position(id)?;
        let removed = state.tasks.remove(index);
        tracing::info!("Deleted task {}", id);

        self.persist(&state.tasks).await?;
        Ok(removed)
    }

    async fn persist(&self, tasks: &[Task]) -> AppResult<()> {
        let json = serde_json::to_string(tasks)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Err(e) = self.store.set(TASKS_KEY, &json).await {
            tracing::warn!("Failed to persist {} tasks: {}", tasks.len(), e);
            return Err(e.into());
        }

        tracing::debug!("Persisted {} tasks", tasks.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryKeyValueStore;
    use crate::domain::{ColorTag, DomainError, TaskTime, PALETTE};
    use crate::ports::MockKeyValueStore;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Returns the same instant until advanced.
    struct FixedClock(AtomicI64);

    impl FixedClock {
        fn at(millis: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(millis)))
        }

        fn advance(&self, millis: i64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }

        fn set(&self, millis: i64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn draft(text: &str) -> TaskDraft {
        TaskDraft::new(text, PALETTE[1].tag)
    }

    fn repo_on(store: Arc<MemoryKeyValueStore>) -> TaskRepository {
        TaskRepository::with_clock(store, FixedClock::at(1_700_000_000_000))
    }

    fn texts(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.text.as_str()).collect()
    }

    #[tokio::test]
    async fn load_on_fresh_store_is_empty() {
        let repo = repo_on(Arc::new(MemoryKeyValueStore::new()));

        assert_eq!(repo.load().await, LoadReport::Empty);
        assert!(repo.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn create_toggle_delete_example() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let repo = repo_on(store.clone());
        repo.load().await;

        let created = repo
            .create(draft("Buy milk").with_times(
                TaskTime::from_raw("2024-01-01 09:00"),
                TaskTime::unset(),
            ))
            .await
            .unwrap();
        assert!(!created.is_done);
        assert_eq!(repo.tasks().await, vec![created.clone()]);

        let toggled = repo.toggle(created.id, true).await.unwrap();
        assert!(toggled.is_done);
        assert_eq!(toggled.id, created.id);
        assert_eq!(toggled.text, "Buy milk");

        let removed = repo.delete(created.id).await.unwrap();
        assert_eq!(removed.id, created.id);
        assert!(repo.tasks().await.is_empty());
        assert_eq!(store.get(TASKS_KEY).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn creates_are_newest_first() {
        let repo = repo_on(Arc::new(MemoryKeyValueStore::new()));
        for text in ["first", "second", "third"] {
            repo.create(draft(text)).await.unwrap();
        }

        assert_eq!(texts(&repo.tasks().await), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn ids_are_unique_within_one_millisecond() {
        let repo = repo_on(Arc::new(MemoryKeyValueStore::new()));
        let a = repo.create(draft("a")).await.unwrap();
        let b = repo.create(draft("b")).await.unwrap();
        let c = repo.create(draft("c")).await.unwrap();

        assert_eq!(a.id, TaskId(1_700_000_000_000));
        assert_eq!(b.id, TaskId(1_700_000_000_001));
        assert_eq!(c.id, TaskId(1_700_000_000_002));
    }

    #[tokio::test]
    async fn ids_follow_the_clock_and_never_go_back() {
        let clock = FixedClock::at(5_000);
        let repo = TaskRepository::with_clock(Arc::new(MemoryKeyValueStore::new()), clock.clone());

        let first = repo.create(draft("a")).await.unwrap();
        clock.advance(1_000);
        let second = repo.create(draft("b")).await.unwrap();
        clock.set(10);
        let third = repo.create(draft("c")).await.unwrap();
        repo.delete(third.id).await.unwrap();
        let fourth = repo.create(draft("d")).await.unwrap();

        assert_eq!(first.id, TaskId(5_000));
        assert_eq!(second.id, TaskId(6_000));
        assert_eq!(third.id, TaskId(6_001));
        assert_eq!(fourth.id, TaskId(6_002));
    }

    #[tokio::test]
    async fn loaded_ids_are_not_reissued() {
        let store = Arc::new(MemoryKeyValueStore::with_entries([(
            TASKS_KEY,
            r#"[{"id":9000,"text":"future","isDone":false,"colorTag":-1}]"#,
        )]));
        let repo = TaskRepository::with_clock(store, FixedClock::at(100));
        repo.load().await;

        let created = repo.create(draft("now")).await.unwrap();
        assert_eq!(created.id, TaskId(9001));
    }

    #[tokio::test]
    async fn update_keeps_position_id_and_completion() {
        let repo = repo_on(Arc::new(MemoryKeyValueStore::new()));
        let oldest = repo.create(draft("oldest")).await.unwrap();
        let middle = repo.create(draft("middle")).await.unwrap();
        repo.create(draft("newest")).await.unwrap();
        repo.toggle(middle.id, true).await.unwrap();

        let edited = TaskDraft::new("middle, edited", PALETTE[4].tag).with_times(
            TaskTime::from_raw("2024-03-01 08:00"),
            TaskTime::from_raw("2024-03-01 09:30"),
        );
        let updated = repo.update(middle.id, edited.clone()).await.unwrap();

        let tasks = repo.tasks().await;
        assert_eq!(texts(&tasks), vec!["newest", "middle, edited", "oldest"]);
        assert_eq!(tasks[1], updated);
        assert_eq!(updated.id, middle.id);
        assert!(updated.is_done);
        assert_eq!(updated.color_tag, PALETTE[4].tag);
        assert_eq!(updated.end_time.as_str(), "2024-03-01 09:30");
        assert_eq!(tasks[2], oldest);
    }

    #[tokio::test]
    async fn toggle_only_changes_completion() {
        let repo = repo_on(Arc::new(MemoryKeyValueStore::new()));
        let a = repo.create(draft("a")).await.unwrap();
        let b = repo.create(draft("b")).await.unwrap();

        repo.toggle(a.id, true).await.unwrap();
        let tasks = repo.tasks().await;
        assert_eq!(tasks[0], b);
        assert_eq!(tasks[1], Task { is_done: true, ..a.clone() });

        repo.toggle(a.id, false).await.unwrap();
        assert_eq!(repo.tasks().await[1], a);
    }

    #[tokio::test]
    async fn delete_removes_one_and_keeps_order() {
        let repo = repo_on(Arc::new(MemoryKeyValueStore::new()));
        for text in ["a", "b", "c", "d"] {
            repo.create(draft(text)).await.unwrap();
        }
        let target = repo.tasks().await[1].id;

        repo.delete(target).await.unwrap();
        assert_eq!(texts(&repo.tasks().await), vec!["d", "b", "a"]);
    }

    #[tokio::test]
    async fn blank_text_is_a_validation_error_without_write() {
        let mut store = MockKeyValueStore::new();
        store.expect_set().times(0);
        let repo = TaskRepository::with_clock(Arc::new(store), FixedClock::at(1));

        for text in ["", "   ", "\n\t"] {
            let result = repo.create(draft(text)).await;
            assert_eq!(result, Err(AppError::Validation(DomainError::EmptyText)));
        }
        assert!(repo.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn update_rejects_blank_text() {
        let repo = repo_on(Arc::new(MemoryKeyValueStore::new()));
        let task = repo.create(draft("keep me")).await.unwrap();

        let result = repo.update(task.id, draft(" ")).await;
        assert_eq!(result, Err(AppError::Validation(DomainError::EmptyText)));
        assert_eq!(repo.tasks().await, vec![task]);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_and_changes_nothing() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let repo = repo_on(store.clone());
        repo.create(draft("a")).await.unwrap();
        let before = repo.tasks().await;
        let stored_before = store.get(TASKS_KEY).await.unwrap();
        let missing = TaskId(42);

        assert_eq!(
            repo.update(missing, draft("x")).await,
            Err(AppError::NotFound(missing))
        );
        assert_eq!(repo.toggle(missing, true).await, Err(AppError::NotFound(missing)));
        assert_eq!(repo.delete(missing).await, Err(AppError::NotFound(missing)));
        assert_eq!(repo.get(missing).await, Err(AppError::NotFound(missing)));

        assert_eq!(repo.tasks().await, before);
        assert_eq!(store.get(TASKS_KEY).await.unwrap(), stored_before);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let repo = repo_on(Arc::new(MemoryKeyValueStore::new()));
        let task = repo.create(draft("once")).await.unwrap();

        repo.delete(task.id).await.unwrap();
        assert_eq!(repo.delete(task.id).await, Err(AppError::NotFound(task.id)));
    }

    #[tokio::test]
    async fn state_round_trips_through_the_store() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let repo = repo_on(store.clone());
        let a = repo.create(draft("a")).await.unwrap();
        let b = repo
            .create(TaskDraft::new("b", ColorTag(12345)).with_times(
                TaskTime::from_raw("2024-05-01 10:00"),
                TaskTime::from_raw("2024-05-02 11:00"),
            ))
            .await
            .unwrap();
        repo.create(draft("c")).await.unwrap();
        repo.toggle(a.id, true).await.unwrap();
        repo.update(b.id, draft("b2")).await.unwrap();
        let c = repo.tasks().await[0].id;
        repo.delete(c).await.unwrap();
        let expected = repo.tasks().await;

        let restarted = repo_on(store);
        assert_eq!(restarted.load().await, LoadReport::Restored(2));
        assert_eq!(restarted.tasks().await, expected);
    }

    #[tokio::test]
    async fn legacy_data_without_times_loads() {
        let legacy = r#"[
            {"id":1700000000002,"text":"newer","isDone":false,"colorArgb":-30080},
            {"id":1700000000001,"text":"older","isDone":true,"colorArgb":-1,"startTime":"2023-11-14 22:13"}
        ]"#;
        let store = Arc::new(MemoryKeyValueStore::with_entries([(TASKS_KEY, legacy)]));
        let repo = repo_on(store);

        assert_eq!(repo.load().await, LoadReport::Restored(2));
        let tasks = repo.tasks().await;
        assert_eq!(texts(&tasks), vec!["newer", "older"]);
        assert!(tasks[0].start_time.is_unset());
        assert!(tasks[0].end_time.is_unset());
        assert_eq!(tasks[0].color_tag, PALETTE[2].tag);
        assert_eq!(tasks[1].start_time.as_str(), "2023-11-14 22:13");
        assert!(tasks[1].end_time.is_unset());
        assert!(tasks[1].is_done);
    }

    #[tokio::test]
    async fn duplicate_ids_are_renumbered_on_load() {
        let stored = r#"[
            {"id":5,"text":"a","isDone":false,"colorTag":-1},
            {"id":5,"text":"b","isDone":false,"colorTag":-1},
            {"id":7,"text":"c","isDone":false,"colorTag":-1}
        ]"#;
        let store = Arc::new(MemoryKeyValueStore::with_entries([(TASKS_KEY, stored)]));
        let repo = TaskRepository::with_clock(store.clone(), FixedClock::at(1));

        assert_eq!(
            repo.load().await,
            LoadReport::Renumbered {
                restored: 3,
                renumbered: 1
            }
        );
        let ids: Vec<TaskId> = repo.tasks().await.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TaskId(5), TaskId(8), TaskId(7)]);

        let toggled = repo.toggle(TaskId(8), true).await.unwrap();
        assert_eq!(toggled.text, "b");
        assert!(!repo.get(TaskId(5)).await.unwrap().is_done);

        let restarted = TaskRepository::with_clock(store, FixedClock::at(1));
        assert_eq!(restarted.load().await, LoadReport::Restored(3));
    }

    #[tokio::test]
    async fn corrupt_data_loads_empty_and_is_kept_aside() {
        let store = Arc::new(MemoryKeyValueStore::with_entries([(TASKS_KEY, "{not a list")]));
        let repo = repo_on(store.clone());

        assert!(matches!(repo.load().await, LoadReport::Recovered(_)));
        assert!(repo.tasks().await.is_empty());
        assert_eq!(
            store.get(CORRUPT_TASKS_KEY).await.unwrap().as_deref(),
            Some("{not a list")
        );
    }

    #[tokio::test]
    async fn unreadable_store_loads_empty() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(StoreError::Read("disk gone".to_string())));
        let repo = TaskRepository::with_clock(Arc::new(store), FixedClock::at(1));

        assert_eq!(
            repo.load().await,
            LoadReport::Recovered("Failed to read store: disk gone".to_string())
        );
        assert!(repo.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_the_change_and_reports() {
        let mut store = MockKeyValueStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_set()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(StoreError::Write("read-only".to_string())));
        store
            .expect_set()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, value| {
                assert!(value.contains("first"));
                assert!(value.contains("second"));
                Ok(())
            });
        let repo = TaskRepository::with_clock(Arc::new(store), FixedClock::at(1));

        let result = repo.create(draft("first")).await;
        assert_eq!(
            result,
            Err(AppError::Store(StoreError::Write("read-only".to_string())))
        );
        assert_eq!(texts(&repo.tasks().await), vec!["first"]);

        repo.create(draft("second")).await.unwrap();
        assert_eq!(texts(&repo.tasks().await), vec!["second", "first"]);
    }
}
