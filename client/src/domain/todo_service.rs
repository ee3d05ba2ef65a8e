//! Local CRUD over the todo cache.
//!
//! Every write is validated, applied to the cache together with its pending
//! mutations in one store transaction, and then nudges the sync loop.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use tracing::debug;

use super::ports::{StoreCounts, TodoStore};
use super::{
    Error, LocalWrite, RecordId, SyncTrigger, Todo, TodoChanges, TodoList, validate_text,
};

/// Application service for lists and todos.
pub struct TodoService {
    store: Arc<dyn TodoStore>,
    clock: Arc<dyn Clock>,
    trigger: Option<SyncTrigger>,
}

impl TodoService {
    /// Build a service that does not signal any sync loop.
    pub fn new(store: Arc<dyn TodoStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            trigger: None,
        }
    }

    /// Wake `trigger` after every successful write.
    #[must_use]
    pub fn with_trigger(mut self, trigger: SyncTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// All lists, newest first.
    pub async fn lists(&self) -> Result<Vec<TodoList>, Error> {
        Ok(self.store.lists().await?)
    }

    /// One list by id.
    pub async fn list(&self, id: &RecordId) -> Result<TodoList, Error> {
        self.store
            .find_list(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("list {id} does not exist")))
    }

    /// Todos of one list, newest first.
    pub async fn todos(&self, list_id: &RecordId) -> Result<Vec<Todo>, Error> {
        self.list(list_id).await?;
        Ok(self.store.todos_for_list(list_id).await?)
    }

    /// One todo by id.
    pub async fn todo(&self, id: &RecordId) -> Result<Todo, Error> {
        self.store
            .find_todo(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("todo {id} does not exist")))
    }

    /// Row counts and queue depth.
    pub async fn counts(&self) -> Result<StoreCounts, Error> {
        Ok(self.store.counts().await?)
    }

    /// Create a list with a fresh id.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use client::domain::TodoService;
    /// use client::domain::ports::FixtureTodoStore;
    /// use mockable::DefaultClock;
    ///
    /// # tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(async {
    /// let service = TodoService::new(Arc::new(FixtureTodoStore), Arc::new(DefaultClock));
    /// let list = service.create_list("  Groceries ").await.expect("valid name");
    /// assert_eq!(list.name, "Groceries");
    /// # });
    /// ```
    pub async fn create_list(&self, name: &str) -> Result<TodoList, Error> {
        let name = validate_text("name", name)?;
        let now = self.now();
        let list = TodoList {
            id: RecordId::random(),
            name,
            created_at: now,
            updated_at: now,
        };
        self.write(vec![LocalWrite::PutList(list.clone())]).await?;
        Ok(list)
    }

    /// Rename an existing list.
    pub async fn rename_list(&self, id: &RecordId, name: &str) -> Result<TodoList, Error> {
        let name = validate_text("name", name)?;
        let mut list = self.list(id).await?;
        let now = self.now();
        self.write(vec![LocalWrite::RenameList {
            id: id.clone(),
            name: name.clone(),
            updated_at: now,
        }])
        .await?;
        list.name = name;
        list.updated_at = now;
        Ok(list)
    }

    /// Delete a list and its todos, queuing the todo deletes first.
    pub async fn delete_list(&self, id: &RecordId) -> Result<(), Error> {
        self.list(id).await?;
        let mut todos = self.store.todos_for_list(id).await?;
        todos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut writes: Vec<_> = todos
            .into_iter()
            .map(|todo| LocalWrite::DeleteTodo(todo.id))
            .collect();
        writes.push(LocalWrite::DeleteList(id.clone()));
        self.write(writes).await
    }

    /// Add an open todo to an existing list.
    pub async fn create_todo(&self, list_id: &RecordId, description: &str) -> Result<Todo, Error> {
        let description = validate_text("description", description)?;
        self.list(list_id).await?;
        let now = self.now();
        let todo = Todo {
            id: RecordId::random(),
            list_id: list_id.clone(),
            description,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.write(vec![LocalWrite::PutTodo(todo.clone())]).await?;
        Ok(todo)
    }

    /// Replace a todo's description.
    pub async fn edit_todo(&self, id: &RecordId, description: &str) -> Result<Todo, Error> {
        let description = validate_text("description", description)?;
        self.patch_todo(
            id,
            TodoChanges {
                description: Some(description),
                completed: None,
            },
        )
        .await
    }

    /// Set a todo's completion flag.
    pub async fn set_completed(&self, id: &RecordId, completed: bool) -> Result<Todo, Error> {
        self.patch_todo(
            id,
            TodoChanges {
                description: None,
                completed: Some(completed),
            },
        )
        .await
    }

    /// Flip a todo's completion flag.
    pub async fn toggle_todo(&self, id: &RecordId) -> Result<Todo, Error> {
        let todo = self.todo(id).await?;
        self.set_completed(id, !todo.completed).await
    }

    /// Delete one todo.
    pub async fn delete_todo(&self, id: &RecordId) -> Result<(), Error> {
        self.todo(id).await?;
        self.write(vec![LocalWrite::DeleteTodo(id.clone())]).await
    }

    async fn patch_todo(&self, id: &RecordId, changes: TodoChanges) -> Result<Todo, Error> {
        let mut todo = self.todo(id).await?;
        let now = self.now();
        self.write(vec![LocalWrite::PatchTodo {
            id: id.clone(),
            changes: changes.clone(),
            updated_at: now,
        }])
        .await?;
        if let Some(description) = changes.description {
            todo.description = description;
        }
        if let Some(completed) = changes.completed {
            todo.completed = completed;
        }
        todo.updated_at = now;
        Ok(todo)
    }

    async fn write(&self, writes: Vec<LocalWrite>) -> Result<(), Error> {
        let op_ids = self.store.apply(&writes).await?;
        debug!(?op_ids, writes = writes.len(), "queued local writes");
        if let Some(trigger) = &self.trigger {
            trigger.notify();
        }
        Ok(())
    }

    /// Current time at the precision the stores keep.
    fn now(&self) -> DateTime<Utc> {
        self.clock.utc().trunc_subsecs(3)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mockall::predicate::always;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockTodoStore, TodoStoreError};
    use crate::test_support::MutableClock;

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
            .single()
            .expect("valid time")
    }

    fn id(raw: &str) -> RecordId {
        RecordId::new(raw).expect("valid id")
    }

    fn list(raw: &str, at: DateTime<Utc>) -> TodoList {
        TodoList {
            id: id(raw),
            name: "Groceries".to_owned(),
            created_at: at,
            updated_at: at,
        }
    }

    fn todo(raw: &str, completed: bool, at: DateTime<Utc>) -> Todo {
        Todo {
            id: id(raw),
            list_id: id("L1"),
            description: "Milk".to_owned(),
            completed,
            created_at: at,
            updated_at: at,
        }
    }

    fn service(store: MockTodoStore, now: DateTime<Utc>) -> TodoService {
        TodoService::new(Arc::new(store), Arc::new(MutableClock::new(now)))
    }

    #[rstest]
    #[tokio::test]
    async fn create_list_queues_a_put(now: DateTime<Utc>) {
        let mut store = MockTodoStore::new();
        store
            .expect_apply()
            .withf(|writes| matches!(writes, [LocalWrite::PutList(list)] if list.name == "Groceries"))
            .times(1)
            .returning(|_| Ok(vec![1]));

        let created = service(store, now)
            .create_list(" Groceries ")
            .await
            .expect("list created");

        assert_eq!(created.name, "Groceries");
        assert_eq!(created.created_at, now);
    }

    #[rstest]
    #[case("")]
    #[case("    ")]
    #[tokio::test]
    async fn blank_names_never_reach_the_store(now: DateTime<Utc>, #[case] name: &str) {
        let mut store = MockTodoStore::new();
        store.expect_apply().never();

        let error = service(store, now)
            .create_list(name)
            .await
            .expect_err("blank name");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn todos_need_an_existing_list(now: DateTime<Utc>) {
        let mut store = MockTodoStore::new();
        store.expect_find_list().with(always()).returning(|_| Ok(None));
        store.expect_apply().never();

        let error = service(store, now)
            .create_todo(&id("L404"), "Milk")
            .await
            .expect_err("missing list");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[case(false, true)]
    #[case(true, false)]
    #[tokio::test]
    async fn toggle_flips_completion(
        now: DateTime<Utc>,
        #[case] before: bool,
        #[case] after: bool,
    ) {
        let mut store = MockTodoStore::new();
        store
            .expect_find_todo()
            .returning(move |_| Ok(Some(todo("T1", before, now))));
        store
            .expect_apply()
            .withf(move |writes| {
                matches!(
                    writes,
                    [LocalWrite::PatchTodo { changes, .. }]
                        if changes.completed == Some(after) && changes.description.is_none()
                )
            })
            .times(1)
            .returning(|_| Ok(vec![7]));

        let toggled = service(store, now)
            .toggle_todo(&id("T1"))
            .await
            .expect("toggle succeeds");

        assert_eq!(toggled.completed, after);
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_a_list_queues_todos_oldest_first_then_the_list(now: DateTime<Utc>) {
        let later = now + chrono::TimeDelta::minutes(5);
        let mut store = MockTodoStore::new();
        store
            .expect_find_list()
            .returning(move |_| Ok(Some(list("L1", now))));
        store
            .expect_todos_for_list()
            .returning(move |_| Ok(vec![todo("T2", false, later), todo("T1", false, now)]));
        store
            .expect_apply()
            .withf(|writes| {
                writes
                    == [
                        LocalWrite::DeleteTodo(id("T1")),
                        LocalWrite::DeleteTodo(id("T2")),
                        LocalWrite::DeleteList(id("L1")),
                    ]
            })
            .times(1)
            .returning(|_| Ok(vec![1, 2, 3]));

        service(store, now)
            .delete_list(&id("L1"))
            .await
            .expect("delete succeeds");
    }

    #[rstest]
    #[tokio::test]
    async fn store_failures_become_domain_errors(now: DateTime<Utc>) {
        let mut store = MockTodoStore::new();
        store
            .expect_lists()
            .returning(|| Err(TodoStoreError::connection("database is locked")));

        let error = service(store, now).lists().await.expect_err("store down");

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    #[tokio::test]
    async fn writes_wake_the_sync_loop(now: DateTime<Utc>) {
        let mut store = MockTodoStore::new();
        store.expect_apply().returning(|_| Ok(vec![1]));
        let trigger = SyncTrigger::new();
        let service = service(store, now).with_trigger(trigger.clone());

        service.create_list("Chores").await.expect("list created");

        tokio::time::timeout(std::time::Duration::from_secs(1), trigger.notified())
            .await
            .expect("write notified the trigger");
    }
}
