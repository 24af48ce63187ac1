use std::sync::Arc;

use crate::models::{decode_tasks, EditCursor, SubmitMode, Task, TASK_KEY};
use crate::persist::SnapshotWriter;
use crate::state::{Outcome, TaskListState, TaskRef};
use crate::storage::KeyValueStore;

/// How the list was obtained at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// A stored snapshot was loaded with this many tasks.
    Restored(usize),
    /// Nothing was stored under the key.
    Empty,
    /// The stored value could not be read or parsed; starting empty.
    Discarded,
}

/// The task list, the shared draft and the edit cursor, kept in sync with a
/// key-value store.
///
/// Every operation that changes the list queues a full snapshot write under
/// [`TASK_KEY`] and returns without waiting for it.
pub struct TaskListStore {
    state: TaskListState,
    writer: SnapshotWriter,
    hydration: Hydration,
}

impl TaskListStore {
    /// Creates the store and hydrates it once from `kv`.
    pub async fn open(kv: Arc<dyn KeyValueStore>) -> Self {
        let writer = SnapshotWriter::spawn(Arc::clone(&kv), TASK_KEY);
        let mut store = Self {
            state: TaskListState::new(),
            writer,
            hydration: Hydration::Empty,
        };
        store.hydrate(kv).await;
        store
    }

    async fn hydrate(&mut self, kv: Arc<dyn KeyValueStore>) {
        let read = tokio::task::spawn_blocking(move || kv.get(TASK_KEY)).await;
        let raw = match read {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                log::warn!("store: failed to read {TASK_KEY}, starting empty: {err}");
                self.hydration = Hydration::Discarded;
                return;
            }
            Err(err) => {
                log::warn!("store: hydrate task aborted, starting empty: {err}");
                self.hydration = Hydration::Discarded;
                return;
            }
        };
        let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
            log::info!("store: no saved tasks under {TASK_KEY}");
            self.hydration = Hydration::Empty;
            return;
        };
        match decode_tasks(&raw) {
            Ok(tasks) => {
                log::info!("store: restored {} tasks", tasks.len());
                self.hydration = Hydration::Restored(tasks.len());
                self.state.replace_tasks(tasks);
            }
            Err(err) => {
                log::warn!("store: malformed data under {TASK_KEY}, starting empty: {err}");
                self.hydration = Hydration::Discarded;
            }
        }
    }

    pub fn hydration(&self) -> Hydration {
        self.hydration
    }

    pub fn state(&self) -> &TaskListState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        self.state.tasks()
    }

    pub fn draft(&self) -> &str {
        self.state.draft()
    }

    pub fn edit_cursor(&self) -> EditCursor {
        self.state.edit_cursor()
    }

    pub fn submit_mode(&self) -> SubmitMode {
        self.state.submit_mode()
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        let _ = self.state.set_draft(text);
    }

    pub fn submit_draft(&mut self) -> Outcome {
        let mode = self.state.submit_mode();
        let outcome = self.state.submit_draft();
        if outcome.is_mutated() {
            log::debug!("store: submit mode={mode:?} len={}", self.tasks().len());
        } else {
            log::debug!("store: submit ignored, blank draft");
        }
        self.commit(outcome)
    }

    pub fn begin_edit(&mut self, handle: impl TaskRef) -> Outcome {
        let outcome = self.state.begin_edit(handle);
        self.commit_logged("begin_edit", handle, outcome)
    }

    pub fn delete_task(&mut self, handle: impl TaskRef) -> Outcome {
        let outcome = self.state.delete_task(handle);
        self.commit_logged("delete", handle, outcome)
    }

    pub fn toggle_complete(&mut self, handle: impl TaskRef) -> Outcome {
        let outcome = self.state.toggle_complete(handle);
        self.commit_logged("toggle", handle, outcome)
    }

    /// Waits until every snapshot queued so far has been handed to the store.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    fn commit_logged(&self, op: &str, handle: impl TaskRef, outcome: Outcome) -> Outcome {
        if outcome == Outcome::Ignored {
            log::debug!("store: {op} ignored, no task at {handle:?}");
        }
        self.commit(outcome)
    }

    fn commit(&self, outcome: Outcome) -> Outcome {
        if outcome.is_mutated() {
            self.writer.write(self.state.tasks());
        }
        outcome
    }
}
