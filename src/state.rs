use crate::models::{EditCursor, SubmitMode, Task};

/// Resolves a caller-supplied task handle to a position in the list.
///
/// Tasks are addressed by position today, so a handle means "whatever sits at
/// position i right now". Swapping in stable identifiers only needs a new impl.
pub trait TaskRef: Copy + std::fmt::Debug {
    fn resolve(self, tasks: &[Task]) -> Option<usize>;
}

impl TaskRef for usize {
    fn resolve(self, tasks: &[Task]) -> Option<usize> {
        (self < tasks.len()).then_some(self)
    }
}

/// Result of applying one operation to [`TaskListState`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The task list changed and a new snapshot must be written.
    Mutated,
    /// Only the draft text or the edit cursor changed.
    SessionOnly,
    /// Rejected input or unresolvable handle; nothing changed.
    Ignored,
}

impl Outcome {
    pub fn is_mutated(self) -> bool {
        self == Outcome::Mutated
    }
}

/// The whole screen state: the list, the shared input text and the edit cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListState {
    tasks: Vec<Task>,
    draft: String,
    cursor: EditCursor,
}

impl TaskListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn edit_cursor(&self) -> EditCursor {
        self.cursor
    }

    pub fn submit_mode(&self) -> SubmitMode {
        SubmitMode::from(self.cursor)
    }

    /// Replaces the list wholesale. Draft and cursor are untouched.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn set_draft(&mut self, text: impl Into<String>) -> Outcome {
        self.draft = text.into();
        Outcome::SessionOnly
    }

    /// Adds the draft as a new task, or commits it over the task being edited.
    ///
    /// A committed edit always comes back as not completed. A cursor left past
    /// the end of the list by an earlier delete appends instead of replacing.
    pub fn submit_draft(&mut self) -> Outcome {
        if self.draft.trim().is_empty() {
            return Outcome::Ignored;
        }
        let task = Task::new(std::mem::take(&mut self.draft));
        match self.cursor {
            EditCursor::Idle => self.tasks.push(task),
            EditCursor::Editing(index) => match self.tasks.get_mut(index) {
                Some(slot) => *slot = task,
                None => self.tasks.push(task),
            },
        }
        self.cursor = EditCursor::Idle;
        Outcome::Mutated
    }

    /// Loads a task's name into the draft and points the cursor at it.
    ///
    /// Any edit already in progress is abandoned.
    pub fn begin_edit(&mut self, handle: impl TaskRef) -> Outcome {
        let Some(index) = handle.resolve(&self.tasks) else {
            return Outcome::Ignored;
        };
        self.draft = self.tasks[index].name.clone();
        self.cursor = EditCursor::Editing(index);
        Outcome::SessionOnly
    }

    /// Removes one task; later tasks shift left. The edit cursor is not adjusted.
    pub fn delete_task(&mut self, handle: impl TaskRef) -> Outcome {
        let Some(index) = handle.resolve(&self.tasks) else {
            return Outcome::Ignored;
        };
        self.tasks.remove(index);
        Outcome::Mutated
    }

    pub fn toggle_complete(&mut self, handle: impl TaskRef) -> Outcome {
        let Some(index) = handle.resolve(&self.tasks) else {
            return Outcome::Ignored;
        };
        let task = &mut self.tasks[index];
        task.is_completed = !task.is_completed;
        Outcome::Mutated
    }
}
