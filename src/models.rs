use serde::{Deserialize, Serialize};

/// Key of the persisted task list in the key-value store.
pub const TASK_KEY: &str = "@tasks";

/// One row of the list. Field names are part of the stored layout:
/// `{"name":"buy milk","isCompleted":false}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub is_completed: bool,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_completed: false,
        }
    }
}

/// Serializes the whole list in display order as a compact JSON array.
pub fn encode_tasks(tasks: &[Task]) -> Result<String, serde_json::Error> {
    serde_json::to_string(tasks)
}

pub fn decode_tasks(raw: &str) -> Result<Vec<Task>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Which task, if any, the shared input field is currently editing.
///
/// Session-only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditCursor {
    #[default]
    Idle,
    Editing(usize),
}

impl EditCursor {
    /// `-1` when idle, otherwise the edited position.
    pub fn as_sentinel(self) -> i64 {
        match self {
            EditCursor::Idle => -1,
            EditCursor::Editing(index) => index as i64,
        }
    }

    pub fn is_editing(self) -> bool {
        matches!(self, EditCursor::Editing(_))
    }
}

/// What the submit control does right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    Add,
    Update,
}

impl From<EditCursor> for SubmitMode {
    fn from(cursor: EditCursor) -> Self {
        if cursor.is_editing() {
            SubmitMode::Update
        } else {
            SubmitMode::Add
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: default_language(),
            flush_timeout_ms: default_flush_timeout_ms(),
        }
    }
}

impl Settings {
    /// Trims and lowercases the language; anything unknown falls back to `auto`.
    pub fn normalized(mut self) -> Self {
        let language = self.language.trim().to_lowercase();
        self.language = match language.as_str() {
            "auto" | "en" | "pt" => language,
            _ => default_language(),
        };
        self
    }
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_flush_timeout_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}
