use std::fmt::Write as _;

use serde::Serialize;

use crate::labels::Labels;
use crate::models::{EditCursor, SubmitMode};
use crate::state::TaskListState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowView {
    pub index: usize,
    pub name: String,
    pub is_completed: bool,
    pub editing: bool,
}

/// Everything the screen shows, derived fresh from the state on every render.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListView {
    pub title: String,
    pub subtitle: String,
    pub placeholder: String,
    pub draft: String,
    pub mode: SubmitMode,
    pub submit_label: String,
    pub edit_cursor: i64,
    pub rows: Vec<RowView>,
    #[serde(skip)]
    empty_label: String,
}

impl ListView {
    pub fn build(state: &TaskListState, labels: &Labels) -> Self {
        let cursor = state.edit_cursor();
        let rows = state
            .tasks()
            .iter()
            .enumerate()
            .map(|(index, task)| RowView {
                index,
                name: task.name.clone(),
                is_completed: task.is_completed,
                editing: cursor == EditCursor::Editing(index),
            })
            .collect();
        let mode = state.submit_mode();
        Self {
            title: labels.title.to_string(),
            subtitle: labels.subtitle.to_string(),
            placeholder: labels.placeholder.to_string(),
            draft: state.draft().to_string(),
            mode,
            submit_label: labels.submit(mode).to_string(),
            edit_cursor: cursor.as_sentinel(),
            rows,
            empty_label: labels.empty_list.to_string(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", self.subtitle);
        let input = if self.draft.is_empty() {
            format!("({})", self.placeholder)
        } else {
            self.draft.clone()
        };
        let _ = writeln!(out, "> {input}  [{}]", self.submit_label);
        if self.rows.is_empty() {
            let _ = writeln!(out, "  {}", self.empty_label);
        }
        for row in &self.rows {
            let check = if row.is_completed { 'x' } else { ' ' };
            let marker = if row.editing { '*' } else { ' ' };
            let _ = writeln!(out, "{marker}{:>3} [{check}] {}", row.index, row.name);
        }
        out
    }
}
