pub mod commands;
pub mod export;
pub mod labels;
pub mod logging;
pub mod models;
pub mod persist;
pub mod state;
pub mod storage;
pub mod store;
pub mod view;

#[cfg(all(feature = "cli", not(test)))]
mod cli;
#[cfg(test)]
mod test_support;

#[cfg(all(feature = "cli", not(test)))]
pub use cli::run;

pub use models::{EditCursor, SubmitMode, Task, TASK_KEY};
pub use state::{Outcome, TaskListState, TaskRef};
pub use storage::{KeyValueStore, MemoryKvStore, Storage, StorageError};
pub use store::{Hydration, TaskListStore};
