use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::models::{encode_tasks, Task};
use crate::storage::KeyValueStore;

enum WriteRequest {
    Snapshot(String),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget writer for full list snapshots.
///
/// Each [`SnapshotWriter::write`] serializes the list immediately and queues it
/// for a single background task, so writes land in mutation order and callers
/// never wait on storage. Write failures are logged, not returned.
pub struct SnapshotWriter {
    key: String,
    tx: mpsc::UnboundedSender<WriteRequest>,
}

impl SnapshotWriter {
    /// Starts the background writer. Must be called from within a tokio runtime.
    pub fn spawn(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteRequest>();
        let task_key = key.clone();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request {
                    WriteRequest::Snapshot(value) => {
                        store_snapshot(Arc::clone(&kv), task_key.clone(), value).await
                    }
                    WriteRequest::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            log::debug!("persist: writer stopped key={task_key}");
        });
        Self { key, tx }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn write(&self, tasks: &[Task]) {
        let value = match encode_tasks(tasks) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("persist: failed to encode snapshot key={}: {err}", self.key);
                return;
            }
        };
        if self.tx.send(WriteRequest::Snapshot(value)).is_err() {
            log::warn!("persist: writer is gone, dropping snapshot key={}", self.key);
        }
    }

    /// Resolves once every snapshot queued before this call has been handled.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(WriteRequest::Flush(done)).is_err() {
            return;
        }
        let _ = wait.await;
    }
}

async fn store_snapshot(kv: Arc<dyn KeyValueStore>, key: String, value: String) {
    let bytes = value.len();
    let log_key = key.clone();
    match tokio::task::spawn_blocking(move || kv.set(&key, &value)).await {
        Ok(Ok(())) => log::debug!("persist: wrote key={log_key} bytes={bytes}"),
        Ok(Err(err)) => log::warn!("persist: write failed key={log_key}: {err}"),
        Err(err) => log::warn!("persist: write task aborted key={log_key}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TASK_KEY;
    use crate::test_support::RecordingKv;

    #[tokio::test]
    async fn writes_land_in_order_and_flush_waits_for_them() {
        let kv = Arc::new(RecordingKv::new());
        let writer = SnapshotWriter::spawn(kv.clone(), TASK_KEY);
        assert_eq!(writer.key(), "@tasks");

        writer.write(&[Task::new("a")]);
        writer.write(&[Task::new("a"), Task::new("b")]);
        writer.write(&[]);
        writer.flush().await;

        assert_eq!(
            kv.writes(),
            vec![
                r#"[{"name":"a","isCompleted":false}]"#.to_string(),
                r#"[{"name":"a","isCompleted":false},{"name":"b","isCompleted":false}]"#
                    .to_string(),
                "[]".to_string(),
            ]
        );
        assert_eq!(kv.get(TASK_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn failed_writes_are_swallowed_and_later_writes_still_run() {
        let kv = Arc::new(RecordingKv::new());
        let writer = SnapshotWriter::spawn(kv.clone(), TASK_KEY);

        kv.set_failing(true);
        writer.write(&[Task::new("lost")]);
        writer.flush().await;
        assert!(kv.writes().is_empty());
        assert_eq!(kv.failed_writes(), 1);

        kv.set_failing(false);
        writer.write(&[Task::new("kept")]);
        writer.flush().await;
        assert_eq!(
            kv.get(TASK_KEY).unwrap().as_deref(),
            Some(r#"[{"name":"kept","isCompleted":false}]"#)
        );
    }
}
