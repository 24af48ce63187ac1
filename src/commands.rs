use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::export::{export_default_path, export_to_path, ExportFormat};
use crate::labels::Labels;
use crate::state::Outcome;
use crate::storage::KeyValueStore;
use crate::store::TaskListStore;
use crate::view::ListView;

pub const HELP: &str = "\
type text + enter   add it (or save the task being edited)
enter on empty line submit the current input again
/edit N             load task N into the input
/toggle N           mark task N done / not done
/delete N           remove task N
/list               show the list
/export md|csv|json write the list to the exports folder
/help               this text
/quit               leave
//text              add text that starts with '/'";

#[derive(Debug, serde::Serialize, PartialEq)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

pub fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

pub fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Optionally replace the input text, then press submit.
    Submit(Option<String>),
    Edit(usize),
    Toggle(usize),
    Delete(usize),
    List,
    Export(ExportFormat),
    Help,
    Quit,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    View(ListView),
    Exported { path: String },
    Help { text: String },
    Quit,
}

/// Parses one line of user input. Surrounding whitespace of plain text is kept.
pub fn parse_line(line: &str) -> Result<SessionCommand, String> {
    let line = line.trim_end_matches(['\n', '\r']);
    if let Some(text) = line.strip_prefix("//") {
        return Ok(SessionCommand::Submit(Some(format!("/{text}"))));
    }
    if !line.starts_with('/') {
        if line.is_empty() {
            return Ok(SessionCommand::Submit(None));
        }
        return Ok(SessionCommand::Submit(Some(line.to_string())));
    }

    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or("/");
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(format!("too many arguments for {name}"));
    }
    match name {
        "/edit" | "/e" => parse_index(name, arg).map(SessionCommand::Edit),
        "/toggle" | "/t" => parse_index(name, arg).map(SessionCommand::Toggle),
        "/delete" | "/d" => parse_index(name, arg).map(SessionCommand::Delete),
        "/list" | "/l" => no_arg(name, arg, SessionCommand::List),
        "/help" | "/h" | "/?" => no_arg(name, arg, SessionCommand::Help),
        "/quit" | "/q" => no_arg(name, arg, SessionCommand::Quit),
        "/export" => arg
            .unwrap_or("md")
            .parse::<ExportFormat>()
            .map(SessionCommand::Export),
        other => Err(format!("unknown command {other}, try /help")),
    }
}

fn parse_index(name: &str, arg: Option<&str>) -> Result<usize, String> {
    let arg = arg.ok_or_else(|| format!("{name} needs a task number"))?;
    arg.parse::<usize>()
        .map_err(|_| format!("{name}: '{arg}' is not a task number"))
}

fn no_arg(
    name: &str,
    arg: Option<&str>,
    command: SessionCommand,
) -> Result<SessionCommand, String> {
    match arg {
        Some(_) => Err(format!("{name} takes no arguments")),
        None => Ok(command),
    }
}

/// The store plus what the front end needs to present and export it.
pub struct Session {
    store: TaskListStore,
    labels: Labels,
    data_dir: PathBuf,
}

impl Session {
    pub async fn open(kv: Arc<dyn KeyValueStore>, labels: Labels, data_dir: PathBuf) -> Self {
        Self {
            store: TaskListStore::open(kv).await,
            labels,
            data_dir,
        }
    }

    pub fn store(&self) -> &TaskListStore {
        &self.store
    }

    pub fn view(&self) -> ListView {
        ListView::build(self.store.state(), &self.labels)
    }

    pub async fn flush(&self) {
        self.store.flush().await;
    }

    pub fn execute(&mut self, command: SessionCommand) -> CommandResult<Reply> {
        let outcome = match command {
            SessionCommand::Submit(text) => {
                if let Some(text) = text {
                    self.store.set_draft(text);
                }
                // A blank submit is silently rejected; the view still comes back.
                let _ = self.store.submit_draft();
                return ok(Reply::View(self.view()));
            }
            SessionCommand::Edit(index) => (index, self.store.begin_edit(index)),
            SessionCommand::Toggle(index) => (index, self.store.toggle_complete(index)),
            SessionCommand::Delete(index) => (index, self.store.delete_task(index)),
            SessionCommand::List => return ok(Reply::View(self.view())),
            SessionCommand::Export(format) => return self.export(format),
            SessionCommand::Help => {
                return ok(Reply::Help {
                    text: HELP.to_string(),
                })
            }
            SessionCommand::Quit => return ok(Reply::Quit),
        };
        match outcome {
            (index, Outcome::Ignored) => err(&format!("no task at position {index}")),
            _ => ok(Reply::View(self.view())),
        }
    }

    /// Replaces the text of one task in a single step; blank text is an error
    /// here rather than a silent no-op.
    pub fn replace_task(&mut self, index: usize, text: String) -> CommandResult<Reply> {
        if text.trim().is_empty() {
            return err("text is empty");
        }
        let result = self.execute(SessionCommand::Edit(index));
        if !result.ok {
            return result;
        }
        self.execute(SessionCommand::Submit(Some(text)))
    }

    fn export(&self, format: ExportFormat) -> CommandResult<Reply> {
        self.export_to(&export_default_path(&self.data_dir, format), format)
    }

    pub fn export_to(&self, path: &Path, format: ExportFormat) -> CommandResult<Reply> {
        if let Err(error) = export_to_path(path, format, self.labels.title, self.store.tasks()) {
            log::warn!("commands: export failed path={}: {error}", path.display());
            return err(&format!("export error: {error}"));
        }
        log::info!(
            "commands: exported {} tasks to {}",
            self.store.tasks().len(),
            path.display()
        );
        ok(Reply::Exported {
            path: path.to_string_lossy().to_string(),
        })
    }
}

fn error_line(message: &str) -> String {
    let envelope = serde_json::json!({"ok": false, "data": null, "error": message});
    format!("{envelope}\n")
}

pub fn format_reply(result: &CommandResult<Reply>, json: bool) -> String {
    if json {
        return serde_json::to_string(result)
            .map(|mut line| {
                line.push('\n');
                line
            })
            .unwrap_or_else(|e| error_line(&e.to_string()));
    }
    match (&result.data, &result.error) {
        (Some(Reply::View(view)), _) => view.render_text(),
        (Some(Reply::Exported { path }), _) => format!("exported to {path}\n"),
        (Some(Reply::Help { text }), _) => format!("{text}\n"),
        (Some(Reply::Quit), _) => String::new(),
        (None, Some(message)) => format!("error: {message}\n"),
        (None, None) => String::new(),
    }
}

/// Reads commands line by line until `/quit` or end of input, printing a reply
/// after each one. Queued writes are left to the caller to flush.
pub async fn run_session<R, W>(
    session: &mut Session,
    mut input: R,
    out: &mut W,
    json: bool,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    out.write_all(format_reply(&ok(Reply::View(session.view())), json).as_bytes())?;
    out.flush()?;
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line).await? == 0 {
            break;
        }
        let result = match parse_line(&line) {
            Ok(command) => session.execute(command),
            Err(message) => err(&message),
        };
        out.write_all(format_reply(&result, json).as_bytes())?;
        out.flush()?;
        if matches!(result.data, Some(Reply::Quit)) {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{labels, Language};
    use crate::models::{EditCursor, Task, TASK_KEY};
    use crate::test_support::RecordingKv;

    async fn make_session(kv: Arc<RecordingKv>, data_dir: PathBuf) -> Session {
        Session::open(kv, labels(Language::En), data_dir).await
    }

    #[test]
    fn ok_and_err_helpers_construct_expected_shape() {
        let r = ok(123);
        assert!(r.ok);
        assert_eq!(r.data, Some(123));
        assert_eq!(r.error, None);

        let r: CommandResult<i32> = err("nope");
        assert!(!r.ok);
        assert_eq!(r.data, None);
        assert_eq!(r.error, Some("nope".to_string()));
    }

    #[test]
    fn parse_line_covers_text_and_slash_commands() {
        assert_eq!(
            parse_line("buy milk\n"),
            Ok(SessionCommand::Submit(Some("buy milk".to_string())))
        );
        assert_eq!(
            parse_line("  padded  \r\n"),
            Ok(SessionCommand::Submit(Some("  padded  ".to_string())))
        );
        assert_eq!(parse_line("\n"), Ok(SessionCommand::Submit(None)));
        assert_eq!(
            parse_line("//etc/hosts"),
            Ok(SessionCommand::Submit(Some("/etc/hosts".to_string())))
        );
        assert_eq!(parse_line("/edit 2"), Ok(SessionCommand::Edit(2)));
        assert_eq!(parse_line("/t 0"), Ok(SessionCommand::Toggle(0)));
        assert_eq!(parse_line("/delete  1 "), Ok(SessionCommand::Delete(1)));
        assert_eq!(parse_line("/list"), Ok(SessionCommand::List));
        assert_eq!(parse_line("/q"), Ok(SessionCommand::Quit));
        assert_eq!(parse_line("/help"), Ok(SessionCommand::Help));
        assert_eq!(
            parse_line("/export"),
            Ok(SessionCommand::Export(ExportFormat::Markdown))
        );
        assert_eq!(
            parse_line("/export csv"),
            Ok(SessionCommand::Export(ExportFormat::Csv))
        );
    }

    #[test]
    fn parse_line_rejects_malformed_commands() {
        assert!(parse_line("/edit").is_err());
        assert!(parse_line("/edit -1").is_err());
        assert!(parse_line("/edit x").is_err());
        assert!(parse_line("/toggle 1 2").is_err());
        assert!(parse_line("/list now").is_err());
        assert!(parse_line("/export xml").is_err());
        assert!(parse_line("/frobnicate").is_err());
        assert!(parse_line("/").is_err());
    }

    #[tokio::test]
    async fn execute_drives_the_store_and_returns_views() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(RecordingKv::new());
        let mut session = make_session(kv.clone(), dir.path().to_path_buf()).await;

        let r = session.execute(SessionCommand::Submit(Some("buy milk".to_string())));
        assert!(r.ok);
        let Some(Reply::View(view)) = r.data else {
            panic!("expected view");
        };
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.submit_label, "Add Task");

        let r = session.execute(SessionCommand::Edit(0));
        let Some(Reply::View(view)) = r.data else {
            panic!("expected view");
        };
        assert_eq!(view.draft, "buy milk");
        assert_eq!(view.submit_label, "Update Task");

        // Empty submit commits the loaded text unchanged.
        let _ = session.execute(SessionCommand::Submit(None));
        assert_eq!(session.store().tasks(), &[Task::new("buy milk")]);
        assert_eq!(session.store().edit_cursor(), EditCursor::Idle);

        let _ = session.execute(SessionCommand::Toggle(0));
        assert!(session.store().tasks()[0].is_completed);
        let _ = session.execute(SessionCommand::Delete(0));
        assert!(session.store().tasks().is_empty());

        session.flush().await;
        assert_eq!(kv.writes().len(), 4);
        assert_eq!(kv.get(TASK_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn execute_reports_missing_positions_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(RecordingKv::new());
        let mut session = make_session(kv.clone(), dir.path().to_path_buf()).await;

        for command in [
            SessionCommand::Edit(0),
            SessionCommand::Toggle(3),
            SessionCommand::Delete(1),
        ] {
            let r = session.execute(command);
            assert!(!r.ok);
            assert!(r.error.unwrap().starts_with("no task at position"));
        }

        let r = session.execute(SessionCommand::Submit(Some("   ".to_string())));
        assert!(r.ok);
        assert!(session.store().tasks().is_empty());

        session.flush().await;
        assert!(kv.writes().is_empty());
    }

    #[tokio::test]
    async fn replace_task_rejects_blank_text_and_missing_positions() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(RecordingKv::with_entry(
            TASK_KEY,
            r#"[{"name":"a","isCompleted":true}]"#,
        ));
        let mut session = make_session(kv.clone(), dir.path().to_path_buf()).await;

        let r = session.replace_task(0, "   ".to_string());
        assert!(!r.ok);
        assert_eq!(r.error.as_deref(), Some("text is empty"));
        assert_eq!(session.store().edit_cursor(), EditCursor::Idle);

        let r = session.replace_task(4, "b".to_string());
        assert_eq!(r.error.as_deref(), Some("no task at position 4"));

        let r = session.replace_task(0, "b".to_string());
        assert!(r.ok);
        assert_eq!(session.store().tasks(), &[Task::new("b")]);

        session.flush().await;
        assert_eq!(kv.writes().len(), 1);
    }

    #[test]
    fn error_line_escapes_quotes_and_backslashes() {
        let line = error_line(r#"bad "value" at C:\path"#);
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["ok"], serde_json::json!(false));
        assert!(value["data"].is_null());
        assert_eq!(value["error"], serde_json::json!(r#"bad "value" at C:\path"#));
    }

    #[tokio::test]
    async fn export_writes_into_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(RecordingKv::with_entry(
            TASK_KEY,
            r#"[{"name":"a","isCompleted":true}]"#,
        ));
        let mut session = make_session(kv, dir.path().to_path_buf()).await;

        let r = session.execute(SessionCommand::Export(ExportFormat::Markdown));
        let Some(Reply::Exported { path }) = r.data else {
            panic!("expected export path");
        };
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "# Task list\n\n- [x] a\n");
    }

    #[tokio::test]
    async fn export_fails_when_data_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let mut session = make_session(Arc::new(RecordingKv::new()), blocker).await;

        let r = session.execute(SessionCommand::Export(ExportFormat::Json));
        assert!(!r.ok);
        assert!(r.error.unwrap().starts_with("export error:"));
    }

    #[test]
    fn format_reply_renders_text_and_json() {
        let r: CommandResult<Reply> = err("boom");
        assert_eq!(format_reply(&r, false), "error: boom\n");
        assert_eq!(
            format_reply(&r, true),
            "{\"ok\":false,\"data\":null,\"error\":\"boom\"}\n"
        );

        let r = ok(Reply::Exported {
            path: "/tmp/x.md".to_string(),
        });
        assert_eq!(format_reply(&r, false), "exported to /tmp/x.md\n");
        let value: serde_json::Value =
            serde_json::from_str(format_reply(&r, true).trim_end()).unwrap();
        assert_eq!(value["data"]["kind"], serde_json::json!("exported"));
        assert_eq!(format_reply(&ok(Reply::Quit), false), "");
    }

    #[tokio::test]
    async fn run_session_processes_lines_until_quit() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(RecordingKv::new());
        let mut session = make_session(kv.clone(), dir.path().to_path_buf()).await;

        let input: &[u8] = b"first\nsecond\n/toggle 0\n/nope\n/quit\nnever\n";
        let mut out = Vec::new();
        run_session(&mut session, input, &mut out, false).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("error: unknown command /nope"));
        assert!(text.contains("   0 [x] first"));
        assert_eq!(
            session.store().tasks(),
            &[
                Task {
                    name: "first".to_string(),
                    is_completed: true
                },
                Task::new("second")
            ]
        );
        session.flush().await;
        assert_eq!(kv.writes().len(), 3);
    }

    #[tokio::test]
    async fn run_session_stops_at_end_of_input() {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(RecordingKv::new());
        let mut session = make_session(kv.clone(), dir.path().to_path_buf()).await;

        let input: &[u8] = b"only";
        let mut out = Vec::new();
        run_session(&mut session, input, &mut out, true).await.unwrap();

        let lines: Vec<&str> = std::str::from_utf8(&out).unwrap().lines().collect();
        assert_eq!(lines.len(), 2);
        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last["ok"], serde_json::json!(true));
        assert_eq!(last["data"]["rows"][0]["name"], serde_json::json!("only"));
        session.flush().await;
        assert_eq!(kv.writes().len(), 1);
    }
}
