use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use crate::commands::{format_reply, run_session, CommandResult, Reply, Session, SessionCommand};
use crate::export::ExportFormat;
use crate::labels::{labels, resolve_language};
use crate::logging::init_logging;
use crate::models::Settings;
use crate::storage::{KeyValueStore, Storage};

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Lista de tarefas - add, edit, complete and delete short tasks")]
#[command(version)]
struct Cli {
    /// Directory holding storage.json, settings.json and the log files
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print every reply as a JSON envelope
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session on stdin (default)
    Shell,
    /// Show the list
    List,
    /// Add a task
    Add { text: String },
    /// Replace the text of task N (this also clears its done mark)
    Edit { index: usize, text: String },
    /// Mark task N done / not done
    Toggle { index: usize },
    /// Remove task N
    Delete { index: usize },
    /// Write the list as Markdown, CSV or JSON
    Export {
        #[arg(short, long, default_value = "md", value_parser = parse_format)]
        format: ExportFormat,
        /// Destination file (default: <data-dir>/exports/tasks-<timestamp>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tasklist"))
        .unwrap_or_else(|| PathBuf::from(".tasklist"))
}

pub fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);

    // A broken log setup must not keep the list from opening.
    let _logger = match init_logging(&data_dir) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("tasklist: logging disabled: {err}");
            None
        }
    };

    let storage = Storage::new(data_dir.clone());
    storage.ensure_dirs()?;
    let settings = storage.load_settings_or_default();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_async(cli, storage, settings, data_dir))
}

async fn run_async(
    cli: Cli,
    storage: Storage,
    settings: Settings,
    data_dir: PathBuf,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let labels = labels(resolve_language(&settings.language));
    let kv: Arc<dyn KeyValueStore> = Arc::new(storage);
    let mut session = Session::open(kv, labels, data_dir).await;
    let json = cli.json;
    let mut out = std::io::stdout().lock();

    let code = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_session(&mut session, stdin, &mut out, json).await?;
            ExitCode::SUCCESS
        }
        Commands::List => print_reply(&mut out, json, session.execute(SessionCommand::List))?,
        Commands::Add { text } => print_reply(
            &mut out,
            json,
            session.execute(SessionCommand::Submit(Some(text))),
        )?,
        Commands::Edit { index, text } => {
            print_reply(&mut out, json, session.replace_task(index, text))?
        }
        Commands::Toggle { index } => {
            print_reply(&mut out, json, session.execute(SessionCommand::Toggle(index)))?
        }
        Commands::Delete { index } => {
            print_reply(&mut out, json, session.execute(SessionCommand::Delete(index)))?
        }
        Commands::Export {
            format,
            output: Some(path),
        } => print_reply(&mut out, json, session.export_to(&path, format))?,
        Commands::Export {
            format,
            output: None,
        } => print_reply(&mut out, json, session.execute(SessionCommand::Export(format)))?,
    };

    let timeout = Duration::from_millis(settings.flush_timeout_ms);
    if tokio::time::timeout(timeout, session.flush()).await.is_err() {
        log::warn!("cli: pending writes not finished after {timeout:?}");
    }
    Ok(code)
}

fn print_reply(
    out: &mut impl Write,
    json: bool,
    result: CommandResult<Reply>,
) -> std::io::Result<ExitCode> {
    out.write_all(format_reply(&result, json).as_bytes())?;
    Ok(if result.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
