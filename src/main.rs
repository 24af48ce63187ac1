use std::process::ExitCode;

fn main() -> ExitCode {
    match tasklist_lib::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("tasklist: {err}");
            ExitCode::FAILURE
        }
    }
}
