use std::process::ExitCode;

use refmesh::ui::output;

fn main() -> ExitCode {
    match refmesh::cli::run() {
        Ok(code) => code,
        Err(e) => {
            output::error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
