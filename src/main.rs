use std::process::ExitCode;

fn main() -> ExitCode {
    match tsvar_scrub::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tsvar: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
