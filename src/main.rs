use std::process::ExitCode;

fn main() -> ExitCode {
    match specstress::entry::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
