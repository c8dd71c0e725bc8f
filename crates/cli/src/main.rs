use std::process::ExitCode;

fn main() -> ExitCode {
    sommelier_cli::run()
}
