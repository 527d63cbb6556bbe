use std::process::ExitCode;

fn main() -> ExitCode {
    sheetbot_cli::run()
}
