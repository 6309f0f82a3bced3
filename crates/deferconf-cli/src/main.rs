use std::process::ExitCode;

fn main() -> ExitCode {
    deferconf_cli::run()
}
