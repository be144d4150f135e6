use std::process::ExitCode;

fn main() -> ExitCode {
    customer_api_cli::run()
}
