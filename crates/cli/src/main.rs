use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tramite_cli::run().await
}
