use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match psicoflow_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Psicoflow failed to start: {e}");
            ExitCode::FAILURE
        }
    }
}
