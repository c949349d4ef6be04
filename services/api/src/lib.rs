mod cli;
mod infra;
mod report;
mod routes;
mod server;

use supper_club::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
