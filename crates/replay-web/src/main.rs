use clap::Parser;
use replay_check::{BodyTap, ConsistencyChecker};
use replay_web::app::app;
use replay_web::cli::{Args, Role};
use replay_web::{Server, client};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(args.log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    match args.role() {
        Role::Server => serve(&args).await,
        Role::Client(mode) => match client::send(&args.target(), mode, &args.file, &args.types).await {
            Ok(status) => {
                info!(%status, "upload finished");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(cause = %e, "upload failed");
                ExitCode::FAILURE
            }
        },
    }
}

async fn serve(args: &Args) -> ExitCode {
    let tap = BodyTap::new(Arc::new(ConsistencyChecker::new()));

    let app = match app(tap) {
        Ok(app) => app,
        Err(e) => {
            error!(cause = %e, "failed to build routes");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::builder().address(args.address()).handler(app).build() {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "invalid server configuration");
            return ExitCode::FAILURE;
        }
    };

    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}
