use clap::Parser;
use rtcchat::cli::{
    Cli, Commands, cmd_cleanup, cmd_create_user, cmd_init, cmd_serve, cmd_status,
};
use rtcchat::logging::init_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_format) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Serve(args) => cmd_serve(&cli.database, args).await,
        Commands::Init { force } => cmd_init(&cli.database, force),
        Commands::Status { json } => cmd_status(&cli.database, json),
        Commands::Cleanup { limit_mb, env } => cmd_cleanup(&cli.database, limit_mb, env),
        Commands::CreateUser { name, password } => {
            cmd_create_user(&cli.database, &name, &password).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
