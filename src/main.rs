use drawdrive::commands::{failure_hint, Cli, DriveCommand};
use drawdrive::config::DriveSettings;
use drawdrive::error::DrawDriveResult;
use drawdrive::utils::logger::init_logger;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(err) = init_logger(cli.log_level.as_deref(), cli.log_file.clone()) {
        eprintln!("Failed to initialize logging: {err}");
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(details = %err.technical_details(), "Command failed");
            eprintln!("❌ {}", err.user_message());
            eprintln!("   {}", failure_hint(&err));
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> DrawDriveResult<u8> {
    let settings = DriveSettings::load(cli.config.as_deref())?;
    let mut command = DriveCommand::new(settings);
    command.execute(&cli.command).await
}
