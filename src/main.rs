use std::error::Error as _;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use sshportal::cli::{strip_command_delimiter, Cli};
use sshportal::config::{self, ConnectionConfig, ConnectionOverrides};
use sshportal::{Error, Session, SessionOptions};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .format_timestamp(None)
        .init();

    if cli.create_config {
        return match config::write_template(&cli.config) {
            Ok(()) => {
                println!("Configuration template created: {}", cli.config.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: could not write {}: {}", cli.config.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if matches!(e, Error::Validation { .. }) {
                eprintln!(
                    "Use --create-config to create a configuration file \
                     or provide parameters via command line"
                );
            }
            let mut source = e.source();
            while let Some(cause) = source {
                log::debug!("caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> sshportal::Result<()> {
    let file = config::load(&cli.config);
    let connection = ConnectionConfig::resolve(
        ConnectionOverrides {
            host: cli.host,
            user: cli.user,
            password: cli.password,
            port: cli.port,
        },
        &file,
    )?;

    let options = SessionOptions {
        quiet: cli.quiet,
        log_file: cli.log,
    };

    let mut session = Session::new(connection, options);

    if let Some(transfer) = cli.transfer {
        // num_args = 2 guarantees exactly two values.
        let (local, remote) = (&transfer[0], &transfer[1]);
        session.transfer(Path::new(local), remote).await?;
    } else if let Some(command) = cli.command.as_deref() {
        let command = strip_command_delimiter(command);
        session.execute(command).await?;
    } else {
        session.interactive_shell().await?;
    }

    Ok(())
}
