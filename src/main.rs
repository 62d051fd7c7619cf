mod cli;

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vrt_lib::{ChromiumLauncher, Config, Harness, Mode, VrtError};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = match cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version arrive here too, on stdout.
            let code = u8::from(err.use_stderr());
            if let Err(print_err) = err.print() {
                error!("{print_err}");
            }
            return ExitCode::from(code);
        }
    };
    let mode = args.mode();

    match run(mode).await {
        Ok(code) => code,
        Err(err) => {
            report_fatal(&err);
            ExitCode::from(1)
        }
    }
}

async fn run(mode: Mode) -> vrt_lib::Result<ExitCode> {
    let config = Config::load(None)?;
    info!(
        "Running in {mode} mode against {}",
        config.screenshots_dir.display()
    );

    let launcher = ChromiumLauncher::new(config.browser.clone());
    let summary = Harness::new(config, mode, launcher).run().await?;

    if summary.outcome.is_failure() {
        error!("Please run `vrt --update` to update the screenshots");
    }
    Ok(ExitCode::from(summary.exit_code()))
}

fn report_fatal(err: &VrtError) {
    let payload = err.to_payload();
    error!("{}", payload.message);
    if let Some(hint) = payload.remediation {
        error!("{hint}");
    }
}
