//! Campaign runner.
//!
//! ```bash
//! hwfuzz queue --dut ./testArrayOfQueue
//! SEED=7 NUM_ITERATIONS=0 hwfuzz mailbox
//! hwfuzz memory --checker ./axe --flushes 4
//! ```
//!
//! Exit status: 0 when the iteration cap is reached, 1 when a trial fails,
//! 2 when the campaign could not run.

use std::process::ExitCode;

use clap::Parser;
use hwfuzz::cli::Cli;
use hwfuzz::report::exit_code;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let result = match cli.command.build_campaign() {
        Ok(mut campaign) => campaign.run().await,
        Err(err) => Err(err),
    };

    match &result {
        Ok(report) if report.is_success() => println!("{report}"),
        Ok(report) => eprintln!("{report}"),
        Err(err) => {
            tracing::error!(error = %err, "campaign aborted");
            eprintln!("{err}");
        }
    }
    ExitCode::from(exit_code(&result))
}
