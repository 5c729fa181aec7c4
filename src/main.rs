use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use logval_logs::LogValidatorService;
use logval_types::{ServiceResponse, ServiceResponseBody};

mod plan;

use plan::{ConfigFile, Plan};

/// logval - wait for expected records to show up in growing log files
#[derive(Parser, Debug)]
#[command(name = "logval")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Plan file (TOML, or JSON with a .json extension) of listen/assert/reset steps
    #[arg(value_name = "PLAN")]
    plan: PathBuf,

    /// Config file (TOML) with a [validator] table
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Stop waiting for records after this many seconds overall
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Run the remaining steps after a failed one
    #[arg(long)]
    keep_going: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let plan = Plan::load(&args.plan)?;
    let service = LogValidatorService::new(config.validator);

    // Ctrl-C and the overall timeout both cut the current wait short
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }
    if let Some(secs) = args.timeout_secs {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!(secs, "timeout reached");
            cancel.cancel();
        });
    }

    let total = plan.steps.len();
    let mut failed = 0;
    for step in plan.steps {
        let response = service.run(step, &cancel).await;
        println!("{}", serde_json::to_string_pretty(&response)?);

        if step_failed(&response) {
            failed += 1;
            if !args.keep_going {
                break;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} steps failed", failed, total);
    }
    Ok(())
}

/// A step fails on a top-level error or on any unmatched expectation
fn step_failed(response: &ServiceResponse) -> bool {
    match &response.response {
        _ if response.is_error() => true,
        Some(ServiceResponseBody::Assert(body)) => !body.is_success(),
        _ => false,
    }
}
