use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tokio::task;

use quickbuy::console::{self, ScheduleChoice};
use quickbuy::interrupt::CancelToken;
use quickbuy::login;
use quickbuy::runner::StepRunner;
use quickbuy::schedule::{self, ScheduleStore, StartupDecision, WaitOutcome};
use quickbuy::script;
use quickbuy::session::{BrowserSession, SessionOptions};
use quickbuy::types::{ResolvedInputs, RunReport, ScheduleRequest};

/// One-click purchase automation with optional scheduled execution.
#[derive(Debug, Parser)]
#[command(name = "quickbuy", version, about)]
struct Cli {
    /// Run Chrome headless instead of showing the window.
    #[arg(long)]
    headless: bool,

    /// Chrome profile directory; keeps the site login between runs.
    #[arg(long, default_value = "user_data")]
    profile_dir: PathBuf,

    /// Where the pending schedule is stored.
    #[arg(long, default_value = "schedule.json")]
    schedule_file: PathBuf,

    /// Assume the profile is already logged in.
    #[arg(long)]
    skip_login_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cancel = CancelToken::install();
    let store = ScheduleStore::new(&cli.schedule_file);

    console::banner();

    let Some(request) = resolve_request(&store, &cancel).await? else {
        return Ok(());
    };

    println!("\nStarting automation for {}", request.inputs.target_url);

    let opts = SessionOptions {
        headless: cli.headless,
        profile_dir: cli.profile_dir.clone(),
    };
    let skip_login_check = cli.skip_login_check;
    let inputs = request.inputs;
    let blocking_cancel = cancel.clone();
    let (report, _session) =
        task::spawn_blocking(move || run_automation(opts, inputs, skip_login_check, blocking_cancel))
            .await
            .map_err(|e| anyhow::anyhow!("automation task panicked: {e}"))??;

    print_summary(&report);

    // The session stays open while the user finishes any skipped step.
    console::hold_open()?;
    Ok(())
}

/// Work out what to run: a stored schedule (after its menu and wait), or
/// freshly collected inputs (possibly scheduled, saved and waited out).
/// `None` means a clean exit without running.
async fn resolve_request(
    store: &ScheduleStore,
    cancel: &CancelToken,
) -> Result<Option<ScheduleRequest>> {
    match schedule::startup_decision(store, Local::now()) {
        StartupDecision::Pending(request) => match console::schedule_menu(&request)? {
            ScheduleChoice::RunNow => {
                store.clear();
                Ok(Some(request))
            }
            ScheduleChoice::Cancel => {
                store.clear();
                println!("Scheduled execution cancelled.");
                Ok(None)
            }
            ScheduleChoice::Wait => {
                println!("Waiting for the scheduled time. Press Ctrl+C to cancel.");
                wait_out(store, request, cancel).await
            }
        },
        StartupDecision::Fresh => {
            let request = console::collect_request()?;
            if request.inputs.target_url.is_empty() {
                anyhow::bail!("no product URL provided");
            }
            match request.scheduled_at {
                Some(at) => {
                    store.save(&request)?;
                    println!(
                        "Scheduled for {}. Keep this tool running; press Ctrl+C to cancel.",
                        at.format("%d/%m/%Y at %H:%M")
                    );
                    wait_out(store, request, cancel).await
                }
                None => Ok(Some(request)),
            }
        }
    }
}

async fn wait_out(
    store: &ScheduleStore,
    request: ScheduleRequest,
    cancel: &CancelToken,
) -> Result<Option<ScheduleRequest>> {
    match schedule::await_schedule(store, &request, schedule::POLL_INTERVAL, cancel.cancelled())
        .await
    {
        WaitOutcome::Elapsed => Ok(Some(request)),
        WaitOutcome::Cancelled => {
            println!("Scheduled execution cancelled.");
            Ok(None)
        }
    }
}

/// The blocking half: owns the browser session for the whole run and
/// hands it back so the caller decides when to release it.
fn run_automation(
    opts: SessionOptions,
    inputs: ResolvedInputs,
    skip_login_check: bool,
    cancel: CancelToken,
) -> Result<(RunReport, BrowserSession)> {
    let session = BrowserSession::launch(&opts)?;

    if !skip_login_check {
        let probe = script::login_probe();
        if !login::check_login(&session, &probe)
            && !login::wait_for_login(&session, &probe, &cancel)
        {
            anyhow::bail!("login was not completed");
        }
    }

    let runner = StepRunner::new(&session, script::runner_config());
    let report = runner.run(script::purchase_steps(), &inputs);
    Ok((report, session))
}

fn print_summary(report: &RunReport) {
    println!("\nAutomation completed.");
    let failed = report.failure_count();
    if failed > 0 {
        println!("{failed} step(s) need manual attention:");
        for step in report.failed() {
            println!("  {}. {}", step.index + 1, step.description);
        }
    }
}
