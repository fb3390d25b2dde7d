use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;
use parking_lot::Mutex;
use serde_json::json;
use ui_poll::host::{Host, SimulatedHost};
use ui_poll::{poll_until, Config, PendingRequest, TaskIdentity};

/// Wait for a (simulated) color pick while a queued request waits its turn.
#[derive(Parser, Debug)]
#[command(name = "ui-poll", version)]
struct Args {
    /// Give up and use the default color after this many seconds
    #[arg(long, default_value_t = 10.0)]
    timeout_secs: f64,

    /// Predicate checks per second
    #[arg(long, default_value_t = 25)]
    fps: u32,

    /// Host loop iterations between checks (overrides the config file)
    #[arg(long)]
    events_per_frame: Option<usize>,

    /// Simulate a click after this many milliseconds
    #[arg(long)]
    pick_after_ms: Option<u64>,

    /// Color the simulated click picks
    #[arg(long, default_value = "tomato")]
    color: String,

    /// Color used when nobody picks in time
    #[arg(long, default_value = "beige")]
    default: String,

    /// Config file (defaults to $UI_POLL_CONFIG or the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };

    let frame = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
    let mut options = config.poll.with_interval(Some(frame));
    if let Some(n) = args.events_per_frame {
        options = options.with_iterations(n);
    }

    let host = SimulatedHost::new();
    host.set_current_task_identity(TaskIdentity::new("cell-1", json!({ "msg_id": "cell-1" })));

    // The next cell was submitted while this one is still running.
    host.push_request(PendingRequest::new(
        "shell",
        "cell-2",
        json!({ "msg_id": "cell-2" }),
    ));

    let selection: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let clicker = args.pick_after_ms.map(|delay_ms| {
        let host = host.clone();
        let selection = selection.clone();
        let color = args.color.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(delay_ms));
            host.push_callback("click", move |_| {
                *selection.lock() = Some(color);
            });
        })
    });

    let timeout = Duration::try_from_secs_f64(args.timeout_secs.max(0.0))
        .map_err(|e| anyhow!("invalid --timeout-secs {}: {e}", args.timeout_secs))?;
    let started = Instant::now();
    let mut hurried = false;

    let (choice, source) = poll_until(
        host.clone(),
        || {
            if let Some(color) = selection.lock().clone() {
                return Some((color, "user"));
            }
            let elapsed = started.elapsed();
            if !hurried && elapsed.as_secs_f64() > 0.7 * timeout.as_secs_f64() {
                eprintln!("Hurry!!!");
                hurried = true;
            }
            if elapsed >= timeout {
                eprintln!("Times up!");
                return Some((args.default.clone(), "timeout"));
            }
            None
        },
        &options,
    )?;
    println!("{choice} ({source})");

    if let Some(clicker) = clicker {
        clicker
            .join()
            .map_err(|_| anyhow!("click simulation thread panicked"))?;
    }

    // Deferred work runs once the foreground computation is done.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(host.run_until_idle())?;
    for message_id in host.executed() {
        println!("replayed {message_id}");
    }

    Ok(())
}
