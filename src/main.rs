use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use replay_sender::config::{Config, DEFAULT_CONFIG_FILE};
use replay_sender::cycle::run_cycle;
use replay_sender::scheduler::Scheduler;
use replay_sender::transfer::FtpConnector;
use replay_sender::util::init_logging;

const LOG_DIR: &str = "logs";

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging(Path::new(LOG_DIR));
    tracing::info!("starting replay-sender {}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load(DEFAULT_CONFIG_FILE) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}; no cycles will run", e);
            return Err(e.into());
        }
    };
    tracing::info!(
        "loaded {}: {}",
        DEFAULT_CONFIG_FILE,
        serde_json::to_string(&config).with_context(|| "cannot render config")?
    );

    let scheduler = Arc::new(Scheduler::new(config.cycle_period()));
    tracing::info!(
        "watching {} every {}s",
        config.watched_directory.display(),
        scheduler.period().as_secs()
    );
    let connector = FtpConnector;
    let handle = scheduler
        .spawn(move || {
            run_cycle(&config, &connector);
        })
        .with_context(|| "cannot start scheduler thread")?;

    // the scheduler owns all further work; stay alive until killed
    if handle.wait().is_err() {
        anyhow::bail!("scheduler thread panicked");
    }
    Ok(())
}
