use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, after, bounded, select};

/// Periodic trigger that never lets two cycles overlap.
///
/// The trigger is disarmed for the whole duration of a cycle and re-armed only once the
/// cycle returns, so a slow cycle delays the next one instead of queueing ticks behind it.
pub struct Scheduler {
    period: Duration,
    gate: Mutex<()>,
    in_progress: AtomicBool,
    completed: AtomicU64,
}

/// Held while a cycle runs; dropping it re-arms the trigger even if the job panicked.
struct Disarmed<'a> {
    _gate: MutexGuard<'a, ()>,
    flag: &'a AtomicBool,
}

impl Drop for Disarmed<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            gate: Mutex::new(()),
            in_progress: AtomicBool::new(false),
            completed: AtomicU64::new(0),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_cycle_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Run `job` as one cycle. A caller arriving while another cycle is in flight blocks
    /// until that cycle has finished.
    pub fn fire<T>(&self, job: impl FnOnce() -> T) -> T {
        let _disarmed = self.disarm();
        let out = job();
        self.completed.fetch_add(1, Ordering::SeqCst);
        out
    }

    fn disarm(&self) -> Disarmed<'_> {
        // a panicking cycle poisons the gate; the next cycle starts from a fresh scan anyway
        let gate = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.in_progress.store(true, Ordering::SeqCst);
        Disarmed { _gate: gate, flag: &self.in_progress }
    }

    /// Fire once immediately, then once per period measured from the end of the previous
    /// cycle, until `shutdown` receives a message or is disconnected.
    pub fn run<F: FnMut()>(&self, mut job: F, shutdown: &Receiver<()>) {
        loop {
            self.fire(&mut job);
            select! {
                recv(shutdown) -> _ => break,
                recv(after(self.period)) -> _ => {}
            }
        }
        tracing::debug!("[scheduler] stopped after {} cycle(s)", self.completed_cycles());
    }

    /// Run the loop on a dedicated thread.
    pub fn spawn<F>(self: Arc<Self>, job: F) -> std::io::Result<SchedulerHandle>
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = bounded::<()>(1);
        let thread = std::thread::Builder::new()
            .name("cycle-scheduler".to_string())
            .spawn(move || self.run(job, &rx))?;
        Ok(SchedulerHandle { shutdown: Some(tx), thread: Some(thread) })
    }
}

pub struct SchedulerHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Block until the scheduler thread exits. With the handle still holding the shutdown
    /// sender this only returns if the thread panicked.
    pub fn wait(mut self) -> std::thread::Result<()> {
        match self.thread.take() {
            Some(t) => t.join(),
            None => Ok(()),
        }
    }

    /// Ask the loop to stop and wait for it. An in-flight cycle is allowed to finish.
    pub fn stop(mut self) -> std::thread::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.try_send(());
        }
        match self.thread.take() {
            Some(t) => t.join(),
            None => Ok(()),
        }
    }
}
