use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::SignalResult;

/// Indicates the signal was asked to stop.
const STOPPING: bool = true;

/// Indicates the signal is still running.
const RUNNING: bool = false;

/// Signals stopped by the process wide interrupt handler.
static INTERRUPT_REGISTRY: Mutex<InterruptRegistry> = Mutex::new(InterruptRegistry {
    installed: false,
    signals: Vec::new(),
});

struct InterruptRegistry {
    installed: bool,
    signals: Vec<ShutdownSignal>,
}

fn interrupt_registry() -> MutexGuard<'static, InterruptRegistry> {
    match INTERRUPT_REGISTRY.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Requests a stop on every signal registered through
/// [`ShutdownSignal::stop_on_interrupt`], returns how many got stopped.
fn stop_registered_signals() -> usize {
    let signals = std::mem::take(&mut interrupt_registry().signals);
    tracing::info!(
        "Received interrupt, requesting shutdown of {} signals",
        signals.len()
    );

    signals
        .iter()
        .filter(|signal| signal.request_stop())
        .count()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Stopping,
}

/// `ShutdownSignal` is a cancellation token shared between an
/// orchestrator and its workers.
///
/// It moves one way only: from [`ShutdownState::Running`] to
/// [`ShutdownState::Stopping`], and never back. Every clone points at
/// the same underlying flag so the orchestrator keeps one handle and
/// gives a clone to each worker, and reads never take a lock.
///
/// Workers are expected to probe [`ShutdownSignal::is_running`] once
/// per loop, nothing forces a worker that never checks to stop.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    state: Arc<AtomicBool>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicBool::new(RUNNING)),
        }
    }

    /// `request_stop` flips the state from running to stopping.
    ///
    /// Returns true only for the call that actually made the
    /// transition, later calls are no-ops returning false.
    #[inline]
    pub fn request_stop(&self) -> bool {
        let flipped = self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::Acquire)
            .is_ok();

        if flipped {
            tracing::info!("ShutdownSignal moved to stopping");
        } else {
            tracing::debug!("ShutdownSignal already stopping, ignoring request");
        }
        flipped
    }

    /// `is_running` returns true until a stop was requested.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    #[inline]
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        !self.is_running()
    }

    #[must_use]
    pub fn state(&self) -> ShutdownState {
        if self.is_running() {
            ShutdownState::Running
        } else {
            ShutdownState::Stopping
        }
    }

    /// `stop_on_interrupt` makes a Ctrl-C on this process request a
    /// stop on this signal.
    ///
    /// A single process wide handler gets installed by the first call,
    /// every registered signal is stopped when it fires. Registering the
    /// same signal (or one of its clones) again is a no-op, signals
    /// already stopping are pruned on the next registration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::SignalError::Registration`] when the
    /// platform handler could not be installed.
    pub fn stop_on_interrupt(&self) -> SignalResult<()> {
        let mut registry = interrupt_registry();
        if !registry.installed {
            ctrlc::set_handler(|| {
                stop_registered_signals();
            })?;
            registry.installed = true;
            tracing::debug!("Interrupt handler installed");
        }

        registry.signals.retain(ShutdownSignal::is_running);
        if registry
            .signals
            .iter()
            .any(|registered| Arc::ptr_eq(&registered.state, &self.state))
        {
            tracing::debug!("ShutdownSignal already registered for interrupts");
            return Ok(());
        }

        registry.signals.push(self.clone());
        Ok(())
    }
}
