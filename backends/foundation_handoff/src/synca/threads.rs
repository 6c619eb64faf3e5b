use std::thread::{self, JoinHandle};

use crate::errors::{ThreadError, ThreadResult};

use super::RunOnDrop;

/// `ScopedThread` owns exactly one running thread of execution and
/// joins it when the owner goes out of scope, whether that scope exits
/// by returning early, normally, or by unwinding from a panic.
///
/// No thread launched through a `ScopedThread` outlives its owner,
/// there is no way to detach it.
///
/// The type is neither `Clone` nor `Copy`. Moving a `ScopedThread`
/// transfers ownership of the thread and the moved-from binding can
/// no longer be used, so only one owner ever joins.
///
/// # Examples
///
/// ```
/// use foundation_handoff::synca::ScopedThread;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let done = Arc::new(AtomicBool::new(false));
/// {
///     let done = Arc::clone(&done);
///     let _worker = ScopedThread::spawn("worker", move || {
///         done.store(true, Ordering::SeqCst);
///     })
///     .expect("should spawn thread");
/// }
///
/// // the scope above joined the worker before exiting.
/// assert!(done.load(Ordering::SeqCst));
/// ```
pub struct ScopedThread {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for ScopedThread {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopedThread")
            .field("name", &self.name)
            .field("joinable", &self.is_joinable())
            .finish()
    }
}

impl ScopedThread {
    /// `spawn` starts `work` on a new thread named `name`.
    ///
    /// Returns once the thread was created, not once `work` starts.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadError::FailedStart`] when the operating
    /// system could not create the thread.
    pub fn spawn<F>(name: impl Into<String>, work: F) -> ThreadResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::builder(name).spawn(work)
    }

    /// `builder` returns a [`ScopedThreadBuilder`] for configuring
    /// the thread before spawning it.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ScopedThreadBuilder {
        ScopedThreadBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `is_joinable` returns true until the owned thread was joined.
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.handle.is_some()
    }

    /// `is_finished` reports whether the owned thread has completed
    /// its work without blocking, a joined thread counts as finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// `join_if_needed` blocks until the owned thread terminates
    /// if it has not been joined yet.
    ///
    /// Returns `Ok(true)` when this call performed the join and
    /// `Ok(false)` when there was nothing left to join. Once this
    /// returns, in any form, the instance is no longer joinable.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadError::Panicked`] when the owned work panicked.
    pub fn join_if_needed(&mut self) -> ThreadResult<bool> {
        let Some(handle) = self.handle.take() else {
            return Ok(false);
        };

        if !handle.is_finished() {
            tracing::debug!(
                "ScopedThread {} is still active, waiting for it to exit",
                &self.name
            );
        }

        match handle.join() {
            Ok(()) => {
                tracing::debug!("ScopedThread {} has completed", &self.name);
                Ok(true)
            }
            Err(payload) => Err(ThreadError::panicked(&self.name, &*payload)),
        }
    }
}

impl Drop for ScopedThread {
    fn drop(&mut self) {
        if let Err(err) = self.join_if_needed() {
            tracing::error!("ScopedThread {} ended with: {}", &self.name, err);
        }
    }
}

/// `ScopedThreadBuilder` configures the thread a [`ScopedThread`]
/// will own.
#[derive(Debug)]
pub struct ScopedThreadBuilder {
    name: String,
    stack_size: Option<usize>,
}

impl ScopedThreadBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack_size: None,
        }
    }

    /// Sets the stack size in bytes of the spawned thread.
    #[must_use]
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// # Errors
    ///
    /// Returns [`ThreadError::FailedStart`] when the operating
    /// system could not create the thread.
    pub fn spawn<F>(self, work: F) -> ThreadResult<ScopedThread>
    where
        F: FnOnce() + Send + 'static,
    {
        let span = tracing::trace_span!("ScopedThread::spawn");
        let _enter = span.enter();

        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread_name = self.name.clone();
        let handle = builder.spawn(move || {
            let _finished = RunOnDrop::new(|| {
                tracing::debug!("ScopedThread {} is exiting", &thread_name);
            });
            work();
        })?;

        tracing::debug!("ScopedThread {} started", &self.name);
        Ok(ScopedThread {
            name: self.name,
            handle: Some(handle),
        })
    }
}
