use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::synca::{RunOnDrop, SharedQueue, ShutdownSignal};

use super::Envelope;

type StreamCloser = RunOnDrop<Box<dyn FnOnce() + Send>>;

/// `Producer` feeds values into a hand-off queue until its
/// [`ShutdownSignal`] asks it to stop, then announces the end of
/// the stream through the queue.
///
/// The end of stream is sent by a guard the producer owns, so it goes
/// out whether [`Producer::run`] returns, the value generator panics, or
/// the producer gets dropped without ever running. A consumer therefore
/// never waits on a producer that is gone.
///
/// Producers built together through [`Producer::group`] share that
/// guard's countdown and only the last one to finish closes the stream.
pub struct Producer<T> {
    id: usize,
    queue: SharedQueue<Envelope<T>>,
    signal: ShutdownSignal,
    pacing: Duration,
    _closer: StreamCloser,
}

impl<T: Send + 'static> Producer<T> {
    /// `new` creates a lone producer, it closes the stream by itself.
    #[must_use]
    pub fn new(queue: SharedQueue<Envelope<T>>, signal: ShutdownSignal, pacing: Duration) -> Self {
        Self::member(0, queue, signal, pacing, Arc::new(AtomicUsize::new(1)))
    }

    /// `group` creates `count` producers feeding the same queue where
    /// only the last member to finish sends the single end of stream,
    /// regardless of the order in which they finish.
    #[must_use]
    pub fn group(
        queue: &SharedQueue<Envelope<T>>,
        signal: &ShutdownSignal,
        pacing: Duration,
        count: usize,
    ) -> Vec<Self> {
        let remaining = Arc::new(AtomicUsize::new(count));
        (0..count)
            .map(|id| {
                Self::member(
                    id,
                    Arc::clone(queue),
                    signal.clone(),
                    pacing,
                    Arc::clone(&remaining),
                )
            })
            .collect()
    }

    fn member(
        id: usize,
        queue: SharedQueue<Envelope<T>>,
        signal: ShutdownSignal,
        pacing: Duration,
        remaining: Arc<AtomicUsize>,
    ) -> Self {
        let closer_queue = Arc::clone(&queue);
        let closer: Box<dyn FnOnce() + Send> = Box::new(move || {
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                tracing::debug!("Producer {} sending end of stream", id);
                closer_queue.push(Envelope::EndOfStream);
            } else {
                tracing::debug!("Producer {} done, others still producing", id);
            }
        });

        Self {
            id,
            queue,
            signal,
            pacing,
            _closer: RunOnDrop::new(closer),
        }
    }
}

impl<T> Producer<T> {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// `run` pushes `next(sequence)` into the queue and waits the pacing
    /// interval, for as long as the signal is running. The signal is
    /// checked once per value, so a stop is seen within one interval.
    ///
    /// Returns the number of values pushed before the end of stream.
    pub fn run<F>(self, mut next: F) -> u64
    where
        F: FnMut(u64) -> T,
    {
        let span = tracing::debug_span!("Producer::run", producer = self.id);
        let _enter = span.enter();

        let mut produced: u64 = 0;
        while self.signal.is_running() {
            self.queue.push(Envelope::Data(next(produced)));
            produced += 1;

            if !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
        }

        tracing::debug!("Producer observed stop after {} values", produced);

        // closing guard goes with self.
        drop(self);
        produced
    }
}
