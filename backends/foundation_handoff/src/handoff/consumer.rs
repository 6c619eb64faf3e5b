use crate::synca::SharedQueue;

use super::Envelope;

/// `Consumer` drains a hand-off queue until it sees the end of stream.
pub struct Consumer<T> {
    queue: SharedQueue<Envelope<T>>,
}

impl<T> Consumer<T> {
    #[must_use]
    pub fn new(queue: SharedQueue<Envelope<T>>) -> Self {
        Self { queue }
    }

    /// `run` blocks on the queue and calls `handle` with every payload,
    /// in the order they were pushed, until [`Envelope::EndOfStream`]
    /// arrives.
    ///
    /// Returns the number of payloads handled. If no end of stream
    /// ever arrives this blocks forever.
    pub fn run<F>(self, mut handle: F) -> u64
    where
        F: FnMut(T),
    {
        let span = tracing::debug_span!("Consumer::run");
        let _enter = span.enter();

        let mut consumed: u64 = 0;
        loop {
            match self.queue.pop() {
                Envelope::Data(value) => {
                    handle(value);
                    consumed += 1;
                }
                Envelope::EndOfStream => {
                    tracing::debug!("Consumer received end of stream after {} values", consumed);
                    return consumed;
                }
            }
        }
    }

    /// `collect` runs the consumer, gathering every payload.
    pub fn collect(self) -> Vec<T> {
        let mut received = Vec::new();
        self.run(|value| received.push(value));
        received
    }
}
