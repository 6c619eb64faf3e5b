use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HandoffConfig;
use crate::errors::ThreadResult;
use crate::synca::{BlockingQueue, ScopedThread, ScopedThreadBuilder, SharedQueue, ShutdownSignal};

use super::{Consumer, Envelope, Producer};

/// Counts reported by [`Pipeline::shutdown`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub produced: u64,
    pub consumed: u64,
}

/// `Pipeline` runs one [`Producer`] and one [`Consumer`], each on its
/// own [`ScopedThread`], joined by a private queue and stopped through
/// a shared [`ShutdownSignal`].
///
/// Dropping a `Pipeline` requests a stop and then joins both threads,
/// so leaving the owning scope never leaves a worker behind.
///
/// # Examples
///
/// ```
/// use foundation_handoff::config::HandoffConfig;
/// use foundation_handoff::handoff::Pipeline;
/// use std::sync::mpsc;
/// use std::time::Duration;
///
/// let (sender, receiver) = mpsc::channel();
/// let config = HandoffConfig::default().with_pacing(Duration::from_millis(1));
///
/// let pipeline = Pipeline::spawn(&config, |seq| seq * 2, move |value| {
///     sender.send(value).expect("should send");
/// })
/// .expect("should spawn pipeline");
///
/// assert_eq!(receiver.recv().unwrap(), 0);
/// assert_eq!(receiver.recv().unwrap(), 2);
///
/// let report = pipeline.shutdown().expect("should shut down cleanly");
/// assert_eq!(report.produced, report.consumed);
/// ```
pub struct Pipeline {
    signal: ShutdownSignal,
    produced: Arc<AtomicU64>,
    consumed: Arc<AtomicU64>,

    // dropped in this order: the producer ends first, its end
    // of stream then lets the consumer finish.
    producer: ScopedThread,
    consumer: ScopedThread,
}

impl core::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.signal.state())
            .field("producer", &self.producer)
            .field("consumer", &self.consumer)
            .finish()
    }
}

fn worker_builder(config: &HandoffConfig, name: &str) -> ScopedThreadBuilder {
    let builder = ScopedThread::builder(name);
    match config.stack_size {
        Some(bytes) => builder.stack_size(bytes),
        None => builder,
    }
}

impl Pipeline {
    /// `spawn` starts the consumer, then the producer. `produce` is called
    /// with a running sequence number for every value, `consume` gets
    /// every value in production order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::ThreadError::FailedStart`] when either
    /// thread could not be created. A consumer already started is joined
    /// before the error is returned.
    pub fn spawn<T, P, C>(config: &HandoffConfig, produce: P, consume: C) -> ThreadResult<Self>
    where
        T: Send + 'static,
        P: FnMut(u64) -> T + Send + 'static,
        C: FnMut(T) + Send + 'static,
    {
        Self::spawn_with(
            worker_builder(config, &config.producer_name),
            worker_builder(config, &config.consumer_name),
            config.pacing(),
            produce,
            consume,
        )
    }

    fn spawn_with<T, P, C>(
        producer_builder: ScopedThreadBuilder,
        consumer_builder: ScopedThreadBuilder,
        pacing: Duration,
        produce: P,
        consume: C,
    ) -> ThreadResult<Self>
    where
        T: Send + 'static,
        P: FnMut(u64) -> T + Send + 'static,
        C: FnMut(T) + Send + 'static,
    {
        let span = tracing::trace_span!("Pipeline::spawn");
        let _enter = span.enter();

        let queue: SharedQueue<Envelope<T>> = Arc::new(BlockingQueue::new());
        let signal = ShutdownSignal::new();
        let produced = Arc::new(AtomicU64::new(0));
        let consumed = Arc::new(AtomicU64::new(0));

        let consumer_role = Consumer::new(Arc::clone(&queue));
        let consumed_count = Arc::clone(&consumed);
        let consumer = consumer_builder.spawn(move || {
            let count = consumer_role.run(consume);
            consumed_count.store(count, Ordering::Release);
        })?;

        // should the spawn fail the producer is dropped unstarted,
        // which still ends the stream for the consumer above.
        let producer_role = Producer::new(queue, signal.clone(), pacing);
        let produced_count = Arc::clone(&produced);
        let producer = producer_builder.spawn(move || {
            let count = producer_role.run(produce);
            produced_count.store(count, Ordering::Release);
        })?;

        tracing::debug!(
            "Pipeline started with producer={} and consumer={}",
            producer.name(),
            consumer.name()
        );

        Ok(Self {
            signal,
            produced,
            consumed,
            producer,
            consumer,
        })
    }

    #[must_use]
    pub fn signal(&self) -> &ShutdownSignal {
        &self.signal
    }

    /// `stop` asks the producer to stop, returns true if this call
    /// was the one to do so.
    pub fn stop(&self) -> bool {
        self.signal.request_stop()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.producer.is_finished() && self.consumer.is_finished()
    }

    /// `shutdown` stops the producer and blocks until both threads
    /// exited, the consumer having handled every value produced.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::ThreadError::Panicked`] if either side
    /// panicked, the producer's error wins when both did. Both threads
    /// are joined before returning in every case.
    pub fn shutdown(mut self) -> ThreadResult<PipelineReport> {
        self.stop();

        let producer_result = self.producer.join_if_needed();
        let consumer_result = self.consumer.join_if_needed();
        producer_result?;
        consumer_result?;

        Ok(PipelineReport {
            produced: self.produced.load(Ordering::Acquire),
            consumed: self.consumed.load(Ordering::Acquire),
        })
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.signal.request_stop();
    }
}

#[cfg(test)]
mod test_pipeline {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::config::HandoffConfig;
    use crate::errors::ThreadError;
    use crate::synca::ScopedThread;

    use super::{Pipeline, PipelineReport};

    const IMPOSSIBLE_STACK: usize = 1 << 50;

    /// Flips its flag when dropped, showing a closure was released.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn fast_config() -> HandoffConfig {
        HandoffConfig::default()
            .with_pacing(Duration::from_millis(1))
            .with_producer_name("SrcWorker")
            .with_consumer_name("SinkWorker")
    }

    #[test]
    #[ntest::timeout(5000)]
    fn shutdown_delivers_everything_produced() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let pipeline = Pipeline::spawn(
            &fast_config(),
            |seq| format!("msg-{seq}"),
            move |value| sink.lock().expect("lock").push(value),
        )
        .expect("should spawn");

        thread::sleep(Duration::from_millis(20));
        let report = pipeline.shutdown().expect("should shut down");

        let received = received.lock().expect("lock");
        assert!(report.produced > 0);
        assert_eq!(report.produced, report.consumed);
        assert_eq!(received.len() as u64, report.consumed);
        for (index, value) in received.iter().enumerate() {
            assert_eq!(value, &format!("msg-{index}"));
        }
    }

    #[test]
    #[ntest::timeout(5000)]
    fn dropping_the_pipeline_stops_and_joins() {
        let (sender, receiver) = mpsc::channel::<u64>();

        {
            let _pipeline = Pipeline::spawn(&fast_config(), |seq| seq, move |value| {
                let _ = sender.send(value);
            })
            .expect("should spawn");

            assert_eq!(receiver.recv().expect("should see a first value"), 0);
        }

        let remaining: Vec<u64> = receiver.try_iter().collect();
        assert!(remaining.windows(2).all(|pair| pair[0] + 1 == pair[1]));

        // the sender lived in the consumer closure, which was joined and dropped.
        assert!(matches!(receiver.recv(), Err(mpsc::RecvError)));
    }

    #[test]
    #[ntest::timeout(5000)]
    fn stop_is_reported_once() {
        let pipeline = Pipeline::spawn(&fast_config(), |seq| seq, |_| {}).expect("should spawn");

        assert!(pipeline.signal().is_running());
        assert!(pipeline.stop());
        assert!(!pipeline.stop());

        let report = pipeline.shutdown().expect("should shut down");
        assert_eq!(report.produced, report.consumed);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn stopping_returns_within_a_pacing_interval() {
        let config = fast_config().with_pacing(Duration::from_millis(10));
        let pipeline = Pipeline::spawn(&config, |seq| seq, |_| {}).expect("should spawn");
        thread::sleep(Duration::from_millis(30));

        let started = Instant::now();
        pipeline.shutdown().expect("should shut down");
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    #[ntest::timeout(5000)]
    fn consumer_panic_surfaces_from_shutdown() {
        let pipeline = Pipeline::spawn(&fast_config(), |seq| seq, |value| {
            assert!(value < 3, "consumer choked on {value}");
        })
        .expect("should spawn");

        while !pipeline.consumer.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }

        match pipeline.shutdown() {
            Err(ThreadError::Panicked { name, .. }) => assert_eq!(name, "SinkWorker"),
            other => panic!("expected consumer panic, got {other:?}"),
        }
    }

    #[test]
    #[ntest::timeout(5000)]
    fn producer_panic_still_releases_the_consumer() {
        let pipeline = Pipeline::spawn(
            &fast_config(),
            |seq| {
                assert!(seq < 2, "producer gave out");
                seq
            },
            |_| {},
        )
        .expect("should spawn");

        // nobody requested a stop, the end of stream comes from the dying producer.
        while !pipeline.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(pipeline.signal().is_running());

        match pipeline.shutdown() {
            Err(ThreadError::Panicked { name, .. }) => assert_eq!(name, "SrcWorker"),
            other => panic!("expected producer panic, got {other:?}"),
        }
    }

    #[test]
    #[ntest::timeout(5000)]
    fn failed_consumer_start_is_returned() {
        let released = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(Arc::clone(&released));

        let config = fast_config().with_stack_size(IMPOSSIBLE_STACK);
        let result = Pipeline::spawn(&config, |seq| seq, move |_| {
            let _keep = &guard;
        });

        assert!(matches!(result, Err(ThreadError::FailedStart(_))));
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    #[ntest::timeout(5000)]
    fn failed_producer_start_releases_the_started_consumer() {
        let consumer_done = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(Arc::clone(&consumer_done));

        let result = Pipeline::spawn_with(
            ScopedThread::builder("SrcWorker").stack_size(IMPOSSIBLE_STACK),
            ScopedThread::builder("SinkWorker"),
            Duration::from_millis(1),
            |seq| seq,
            move |_: u64| {
                let _keep = &guard;
            },
        );

        // the consumer got its end of stream from the unstarted producer
        // and was joined before the error came back.
        assert!(matches!(result, Err(ThreadError::FailedStart(_))));
        assert!(consumer_done.load(Ordering::SeqCst));
    }

    #[test]
    fn report_defaults_to_zero() {
        assert_eq!(
            PipelineReport::default(),
            PipelineReport {
                produced: 0,
                consumed: 0
            }
        );
    }
}
