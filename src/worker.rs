//! Off-thread parsing and querying with latest-request-wins delivery.
//!
//! Every submission gets a generation number. Results of anything but the
//! most recent submission are dropped on arrival, and the worker skips queued
//! jobs that were already superseded before it picked them up. Inputs cross
//! the thread boundary as owned values or `Arc`s; nothing is shared mutably.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::InspectorConfig;
use crate::error::{FilterValidationError, ParseError};
use crate::filter::{FilterCriteria, filter};
use crate::hierarchy::Hierarchy;
use crate::node::{Node, NodeId};
use crate::parser::parse;
use crate::search::{SearchQuery, search};

/// Work the background thread can run.
#[derive(Clone, Debug)]
pub enum Job {
    Parse(String),
    /// Filter every node of the tree in pre-order; the criteria's own search
    /// dimension applies.
    Filter {
        tree: Arc<Hierarchy>,
        criteria: FilterCriteria,
    },
    Search {
        tree: Arc<Hierarchy>,
        query: SearchQuery,
    },
}

/// Result of a [`Job`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutput {
    Parsed(Result<Arc<Hierarchy>, ParseError>),
    Filtered(Result<Vec<NodeId>, FilterValidationError>),
    Found(Vec<NodeId>),
}

/// A finished job tagged with the generation it was submitted under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completed {
    pub generation: u64,
    pub output: JobOutput,
}

fn run(job: Job) -> JobOutput {
    match job {
        Job::Parse(text) => JobOutput::Parsed(parse(&text).map(Arc::new)),
        Job::Filter { tree, criteria } => JobOutput::Filtered(
            criteria
                .validate()
                .map(|()| filter(tree.iter(), &criteria).into_iter().map(Node::id).collect()),
        ),
        Job::Search { tree, query } => {
            JobOutput::Found(search(tree.iter(), &query).into_iter().map(Node::id).collect())
        }
    }
}

/// Handle to the background evaluation thread.
///
/// Dropping the handle closes the job queue and joins the thread.
#[derive(Debug)]
pub struct QueryWorker {
    jobs: Option<Sender<(u64, Job)>>,
    results: Receiver<Completed>,
    latest: u64,
    handle: Option<JoinHandle<()>>,
}

impl QueryWorker {
    /// Starts the worker thread.
    pub fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<(u64, Job)>();
        let (result_tx, result_rx) = mpsc::channel::<Completed>();
        let handle = thread::Builder::new()
            .name("uidump-query".to_string())
            .spawn(move || worker_loop(&job_rx, &result_tx))?;
        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            latest: 0,
            handle: Some(handle),
        })
    }

    /// Queues a job and returns its generation. Earlier jobs become stale.
    pub fn submit(&mut self, job: Job) -> u64 {
        self.latest += 1;
        let generation = self.latest;
        let sent = self
            .jobs
            .as_ref()
            .is_some_and(|jobs| jobs.send((generation, job)).is_ok());
        if !sent {
            warn!(generation, "query worker is gone; job dropped");
        }
        generation
    }

    /// Generation of the most recent submission (0 before the first one).
    pub const fn latest_generation(&self) -> u64 {
        self.latest
    }

    /// Returns the result of the latest submission if it has arrived.
    ///
    /// Stale results found in the queue are discarded. Never blocks.
    pub fn poll(&mut self) -> Option<Completed> {
        let mut newest = None;
        while let Ok(done) = self.results.try_recv() {
            if let Some(done) = self.accept(done) {
                newest = Some(done);
            }
        }
        newest
    }

    /// Blocks until the latest submission completes or `timeout` elapses.
    ///
    /// A timeout too large to express as an instant waits without limit.
    pub fn wait(&mut self, timeout: Duration) -> Option<Completed> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait_forever();
        };
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(done) => {
                    if let Some(done) = self.accept(done) {
                        return Some(done);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn wait_forever(&mut self) -> Option<Completed> {
        while let Ok(done) = self.results.recv() {
            if let Some(done) = self.accept(done) {
                return Some(done);
            }
        }
        None
    }

    fn accept(&self, done: Completed) -> Option<Completed> {
        if done.generation == self.latest {
            Some(done)
        } else {
            debug!(
                generation = done.generation,
                latest = self.latest,
                "discarding stale result"
            );
            None
        }
    }
}

impl Drop for QueryWorker {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("query worker panicked");
        }
    }
}

fn worker_loop(jobs: &Receiver<(u64, Job)>, results: &Sender<Completed>) {
    while let Ok(mut next) = jobs.recv() {
        // Only the newest queued job matters.
        while let Ok(newer) = jobs.try_recv() {
            debug!(skipped = next.0, "skipping superseded job");
            next = newer;
        }
        let (generation, job) = next;
        let output = run(job);
        if results.send(Completed { generation, output }).is_err() {
            break;
        }
    }
    debug!("query worker stopped");
}

/// Trailing debounce: a value is released once no newer value arrived for
/// the configured delay.
///
/// Time is passed in by the caller, which keeps the behaviour reproducible.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Debouncer using [`InspectorConfig::debounce`] as its delay.
    pub const fn from_config(config: &InspectorConfig) -> Self {
        Self::new(config.debounce)
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces any pending value and restarts the delay from `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Releases the pending value if its delay has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.deadline()?;
        if now < due {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }

    /// When the pending value becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<hierarchy><node class="A" text="Login" clickable="true"><node class="B" text="Help"/></node></hierarchy>"#;
    const TIMEOUT: Duration = Duration::from_secs(10);

    fn parsed(worker: &mut QueryWorker, text: &str) -> Arc<Hierarchy> {
        worker.submit(Job::Parse(text.to_string()));
        match worker.wait(TIMEOUT).map(|done| done.output) {
            Some(JobOutput::Parsed(Ok(tree))) => tree,
            other => panic!("unexpected worker output: {other:?}"),
        }
    }

    #[test]
    fn parses_and_filters_in_background() {
        let mut worker = QueryWorker::spawn().unwrap();
        let tree = parsed(&mut worker, DUMP);
        assert_eq!(tree.len(), 3);

        let generation = worker.submit(Job::Filter {
            tree: Arc::clone(&tree),
            criteria: FilterCriteria::new().clickable_only(true),
        });
        let done = worker.wait(TIMEOUT).unwrap();
        assert_eq!(done.generation, generation);
        assert_eq!(done.output, JobOutput::Filtered(Ok(vec![NodeId(1)])));

        worker.submit(Job::Search {
            tree,
            query: SearchQuery::new("help"),
        });
        assert_eq!(
            worker.wait(TIMEOUT).map(|done| done.output),
            Some(JobOutput::Found(vec![NodeId(2)]))
        );
    }

    #[test]
    fn parse_errors_are_delivered() {
        let mut worker = QueryWorker::spawn().unwrap();
        worker.submit(Job::Parse(String::new()));
        assert_eq!(
            worker.wait(TIMEOUT).map(|done| done.output),
            Some(JobOutput::Parsed(Err(ParseError::Empty)))
        );
    }

    #[test]
    fn invalid_criteria_are_rejected() {
        let mut worker = QueryWorker::spawn().unwrap();
        let tree = parsed(&mut worker, DUMP);
        worker.submit(Job::Filter {
            tree,
            criteria: FilterCriteria::new().depth_range(3, 1),
        });
        assert_eq!(
            worker.wait(TIMEOUT).map(|done| done.output),
            Some(JobOutput::Filtered(Err(
                FilterValidationError::InvertedDepthRange { min: 3, max: 1 }
            )))
        );
    }

    #[test]
    fn only_the_latest_submission_is_delivered() {
        let mut worker = QueryWorker::spawn().unwrap();
        let tree = parsed(&mut worker, DUMP);
        for text in ["l", "lo", "log"] {
            worker.submit(Job::Search {
                tree: Arc::clone(&tree),
                query: SearchQuery::new(text),
            });
        }
        let last = worker.submit(Job::Search {
            tree,
            query: SearchQuery::new("help"),
        });
        let done = worker.wait(TIMEOUT).unwrap();
        assert_eq!(done.generation, last);
        assert_eq!(done.output, JobOutput::Found(vec![NodeId(2)]));
        assert_eq!(worker.poll(), None);
    }

    #[test]
    fn debounce_releases_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        assert_eq!(debouncer.poll(start), None);

        debouncer.push("l", start);
        debouncer.push("lo", start + Duration::from_millis(100));
        assert_eq!(debouncer.poll(start + Duration::from_millis(350)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(400))
        );
        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), Some("lo"));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn unbounded_wait_still_returns_the_result() {
        let mut worker = QueryWorker::spawn().unwrap();
        let generation = worker.submit(Job::Parse(DUMP.to_string()));
        let done = worker.wait(Duration::MAX).unwrap();
        assert_eq!(done.generation, generation);
        assert!(matches!(done.output, JobOutput::Parsed(Ok(_))));
    }

    #[test]
    fn debounce_delay_comes_from_config() {
        let config = InspectorConfig {
            debounce: Duration::from_millis(120),
            ..InspectorConfig::default()
        };
        let start = Instant::now();
        let mut debouncer = Debouncer::from_config(&config);
        assert_eq!(debouncer.delay(), Duration::from_millis(120));
        debouncer.push("query", start);
        assert_eq!(debouncer.poll(start + Duration::from_millis(119)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(120)), Some("query"));
    }

    #[test]
    fn debounce_cancel_drops_pending() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.push(1, start);
        assert_eq!(debouncer.cancel(), Some(1));
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }
}
