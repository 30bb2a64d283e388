//! Async query and mutation primitives for data fetching with cache invalidation.
//!
//! Inspired by TanStack Query: a `Query<T>` owns a fetcher, its loading and
//! error states, and the last good data; a `Mutation<I, O, E>` runs writes and
//! hands their settled results back to the event loop.
//!
//! # Example
//!
//! ```ignore
//! let client = product_client.clone();
//! let mut query = Query::new(move || {
//!     let client = client.clone();
//!     async move { client.list().await.map_err(|e| e.to_string()) }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // After a successful write
//! query.invalidate();
//! ```

use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// First fetch in flight, nothing to show yet
  Loading,
  /// Data is available (possibly being refreshed in the background)
  Success(T),
  /// Fetch failed before any data was loaded
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Async query for data fetching with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/success/error states
/// - Async result handling via channels
/// - Stale tracking and explicit invalidation
///
/// Once data has loaded it is never dropped by a refetch: the old value stays
/// visible until the new one arrives, and a failed refetch is reported through
/// `refresh_error()` instead of replacing it.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  refresh_error: Option<String>,
  fetched_at: Option<Instant>,
  updated_at: Option<DateTime<Local>>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()`, `refetch()` or `invalidate()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || fetcher().boxed()),
      receiver: None,
      refresh_error: None,
      fetched_at: None,
      updated_at: None,
      stale_time: Duration::ZERO,
    }
  }

  /// Set the stale time for this query.
  ///
  /// After this duration, the data is considered stale and `is_stale()` returns true.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// True only while the first fetch is in flight.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// True while a request is in flight, including background refreshes.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  /// Error from a fetch that never produced data.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Error from the latest background refresh, if it failed.
  pub fn refresh_error(&self) -> Option<&str> {
    self.refresh_error.as_deref()
  }

  /// Wall-clock time of the last successful fetch.
  pub fn updated_at(&self) -> Option<DateTime<Local>> {
    self.updated_at
  }

  /// Check if the data is stale (older than stale_time, or invalidated).
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() >= self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching data if not already fetching.
  pub fn fetch(&mut self) {
    if self.is_fetching() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, discarding the result of any fetch still in flight.
  pub fn refetch(&mut self) {
    // Dropping the receiver makes the old task's send fail silently
    self.receiver = None;
    self.start_fetch();
  }

  /// Mark the data stale and refetch it.
  pub fn invalidate(&mut self) {
    self.fetched_at = None;
    self.refetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending (the task panicked)
        Err("Query was cancelled".to_string())
      }
    };
    self.receiver = None;

    match result {
      Ok(data) => {
        self.state = QueryState::Success(data);
        self.refresh_error = None;
        self.fetched_at = Some(Instant::now());
        self.updated_at = Some(Local::now());
      }
      Err(error) if self.state.is_success() => {
        self.refresh_error = Some(error);
      }
      Err(error) => {
        self.state = QueryState::Error(error);
      }
    }
    true
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("refresh_error", &self.refresh_error)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

/// A write that has finished, paired with the input that started it
#[derive(Debug)]
pub struct Settled<I, O, E> {
  pub input: I,
  pub result: Result<O, E>,
}

type MutatorFn<I, O, E> = Box<dyn Fn(I) -> BoxFuture<'static, Result<O, E>> + Send + Sync>;

/// Async mutation: fire-and-collect writes.
///
/// Every `mutate()` call spawns its own request; there is no deduplication and
/// no cancellation, so several writes can be in flight at once. Their results
/// come back through `poll()` in completion order.
pub struct Mutation<I, O, E> {
  mutator: MutatorFn<I, O, E>,
  tx: mpsc::UnboundedSender<Settled<I, O, E>>,
  rx: mpsc::UnboundedReceiver<Settled<I, O, E>>,
  in_flight: usize,
}

impl<I, O, E> Mutation<I, O, E>
where
  I: Clone + Send + 'static,
  O: Send + 'static,
  E: Send + 'static,
{
  pub fn new<F, Fut>(mutator: F) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      mutator: Box::new(move |input| mutator(input).boxed()),
      tx,
      rx,
      in_flight: 0,
    }
  }

  /// Start a write with the given input.
  pub fn mutate(&mut self, input: I) {
    let future = (self.mutator)(input.clone());
    let tx = self.tx.clone();
    self.in_flight += 1;

    tokio::spawn(async move {
      let result = future.await;
      let _ = tx.send(Settled { input, result });
    });
  }

  /// Number of writes started but not yet collected by `poll()`.
  pub fn in_flight(&self) -> usize {
    self.in_flight
  }

  /// Drain every write that has settled since the last poll.
  pub fn poll(&mut self) -> Vec<Settled<I, O, E>> {
    let mut settled = Vec::new();
    while let Ok(outcome) = self.rx.try_recv() {
      settled.push(outcome);
    }
    self.in_flight = self.in_flight.saturating_sub(settled.len());
    settled
  }
}

impl<I, O, E> std::fmt::Debug for Mutation<I, O, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("in_flight", &self.in_flight)
      .finish_non_exhaustive()
  }
}
