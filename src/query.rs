//! Async fetch and mutation handles polled from the UI loop.
//!
//! The terminal loop is synchronous between ticks, so remote calls run on
//! spawned tasks and report back over a channel. Views call `poll()` on every
//! tick and re-render when it returns a change.
//!
//! ```ignore
//! let client = synced.clone();
//! let mut users = Query::new(move || {
//!     let client = client.clone();
//!     async move { client.fetch().await.map_err(|e| e.to_string()) }
//! });
//! users.fetch();
//!
//! // on tick
//! if users.poll() {
//!     // state changed, re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with a displayable message
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Repeatable fetch with loading/success/error state.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a query; `fetcher` is invoked on every `fetch()`/`refetch()`.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Start fetching unless a fetch is already running.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Start a new fetch; the result of any pending one is discarded.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  /// Take the data out of a successful query, leaving it idle.
  pub fn take(&mut self) -> Option<T> {
    match std::mem::replace(&mut self.state, QueryState::Idle) {
      QueryState::Success(data) => Some(data),
      other => {
        self.state = other;
        None
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      // Receiver may have been dropped by a refetch
      let _ = tx.send(future.await);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

/// One-shot background operation (create, update, delete).
#[derive(Debug)]
pub struct Mutation<T> {
  receiver: mpsc::UnboundedReceiver<Result<T, String>>,
}

impl<T: Send + 'static> Mutation<T> {
  pub fn spawn<Fut>(future: Fut) -> Self
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    Self { receiver: rx }
  }

  /// `Some` once the operation finished.
  pub fn poll(&mut self) -> Option<Result<T, String>> {
    match self.receiver.try_recv() {
      Ok(result) => Some(result),
      Err(mpsc::error::TryRecvError::Empty) => None,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        Some(Err("Operation was cancelled".to_string()))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(matches!(query.state(), QueryState::Success(data) if *data == vec![1, 2, 3]));
    assert_eq!(query.take(), Some(vec![1, 2, 3]));
    assert!(matches!(query.state(), QueryState::Idle));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Fetch failed: 500".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.state().error(), Some("Fetch failed: 500"));
    assert_eq!(query.take(), None);
    assert!(query.is_error());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(42)
    });

    query.fetch();
    query.fetch();
    assert!(query.is_loading());
    assert!(!query.poll());
  }

  #[tokio::test]
  async fn test_refetch_discards_pending_result() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(n)
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    assert!(matches!(query.state(), QueryState::Success(1)));
  }

  #[tokio::test]
  async fn test_mutation_reports_once_finished() {
    let mut mutation = Mutation::spawn(async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok::<_, String>("done")
    });

    assert!(mutation.poll().is_none());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(mutation.poll(), Some(Ok("done")));
  }
}
