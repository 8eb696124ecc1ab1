use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use qdsl_data::query::{CountQuery, Mutation, SelectQuery};
use qdsl_data::{DataError, Entity, QueryExecutor, QueryResults, Row, SessionFactory};
use tokio::sync::RwLock;

use crate::dataset::Dataset;
use crate::eval::{self, engine_error};
use crate::fixtures;

/// Per-operation call counts, shared by an engine and all of its sessions.
#[derive(Debug, Default)]
pub struct CallCounters {
    acquire: AtomicUsize,
    commit: AtomicUsize,
    rollback: AtomicUsize,
    fetch_all: AtomicUsize,
    fetch_count: AtomicUsize,
    fetch_results: AtomicUsize,
    execute: AtomicUsize,
}

/// Point-in-time copy of [`CallCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSnapshot {
    pub acquire: usize,
    pub commit: usize,
    pub rollback: usize,
    pub fetch_all: usize,
    pub fetch_count: usize,
    pub fetch_results: usize,
    pub execute: usize,
}

impl CallCounters {
    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            acquire: self.acquire.load(Ordering::SeqCst),
            commit: self.commit.load(Ordering::SeqCst),
            rollback: self.rollback.load(Ordering::SeqCst),
            fetch_all: self.fetch_all.load(Ordering::SeqCst),
            fetch_count: self.fetch_count.load(Ordering::SeqCst),
            fetch_results: self.fetch_results.load(Ordering::SeqCst),
            execute: self.execute.load(Ordering::SeqCst),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.acquire,
            &self.commit,
            &self.rollback,
            &self.fetch_all,
            &self.fetch_count,
            &self.fetch_results,
            &self.execute,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory execution engine for tests.
///
/// Sessions read the shared [`Dataset`] directly until their first mutation,
/// then work on a private copy that is written back on commit and dropped on
/// rollback. Concurrent committing sessions overwrite each other.
///
/// # Example
///
/// ```ignore
/// let engine = InMemoryEngine::with_fixtures();
/// let repo = MemberRepository::new(engine.clone());
/// let page = repo.search_page_complex(&SearchCondition::new(), &Pageable::of(0, 10)).await?;
/// assert_eq!(engine.calls().fetch_count, 0);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryEngine {
    data: Arc<RwLock<Dataset>>,
    calls: Arc<CallCounters>,
    combined_fetch: bool,
    fail_counts: Arc<AtomicBool>,
}

impl InMemoryEngine {
    pub fn new(data: Dataset) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            calls: Arc::new(CallCounters::default()),
            combined_fetch: true,
            fail_counts: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Engine over [`fixtures::member_team_dataset`].
    pub fn with_fixtures() -> Self {
        Self::new(fixtures::member_team_dataset())
    }

    /// Make `fetch_results` fall back to a separate fetch and count.
    pub fn without_combined_fetch(mut self) -> Self {
        self.combined_fetch = false;
        self
    }

    /// Make every subsequent count query fail with a database error.
    pub fn fail_counts(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> CallSnapshot {
        self.calls.snapshot()
    }

    pub fn reset_calls(&self) {
        self.calls.reset();
    }

    /// Copy of the committed data.
    pub async fn dataset(&self) -> Dataset {
        self.data.read().await.clone()
    }

    pub async fn insert<E: Entity>(&self, entity: &E) {
        self.data.write().await.insert(entity);
    }
}

impl SessionFactory for InMemoryEngine {
    type Session = InMemorySession;

    async fn acquire(&self) -> Result<InMemorySession, DataError> {
        CallCounters::bump(&self.calls.acquire);
        Ok(InMemorySession {
            shared: Arc::clone(&self.data),
            pending: None,
            calls: Arc::clone(&self.calls),
            combined_fetch: self.combined_fetch,
            fail_counts: Arc::clone(&self.fail_counts),
        })
    }
}

pub struct InMemorySession {
    shared: Arc<RwLock<Dataset>>,
    /// Uncommitted copy, present after the first mutation.
    pending: Option<Dataset>,
    calls: Arc<CallCounters>,
    combined_fetch: bool,
    fail_counts: Arc<AtomicBool>,
}

impl InMemorySession {
    async fn read<R>(
        &self,
        f: impl FnOnce(&Dataset) -> Result<R, DataError> + Send,
    ) -> Result<R, DataError> {
        match &self.pending {
            Some(data) => f(data),
            None => {
                let data = self.shared.read().await;
                f(&data)
            }
        }
    }
}

impl QueryExecutor for InMemorySession {
    async fn fetch_all(&mut self, query: &SelectQuery) -> Result<Vec<Row>, DataError> {
        CallCounters::bump(&self.calls.fetch_all);
        tracing::debug!(table = query.table().name, "in-memory fetch_all");
        self.read(|data| eval::select(data, query).map(|(rows, _)| rows))
            .await
    }

    async fn fetch_count(&mut self, query: &CountQuery) -> Result<u64, DataError> {
        CallCounters::bump(&self.calls.fetch_count);
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(engine_error("count query failed"));
        }
        self.read(|data| eval::count(data, query)).await
    }

    async fn fetch_results(&mut self, query: &SelectQuery) -> Result<QueryResults<Row>, DataError> {
        let (results, total) = if self.combined_fetch {
            CallCounters::bump(&self.calls.fetch_results);
            self.read(|data| eval::select(data, query)).await?
        } else {
            let results = self.fetch_all(query).await?;
            let total = self.fetch_count(&query.to_count_query()).await?;
            (results, total)
        };
        Ok(QueryResults {
            results,
            total,
            offset: query.offset_value().unwrap_or(0),
            limit: query.limit_value(),
        })
    }

    async fn execute(&mut self, mutation: &Mutation) -> Result<u64, DataError> {
        CallCounters::bump(&self.calls.execute);
        let mut working = match self.pending.take() {
            Some(data) => data,
            None => self.shared.read().await.clone(),
        };
        let result = eval::execute(&mut working, mutation);
        self.pending = Some(working);
        result
    }

    async fn release(self, success: bool) -> Result<(), DataError> {
        if success {
            CallCounters::bump(&self.calls.commit);
            if let Some(data) = self.pending {
                *self.shared.write().await = data;
            }
        } else {
            CallCounters::bump(&self.calls.rollback);
        }
        Ok(())
    }
}
