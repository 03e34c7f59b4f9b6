//! Upsert orchestrator
//!
//! The single entrypoint of the pipeline. `Upsert` validates the job,
//! connects the HTTP client, opens one transaction per backend, plans the
//! work list, wires the two worker pools together and drives the job to
//! commit or rollback.
//!
//! # Partial success
//!
//! Commit is best-effort per backend, in `dnsList` order: the first commit
//! failure aborts with `TransportError::Commit`, and backends committed
//! before it are NOT reversed. Callers needing all-or-nothing semantics
//! must layer two-phase commit above this crate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use siphon_config::{Authentication, Config};
use siphon_encode::Registry;
use siphon_protocol::TruncateRequest;
use siphon_storage::{Repository, StorageError, Txn, TxnHandle};
use siphon_web::{Client, RateLimiter, Signer};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TransportError};
use crate::plan::{FlattenedRequest, plan};
use crate::worker::{PoolShared, RepoJob, spawn_repo_workers, spawn_web_workers};

/// Submission-channel depth per backend transaction
const TXN_CHANNEL_CAPACITY: usize = 64;

/// Opens one repository session per backend connection string
///
/// The default factory dispatches on the DNS scheme via
/// `siphon_storage::connect`; jobs targeting external drivers inject their
/// own.
pub type RepositoryFactory = Arc<
    dyn Fn(String) -> BoxFuture<'static, std::result::Result<Box<dyn Repository>, StorageError>>
        + Send
        + Sync,
>;

fn default_factory() -> RepositoryFactory {
    Arc::new(|dns: String| Box::pin(async move { siphon_storage::connect(&dns).await }))
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1)
}

/// One ingestion job, ready to run
///
/// ```no_run
/// # async fn example(config: siphon_config::Config) -> Result<(), siphon_transport::TransportError> {
/// use siphon_transport::Upsert;
///
/// Upsert::new(&config).run().await
/// # }
/// ```
pub struct Upsert<'a> {
    config: &'a Config,
    registry: Arc<Registry>,
    cancel: CancellationToken,
    workers: usize,
    factory: RepositoryFactory,
}

impl<'a> Upsert<'a> {
    /// Create a job over the given configuration
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            registry: Arc::new(Registry::default()),
            cancel: CancellationToken::new(),
            workers: num_cpus(),
            factory: default_factory(),
        }
    }

    /// Use a custom encoder registry
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Thread an external cancellation token through the job
    ///
    /// Cancelling the token aborts in-flight fetches and upserts; open
    /// transactions roll back and `run` returns `Cancelled` (or the first
    /// worker error when one raced the cancellation).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override the per-pool worker count (defaults to the CPU count)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Override the repository factory
    pub fn with_repository_factory(mut self, factory: RepositoryFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Run the job to completion
    ///
    /// Returns `Ok(())` only when every flattened request produced a
    /// response and every backend commit succeeded.
    pub async fn run(self) -> Result<()> {
        let job_started = Instant::now();

        let (burst, period) = validate(self.config)?;

        let client = Arc::new(Client::new(build_signer(&self.config.authentication))?);
        tracing::info!(url = %self.config.url, "connection established");

        // One transaction per backend; abandoning them (any early return)
        // rolls the drivers back once the handles drop.
        let mut txns = Vec::with_capacity(self.config.dns_list.len());
        let mut handles = Vec::with_capacity(self.config.dns_list.len());
        for dns in &self.config.dns_list {
            let repo = (self.factory)(dns.clone())
                .await
                .map_err(TransportError::Repository)?;
            let (txn, handle) = Txn::open(dns.clone(), repo, TXN_CHANNEL_CAPACITY);
            tracing::info!(dns = %dns, "created repository transaction");
            txns.push(txn);
            handles.push(handle);
        }

        // A single limiter instance spans every fetch, so concurrent
        // workers and timeseries chunks share one account budget.
        let limiter = Arc::new(RateLimiter::new(burst, period));

        let outcome = drive_pipeline(
            self.config,
            &client,
            &limiter,
            &self.registry,
            handles,
            self.workers,
            &self.cancel,
        )
        .await;

        match outcome {
            Ok(()) => {
                for txn in txns {
                    let dns = txn.dns().to_string();
                    txn.commit()
                        .await
                        .map_err(|source| TransportError::Commit { dns, source })?;
                }
                tracing::info!(
                    elapsed_ms = job_started.elapsed().as_millis() as u64,
                    "upsert completed"
                );
                Ok(())
            }
            Err(e) => {
                for txn in txns {
                    let _ = txn.rollback().await;
                }
                Err(e)
            }
        }
    }
}

/// Run one ingestion job with default wiring
///
/// Convenience for `Upsert::new(config).run()`.
pub async fn upsert(config: &Config) -> Result<()> {
    Upsert::new(config).run().await
}

/// Fail-closed configuration validation
fn validate(config: &Config) -> Result<(u32, Duration)> {
    let rate_limit = config
        .rate_limit
        .as_ref()
        .ok_or(TransportError::MissingConfigField("rateLimit"))?;

    let burst = rate_limit.burst.ok_or_else(|| {
        TransportError::invalid_rate_limit(TransportError::MissingRateLimitField("burst"))
    })?;
    let period = rate_limit.period.ok_or_else(|| {
        TransportError::invalid_rate_limit(TransportError::MissingRateLimitField("period"))
    })?;

    if burst == 0 {
        return Err(TransportError::invalid_rate_limit(
            TransportError::UnableToParse("burst"),
        ));
    }
    if period.is_zero() {
        return Err(TransportError::invalid_rate_limit(
            TransportError::UnableToParse("period"),
        ));
    }

    Ok((burst, period))
}

/// Exhaust the authentication variants into a signer
fn build_signer(authentication: &Authentication) -> Signer {
    if let Some(api_key) = &authentication.api_key {
        Signer::api_key(&api_key.key, &api_key.passphrase, &api_key.secret)
    } else if let Some(auth2) = &authentication.auth2 {
        Signer::bearer(&auth2.bearer)
    } else {
        Signer::None
    }
}

/// Plan the work list, truncate if asked, run the pools and await drain
///
/// Consumes the transaction handles: by the time this returns, every
/// worker has exited and every handle is dropped, so the caller's
/// commit/rollback observes a closed submission channel.
async fn drive_pipeline(
    config: &Config,
    client: &Arc<Client>,
    limiter: &Arc<RateLimiter>,
    registry: &Arc<Registry>,
    handles: Vec<TxnHandle>,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let plan = plan(config, client, limiter)?;
    let flattened_count = plan.flattened.len();

    // Truncate each backend exactly once, strictly before any upsert.
    if config.truncate && !plan.tables.is_empty() {
        let request = TruncateRequest::new(plan.tables.iter().cloned().collect());
        for handle in &handles {
            let started = Instant::now();
            handle
                .truncate(&request)
                .await
                .map_err(|source| TransportError::Truncate {
                    dns: handle.dns().to_string(),
                    source,
                })?;
            tracing::info!(
                dns = %handle.dns(),
                tables = ?request.tables,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "truncated tables"
            );
        }
    }

    if flattened_count == 0 {
        return Ok(());
    }

    let backend_count = handles.len().max(1);
    let (web_tx, web_rx) = crossfire::mpmc::bounded_async::<FlattenedRequest>(flattened_count);
    let (repo_tx, repo_rx) =
        crossfire::mpmc::bounded_async::<RepoJob>(flattened_count * backend_count);
    let (done_tx, mut done_rx) = mpsc::channel::<()>(flattened_count);
    let (err_tx, mut err_rx) = mpsc::channel::<TransportError>(1);

    // Keep `shared` (and its error sender) alive past the await loop so a
    // drained error channel always means "no error", never "workers gone".
    let shared = Arc::new(PoolShared::new(err_tx, cancel.clone()));

    let mut tasks = spawn_repo_workers(
        workers,
        repo_rx,
        Arc::clone(registry),
        handles,
        done_tx,
        Arc::clone(&shared),
    );
    tracing::info!(count = workers, "repository workers started");

    tasks.extend(spawn_web_workers(
        workers,
        web_rx,
        repo_tx,
        Arc::clone(&shared),
    ));
    tracing::info!(count = workers, "web workers started");

    for request in plan.flattened {
        if web_tx.send(request).await.is_err() {
            break; // pool aborted; the error surfaces in the await loop
        }
    }
    drop(web_tx);
    tracing::info!(count = flattened_count, "web worker jobs enqueued");

    let mut completed = 0usize;
    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                break Err(first_error(&mut err_rx));
            }
            received = err_rx.recv() => {
                break Err(received.unwrap_or(TransportError::Cancelled));
            }
            signal = done_rx.recv() => match signal {
                Some(()) => {
                    completed += 1;
                    if completed == flattened_count {
                        break Ok(());
                    }
                }
                None => {
                    // Every worker exited without finishing the work list.
                    break Err(first_error(&mut err_rx));
                }
            },
        }
    };

    if outcome.is_err() {
        cancel.cancel();
    }
    for task in tasks {
        let _ = task.await;
    }

    outcome
}

/// The reported worker error, or `Cancelled` when none arrived
fn first_error(err_rx: &mut mpsc::Receiver<TransportError>) -> TransportError {
    err_rx
        .try_recv()
        .ok()
        .unwrap_or(TransportError::Cancelled)
}
