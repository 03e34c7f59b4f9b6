//! Web and repository worker pools
//!
//! Two stages of bounded fan-out over shared MPMC job channels. Web
//! workers fetch under the job-wide rate limiter and hand raw bodies to
//! the repository stage; repository workers encode and submit one upsert
//! per backend transaction, then signal completion.
//!
//! Failures are fatal to the job: the first worker to observe one reports
//! it on the error channel, cancels the shared token and exits. The
//! remaining workers drain out at their next suspension point.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use crossfire::{MAsyncRx, MAsyncTx};
use siphon_encode::Registry;
use siphon_storage::TxnHandle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::TransportError;
use crate::plan::FlattenedRequest;

/// A fetched response handed from the web stage to the repository stage
#[derive(Debug)]
pub(crate) struct RepoJob {
    /// Completed request URL (drives encoder lookup).
    pub url: Url,
    /// Raw response body.
    pub body: Bytes,
    /// Destination table override from the originating request.
    pub table: Option<String>,
}

/// Failure reporting shared by both pools
pub(crate) struct PoolShared {
    errors: mpsc::Sender<TransportError>,
    cancel: CancellationToken,
}

impl PoolShared {
    pub fn new(errors: mpsc::Sender<TransportError>, cancel: CancellationToken) -> Self {
        Self { errors, cancel }
    }

    /// Report a fatal error and abort the job
    ///
    /// Only the first report is kept; the cancel fires either way so every
    /// worker observes the abort.
    fn fail(&self, error: TransportError) {
        let _ = self.errors.try_send(error);
        self.cancel.cancel();
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Spawn the web worker pool
pub(crate) fn spawn_web_workers(
    count: usize,
    jobs: MAsyncRx<FlattenedRequest>,
    repo_jobs: MAsyncTx<RepoJob>,
    shared: Arc<PoolShared>,
) -> Vec<JoinHandle<()>> {
    (1..=count)
        .map(|id| {
            let jobs = jobs.clone();
            let repo_jobs = repo_jobs.clone();
            let shared = Arc::clone(&shared);
            tokio::spawn(web_worker(id, jobs, repo_jobs, shared))
        })
        .collect()
}

async fn web_worker(
    id: usize,
    jobs: MAsyncRx<FlattenedRequest>,
    repo_jobs: MAsyncTx<RepoJob>,
    shared: Arc<PoolShared>,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            received = jobs.recv() => match received {
                Ok(job) => job,
                Err(_) => break, // channel closed and drained
            },
        };

        let started = Instant::now();

        let response = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            fetched = job.fetch.fetch() => match fetched {
                Ok(response) => response,
                Err(e) => {
                    shared.fail(TransportError::Web(e));
                    break;
                }
            },
        };

        let url = response.url().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                shared.fail(TransportError::Web(siphon_web::WebError::Request {
                    url: url.to_string(),
                    source: e,
                }));
                break;
            }
        };

        let path = url.path().to_string();
        if repo_jobs
            .send(RepoJob {
                url,
                body,
                table: job.table,
            })
            .await
            .is_err()
        {
            break; // repository stage is gone, the job is aborting
        }

        tracing::info!(
            worker_id = id,
            worker = "web",
            elapsed_ms = started.elapsed().as_millis() as u64,
            path = %path,
            "web request completed"
        );
    }
}

/// Spawn the repository worker pool
pub(crate) fn spawn_repo_workers(
    count: usize,
    jobs: MAsyncRx<RepoJob>,
    registry: Arc<Registry>,
    txns: Vec<TxnHandle>,
    done: mpsc::Sender<()>,
    shared: Arc<PoolShared>,
) -> Vec<JoinHandle<()>> {
    (1..=count)
        .map(|id| {
            let jobs = jobs.clone();
            let registry = Arc::clone(&registry);
            let txns = txns.clone();
            let done = done.clone();
            let shared = Arc::clone(&shared);
            tokio::spawn(repo_worker(id, jobs, registry, txns, done, shared))
        })
        .collect()
}

async fn repo_worker(
    id: usize,
    jobs: MAsyncRx<RepoJob>,
    registry: Arc<Registry>,
    txns: Vec<TxnHandle>,
    done: mpsc::Sender<()>,
    shared: Arc<PoolShared>,
) {
    'jobs: loop {
        let job = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            received = jobs.recv() => match received {
                Ok(job) => job,
                Err(_) => break,
            },
        };

        let mut record = match registry.lookup(&job.url).encode(&job.url, &job.body) {
            Ok(record) => record,
            Err(e) => {
                shared.fail(TransportError::Encode(e));
                break;
            }
        };

        // A configured table overrides whatever the encoder derived.
        if let Some(table) = &job.table {
            record.table = table.clone();
        }

        for txn in &txns {
            let record = record.clone();
            let errors = shared.errors.clone();
            let cancel = shared.cancel.clone();
            let worker_id = id;

            let submitted = txn
                .transact(move |repo: &mut (dyn siphon_storage::Repository + 'static)| {
                    Box::pin(async move {
                        let started = Instant::now();
                        match repo.upsert(&record).await {
                            Ok(summary) => {
                                tracing::info!(
                                    worker_id,
                                    worker = "repository",
                                    scheme = %repo.kind(),
                                    table = %record.table,
                                    upserted_count = summary.upserted_count,
                                    matched_count = summary.matched_count,
                                    elapsed_ms = started.elapsed().as_millis() as u64,
                                    "partial upsert completed"
                                );
                                Ok(())
                            }
                            Err(e) => {
                                let _ =
                                    errors.try_send(TransportError::Repository(e.clone()));
                                cancel.cancel();
                                Err(e)
                            }
                        }
                    })
                })
                .await;

            if submitted.is_err() {
                if !shared.cancelled() {
                    shared.fail(TransportError::Repository(
                        siphon_storage::StorageError::TxnClosed,
                    ));
                }
                break 'jobs;
            }
        }

        if done.send(()).await.is_err() {
            break;
        }
    }
}
