//! Per-backend transaction multiplexer
//!
//! Wraps one `Repository` session behind a submission channel. Workers
//! submit operations through cloneable `TxnHandle`s and never touch the
//! session; a single driver task applies operations in submission order
//! and finalizes when the orchestrator decides.
//!
//! # Lifecycle
//!
//! `OPEN` (driver applying ops) → `CLOSING` (every handle dropped, driver
//! awaiting the decision) → `COMMITTED` or `ROLLED_BACK`. The decision is
//! delivered by `Txn::commit` / `Txn::rollback`, which consume the `Txn`,
//! so at most one of the two can ever be issued. Dropping the `Txn`
//! without deciding counts as rollback.

use futures::future::BoxFuture;
use siphon_protocol::TruncateRequest;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, StorageError};
use crate::repository::Repository;

/// A type-erased operation applied to the backend session by the driver
pub type TxnOp = Box<
    dyn for<'a> FnOnce(&'a mut (dyn Repository + 'static)) -> BoxFuture<'a, Result<()>>
        + Send
        + 'static,
>;

/// Orchestrator-side end of a backend transaction
///
/// Holds the commit decision; `commit` and `rollback` consume the value
/// and block until the driver reports the terminal state.
#[derive(Debug)]
pub struct Txn {
    dns: String,
    decision: oneshot::Sender<bool>,
    status: oneshot::Receiver<Result<()>>,
}

/// Worker-side submission handle for a backend transaction
///
/// Cloneable; concurrent submissions from multiple workers are linearized
/// by the channel. The driver shuts down once every handle is dropped and
/// the decision arrives.
#[derive(Debug, Clone)]
pub struct TxnHandle {
    dns: String,
    ops: mpsc::Sender<TxnOp>,
}

impl Txn {
    /// Open a transaction over a repository session
    ///
    /// Spawns the driver task owning `repo`. `capacity` bounds the
    /// submission channel; sizing it to the expected operation count makes
    /// submission effectively non-blocking.
    pub fn open(dns: impl Into<String>, repo: Box<dyn Repository>, capacity: usize) -> (Self, TxnHandle) {
        let (ops_tx, ops_rx) = mpsc::channel(capacity.max(1));
        let (decision_tx, decision_rx) = oneshot::channel();
        let (status_tx, status_rx) = oneshot::channel();

        let dns = dns.into();
        tokio::spawn(drive(dns.clone(), repo, ops_rx, decision_rx, status_tx));

        (
            Self {
                dns: dns.clone(),
                decision: decision_tx,
                status: status_rx,
            },
            TxnHandle { dns, ops: ops_tx },
        )
    }

    /// Backend connection string this transaction is bound to
    pub fn dns(&self) -> &str {
        &self.dns
    }

    /// Commit the transaction
    ///
    /// Blocks until every submitted operation has been applied and the
    /// session has committed. The first operation failure poisons the
    /// transaction: later operations are skipped and this returns the
    /// failure instead of committing.
    pub async fn commit(self) -> Result<()> {
        self.decide(true).await
    }

    /// Roll back the transaction, discarding all submitted work
    pub async fn rollback(self) -> Result<()> {
        self.decide(false).await
    }

    async fn decide(self, commit: bool) -> Result<()> {
        // The driver may already be gone (it never drops status before
        // sending); a lost channel either way is a closed transaction.
        let _ = self.decision.send(commit);
        self.status.await.map_err(|_| StorageError::TxnClosed)?
    }
}

impl TxnHandle {
    /// Backend connection string this handle submits to
    pub fn dns(&self) -> &str {
        &self.dns
    }

    /// Submit an operation for the driver to apply
    ///
    /// Operations are applied in submission order. Returns once the
    /// operation is enqueued; the result surfaces at commit time (or on
    /// the channel the operation itself reports to).
    ///
    /// # Errors
    ///
    /// Returns `TxnClosed` when the driver is gone.
    pub async fn transact<F>(&self, op: F) -> Result<()>
    where
        F: for<'a> FnOnce(&'a mut (dyn Repository + 'static)) -> BoxFuture<'a, Result<()>>
            + Send
            + 'static,
    {
        self.ops
            .send(Box::new(op))
            .await
            .map_err(|_| StorageError::TxnClosed)
    }

    /// Truncate tables and wait for the result
    ///
    /// Submits a truncate operation and blocks until the driver has applied
    /// it, so callers can order truncation strictly before any upsert
    /// submissions.
    pub async fn truncate(&self, request: &TruncateRequest) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let request = request.clone();

        self.transact(move |repo: &mut (dyn Repository + 'static)| {
            Box::pin(async move {
                let result = repo.truncate(&request).await;
                let outcome = result.clone();
                let _ = ack_tx.send(result);
                outcome
            })
        })
        .await?;

        ack_rx.await.map_err(|_| StorageError::TxnClosed)?
    }
}

/// Driver loop: apply operations FIFO, then finalize on the decision
async fn drive(
    dns: String,
    mut repo: Box<dyn Repository>,
    mut ops: mpsc::Receiver<TxnOp>,
    decision: oneshot::Receiver<bool>,
    status: oneshot::Sender<Result<()>>,
) {
    let mut failure: Option<StorageError> = None;

    while let Some(op) = ops.recv().await {
        if failure.is_some() {
            // Poisoned: drain without applying.
            continue;
        }
        if let Err(e) = op(repo.as_mut()).await {
            tracing::error!(dns = %dns, error = %e, "transaction operation failed");
            failure = Some(e);
        }
    }

    // Every handle is gone; await the commit decision. A dropped decision
    // sender means the transaction was abandoned and rolls back.
    let commit = decision.await.unwrap_or(false);

    let result = match (commit, failure) {
        (_, Some(e)) => {
            let _ = repo.rollback().await;
            Err(e)
        }
        (true, None) => repo.commit().await,
        (false, None) => repo.rollback().await,
    };

    if let Err(ref e) = result {
        tracing::error!(dns = %dns, error = %e, "transaction finalization failed");
    } else {
        tracing::debug!(dns = %dns, committed = commit, "transaction finalized");
    }

    let _ = status.send(result);
}

#[cfg(test)]
#[path = "txn_test.rs"]
mod txn_test;
