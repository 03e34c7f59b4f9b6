//! Request flattening
//!
//! Turns the job's declared requests into the concrete list of HTTP calls:
//! plain requests map one-to-one, timeseries requests fan out into one
//! flattened request per chunk. Each chunk rebuilds its fetch descriptor
//! from a cloned query map so no flattened request aliases another.

use std::collections::BTreeSet;
use std::sync::Arc;

use siphon_config::Config;
use siphon_web::{Client, FetchConfig, Method, RateLimiter};

use crate::error::{Result, TransportError};
use crate::timeseries::{expand, format_timestamp};

/// One concrete HTTP call and its destination table override
#[derive(Debug, Clone)]
pub(crate) struct FlattenedRequest {
    pub fetch: FetchConfig,
    pub table: Option<String>,
}

/// The planned work list for a job
#[derive(Debug)]
pub(crate) struct Plan {
    /// One entry per HTTP call to perform.
    pub flattened: Vec<FlattenedRequest>,
    /// Unique tables referenced by the job's requests, for truncation.
    pub tables: BTreeSet<String>,
}

/// Flatten every configured request into concrete fetches
pub(crate) fn plan(
    config: &Config,
    client: &Arc<Client>,
    limiter: &Arc<RateLimiter>,
) -> Result<Plan> {
    let mut flattened = Vec::new();
    let mut tables = BTreeSet::new();

    for request in &config.requests {
        let method = parse_method(request.method.as_deref())?;

        let fetch = FetchConfig::build(
            &config.url,
            &request.endpoint,
            &request.query,
            method.clone(),
            Arc::clone(client),
            Arc::clone(limiter),
        )
        .map_err(TransportError::Web)?;

        match &request.timeseries {
            Some(spec) => {
                let chunks =
                    expand(spec, fetch.url()).map_err(TransportError::setting_chunks)?;
                let layout = spec.layout.as_deref();

                for chunk in chunks {
                    // Rebuild from a copied query map so every chunk is
                    // independent of its siblings and of the original
                    // request.
                    let mut query = request.query.clone();
                    query.insert(spec.start_name.clone(), format_timestamp(layout, chunk.start));
                    query.insert(spec.end_name.clone(), format_timestamp(layout, chunk.end));

                    let chunk_fetch = FetchConfig::build(
                        &config.url,
                        &request.endpoint,
                        &query,
                        method.clone(),
                        Arc::clone(client),
                        Arc::clone(limiter),
                    )
                    .map_err(|e| TransportError::fetching_chunks(TransportError::Web(e)))?;

                    flattened.push(FlattenedRequest {
                        fetch: chunk_fetch,
                        table: request.table.clone(),
                    });
                }
            }
            None => flattened.push(FlattenedRequest {
                fetch,
                table: request.table.clone(),
            }),
        }

        if let Some(table) = &request.table {
            tables.insert(table.clone());
        }
    }

    Ok(Plan { flattened, tables })
}

/// Parse the configured HTTP method, defaulting to GET
fn parse_method(method: Option<&str>) -> Result<Method> {
    match method {
        None | Some("") => Ok(Method::GET),
        Some(name) => Method::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::UnableToParse("method")),
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod plan_test;
