//! Known-builder list and the client scan built on it.
//!
//! The contract indexes projects by freelancer only. Answering "which
//! projects did this client commission" means reading every known builder's
//! list and filtering on the client field: one read per builder, so the cost
//! grows with the list.

use std::future::Future;
use std::path::PathBuf;

use alloy::primitives::Address;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::observability::metrics;
use crate::registry::error::RegistryResult;
use crate::registry::types::{ClientScan, Project, ProjectWithOrigin, SkippedBuilder};

/// Source of builder addresses. Not authoritative; may be stale or incomplete.
#[async_trait]
pub trait BuilderIndex: Send + Sync {
    /// Raw entries in list order. Entries are validated by the scan.
    async fn known_builders(&self) -> Result<Vec<String>, String>;
}

/// JSON array of addresses on disk, re-read on every call.
#[derive(Debug, Clone)]
pub struct JsonFileBuilderIndex {
    path: PathBuf,
}

impl JsonFileBuilderIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BuilderIndex for JsonFileBuilderIndex {
    async fn known_builders(&self) -> Result<Vec<String>, String> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Builder list not found, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(format!("cannot read {}: {}", self.path.display(), e)),
        };

        serde_json::from_str(&content)
            .map_err(|e| format!("{} is not a JSON array of strings: {}", self.path.display(), e))
    }
}

/// Scan `entries` for projects commissioned by `client`.
///
/// Malformed entries and builders whose read fails are skipped and reported;
/// one bad builder never aborts the scan. Duplicate entries are read once,
/// under the first spelling. Results echo the entry as listed.
/// Output keeps list order, then project order within each builder.
pub async fn scan_for_client<F, Fut>(
    entries: Vec<String>,
    client: Address,
    concurrency: usize,
    fetch: F,
) -> ClientScan
where
    F: Fn(Address) -> Fut,
    Fut: Future<Output = RegistryResult<Vec<Project>>>,
{
    let mut scan = ClientScan::default();
    let mut builders: Vec<(Address, String)> = Vec::with_capacity(entries.len());

    for entry in entries {
        match entry.trim().parse::<Address>() {
            Ok(address) if !builders.iter().any(|(a, _)| *a == address) => {
                builders.push((address, entry.trim().to_string()))
            }
            Ok(_) => {}
            Err(e) => scan.skipped.push(SkippedBuilder {
                builder: entry,
                reason: format!("invalid address: {}", e),
            }),
        }
    }

    let results: Vec<(String, RegistryResult<Vec<Project>>)> = stream::iter(builders)
        .map(|(address, entry)| {
            let read = fetch(address);
            async move { (entry, read.await) }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for (builder, result) in results {
        match result {
            Ok(projects) => scan.projects.extend(
                projects
                    .into_iter()
                    .enumerate()
                    .filter(|(_, p)| p.client == client)
                    .map(|(index, p)| ProjectWithOrigin::new(builder.as_str(), index, p)),
            ),
            Err(e) => {
                tracing::warn!(builder = %builder, error = %e, "Skipping builder in client scan");
                scan.skipped.push(SkippedBuilder {
                    builder,
                    reason: e.to_string(),
                });
            }
        }
    }

    if !scan.skipped.is_empty() {
        metrics::record_builders_skipped(scan.skipped.len());
    }
    scan
}
