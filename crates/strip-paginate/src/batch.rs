//! Batch runner: independent works processed concurrently

use crate::options::PipelineOptions;
use crate::pipeline::run_work;
use crate::types::*;
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, mpsc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Progress updates sent while a batch runs
#[derive(Debug, Clone)]
pub enum BatchUpdate {
    Started {
        work_id: String,
        position: usize,
        total: usize,
    },
    Finished {
        result: WorkResult,
        completed: usize,
        total: usize,
    },
}

/// List of works to process together
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchManifest {
    pub works: Vec<WorkUnit>,
}

impl BatchManifest {
    /// Load a manifest from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let manifest = serde_json::from_slice(&bytes)
            .map_err(|e| PaginateError::Config(format!("Failed to parse manifest: {}", e)))?;
        Ok(manifest)
    }

    /// Save the manifest to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PaginateError::Config(format!("Failed to serialize manifest: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// Process `works` with at most `options.max_parallel_works` running at once.
///
/// Results come back in the order of `works`. A failing or panicking work
/// only affects its own result.
pub async fn process_batch(
    works: Vec<WorkUnit>,
    options: &PipelineOptions,
    updates: Option<mpsc::UnboundedSender<BatchUpdate>>,
) -> Result<Vec<WorkResult>> {
    options.validate()?;

    let total = works.len();
    let permits = Arc::new(Semaphore::new(options.max_parallel_works));
    let completed = Arc::new(AtomicUsize::new(0));
    let options = Arc::new(options.clone());
    info!(
        "Processing {} works, {} at a time",
        total, options.max_parallel_works
    );

    let mut handles = Vec::with_capacity(total);
    for (position, work) in works.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        let completed = Arc::clone(&completed);
        let options = Arc::clone(&options);
        let updates = updates.clone();
        let work_id = work.id.clone();

        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| PaginateError::Config(e.to_string()))?;
            if let Some(tx) = &updates {
                let _ = tx.send(BatchUpdate::Started {
                    work_id: work.id.clone(),
                    position,
                    total,
                });
            }

            let id = work.id.clone();
            let result = tokio::task::spawn_blocking(move || run_work(&work, &options))
                .await
                .unwrap_or_else(|e| WorkResult::failure(id, PaginateError::from(e)));

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(tx) = &updates {
                let _ = tx.send(BatchUpdate::Finished {
                    result: result.clone(),
                    completed: done,
                    total,
                });
            }
            Ok::<_, PaginateError>(result)
        });
        handles.push((work_id, handle));
    }

    let mut results = Vec::with_capacity(total);
    for (work_id, handle) in handles {
        let result = match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => WorkResult::failure(work_id, e),
            Err(e) => WorkResult::failure(work_id, PaginateError::from(e)),
        };
        results.push(result);
    }

    Ok(results)
}
