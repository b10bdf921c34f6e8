//! Document worker pool
//!
//! Each document is one blocking task with its own [`DocTransformer`], so no
//! transformer state (tables, key counters, namespace cache) is shared
//! between documents. At most `workers` tasks run at once; results are
//! merged in submission order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info};
use xmltab_mapping::{DocTransformer, Tables, TransformOptions, merge_tables};
use xmltab_schema::Schema;

use crate::documents::RawDocument;
use crate::{Error, Result};

/// Fixed-size pool running document transformations on the blocking
/// thread pool.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            semaphore: Arc::new(Semaphore::new(workers)),
        }
    }

    /// One worker per available core, leaving one for the orchestrator.
    pub fn default_workers() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .saturating_sub(1)
            .max(1)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Transform every document and merge the results. Returns the merged
    /// tables and the number of documents processed. The first error, in
    /// document order, ends the call.
    pub async fn transform_all(
        &self,
        schema: &Arc<Schema>,
        options: &TransformOptions,
        documents: Vec<RawDocument>,
    ) -> Result<(Tables, usize)> {
        let mut handles = Vec::with_capacity(documents.len());
        for document in documents {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::pipeline("acquire worker", &document.filename, e.to_string()))?;
            let schema = Arc::clone(schema);
            let options = options.clone();
            let origin = (document.filename.clone(), document.line);
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                transform_document(schema, options, &document)
            });
            handles.push((origin, handle));
        }

        let mut merged = Tables::new();
        let mut processed = 0;
        for ((filename, line), handle) in handles {
            let tables = handle.await.map_err(|e| {
                Error::pipeline("transform", &filename, format!("worker for line {line} failed: {e}"))
            })??;
            merge_tables(&mut merged, tables);
            processed += 1;
            if processed % 100 == 1 {
                info!("Processing document {processed}...");
            }
        }
        Ok((merged, processed))
    }
}

fn transform_document(
    schema: Arc<Schema>,
    options: TransformOptions,
    document: &RawDocument,
) -> Result<Tables> {
    let mut transformer = DocTransformer::new(schema, options)?;
    transformer.process_doc(&document.text, Some(&document.filename), Some(document.line))?;
    debug!(filename = %document.filename, line = document.line, "Transformed document");
    Ok(transformer.take_tables())
}
