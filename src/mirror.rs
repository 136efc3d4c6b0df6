//! Wiring of a complete mirror run.

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

use crate::{
    cleanup,
    config::Config,
    http::HttpClient,
    index::SimpleIndex,
    metadata::MetadataExtractor,
    package::Package,
    progress::{ConsoleProgress, human_size},
    runtime::Runtime,
    store::LocalStore,
    traversal::{Traversal, TraversalReport},
};

/// Mirror `config.package` and its transitive dependencies into
/// `config.download_dir`.
#[tracing::instrument(skip(runtime))]
pub async fn mirror<R: Runtime + Clone + 'static>(
    runtime: R,
    config: &Config,
) -> Result<TraversalReport> {
    runtime
        .create_dir_all(&config.download_dir)
        .with_context(|| format!("Failed to create download directory {:?}", config.download_dir))?;

    let http = HttpClient::new(config.http_client()?);
    let index = SimpleIndex::new(http.clone(), &config.repository);

    let cleanup_ctx = cleanup::new_shared();
    let store = LocalStore::new(
        runtime.clone(),
        http,
        config.download_dir.clone(),
        Arc::clone(&cleanup_ctx),
    );
    let extractor = MetadataExtractor::new(runtime);
    let progress = ConsoleProgress::new(config.quiet);

    // Partial downloads are removed if the user interrupts the run
    let cleanup_ctx_clone = Arc::clone(&cleanup_ctx);
    let ctrl_c_handler = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cleaning up...");
            cleanup_ctx_clone.lock().unwrap().cleanup();
            std::process::exit(130); // Standard exit code for Ctrl-C
        }
    });

    let root = Package::new(config.package.as_str());
    info!(
        "Mirroring {} from {} into {:?} with {} job(s)",
        root, config.repository, config.download_dir, config.jobs
    );

    let result = Traversal::new(&index, &store, &extractor, &progress)
        .with_jobs(config.jobs)
        .run(&root)
        .await;

    ctrl_c_handler.abort();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            // Downloads still in flight were dropped with their partial files registered
            cleanup_ctx.lock().unwrap().cleanup();
            return Err(e);
        }
    };
    debug!(
        "Progress finished at {}/{}",
        progress.completed(),
        progress.total()
    );

    println!(
        "Mirrored {} artifact(s) of {} into {}: {} downloaded ({}), {} already present",
        report.visited.len(),
        root,
        config.download_dir.display(),
        report.fetched,
        human_size(report.bytes),
        report.already_present,
    );

    Ok(report)
}
