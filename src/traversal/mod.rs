//! Recursive dependency traversal.
//!
//! The traversal is a worklist of two kinds of jobs:
//!
//! - `Expand(package)`: ask the index for the package's artifacts
//! - `Process(artifact)`: download the artifact and read its dependencies
//!
//! Jobs run concurrently (up to `jobs` at a time) but their results are
//! folded back into the visited/expanded sets by the single loop in
//! [`Traversal::run`], so "test and mark" needs no locking. An artifact is
//! marked visited when it is queued, which makes every artifact processed at
//! most once and keeps dependency cycles finite.

use anyhow::Result;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use log::{debug, info, warn};
use std::collections::{HashSet, VecDeque};

use crate::index::PackageIndex;
use crate::metadata::DependencyExtractor;
use crate::package::{Artifact, Package};
use crate::progress::ProgressReporter;
use crate::store::{ArtifactStore, DownloadOutcome};

/// Default number of jobs in flight.
pub const DEFAULT_JOBS: usize = 4;

/// Summary of a finished traversal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TraversalReport {
    /// Every processed artifact, in completion order.
    pub visited: Vec<Artifact>,
    /// Artifacts downloaded during this run.
    pub fetched: usize,
    /// Artifacts whose destination already existed.
    pub already_present: usize,
    /// Bytes downloaded during this run.
    pub bytes: u64,
}

impl TraversalReport {
    fn record(&mut self, artifact: Artifact, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Fetched { bytes } => {
                self.fetched += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::AlreadyPresent => self.already_present += 1,
        }
        self.visited.push(artifact);
    }
}

enum Job {
    Expand(Package),
    Process(Artifact),
}

enum JobOutcome {
    Expanded {
        package: Package,
        artifacts: Vec<Artifact>,
    },
    Processed {
        artifact: Artifact,
        outcome: DownloadOutcome,
        dependencies: Vec<Package>,
    },
}

pub struct Traversal<'a, I, S, M, P>
where
    I: PackageIndex,
    S: ArtifactStore,
    M: DependencyExtractor,
    P: ProgressReporter,
{
    index: &'a I,
    store: &'a S,
    extractor: &'a M,
    progress: &'a P,
    jobs: usize,
}

impl<'a, I, S, M, P> Traversal<'a, I, S, M, P>
where
    I: PackageIndex,
    S: ArtifactStore,
    M: DependencyExtractor,
    P: ProgressReporter,
{
    pub fn new(index: &'a I, store: &'a S, extractor: &'a M, progress: &'a P) -> Self {
        Self {
            index,
            store,
            extractor,
            progress,
            jobs: DEFAULT_JOBS,
        }
    }

    /// Maximum number of concurrent jobs; `1` gives a strictly sequential run.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Mirror `root` and everything it transitively depends on.
    ///
    /// The first error stops the traversal: nothing new is scheduled and
    /// in-flight jobs are dropped.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, root: &Package) -> Result<TraversalReport> {
        let mut visited: HashSet<Artifact> = HashSet::new();
        let mut expanded: HashSet<Package> = HashSet::new();
        let mut pending: VecDeque<Job> = VecDeque::new();
        let mut in_flight = FuturesUnordered::new();
        let mut report = TraversalReport::default();

        expanded.insert(root.clone());
        pending.push_back(Job::Expand(root.clone()));

        loop {
            while in_flight.len() < self.jobs {
                let Some(job) = pending.pop_front() else {
                    break;
                };
                in_flight.push(self.run_job(job));
            }

            // Nothing in flight after refilling means nothing is pending either
            let Some(result) = in_flight.next().await else {
                break;
            };

            match result? {
                JobOutcome::Expanded { package, artifacts } => {
                    if artifacts.is_empty() {
                        if package == *root {
                            warn!("The index lists no artifacts for {}", package);
                        } else {
                            debug!("{} has no artifacts on the index", package);
                        }
                    }

                    let mut queued = 0;
                    for artifact in artifacts {
                        if visited.insert(artifact.clone()) {
                            pending.push_back(Job::Process(artifact));
                            queued += 1;
                        }
                    }
                    debug!("{}: queued {} new artifact(s)", package, queued);
                    self.progress.add_expected(queued);
                }
                JobOutcome::Processed {
                    artifact,
                    outcome,
                    dependencies,
                } => {
                    self.progress.complete(&artifact, outcome);
                    for dependency in dependencies {
                        if expanded.insert(dependency.clone()) {
                            pending.push_back(Job::Expand(dependency));
                        }
                    }
                    report.record(artifact, outcome);
                }
            }
        }

        info!(
            "Traversal of {} finished: {} artifact(s), {} fetched, {} already present",
            root,
            report.visited.len(),
            report.fetched,
            report.already_present
        );
        Ok(report)
    }

    async fn run_job(&self, job: Job) -> Result<JobOutcome> {
        match job {
            Job::Expand(package) => {
                let artifacts = self.index.list_artifacts(&package).await?;
                Ok(JobOutcome::Expanded { package, artifacts })
            }
            Job::Process(artifact) => {
                self.progress.start(&artifact);
                let outcome = self.store.ensure_downloaded(&artifact).await?;
                let path = self.store.destination(&artifact);
                let dependencies = self.extractor.dependencies_of(&artifact, &path).await?;
                Ok(JobOutcome::Processed {
                    artifact,
                    outcome,
                    dependencies,
                })
            }
        }
    }
}
