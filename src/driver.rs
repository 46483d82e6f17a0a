use crate::constants::PROGRESS_INTERVAL;
use crate::error::Result;
use crate::publisher::{Outcome, Publisher};
use crate::resolver::{ProductCandidate, Resolver};
use crate::store::ObjectStore;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Anything that can lazily yield product candidates. Implemented by
/// [`Resolver`]; tests drive the run loop from plain vectors.
#[async_trait]
pub trait CandidateSource {
    async fn next_candidate(&mut self) -> Result<Option<ProductCandidate>>;
}

#[async_trait]
impl<S: ObjectStore> CandidateSource for Resolver<'_, S> {
    async fn next_candidate(&mut self) -> Result<Option<ProductCandidate>> {
        self.next().await
    }
}

/// Outcome counters for one run, owned by the run loop and updated once per
/// candidate. `total` counts photos considered; `products` counts candidates
/// pulled from the resolver, including those with no eligible photo.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunCounters {
    pub products: u64,
    pub total: u64,
    pub uploaded: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl RunCounters {
    pub fn progress_line(&self) -> String {
        format!(
            "progress products={} total={} uploaded={} skipped={} errors={}",
            self.products, self.total, self.uploaded, self.skipped, self.errors
        )
    }

    pub fn summary(&self) -> String {
        format!(
            "total_candidates={} uploaded={} skipped={} errors={}",
            self.total, self.uploaded, self.skipped, self.errors
        )
    }

    /// 0 on a clean run, 2 when any candidate errored.
    pub fn exit_code(&self) -> u8 {
        if self.errors == 0 {
            0
        } else {
            2
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Thumbnail only the first photo of each product.
    pub only_first: bool,
    /// Courtesy pause between uploads; not a backpressure mechanism.
    pub sleep: Option<Duration>,
}

/// Sequential run loop: one candidate at a time, one photo at a time.
///
/// Per-item failures are counted and the loop moves on; only candidate-stream
/// failures (API pagination, bucket listing) abort the run.
pub async fn run<C, R, W>(
    candidates: &mut C,
    publisher: &Publisher<'_, R, W>,
    options: &RunOptions,
) -> Result<RunCounters>
where
    C: CandidateSource + Send,
    R: ObjectStore,
    W: ObjectStore,
{
    let mut counters = RunCounters::default();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );

    while let Some(candidate) = candidates.next_candidate().await? {
        counters.products += 1;
        spinner.set_message(format!("Processing product {}", candidate.id));

        for (index, source) in candidate.sources.iter().enumerate() {
            if options.only_first && index > 0 {
                break;
            }
            counters.total += 1;

            match publisher.publish(source).await {
                Ok(Outcome::Uploaded) => {
                    counters.uploaded += 1;
                    if counters.uploaded % PROGRESS_INTERVAL == 0 {
                        spinner.suspend(|| println!("{}", counters.progress_line()));
                    }
                    if let Some(delay) = options.sleep {
                        tokio::time::sleep(delay).await;
                    }
                }
                Ok(Outcome::Skipped) => counters.skipped += 1,
                Err(err) => {
                    counters.errors += 1;
                    spinner.suspend(|| eprintln!("❌ {}: {}", source.key, err));
                }
            }
        }
    }

    spinner.finish_and_clear();
    println!("{}", counters.summary());
    Ok(counters)
}
