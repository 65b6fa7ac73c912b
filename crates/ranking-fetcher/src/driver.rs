//! Run orchestration.
//!
//! Coordinates the entire fetch run: resolve the page range (discovery or
//! explicit override), traverse it per the configured mode, and route
//! successful payloads to the record sinks.

use crate::api::{PacingController, PageResult, RankingClient, RankingPage};
use crate::sink::RecordSink;
use anyhow::{bail, Context, Result};
use shared::DataPaths;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How pages are traversed and written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One page at a time into a single file, adaptively paced
    Sequential,
    /// Contiguous chunks processed in order, one part file each
    Partitioned { parts: u32 },
    /// Fixed-width worker pool into a single file
    Concurrent { workers: usize },
}

/// Per-invocation run options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Traversal mode
    pub mode: FetchMode,
    /// Inclusive page range override; set, it skips page-count discovery
    pub page_range: Option<(u32, u32)>,
    /// Single-file output override
    pub output: Option<PathBuf>,
    /// Sort worker-pool output by page number before writing
    pub sort_output: bool,
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    /// Pages in the resolved range
    pub total_pages: u32,
    /// Pages that produced records
    pub pages_fetched: usize,
    /// Pages the server reported absent
    pub pages_missing: usize,
    /// Pages skipped after exhausting retries
    pub pages_failed: usize,
    /// Records written across all output files
    pub records_written: usize,
}

/// Orchestrates a full fetch run
pub struct RankingDriver {
    client: RankingClient,
    pacing: PacingController,
    paths: DataPaths,
    options: RunOptions,
}

impl RankingDriver {
    /// Create a driver, validating the run options
    pub fn new(
        client: RankingClient,
        pacing: PacingController,
        paths: DataPaths,
        options: RunOptions,
    ) -> Result<Self> {
        if let Some((start, end)) = options.page_range {
            if start == 0 {
                bail!("start page must be at least 1");
            }
            if start > end {
                bail!("start page {} is after end page {}", start, end);
            }
        }

        match options.mode {
            FetchMode::Partitioned { parts: 0 } => bail!("part count must be at least 1"),
            FetchMode::Concurrent { workers: 0 } => bail!("worker count must be at least 1"),
            _ => {}
        }

        if options.output.is_some() && matches!(options.mode, FetchMode::Partitioned { .. }) {
            bail!("an explicit output path only applies to single-file modes");
        }

        Ok(Self {
            client,
            pacing,
            paths,
            options,
        })
    }

    /// Run the complete fetch process
    ///
    /// The only fatal fetch failure is page 1 during discovery: without it
    /// the total page count is unknown. Every other page failure is
    /// counted and skipped.
    pub async fn run(&mut self) -> Result<RunStats> {
        let mut stats = RunStats::default();

        let (first_payload, start, end) = match self.options.page_range {
            Some((start, end)) => {
                info!(start, end, "Using explicit page range, skipping discovery");
                (None, start, end)
            }
            None => {
                info!("Fetching page 1 to discover total page count");
                let payload = match self.client.fetch_page(1).await {
                    PageResult::Success(payload) => payload,
                    PageResult::NotFound => bail!("ranking endpoint reported page 1 as absent"),
                    PageResult::Failed(e) => {
                        return Err(e)
                            .context("Failed to fetch page 1, cannot determine page count")
                    }
                };
                let last_page = payload.last_page.max(1);
                info!(total_pages = last_page, "Resolved total page count");
                (Some(payload), 1, last_page)
            }
        };

        stats.total_pages = end - start + 1;

        std::fs::create_dir_all(self.paths.output_dir())
            .context("Failed to create output directory")?;

        match self.options.mode {
            FetchMode::Sequential => {
                self.run_sequential(first_payload, start, end, &mut stats)
                    .await?
            }
            FetchMode::Partitioned { parts } => {
                self.run_partitioned(first_payload, start, end, parts, &mut stats)
                    .await?
            }
            FetchMode::Concurrent { workers } => {
                self.run_concurrent(first_payload, start, end, workers, &mut stats)
                    .await?
            }
        }

        info!(
            total_pages = stats.total_pages,
            pages_fetched = stats.pages_fetched,
            pages_missing = stats.pages_missing,
            pages_failed = stats.pages_failed,
            records_written = stats.records_written,
            "Run complete"
        );

        Ok(stats)
    }

    /// Fetch pages one at a time into a single file
    async fn run_sequential(
        &mut self,
        first: Option<RankingPage>,
        start: u32,
        end: u32,
        stats: &mut RunStats,
    ) -> Result<()> {
        let path = self.single_output_path();
        info!(
            path = %path.display(),
            pages = format!("{}-{}", start, end),
            "Writing pages"
        );

        let mut sink = RecordSink::create(&path)?;

        let mut next = start;
        if let Some(payload) = first {
            stats.records_written += sink.append(&payload.data)?;
            stats.pages_fetched += 1;
            next += 1;
        }

        for page in next..=end {
            self.fetch_into(page, &mut sink, stats).await?;
            log_progress(page, start, end);
        }

        let written = sink.finish()?;
        debug!(path = %path.display(), lines = written, "Output file closed");

        Ok(())
    }

    /// Fetch contiguous chunks in order, each into its own part file
    async fn run_partitioned(
        &mut self,
        mut first: Option<RankingPage>,
        start: u32,
        end: u32,
        parts: u32,
        stats: &mut RunStats,
    ) -> Result<()> {
        let ranges = chunk_ranges(start, end, parts);

        for (idx, &(chunk_start, chunk_end)) in ranges.iter().enumerate() {
            let part = idx as u32 + 1;
            let path = self.paths.ranking_part_file(part);
            info!(
                part,
                pages = format!("{}-{}", chunk_start, chunk_end),
                path = %path.display(),
                "Writing chunk"
            );

            let mut sink = RecordSink::create(&path)?;

            let mut next = chunk_start;
            if chunk_start == start {
                // Discovery already fetched the range's first page
                if let Some(payload) = first.take() {
                    stats.records_written += sink.append(&payload.data)?;
                    stats.pages_fetched += 1;
                    next += 1;
                }
            }

            for page in next..=chunk_end {
                self.fetch_into(page, &mut sink, stats).await?;
                log_progress(page, start, end);
            }

            let written = sink.finish()?;
            debug!(part, lines = written, "Part file closed");
        }

        Ok(())
    }

    /// Release a fixed-width worker pool against the page range
    ///
    /// Results are collected in memory and written once the pool drains;
    /// file order is completion order unless `sort_output` is set.
    async fn run_concurrent(
        &mut self,
        first: Option<RankingPage>,
        start: u32,
        end: u32,
        workers: usize,
        stats: &mut RunStats,
    ) -> Result<()> {
        let mut collected: Vec<(u32, RankingPage)> = Vec::new();

        let mut next = start;
        if let Some(payload) = first {
            collected.push((start, payload));
            stats.pages_fetched += 1;
            next += 1;
        }

        let queue: Arc<Mutex<VecDeque<u32>>> = Arc::new(Mutex::new((next..=end).collect()));
        let remaining = queue.lock().unwrap().len();
        let workers = workers.min(remaining.max(1));

        info!(workers, pages = remaining, "Releasing worker pool");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::new();

        for worker_id in 0..workers {
            let client = self.client.clone();
            let queue = Arc::clone(&queue);
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let page = queue.lock().unwrap().pop_front();
                    let Some(page) = page else { break };

                    debug!(worker_id, page, "Worker picked up page");
                    let result = client.fetch_page(page).await;
                    if tx.send((page, result)).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        let mut done = 0usize;
        while let Some((page, result)) = rx.recv().await {
            done += 1;
            match result {
                PageResult::Success(payload) => {
                    collected.push((page, payload));
                    stats.pages_fetched += 1;
                }
                PageResult::NotFound => stats.pages_missing += 1,
                PageResult::Failed(_) => stats.pages_failed += 1,
            }

            if done % 25 == 0 || done == remaining {
                info!(
                    progress = format!("{}/{}", done, remaining),
                    "Pages completed"
                );
            }
        }

        // Drain the pool before writing
        for handle in handles {
            handle.await.context("Fetch worker panicked")?;
        }

        if self.options.sort_output {
            collected.sort_by_key(|&(page, _)| page);
        }

        let path = self.single_output_path();
        let mut sink = RecordSink::create(&path)?;
        for (_, payload) in &collected {
            stats.records_written += sink.append(&payload.data)?;
        }
        let written = sink.finish()?;
        info!(path = %path.display(), lines = written, "Output file written");

        Ok(())
    }

    /// Fetch one page, route its outcome, and pace the next request
    async fn fetch_into(
        &mut self,
        page: u32,
        sink: &mut RecordSink,
        stats: &mut RunStats,
    ) -> Result<()> {
        let started = Instant::now();
        let result = self.client.fetch_page(page).await;
        let elapsed = started.elapsed();

        match result {
            PageResult::Success(payload) => {
                stats.records_written += sink.append(&payload.data)?;
                stats.pages_fetched += 1;
                self.pacing.on_success();
            }
            PageResult::NotFound => {
                stats.pages_missing += 1;
                self.pacing.on_failure();
            }
            PageResult::Failed(_) => {
                stats.pages_failed += 1;
                self.pacing.on_failure();
            }
        }

        self.pacing.pause(elapsed).await;

        Ok(())
    }

    fn single_output_path(&self) -> PathBuf {
        self.options
            .output
            .clone()
            .unwrap_or_else(|| self.paths.ranking_file())
    }
}

/// Split `start..=end` into `parts` contiguous chunks
///
/// Integer division; the remainder is absorbed into the final chunk. The
/// part count is clamped to the range length so every chunk holds at
/// least one page.
pub fn chunk_ranges(start: u32, end: u32, parts: u32) -> Vec<(u32, u32)> {
    let total = end - start + 1;
    let parts = parts.clamp(1, total);
    let chunk = total / parts;

    (0..parts)
        .map(|i| {
            let chunk_start = start + i * chunk;
            let chunk_end = if i == parts - 1 {
                end
            } else {
                start + (i + 1) * chunk - 1
            };
            (chunk_start, chunk_end)
        })
        .collect()
}

fn log_progress(page: u32, start: u32, end: u32) {
    let done = page - start + 1;
    let total = end - start + 1;
    if done % 25 == 0 || page == end {
        info!(progress = format!("{}/{}", done, total), "Fetching pages");
    }
}
