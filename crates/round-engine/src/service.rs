//! Concrete mining round engine implementation.
//!
//! Orchestrates the pool poll loop, the plot-reader pool, the verifier
//! pool, the deadline arbiter, and the submitter. The poll loop never
//! awaits a round to completion: each round runs as its own spawned task
//! against a clone of the shared [`RoundState`], so a height change can be
//! observed, and the next round started, while the previous round's reads
//! and verifies are still in flight. Cancellation of the stale round is
//! logical, not forced: `current_height` is advanced before the new round
//! is spawned, and the plot reader checks it at every chunk boundary,
//! abandoning the remainder of a file once it sees a newer height.

use crate::config::RoundEngineConfig;
use crate::domain::{AdmissionOutcome, DeadlineArbiter, RejectionReason, TargetDeadlinePolicy};
use crate::error::{Result, RoundEngineError};
use crate::metrics::RoundMetrics;
use crate::ports::inbound::{EngineStatus, MiningRoundEngine};
use crate::ports::outbound::{BudgetedReadBuffer, PlotReader, PoolClient, ProgressSink, Submitter};
use async_trait::async_trait;
use shared_bus::MiningEvent;
use shared_types::{Deadline, DeadlineStatus, NonceConfirmation, PlotDir, SchedulingHint};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (done as f64 / total as f64).min(1.0)
    }
}

/// Everything a single in-flight round needs, shared between the poll loop
/// and whichever round tasks it has spawned. Held behind an `Arc` so a new
/// round can start without waiting for the previous one's task to join.
struct RoundState {
    config: RwLock<RoundEngineConfig>,
    pool_client: Arc<dyn PoolClient>,
    submitter: Arc<dyn Submitter>,
    plot_reader: Arc<dyn PlotReader>,
    progress_sink: Arc<dyn ProgressSink>,
    verifier: Arc<dyn poc_verify::VerifierEngine>,

    arbiter: Arc<DeadlineArbiter>,
    plot_dirs: RwLock<Vec<PlotDir>>,
    memory_budget: Arc<tokio::sync::Semaphore>,

    metrics: Arc<RoundMetrics>,
    current_height: Arc<AtomicU64>,

    mining_intensity: AtomicUsize,
    max_plot_readers: AtomicUsize,
    max_buffer_size: AtomicUsize,

    round_total_bytes: AtomicU64,
    round_bytes_read: AtomicU64,
    round_total_nonces: AtomicU64,
    round_nonces_verified: AtomicU64,
}

/// Wires the outbound ports together into a running mining round engine.
pub struct RoundEngineService {
    state: Arc<RoundState>,
    running: AtomicBool,
    stop_requested: Arc<AtomicBool>,
    restart_requested: AtomicBool,
    current_round: Mutex<Option<JoinHandle<()>>>,
}

impl RoundEngineService {
    /// Assemble a service from its outbound adapters and static config.
    pub fn new(
        config: RoundEngineConfig,
        pool_client: Arc<dyn PoolClient>,
        submitter: Arc<dyn Submitter>,
        plot_reader: Arc<dyn PlotReader>,
        progress_sink: Arc<dyn ProgressSink>,
        verifier: Arc<dyn poc_verify::VerifierEngine>,
    ) -> Self {
        info!("[round-engine] initializing mining round engine");
        info!("  max_plot_readers: {}", config.max_plot_readers);
        info!("  mining_intensity: {}", config.mining_intensity);
        info!("  processor_type: {:?}", config.processor_type);
        info!("  verifier backend: {}", verifier.backend());

        let mining_intensity = if config.mining_intensity == 0 {
            num_cpus::get()
        } else {
            config.mining_intensity
        };
        let memory_budget = Arc::new(tokio::sync::Semaphore::new(config.max_buffer_size_bytes));

        let state = RoundState {
            mining_intensity: AtomicUsize::new(mining_intensity),
            max_plot_readers: AtomicUsize::new(config.max_plot_readers),
            max_buffer_size: AtomicUsize::new(config.max_buffer_size_bytes),
            config: RwLock::new(config),
            pool_client,
            submitter,
            plot_reader,
            progress_sink,
            verifier,
            arbiter: Arc::new(DeadlineArbiter::new()),
            plot_dirs: RwLock::new(Vec::new()),
            memory_budget,
            metrics: Arc::new(RoundMetrics::new()),
            current_height: Arc::new(AtomicU64::new(0)),
            round_total_bytes: AtomicU64::new(0),
            round_bytes_read: AtomicU64::new(0),
            round_total_nonces: AtomicU64::new(0),
            round_nonces_verified: AtomicU64::new(0),
        };

        Self {
            state: Arc::new(state),
            running: AtomicBool::new(false),
            stop_requested: Arc::new(AtomicBool::new(false)),
            restart_requested: AtomicBool::new(false),
            current_round: Mutex::new(None),
        }
    }

    /// Metrics handle, for a CLI `status`/telemetry adapter to read from.
    pub fn metrics(&self) -> Arc<RoundMetrics> {
        self.state.metrics.clone()
    }

    /// Whether the caller should re-invoke `run()` after this `stop()`.
    pub fn restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::Acquire)
    }
}

impl RoundState {
    async fn run_round(
        self: Arc<Self>,
        height: u64,
        base_target: u64,
        generation_signature: [u8; 32],
        pool_target_deadline: u64,
    ) {
        let round_start = Instant::now();
        let plot_dirs = self.plot_dirs.read().expect("plot_dirs lock poisoned").clone();

        let total_plot_bytes: u64 = plot_dirs.iter().map(PlotDir::total_size_bytes).sum();
        let (target_deadline, target_deadline_factor, submit_probability) = {
            let config = self.config.read().expect("config lock poisoned");
            (config.target_deadline, config.target_deadline_factor, config.submit_probability)
        };
        let policy = TargetDeadlinePolicy::new(target_deadline, target_deadline_factor, submit_probability);
        let effective_target = policy.effective_target(base_target, pool_target_deadline, total_plot_bytes);

        self.current_height.store(height, Ordering::Release);
        self.arbiter.start_round(height, effective_target);
        self.round_total_bytes.store(total_plot_bytes, Ordering::Release);
        self.round_bytes_read.store(0, Ordering::Release);
        self.round_total_nonces
            .store(total_plot_bytes / shared_types::SCOOP_SIZE as u64, Ordering::Release);
        self.round_nonces_verified.store(0, Ordering::Release);

        let scoop = shared_types::Challenge::derive_scoop(&generation_signature, height);

        // Parallel directories schedule one work item per file (one read
        // notification each); Sequential directories schedule one work item
        // for the whole file list (one read notification covering all of
        // it), matching how the files were meant to be read off disk.
        let work_items: Vec<PlotDir> = plot_dirs
            .iter()
            .flat_map(|plot_dir| match plot_dir.hint {
                SchedulingHint::Parallel => plot_dir
                    .files
                    .iter()
                    .map(|file| PlotDir {
                        files: vec![file.clone()],
                        related: plot_dir.related.clone(),
                        hint: SchedulingHint::Parallel,
                    })
                    .collect::<Vec<_>>(),
                SchedulingHint::Sequential => vec![plot_dir.clone()],
            })
            .collect();

        self.progress_sink
            .publish(MiningEvent::RoundStarted {
                height,
                effective_target,
                read_notifications: work_items.len() as u32,
            })
            .await;

        let reader_permits = self.max_plot_readers.load(Ordering::Relaxed).max(1);
        let dir_semaphore = Arc::new(tokio::sync::Semaphore::new(reader_permits));

        let dir_futures = work_items.iter().map(|plot_dir| {
            let dir_semaphore = dir_semaphore.clone();
            let state = &self;
            async move {
                let _permit = dir_semaphore.acquire().await.expect("semaphore never closed");
                state
                    .read_and_verify_dir(plot_dir, scoop, height, generation_signature, base_target)
                    .await;
            }
        });
        futures::future::join_all(dir_futures).await;

        let best_deadline = self.arbiter.overall_best();
        let duration_ms = round_start.elapsed().as_millis() as u64;
        self.metrics.record_round_completed();

        self.progress_sink
            .publish(MiningEvent::RoundCompleted {
                height,
                duration_ms,
                best_deadline,
            })
            .await;

        info!(height, duration_ms, ?best_deadline, "round completed");
    }

    async fn read_and_verify_dir(
        &self,
        plot_dir: &PlotDir,
        scoop: u32,
        height: u64,
        generation_signature: [u8; 32],
        base_target: u64,
    ) {
        let queue_depth = self.max_plot_readers.load(Ordering::Relaxed).max(1) * 4;
        let (tx, rx) = crossbeam_channel::bounded::<BudgetedReadBuffer>(queue_depth);

        let read_started = Instant::now();
        let read_result = self
            .plot_reader
            .read_scoop(
                plot_dir,
                scoop,
                height,
                &self.current_height,
                &self.memory_budget,
                Box::new(move |chunk: BudgetedReadBuffer| {
                    let _ = tx.send(chunk);
                }),
            )
            .await;
        let read_duration_ms = read_started.elapsed().as_millis() as u64;

        if let Err(e) = read_result {
            warn!(error = %e, "plot directory read failed");
        }

        while let Ok(chunk) = rx.recv() {
            let bytes = chunk.buffer.size_bytes() as u64;
            self.metrics.record_read(bytes, read_duration_ms);
            self.round_bytes_read.fetch_add(bytes, Ordering::AcqRel);
            self.verify_and_admit(chunk, generation_signature, base_target).await;
        }

        self.progress_sink
            .publish(MiningEvent::ProgressUpdated {
                height,
                read_fraction: fraction(self.round_bytes_read.load(Ordering::Acquire), self.round_total_bytes.load(Ordering::Acquire)),
                verify_fraction: fraction(
                    self.round_nonces_verified.load(Ordering::Acquire),
                    self.round_total_nonces.load(Ordering::Acquire),
                ),
                read_mib_per_s: self.metrics.read_mib_per_s(),
                verify_mib_per_s: self.metrics.verify_mib_per_s(),
            })
            .await;
    }

    /// Verify one chunk and admit its best nonce. Holds `chunk`, and with
    /// it the memory-budget permit its bytes were acquired against, until
    /// verification has actually consumed the bytes.
    async fn verify_and_admit(&self, chunk: BudgetedReadBuffer, generation_signature: [u8; 32], base_target: u64) {
        let verifier = self.verifier.clone();
        let buffer = chunk.buffer;
        let scoop_data = buffer.scoop_data;
        let start_nonce = buffer.start_nonce;
        let nonce_count = buffer.nonce_count;
        let account_id = buffer.account_id;
        let buffer_height = buffer.height;
        let plot_path = buffer.plot_path;

        let verify_started = Instant::now();
        let verify_result = tokio::task::spawn_blocking(move || {
            let request = poc_verify::VerifyRequest {
                generation_signature: &generation_signature,
                scoop_data: &scoop_data,
                start_nonce,
                count: nonce_count,
                base_target,
            };
            verifier.verify_chunk(&request)
        })
        .await;
        self.metrics
            .record_verify(nonce_count, verify_started.elapsed().as_millis() as u64);
        self.round_nonces_verified.fetch_add(nonce_count, Ordering::AcqRel);

        let result = match verify_result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(error = %e, "verifier backend failed");
                return;
            }
            Err(e) => {
                error!(error = %e, "verifier task panicked");
                return;
            }
        };

        let candidate = Deadline {
            nonce: result.best_nonce,
            value: result.best_deadline,
            account_id,
            height: buffer_height,
            plot_path,
            worker_label: self.verifier.backend().to_string(),
            status: DeadlineStatus::Found,
        };
        self.admit_and_submit(candidate).await;
    }

    async fn admit_and_submit(&self, candidate: Deadline) {
        let account_id = candidate.account_id;
        let height = candidate.height;

        match self.arbiter.add_deadline(candidate.clone()) {
            Ok(AdmissionOutcome::Admitted { deadline, status }) => {
                self.metrics.record_deadline_found();
                self.progress_sink
                    .publish(MiningEvent::DeadlineFound {
                        account_id,
                        height,
                        deadline,
                        status,
                    })
                    .await;

                if status != DeadlineStatus::TooHigh {
                    self.arbiter.record_sent(account_id, deadline);
                    self.metrics.record_deadline_submitted();
                    self.progress_sink
                        .publish(MiningEvent::DeadlineSubmitted { account_id, height, deadline })
                        .await;

                    let submitter = self.submitter.clone();
                    let progress_sink = self.progress_sink.clone();
                    let arbiter = self.arbiter.clone();
                    let metrics = self.metrics.clone();
                    let candidate = candidate.clone();
                    tokio::spawn(async move {
                        match submitter.submit(account_id, height, &candidate).await {
                            Ok(()) => {
                                arbiter.record_confirmed(account_id, deadline);
                                metrics.record_deadline_confirmed();
                                progress_sink
                                    .publish(MiningEvent::DeadlineConfirmed { account_id, height, deadline })
                                    .await;
                            }
                            Err(e) => {
                                metrics.record_submission_failed();
                                progress_sink
                                    .publish(MiningEvent::SubmissionFailed {
                                        account_id,
                                        height,
                                        reason: e.to_string(),
                                    })
                                    .await;
                            }
                        }
                    });
                }
            }
            Ok(AdmissionOutcome::Rejected(RejectionReason::NotAnImprovement)) => {
                // Silent drop, per the admission rule: not a NonceConfirmation.
            }
            Err(reason @ NonceConfirmation::WrongBlock { .. }) => {
                self.progress_sink
                    .publish(MiningEvent::DeadlineRejected { account_id, reason })
                    .await;
            }
            Err(reason) => {
                self.progress_sink
                    .publish(MiningEvent::DeadlineRejected { account_id, reason })
                    .await;
            }
        }
    }
}

#[async_trait]
impl MiningRoundEngine for RoundEngineService {
    async fn run(&self) -> Result<()> {
        {
            let config = self.state.config.read().expect("config lock poisoned");
            config.validate()?;
        }

        self.running.store(true, Ordering::Release);
        self.stop_requested.store(false, Ordering::Release);
        info!("[round-engine] starting mining round engine");

        if self.state.plot_dirs.read().expect("plot_dirs lock poisoned").is_empty() {
            self.rescan_plotfiles().await?;
        }

        let (interval_ms, rescan_every_block, wake_up_time_ms) = {
            let config = self.state.config.read().expect("config lock poisoned");
            (config.mining_info_interval_ms, config.rescan_every_block, config.wake_up_time_ms)
        };
        let mut consecutive_failures = 0u32;

        while !self.stop_requested.load(Ordering::Acquire) {
            match self.state.pool_client.poll().await {
                Ok(info) => {
                    consecutive_failures = 0;
                    if info.height > self.state.current_height.load(Ordering::Acquire) {
                        if wake_up_time_ms > 0 {
                            // Let a burst of identical notifications for the
                            // same height settle before committing to a round.
                            tokio::time::sleep(Duration::from_millis(wake_up_time_ms)).await;
                        }

                        if rescan_every_block > 0 && info.height % rescan_every_block == 0 {
                            if let Err(e) = self.rescan_plotfiles().await {
                                warn!(error = %e, "periodic plot rescan failed");
                            }
                        }

                        // Advance current_height immediately so the previous
                        // round's reader sees the new height at its next chunk
                        // boundary and abandons the rest of its work on its
                        // own, instead of this loop waiting for it to finish.
                        self.state.current_height.store(info.height, Ordering::Release);

                        let state = self.state.clone();
                        let handle = tokio::spawn(async move {
                            state
                                .run_round(info.height, info.base_target, info.generation_signature, info.pool_target_deadline)
                                .await;
                        });
                        *self.current_round.lock().expect("current_round lock poisoned") = Some(handle);
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    debug!(error = %e, consecutive_failures, "mining info poll failed");
                    if consecutive_failures >= 5 {
                        error!("[round-engine] five consecutive pool poll failures");
                        self.state
                            .progress_sink
                            .publish(MiningEvent::PollFailure { consecutive_failures })
                            .await;
                        consecutive_failures = 0;
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }

        self.running.store(false, Ordering::Release);
        info!("[round-engine] mining round engine stopped");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::Release);
        if let Some(handle) = self.current_round.lock().expect("current_round lock poisoned").take() {
            handle.abort();
        }
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        self.restart_requested.store(true, Ordering::Release);
        self.stop().await
    }

    async fn set_mining_intensity(&self, intensity: usize) -> Result<()> {
        self.state.mining_intensity.store(intensity.max(1), Ordering::Release);
        Ok(())
    }

    async fn set_max_plot_reader(&self, max_readers: usize) -> Result<()> {
        if max_readers == 0 {
            return Err(RoundEngineError::InvalidConfig("maxPlotReaders must be at least 1".to_string()));
        }
        self.state.max_plot_readers.store(max_readers, Ordering::Release);
        Ok(())
    }

    async fn set_max_buffer_size(&self, max_bytes: usize) -> Result<()> {
        self.state.max_buffer_size.store(max_bytes, Ordering::Release);
        Ok(())
    }

    async fn rescan_plotfiles(&self) -> Result<()> {
        let (plot_dir_configs, poc2_start_block) = {
            let config = self.state.config.read().expect("config lock poisoned");
            (config.plot_dirs.clone(), config.poc2_start_block)
        };
        let height = self.state.current_height.load(Ordering::Acquire);

        let scanned = crate::adapters::plot_scanner::scan_all(&plot_dir_configs, height, poc2_start_block);
        let file_count: usize = scanned.iter().map(|d| d.files.len()).sum();
        info!(directories = scanned.len(), files = file_count, "rescanned plot directories");

        *self.state.plot_dirs.write().expect("plot_dirs lock poisoned") = scanned;
        Ok(())
    }

    async fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.running.load(Ordering::Acquire),
            current_height: Some(self.state.current_height.load(Ordering::Acquire)).filter(|h| *h > 0),
            read_fraction: fraction(
                self.state.round_bytes_read.load(Ordering::Acquire),
                self.state.round_total_bytes.load(Ordering::Acquire),
            ),
            verify_fraction: fraction(
                self.state.round_nonces_verified.load(Ordering::Acquire),
                self.state.round_total_nonces.load(Ordering::Acquire),
            ),
            best_deadline_this_round: self.state.arbiter.overall_best(),
        }
    }
}
