//! # Round Engine End-to-End Flow
//!
//! Drives a real `RoundEngineService` through one full round: a fake pool
//! client hands it a single challenge, the real `FilesystemPlotReader` reads
//! an actual plot file from a temp directory, the real scalar verifier
//! computes deadlines, and a fake submitter records what gets sent. Only
//! the network-facing ports (pool polling, submission) are test doubles;
//! everything else is the production wiring a binary would use.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use round_engine::adapters::{EventBusProgressSink, FilesystemPlotReader};
    use round_engine::{
        CpuInstructionSet, MiningInfo, MiningRoundEngine, PlotDirConfig, PoolClient, ProcessorType,
        Result as EngineResult, RoundEngineConfig, RoundEngineService, SchedulingHintConfig, Submitter,
    };
    use shared_bus::{EventFilter, InMemoryEventBus, MiningEvent};
    use shared_types::{AccountId, Deadline};
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::timeout;

    const SCOOPS_PER_NONCE: u64 = 4096;
    const SCOOP_SIZE: u64 = 64;

    /// Hands out one challenge, then reports no further height advance so
    /// the poll loop idles quietly until the test stops the engine.
    struct OneShotPoolClient {
        info: MiningInfo,
        served: AtomicBool,
    }

    #[async_trait]
    impl PoolClient for OneShotPoolClient {
        async fn poll(&self) -> EngineResult<MiningInfo> {
            if self.served.swap(true, Ordering::AcqRel) {
                Ok(MiningInfo { height: 0, ..self.info.clone() })
            } else {
                Ok(self.info.clone())
            }
        }
    }

    /// Records every submitted deadline instead of sending it anywhere.
    #[derive(Default)]
    struct RecordingSubmitter {
        submitted: Mutex<Vec<(AccountId, u64, Deadline)>>,
    }

    #[async_trait]
    impl Submitter for RecordingSubmitter {
        async fn submit(&self, account_id: AccountId, height: u64, deadline: &Deadline) -> EngineResult<()> {
            self.submitted
                .lock()
                .unwrap()
                .push((account_id, height, deadline.clone()));
            Ok(())
        }
    }

    fn write_plot_file(dir: &std::path::Path, account_id: u64, nonces: u64) {
        let path = dir.join(format!("{account_id}_0_{nonces}_{nonces}"));
        let mut f = std::fs::File::create(&path).unwrap();
        // Deterministic, non-uniform filler so different nonces hash to
        // different deadlines instead of all colliding on zeroed input.
        let mut bytes = vec![0u8; (nonces * SCOOPS_PER_NONCE * SCOOP_SIZE) as usize];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i as u64).wrapping_mul(2654435761).to_le_bytes()[0];
        }
        f.write_all(&bytes).unwrap();
    }

    fn test_config(plot_dir: &std::path::Path) -> RoundEngineConfig {
        let mut config = RoundEngineConfig::default();
        config.plot_dirs.push(PlotDirConfig {
            path: plot_dir.to_path_buf(),
            hint: SchedulingHintConfig::Parallel,
        });
        config.processor_type = ProcessorType::Cpu;
        config.cpu_instruction_set = CpuInstructionSet::Scalar;
        config.max_buffer_size_bytes = 4 * 1024 * 1024;
        config.target_deadline = 0;
        config.mining_info_interval_ms = 20;
        config
    }

    #[tokio::test]
    async fn test_round_completes_and_submits_best_deadline() {
        let dir = std::env::temp_dir().join(format!(
            "poc-miner-tests-round-{:?}",
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        write_plot_file(&dir, 777, 4);

        let config = test_config(&dir);
        let pool_client = Arc::new(OneShotPoolClient {
            info: MiningInfo {
                height: 1,
                base_target: 18_325_193_796, // Signum genesis base target
                generation_signature: [9u8; 32],
                pool_target_deadline: 0,
            },
            served: AtomicBool::new(false),
        });
        let submitter = Arc::new(RecordingSubmitter::default());
        let plot_reader = Arc::new(FilesystemPlotReader::new(config.max_buffer_size_bytes).unwrap());
        let bus = Arc::new(InMemoryEventBus::new());
        let progress_sink = Arc::new(EventBusProgressSink::new(bus.clone()));
        let verifier = poc_verify::auto_detect(poc_verify::Backend::Scalar);

        let mut round_completed = bus.subscribe(EventFilter::all());

        let engine = Arc::new(RoundEngineService::new(
            config,
            pool_client,
            submitter.clone(),
            plot_reader,
            progress_sink,
            verifier,
        ));

        let run_engine = engine.clone();
        let run_handle = tokio::spawn(async move { run_engine.run().await });

        let mut saw_round_completed = false;
        while !saw_round_completed {
            let event = timeout(Duration::from_secs(5), round_completed.recv())
                .await
                .expect("timed out waiting for round to complete")
                .expect("event bus closed");
            if matches!(event, MiningEvent::RoundCompleted { .. }) {
                saw_round_completed = true;
            }
        }

        engine.stop().await.unwrap();
        let _ = timeout(Duration::from_secs(5), run_handle).await;

        let submitted = submitter.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1, "exactly one account's best deadline should be submitted");
        assert_eq!(submitted[0].0, 777);
        assert_eq!(submitted[0].1, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_status_reports_running_while_engine_is_active() {
        let dir = std::env::temp_dir().join(format!(
            "poc-miner-tests-status-{:?}",
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        write_plot_file(&dir, 42, 1);

        let config = test_config(&dir);
        let pool_client = Arc::new(OneShotPoolClient {
            info: MiningInfo {
                height: 1,
                base_target: 18_325_193_796,
                generation_signature: [1u8; 32],
                pool_target_deadline: 0,
            },
            served: AtomicBool::new(false),
        });
        let submitter = Arc::new(RecordingSubmitter::default());
        let plot_reader = Arc::new(FilesystemPlotReader::new(config.max_buffer_size_bytes).unwrap());
        let bus = Arc::new(InMemoryEventBus::new());
        let progress_sink = Arc::new(EventBusProgressSink::new(bus));
        let verifier = poc_verify::auto_detect(poc_verify::Backend::Scalar);

        let engine = Arc::new(RoundEngineService::new(
            config,
            pool_client,
            submitter,
            plot_reader,
            progress_sink,
            verifier,
        ));

        let run_engine = engine.clone();
        let run_handle = tokio::spawn(async move { run_engine.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let status = engine.status().await;
        assert!(status.running);

        engine.stop().await.unwrap();
        let _ = timeout(Duration::from_secs(5), run_handle).await;

        std::fs::remove_dir_all(&dir).unwrap();
    }

    /// One `Parallel` directory with 3 plot files plus one `Sequential`
    /// directory with 2 plot files should read as exactly 4 notifications:
    /// one per file in the parallel directory, one for the sequential
    /// directory's whole file list.
    #[tokio::test]
    async fn test_scheduling_hint_controls_read_notification_count() {
        let base = std::env::temp_dir().join(format!(
            "poc-miner-tests-hints-{:?}",
            std::thread::current().id()
        ));
        let parallel_dir = base.join("parallel");
        let sequential_dir = base.join("sequential");
        std::fs::create_dir_all(&parallel_dir).unwrap();
        std::fs::create_dir_all(&sequential_dir).unwrap();
        write_plot_file(&parallel_dir, 1, 1);
        write_plot_file(&parallel_dir, 2, 1);
        write_plot_file(&parallel_dir, 3, 1);
        write_plot_file(&sequential_dir, 4, 1);
        write_plot_file(&sequential_dir, 5, 1);

        let mut config = RoundEngineConfig::default();
        config.plot_dirs.push(PlotDirConfig {
            path: parallel_dir.clone(),
            hint: SchedulingHintConfig::Parallel,
        });
        config.plot_dirs.push(PlotDirConfig {
            path: sequential_dir.clone(),
            hint: SchedulingHintConfig::Sequential,
        });
        config.processor_type = ProcessorType::Cpu;
        config.cpu_instruction_set = CpuInstructionSet::Scalar;
        config.max_buffer_size_bytes = 4 * 1024 * 1024;
        config.target_deadline = 0;
        config.mining_info_interval_ms = 20;
        config.wake_up_time_ms = 0;

        let pool_client = Arc::new(OneShotPoolClient {
            info: MiningInfo {
                height: 1,
                base_target: 18_325_193_796,
                generation_signature: [3u8; 32],
                pool_target_deadline: 0,
            },
            served: AtomicBool::new(false),
        });
        let submitter = Arc::new(RecordingSubmitter::default());
        let plot_reader = Arc::new(FilesystemPlotReader::new(config.max_buffer_size_bytes).unwrap());
        let bus = Arc::new(InMemoryEventBus::new());
        let progress_sink = Arc::new(EventBusProgressSink::new(bus.clone()));
        let verifier = poc_verify::auto_detect(poc_verify::Backend::Scalar);

        let mut events = bus.subscribe(EventFilter::all());

        let engine = Arc::new(RoundEngineService::new(
            config,
            pool_client,
            submitter,
            plot_reader,
            progress_sink,
            verifier,
        ));

        let run_engine = engine.clone();
        let run_handle = tokio::spawn(async move { run_engine.run().await });

        let mut read_notifications = None;
        let mut progress_updates = 0u32;
        while read_notifications.is_none() || progress_updates < read_notifications.unwrap() {
            let event = timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out waiting for round events")
                .expect("event bus closed");
            match event {
                MiningEvent::RoundStarted { read_notifications: n, .. } => read_notifications = Some(n),
                MiningEvent::ProgressUpdated { .. } => progress_updates += 1,
                _ => {}
            }
        }

        assert_eq!(read_notifications, Some(4));
        assert_eq!(progress_updates, 4);

        engine.stop().await.unwrap();
        let _ = timeout(Duration::from_secs(5), run_handle).await;

        std::fs::remove_dir_all(&base).unwrap();
    }
}
