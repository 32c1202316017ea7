//! Configuration types for the mining round engine

use serde::Deserialize;
use std::path::PathBuf;

/// Runtime configuration for a mining round engine instance.
///
/// Deserialized from the miner's YAML configuration file; every field maps
/// directly to a setting a Signum/Burstcoin-style miner exposes.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEngineConfig {
    /// Maximum bytes of read buffer memory in flight at once.
    pub max_buffer_size_bytes: usize,

    /// Maximum number of concurrent plot-file readers.
    pub max_plot_readers: usize,

    /// Mining intensity: number of verifier worker threads (0 = auto-detect).
    pub mining_intensity: usize,

    /// Preferred verifier backend.
    pub processor_type: ProcessorType,

    /// CPU SIMD instruction set to prefer when `processor_type` is `Cpu`.
    pub cpu_instruction_set: CpuInstructionSet,

    /// Primary pool mining-info URL.
    pub mining_info_url: String,

    /// Alternate pool URLs tried in order if the primary is unreachable.
    #[serde(default)]
    pub mining_info_alternates: Vec<String>,

    /// Polling interval for new mining info, in milliseconds.
    pub mining_info_interval_ms: u64,

    /// Delay after a new block is detected before scheduling reads, in
    /// milliseconds; lets a burst of identical notifications settle.
    pub wake_up_time_ms: u64,

    /// Hard cap on deadlines worth submitting, in seconds. 0 = unbounded.
    pub target_deadline: u64,

    /// Fraction of found deadlines to submit even when over target, used to
    /// probe pool behavior. 0.0 disables probing.
    pub submit_probability: f64,

    /// Multiplier applied to the pool's advertised target deadline to get
    /// this instance's effective target.
    pub target_deadline_factor: f64,

    /// Block height at which plot files switch from PoC1 to PoC2 layout.
    pub poc2_start_block: u64,

    /// Rescan plot directories for added/removed files every N blocks.
    /// 0 disables periodic rescanning.
    pub rescan_every_block: u64,

    /// Plot directories to scan for plot files.
    pub plot_dirs: Vec<PlotDirConfig>,
}

impl Default for RoundEngineConfig {
    fn default() -> Self {
        Self {
            max_buffer_size_bytes: crate::DEFAULT_MAX_BUFFER_SIZE_BYTES,
            max_plot_readers: num_cpus::get(),
            mining_intensity: 0,
            processor_type: ProcessorType::Cpu,
            cpu_instruction_set: CpuInstructionSet::Avx2,
            mining_info_url: "http://localhost:8124/burst".to_string(),
            mining_info_alternates: Vec::new(),
            mining_info_interval_ms: 1000,
            wake_up_time_ms: 50,
            target_deadline: 0,
            submit_probability: 0.0,
            target_deadline_factor: 1.0,
            poc2_start_block: crate::DEFAULT_POC2_START_BLOCK,
            rescan_every_block: 0,
            plot_dirs: Vec::new(),
        }
    }
}

/// A single configured plot directory and how it should be scheduled.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotDirConfig {
    /// Directory path.
    pub path: PathBuf,

    /// How files within this directory should be scheduled for reading.
    #[serde(default)]
    pub hint: SchedulingHintConfig,
}

/// Scheduling hint for a plot directory, mirroring
/// [`shared_types::SchedulingHint`] at the configuration boundary so the
/// config format doesn't depend on the domain crate's internal layout.
#[derive(Copy, Clone, Debug, Deserialize, Default, PartialEq, Eq)]
pub enum SchedulingHintConfig {
    /// Files on a spinning disk: read one at a time in sequence.
    #[default]
    #[serde(rename = "sequential", alias = "hdd")]
    Sequential,
    /// Files on flash storage: read concurrently.
    #[serde(rename = "parallel", alias = "ssd")]
    Parallel,
}

/// Verifier backend selection.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorType {
    /// Scalar or SIMD CPU verification.
    Cpu,
    /// OpenCL GPU verification.
    Gpu,
}

/// CPU SIMD instruction set preference.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CpuInstructionSet {
    /// No SIMD, portable scalar path.
    Scalar,
    /// SSE2 (x86_64 baseline).
    Sse2,
    /// AVX2.
    Avx2,
    /// NEON (aarch64).
    Neon,
}

impl RoundEngineConfig {
    /// Validate cross-field invariants that `serde` alone cannot express.
    pub fn validate(&self) -> Result<(), crate::error::RoundEngineError> {
        use crate::error::RoundEngineError;

        if self.plot_dirs.is_empty() {
            return Err(RoundEngineError::InvalidConfig(
                "at least one plot directory must be configured".to_string(),
            ));
        }
        if self.mining_info_url.is_empty() {
            return Err(RoundEngineError::InvalidConfig(
                "miningInfoUrl must not be empty".to_string(),
            ));
        }
        if self.max_plot_readers == 0 {
            return Err(RoundEngineError::InvalidConfig(
                "maxPlotReaders must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.submit_probability) {
            return Err(RoundEngineError::InvalidConfig(
                "submitProbability must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.target_deadline_factor <= 0.0 {
            return Err(RoundEngineError::InvalidConfig(
                "targetDLFactor must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// All configured pool URLs in failover order, primary first.
    pub fn pool_urls(&self) -> Vec<&str> {
        std::iter::once(self.mining_info_url.as_str())
            .chain(self.mining_info_alternates.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_invalid_without_plot_dirs() {
        let config = RoundEngineConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_config() {
        let mut config = RoundEngineConfig::default();
        config.plot_dirs.push(PlotDirConfig {
            path: PathBuf::from("/plots"),
            hint: SchedulingHintConfig::Sequential,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pool_urls_failover_order() {
        let mut config = RoundEngineConfig::default();
        config.mining_info_alternates = vec!["http://b".to_string(), "http://c".to_string()];
        let urls = config.pool_urls();
        assert_eq!(urls, vec!["http://localhost:8124/burst", "http://b", "http://c"]);
    }

    #[test]
    fn test_submit_probability_out_of_range_rejected() {
        let mut config = RoundEngineConfig::default();
        config.plot_dirs.push(PlotDirConfig {
            path: PathBuf::from("/plots"),
            hint: SchedulingHintConfig::Parallel,
        });
        config.submit_probability = 1.5;
        assert!(config.validate().is_err());
    }
}
