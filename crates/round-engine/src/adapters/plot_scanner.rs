//! Plot directory scanner: turns configured paths into the `PlotFile`/
//! `PlotDir` registrations the reader pool schedules against.
//!
//! Plot files follow the usual `<accountId>_<startNonce>_<nonces>_<stagger>`
//! naming convention. The stagger component is only meaningful for
//! conversion tooling; a miner only needs the account id and nonce count; the
//! nonce count in the filename is cross-checked against the file's actual
//! size and the filename wins only when they disagree by a sub-scoop rounding
//! difference.

use crate::config::{PlotDirConfig, SchedulingHintConfig};
use crate::error::{Result, RoundEngineError};
use shared_types::{AccountId, PlotDir, PlotFile, PocVersion, SchedulingHint, SCOOPS_PER_NONCE, SCOOP_SIZE};
use std::path::Path;

const BYTES_PER_NONCE: u64 = SCOOPS_PER_NONCE as u64 * SCOOP_SIZE as u64;

/// Scan every configured directory, building one [`PlotDir`] per entry.
///
/// `height` resolves which [`PocVersion`] newly-discovered files are
/// interpreted as; directories with no readable plot files are skipped with
/// a warning rather than failing the whole scan, so one bad path doesn't
/// block mining against the rest.
pub fn scan_all(dirs: &[PlotDirConfig], height: u64, poc2_start_block: u64) -> Vec<PlotDir> {
    let format_version = PocVersion::at_height(height, poc2_start_block);
    dirs.iter()
        .filter_map(|entry| match scan_one(&entry.path, entry.hint, format_version) {
            Ok(plot_dir) => Some(plot_dir),
            Err(e) => {
                tracing::warn!(path = %entry.path.display(), error = %e, "skipping unreadable plot directory");
                None
            }
        })
        .collect()
}

fn scan_one(path: &Path, hint: SchedulingHintConfig, format_version: PocVersion) -> Result<PlotDir> {
    let entries = std::fs::read_dir(path).map_err(|e| RoundEngineError::PlotDirectoryUnreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }
        match parse_plot_file(&file_path) {
            Some(mut plot) => {
                plot.format_version = format_version;
                files.push(plot);
            }
            None => tracing::debug!(path = %file_path.display(), "not a plot file, skipping"),
        }
    }

    if files.is_empty() {
        return Err(RoundEngineError::NoPlotFiles(path.display().to_string()));
    }

    Ok(PlotDir {
        files,
        related: Vec::new(),
        hint: match hint {
            SchedulingHintConfig::Sequential => SchedulingHint::Sequential,
            SchedulingHintConfig::Parallel => SchedulingHint::Parallel,
        },
    })
}

/// Parse a single plot file's name and on-disk size into a [`PlotFile`].
///
/// Returns `None` for anything that doesn't look like a plot file (wrong
/// number of `_`-separated components, non-numeric account id, zero size).
fn parse_plot_file(path: &Path) -> Option<PlotFile> {
    let name = path.file_name()?.to_str()?;
    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() < 3 {
        return None;
    }

    let account_id: AccountId = parts[0].parse().ok()?;
    let named_nonce_count: u64 = parts[2].parse().ok()?;

    let size_bytes = std::fs::metadata(path).ok()?.len();
    if size_bytes == 0 || size_bytes % BYTES_PER_NONCE != 0 {
        return None;
    }
    let nonce_count_from_size = size_bytes / BYTES_PER_NONCE;

    // Trust the filename when it's consistent with the file's actual size;
    // a partially-plotted or truncated file is sized by what's really there.
    let nonce_count = if named_nonce_count == nonce_count_from_size {
        named_nonce_count
    } else {
        nonce_count_from_size
    };

    Some(PlotFile {
        path: path.to_path_buf(),
        account_id,
        nonce_count,
        size_bytes,
        format_version: PocVersion::PoC2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_plot_file(dir: &Path, account_id: u64, nonces: u64) -> std::path::PathBuf {
        let path = dir.join(format!("{account_id}_0_{nonces}_{nonces}"));
        let mut f = std::fs::File::create(&path).unwrap();
        let bytes = vec![0u8; (nonces * BYTES_PER_NONCE) as usize];
        f.write_all(&bytes).unwrap();
        path
    }

    #[test]
    fn test_parse_plot_file_reads_account_and_nonce_count() {
        let dir = std::env::temp_dir().join(format!("round-engine-test-{:?}", std::thread::current().id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = write_plot_file(&dir, 12345, 2);
        let plot = parse_plot_file(&path).unwrap();
        assert_eq!(plot.account_id, 12345);
        assert_eq!(plot.nonce_count, 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_parse_plot_file_rejects_non_plot_names() {
        let dir = std::env::temp_dir();
        assert!(parse_plot_file(&dir.join("readme.txt")).is_none());
    }

    #[test]
    fn test_scan_one_reports_empty_directory() {
        let dir = std::env::temp_dir().join(format!("round-engine-test-empty-{:?}", std::thread::current().id()));
        std::fs::create_dir_all(&dir).unwrap();
        let result = scan_one(&dir, SchedulingHintConfig::Sequential, PocVersion::PoC2);
        assert!(result.is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_scan_one_finds_valid_plot_files() {
        let dir = std::env::temp_dir().join(format!("round-engine-test-valid-{:?}", std::thread::current().id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_plot_file(&dir, 1, 1);
        write_plot_file(&dir, 2, 3);
        let plot_dir = scan_one(&dir, SchedulingHintConfig::Parallel, PocVersion::PoC2).unwrap();
        assert_eq!(plot_dir.files.len(), 2);
        assert_eq!(plot_dir.hint, SchedulingHint::Parallel);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
