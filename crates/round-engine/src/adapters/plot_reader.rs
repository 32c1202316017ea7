//! Filesystem plot reader: reads one scoop slice per nonce from each plot
//! file in a directory, chunked to fit the shared memory budget. Each
//! chunk acquires a byte-sized permit from a shared `tokio::sync::Semaphore`
//! before it is allocated, so concurrent reads across every plot directory
//! never exceed the configured budget in aggregate, not just per-chunk.

use crate::domain::ReadBuffer;
use crate::error::{Result, RoundEngineError};
use crate::ports::outbound::{BudgetedReadBuffer, PlotReader};
use async_trait::async_trait;
use shared_types::{PlotDir, SCOOP_SIZE};
use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Reads plot files directly from disk using blocking I/O on a dedicated
/// thread, chunking each file's scoop slice to `chunk_nonce_count` nonces
/// at a time so no single read exceeds the configured memory budget.
pub struct FilesystemPlotReader {
    chunk_nonce_count: u64,
}

impl FilesystemPlotReader {
    /// Size a reader so a single chunk never exceeds `max_buffer_size_bytes`.
    pub fn new(max_buffer_size_bytes: usize) -> Result<Self> {
        let chunk_nonce_count = (max_buffer_size_bytes / SCOOP_SIZE) as u64;
        if chunk_nonce_count == 0 {
            return Err(RoundEngineError::BufferBudgetTooSmall {
                budget: max_buffer_size_bytes,
                minimum: SCOOP_SIZE,
            });
        }
        Ok(Self { chunk_nonce_count })
    }
}

#[async_trait]
impl PlotReader for FilesystemPlotReader {
    async fn read_scoop(
        &self,
        plot_dir: &PlotDir,
        scoop_index: u32,
        height: u64,
        current_height: &AtomicU64,
        memory_budget: &Arc<Semaphore>,
        mut on_chunk: Box<dyn FnMut(BudgetedReadBuffer) + Send>,
    ) -> Result<()> {
        for plot in &plot_dir.files {
            if current_height.load(Ordering::Acquire) > height {
                break;
            }

            let path = plot.path.clone();
            let mut file = match std::fs::File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable plot file");
                    continue;
                }
            };

            let mut nonce_start = 0u64;
            while nonce_start < plot.nonce_count {
                if current_height.load(Ordering::Acquire) > height {
                    break;
                }

                let nonce_count = self.chunk_nonce_count.min(plot.nonce_count - nonce_start);
                let chunk_bytes = (nonce_count as usize * SCOOP_SIZE) as u32;
                let permit = memory_budget
                    .clone()
                    .acquire_many_owned(chunk_bytes)
                    .await
                    .expect("memory budget semaphore never closed");
                let mut scoop_data = vec![0u8; nonce_count as usize * SCOOP_SIZE];

                let mut contiguous = true;
                match plot.format_version {
                    shared_types::PocVersion::PoC2 => {
                        // Scoop-major: the whole chunk is one contiguous region.
                        let offset = plot.scoop_offset(nonce_start, scoop_index);
                        if let Err(e) = file.seek(SeekFrom::Start(offset)) {
                            return Err(RoundEngineError::PlotDirectoryUnreadable {
                                path: path.display().to_string(),
                                reason: e.to_string(),
                            });
                        }
                        if let Err(e) = file.read_exact(&mut scoop_data) {
                            tracing::warn!(path = %path.display(), error = %e, "short read, skipping remainder of file");
                            break;
                        }
                    }
                    shared_types::PocVersion::PoC1 => {
                        contiguous = false;
                    }
                }

                if !contiguous {
                    let mut short_read = false;
                    for i in 0..nonce_count {
                        let offset = plot.scoop_offset(nonce_start + i, scoop_index);
                        if file.seek(SeekFrom::Start(offset)).is_err() {
                            short_read = true;
                            break;
                        }
                        let dest = &mut scoop_data[(i as usize) * SCOOP_SIZE..(i as usize + 1) * SCOOP_SIZE];
                        if file.read_exact(dest).is_err() {
                            short_read = true;
                            break;
                        }
                    }
                    if short_read {
                        tracing::warn!(path = %path.display(), "short read, skipping remainder of file");
                        break;
                    }
                }

                on_chunk(BudgetedReadBuffer::new(
                    ReadBuffer {
                        plot_path: path.clone(),
                        account_id: plot.account_id,
                        start_nonce: nonce_start,
                        nonce_count,
                        scoop_data,
                        height,
                    },
                    permit,
                ));

                nonce_start += nonce_count;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_sizing_rejects_too_small_budget() {
        assert!(FilesystemPlotReader::new(10).is_err());
    }

    #[test]
    fn test_chunk_sizing_accepts_one_scoop() {
        let reader = FilesystemPlotReader::new(SCOOP_SIZE).unwrap();
        assert_eq!(reader.chunk_nonce_count, 1);
    }
}
