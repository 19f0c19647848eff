//! Node log export chunking.
//!
//! Log exports are too large for one frame, so the BLE side splits them into
//! [`NodeLogChunkPayload`]s and the cellular side reassembles them per job.

use crate::payload::NodeLogChunkPayload;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

/// Default raw bytes per log chunk (before base64)
pub const DEFAULT_LOG_CHUNK_SIZE: usize = 512;

/// Largest chunk count a reassembler accepts for one job
pub const MAX_LOG_CHUNKS: u32 = 4096;

/// Jobs a reassembler tracks at once
pub const MAX_PENDING_LOG_JOBS: usize = 8;

/// Log reassembly errors
#[derive(Error, Debug)]
pub enum ChunkError {
    /// Chunk data is not valid base64
    #[error("chunk {index} of job {job_id} has invalid data: {source}")]
    Data {
        job_id: String,
        index: u32,
        #[source]
        source: base64::DecodeError,
    },

    /// Chunk index outside the announced total
    #[error("chunk {index} out of range for job {job_id} ({total} chunks)")]
    OutOfRange { job_id: String, index: u32, total: u32 },

    /// Chunk disagrees with earlier chunks about the total count
    #[error("job {job_id} announced {expected} chunks, got chunk claiming {actual}")]
    TotalMismatch {
        job_id: String,
        expected: u32,
        actual: u32,
    },

    /// Chunk announces more chunks than the reassembler accepts
    #[error("job {job_id} announced {total} chunks, limit is {limit}")]
    TooManyChunks { job_id: String, total: u32, limit: u32 },

    /// A new job arrived while the pending-job limit is reached
    #[error("cannot start job {job_id}: {limit} jobs already pending")]
    TooManyJobs { job_id: String, limit: usize },
}

/// Splits a node log into chunk payloads
#[derive(Debug, Clone)]
pub struct LogChunker {
    chunk_size: usize,
}

impl LogChunker {
    /// Create a chunker with [`DEFAULT_LOG_CHUNK_SIZE`]
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_LOG_CHUNK_SIZE,
        }
    }

    /// Create a chunker with a custom chunk size (at least one byte)
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Split `log` into chunks for a pull-logs job.
    ///
    /// Only the most recent `max_bytes` of the log are exported. An empty log still
    /// produces one empty, complete chunk so the requester learns the job finished.
    pub fn chunk_log(
        &self,
        job_id: &str,
        node_id: &str,
        log: &[u8],
        max_bytes: u32,
    ) -> Vec<NodeLogChunkPayload> {
        let keep = log.len().min(max_bytes as usize);
        let tail = &log[log.len() - keep..];

        if tail.is_empty() {
            return vec![NodeLogChunkPayload::new(job_id, node_id, 0, 1, &[])];
        }

        let total = tail.len().div_ceil(self.chunk_size) as u32;
        tail.chunks(self.chunk_size)
            .enumerate()
            .map(|(i, part)| NodeLogChunkPayload::new(job_id, node_id, i as u32, total, part))
            .collect()
    }
}

impl Default for LogChunker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct PendingLog {
    total: u32,
    chunks: BTreeMap<u32, Vec<u8>>,
}

/// Collects log chunks per job until every chunk has arrived.
///
/// Both the chunk count per job and the number of concurrent jobs are bounded, since
/// the totals come from the peer.
#[derive(Debug)]
pub struct LogReassembler {
    jobs: HashMap<String, PendingLog>,
    max_chunks: u32,
    max_jobs: usize,
}

impl LogReassembler {
    /// Create a reassembler with [`MAX_LOG_CHUNKS`] and [`MAX_PENDING_LOG_JOBS`]
    pub fn new() -> Self {
        Self::with_limits(MAX_LOG_CHUNKS, MAX_PENDING_LOG_JOBS)
    }

    /// Create a reassembler with custom limits
    pub fn with_limits(max_chunks: u32, max_jobs: usize) -> Self {
        Self {
            jobs: HashMap::new(),
            max_chunks,
            max_jobs,
        }
    }

    /// Add a chunk and return the complete log once all chunks for the job are present.
    ///
    /// Chunks may arrive in any order; a repeated index replaces the earlier copy.
    pub fn add_chunk(&mut self, chunk: &NodeLogChunkPayload) -> Result<Option<Vec<u8>>, ChunkError> {
        if chunk.total_chunks == 0 || chunk.chunk_index >= chunk.total_chunks {
            return Err(ChunkError::OutOfRange {
                job_id: chunk.job_id.clone(),
                index: chunk.chunk_index,
                total: chunk.total_chunks,
            });
        }

        if chunk.total_chunks > self.max_chunks {
            return Err(ChunkError::TooManyChunks {
                job_id: chunk.job_id.clone(),
                total: chunk.total_chunks,
                limit: self.max_chunks,
            });
        }

        if !self.jobs.contains_key(&chunk.job_id) && self.jobs.len() >= self.max_jobs {
            return Err(ChunkError::TooManyJobs {
                job_id: chunk.job_id.clone(),
                limit: self.max_jobs,
            });
        }

        let data = chunk.decode_data().map_err(|source| ChunkError::Data {
            job_id: chunk.job_id.clone(),
            index: chunk.chunk_index,
            source,
        })?;

        let pending = self
            .jobs
            .entry(chunk.job_id.clone())
            .or_insert_with(|| PendingLog {
                total: chunk.total_chunks,
                chunks: BTreeMap::new(),
            });

        if pending.total != chunk.total_chunks {
            return Err(ChunkError::TotalMismatch {
                job_id: chunk.job_id.clone(),
                expected: pending.total,
                actual: chunk.total_chunks,
            });
        }

        pending.chunks.insert(chunk.chunk_index, data);
        debug!(
            "Job {}: {}/{} log chunks received",
            chunk.job_id,
            pending.chunks.len(),
            pending.total
        );

        if pending.chunks.len() < pending.total as usize {
            return Ok(None);
        }

        let log: Vec<u8> = self
            .jobs
            .remove(&chunk.job_id)
            .map(|done| done.chunks.into_values().flatten().collect())
            .unwrap_or_default();
        Ok(Some(log))
    }

    /// Jobs with chunks still outstanding
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Drop partial state for a job (e.g. after its timeout)
    pub fn discard(&mut self, job_id: &str) -> bool {
        self.jobs.remove(job_id).is_some()
    }
}

impl Default for LogReassembler {
    fn default() -> Self {
        Self::new()
    }
}
