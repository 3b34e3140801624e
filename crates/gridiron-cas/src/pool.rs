//! Chunk decode worker pool.
//!
//! A fixed set of named threads takes decode jobs from a bounded queue and
//! answers on a response channel. Jobs own their chunk, so workers share
//! nothing. Inside a job, blocks are decompressed on the rayon pool.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::chunk::Chunk;
use crate::decode::{decode_chunk, ResourceRecord};
use crate::{Error, Result};

/// One unit of work: a chunk and the container it came from.
#[derive(Debug)]
pub struct DecodeJob {
    pub sequence: u64,
    pub chunk: Chunk,
    pub relative_path: Arc<str>,
}

struct DecodeOutcome {
    sequence: u64,
    record: Option<ResourceRecord>,
}

/// Bounded pool of chunk decode workers.
///
/// ```no_run
/// use std::sync::Arc;
/// use gridiron_cas::{CasBlockReader, DecodePool};
///
/// let mut pool = DecodePool::new(4, 16)?;
/// let file: Arc<str> = Arc::from("Data/Win32/superbundlelayout/pkg_00/cas_01.cas");
/// for chunk in CasBlockReader::open("cas_01.cas")?.chunks() {
///     pool.submit(chunk?, file.clone())?;
/// }
/// let records: Vec<_> = pool.finish()?.into_iter().flatten().collect();
/// # Ok::<(), gridiron_cas::Error>(())
/// ```
pub struct DecodePool {
    requests: Option<Sender<DecodeJob>>,
    responses: Receiver<DecodeOutcome>,
    workers: Vec<JoinHandle<()>>,
    submitted: u64,
}

impl DecodePool {
    /// Spawn `workers` threads behind a queue holding up to `queue_depth` jobs.
    pub fn new(workers: usize, queue_depth: usize) -> Result<Self> {
        let workers = workers.max(1);
        let (request_tx, request_rx) = bounded::<DecodeJob>(queue_depth.max(1));
        let (response_tx, response_rx) = unbounded();

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let requests = request_rx.clone();
            let responses = response_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("gridiron-decode-{id}"))
                .spawn(move || worker_loop(requests, responses))?;
            handles.push(handle);
        }
        debug!(workers, queue_depth, "decode pool started");

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            workers: handles,
            submitted: 0,
        })
    }

    /// Queue a chunk. Blocks while the queue is full.
    pub fn submit(&mut self, chunk: Chunk, relative_path: Arc<str>) -> Result<()> {
        let requests = self.requests.as_ref().ok_or(Error::PoolClosed)?;
        let job = DecodeJob {
            sequence: self.submitted,
            chunk,
            relative_path,
        };
        requests.send(job).map_err(|_| Error::PoolClosed)?;
        self.submitted += 1;
        Ok(())
    }

    /// Jobs submitted so far.
    #[inline]
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Wait for every job and return the outcomes in submission order.
    pub fn finish(mut self) -> Result<Vec<Option<ResourceRecord>>> {
        self.shutdown();

        let mut outcomes: Vec<DecodeOutcome> = self.responses.try_iter().collect();
        let submitted = self.submitted as usize;
        if outcomes.len() < submitted {
            return Err(Error::WorkerLost {
                missing: submitted - outcomes.len(),
                submitted,
            });
        }

        outcomes.sort_unstable_by_key(|o| o.sequence);
        debug!(jobs = submitted, "decode pool finished");
        Ok(outcomes.into_iter().map(|o| o.record).collect())
    }

    /// Close the queue and join the workers.
    fn shutdown(&mut self) {
        self.requests.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("decode worker panicked");
            }
        }
    }
}

impl Drop for DecodePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(requests: Receiver<DecodeJob>, responses: Sender<DecodeOutcome>) {
    for job in requests {
        let record = decode_chunk(&job.chunk, &job.relative_path);
        let outcome = DecodeOutcome {
            sequence: job.sequence,
            record,
        };
        if responses.send(outcome).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{parse_blocks, CasBlockReader};
    use crate::BlockWriter;
    use gridiron_common::FbGuid;
    use gridiron_ebx::EbxBuilder;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn container(count: usize) -> Vec<u8> {
        let mut writer = BlockWriter::new();
        for i in 0..count {
            let ebx = EbxBuilder::new(format!("Res/{i:03}"), FbGuid::EMPTY, 0)
                .payload(&vec![i as u8; 200 + i * 7])
                .build();
            if i % 5 == 4 {
                writer.write_stored(&ebx, true).unwrap();
            } else {
                writer.write_zstd_chunk(&ebx, 64).unwrap();
            }
        }
        writer.into_inner()
    }

    #[test]
    fn test_outcomes_follow_submission_order() {
        let data = container(40);
        let file: Arc<str> = Arc::from("Data/cas_01.cas");

        let mut pool = DecodePool::new(4, 2).unwrap();
        for chunk in CasBlockReader::new(Cursor::new(data)).chunks() {
            pool.submit(chunk.unwrap(), file.clone()).unwrap();
        }
        assert_eq!(pool.submitted(), 40);

        let outcomes = pool.finish().unwrap();
        assert_eq!(outcomes.len(), 40);
        for (i, outcome) in outcomes.iter().enumerate() {
            if i % 5 == 4 {
                assert!(outcome.is_none());
            } else {
                let record = outcome.as_ref().unwrap();
                assert_eq!(record.name, format!("Res/{i:03}"));
                assert_eq!(&*record.file, "Data/cas_01.cas");
            }
        }
    }

    #[test]
    fn test_matches_inline_decode() {
        let data = container(12);
        let inline: Vec<_> = CasBlockReader::new(Cursor::new(data.clone()))
            .chunks()
            .map(|c| decode_chunk(&c.unwrap(), "f"))
            .collect();

        let mut pool = DecodePool::new(3, 1).unwrap();
        for chunk in CasBlockReader::new(Cursor::new(data)).chunks() {
            pool.submit(chunk.unwrap(), Arc::from("f")).unwrap();
        }
        assert_eq!(pool.finish().unwrap(), inline);
    }

    #[test]
    fn test_empty_pool_finishes() {
        let pool = DecodePool::new(2, 4).unwrap();
        assert!(pool.finish().unwrap().is_empty());
    }

    #[test]
    fn test_zero_workers_still_runs() {
        let mut writer = BlockWriter::new();
        writer
            .write_zstd(&EbxBuilder::new("A", FbGuid::EMPTY, 0).build(), true)
            .unwrap();
        let blocks = parse_blocks(writer.as_bytes(), 0).unwrap();

        let mut pool = DecodePool::new(0, 0).unwrap();
        pool.submit(Chunk::from_blocks(blocks), Arc::from("f")).unwrap();
        assert_eq!(pool.finish().unwrap()[0].as_ref().unwrap().name, "A");
    }
}
