//! Worker pool for the parallel strategy
//!
//! Each worker is a thread owning its own interpreter, loaded inside the
//! thread from the ROM and seed it was spawned with. Interpreters never
//! cross threads; only the ROM bytes, the reference snapshot and the
//! candidate chunk are sent in, and bucket maps come back.

use std::ops::Range;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::buckets::ActionBuckets;
use super::sequential::{ProbeOptions, evaluate_chunk};
use crate::action::CandidateAction;
use crate::error::{InterpreterError, ResolveError};
use crate::interpreter::GameInterpreter;
use crate::rom::RomImage;
use crate::state::GameState;

type ChunkResult = Result<ActionBuckets, InterpreterError>;

enum Job {
    Resolve {
        reference: GameState,
        candidates: Vec<CandidateAction>,
        reply: Sender<ChunkResult>,
    },
    Shutdown,
}

struct Worker {
    id: usize,
    jobs: Sender<Job>,
    handle: Option<JoinHandle<()>>,
}

/// Fixed-size pool of interpreter workers.
///
/// Dropping the pool stops and joins every worker, which drops each
/// worker's interpreter.
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one), each loading `rom` with `seed`.
    pub(crate) fn spawn<I: GameInterpreter + 'static>(
        size: usize,
        rom: &RomImage,
        seed: Option<i64>,
        opts: ProbeOptions,
    ) -> Result<Self, ResolveError> {
        let mut pool = WorkerPool {
            workers: Vec::with_capacity(size.max(1)),
        };
        for id in 0..size.max(1) {
            let (jobs, inbox) = mpsc::channel();
            let rom = rom.clone();
            let opts = opts.clone();
            let handle = thread::Builder::new()
                .name(format!("ifact-worker-{id}"))
                .spawn(move || worker_loop::<I>(&rom, seed, &opts, inbox))
                .map_err(ResolveError::Spawn)?;
            pool.workers.push(Worker {
                id,
                jobs,
                handle: Some(handle),
            });
        }
        debug!(workers = pool.workers.len(), "spawned worker pool");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Split `candidates` into contiguous chunks, one per worker, and merge
    /// the results in worker order.
    ///
    /// Any worker failing fails the whole call.
    pub(crate) fn resolve(
        &self,
        reference: &GameState,
        candidates: &[CandidateAction],
    ) -> Result<ActionBuckets, ResolveError> {
        let mut pending = Vec::new();
        for (worker, range) in self.workers.iter().zip(chunk_ranges(candidates.len(), self.workers.len())) {
            if range.is_empty() {
                continue;
            }
            let (reply, results) = mpsc::channel();
            let job = Job::Resolve {
                reference: reference.clone(),
                candidates: candidates[range].to_vec(),
                reply,
            };
            worker
                .jobs
                .send(job)
                .map_err(|_| ResolveError::WorkerCrashed { worker: worker.id })?;
            pending.push((worker.id, results));
        }

        let mut merged = ActionBuckets::new();
        for (worker, results) in pending {
            match results.recv() {
                Ok(Ok(buckets)) => merged.merge(buckets),
                Ok(Err(source)) => return Err(ResolveError::WorkerFailed { worker, source }),
                Err(_) => {
                    warn!(worker, "worker exited before returning its chunk");
                    return Err(ResolveError::WorkerCrashed { worker });
                }
            }
        }
        Ok(merged)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            let _ = worker.jobs.send(Job::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take()
                && handle.join().is_err()
            {
                warn!(worker = worker.id, "worker panicked");
            }
        }
        debug!(workers = self.workers.len(), "worker pool shut down");
    }
}

fn worker_loop<I: GameInterpreter>(
    rom: &RomImage,
    seed: Option<i64>,
    opts: &ProbeOptions,
    inbox: Receiver<Job>,
) {
    let mut interp = I::load(rom, seed);
    for job in inbox {
        match job {
            Job::Resolve {
                reference,
                candidates,
                reply,
            } => {
                let result = match interp.as_mut() {
                    Ok(interp) => evaluate_chunk(interp, &reference, &candidates, opts),
                    Err(err) => Err(err.clone()),
                };
                // The caller may have given up after another worker failed.
                let _ = reply.send(result);
            }
            Job::Shutdown => break,
        }
    }
}

/// Contiguous ranges covering `0..len`, the first `len % parts` one longer.
pub(crate) fn chunk_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let base = len / parts;
    let extra = len % parts;
    let mut start = 0;
    (0..parts)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ranges_cover_input() {
        assert_eq!(chunk_ranges(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(chunk_ranges(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
        assert_eq!(chunk_ranges(0, 2), vec![0..0, 0..0]);
        assert_eq!(chunk_ranges(5, 0), vec![0..5]);
    }
}
