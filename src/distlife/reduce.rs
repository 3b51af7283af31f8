//! Global convergence detection.
//!
//! A sum of per-worker "unchanged" flags, rooted at `ROOT`: every worker
//! votes, the root counts and broadcasts the verdict. The call is collective,
//! so every worker must enter it for the same generations.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::error::{LifeError, Result};

use super::WorkerId;
use super::fabric::{CollectivePorts, ROOT, recv_within};

#[derive(Clone, Copy, Debug)]
pub struct Vote {
    pub worker: WorkerId,
    pub generation: u64,
    pub unchanged: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct Verdict {
    pub generation: u64,
    pub converged: bool,
}

struct RootSide {
    votes: Receiver<Vote>,
    verdicts: Vec<Sender<Verdict>>,
}

pub struct ConvergenceReducer {
    worker: WorkerId,
    worker_count: usize,
    timeout: Duration,
    vote_tx: Sender<Vote>,
    verdict_rx: Receiver<Verdict>,
    root: Option<RootSide>,
}

impl ConvergenceReducer {
    pub(crate) fn new(
        worker: WorkerId,
        worker_count: usize,
        timeout: Duration,
        ports: &CollectivePorts,
    ) -> Self {
        let root = ports.root.as_ref().map(|root| RootSide {
            votes: root.vote_rx.clone(),
            verdicts: root.verdict_tx.clone(),
        });
        Self {
            worker,
            worker_count,
            timeout,
            vote_tx: ports.vote_tx.clone(),
            verdict_rx: ports.verdict_rx.clone(),
            root,
        }
    }

    /// Returns `true` iff every worker reports no change in `generation`.
    pub fn reduce(&mut self, generation: u64, local_unchanged: bool) -> Result<bool> {
        match &self.root {
            Some(root) => {
                let mut unchanged = local_unchanged as usize;
                for _ in 1..self.worker_count {
                    let vote = recv_within(&root.votes, self.worker, "convergence reduce", self.timeout)?;
                    if vote.generation != generation {
                        return Err(LifeError::Protocol {
                            worker: self.worker,
                            reason: format!(
                                "worker {} voted for generation {} during the generation {generation} reduction",
                                vote.worker, vote.generation
                            ),
                        });
                    }
                    unchanged += vote.unchanged as usize;
                }
                let converged = unchanged == self.worker_count;
                let verdict = Verdict {
                    generation,
                    converged,
                };
                for (peer, tx) in root.verdicts.iter().enumerate() {
                    if peer == ROOT {
                        continue;
                    }
                    tx.send(verdict).map_err(|_| {
                        LifeError::transport(self.worker, "convergence broadcast", format!("worker {peer} disconnected"))
                    })?;
                }
                debug!(generation, unchanged, workers = self.worker_count, converged, "convergence reduced");
                Ok(converged)
            }
            None => {
                self.vote_tx
                    .send(Vote {
                        worker: self.worker,
                        generation,
                        unchanged: local_unchanged,
                    })
                    .map_err(|_| LifeError::transport(self.worker, "convergence vote", "root disconnected"))?;
                let verdict =
                    recv_within(&self.verdict_rx, self.worker, "convergence verdict", self.timeout)?;
                if verdict.generation != generation {
                    return Err(LifeError::Protocol {
                        worker: self.worker,
                        reason: format!(
                            "received the generation {} verdict while reducing generation {generation}",
                            verdict.generation
                        ),
                    });
                }
                Ok(verdict.converged)
            }
        }
    }
}
