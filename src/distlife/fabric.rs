//! In-process message-passing substrate.
//!
//! Workers run on their own threads and share nothing but channels. The
//! fabric wires every link once, before any worker starts:
//!
//! - one halo link per `(sender, direction, slot)` whose neighbor is a
//!   different worker. A link is a data channel carrying a packed border plus
//!   an ack channel that hands the same buffer back once the receiver has
//!   unpacked it, so a send is "retired" exactly when its buffer returns;
//! - a root-directed vote channel and per-worker verdict channels for the
//!   convergence reduction;
//! - a root-directed channel for block pieces during gathers.
//!
//! Workers take their ports out of the fabric while being built; the fabric
//! itself must be dropped before the workers start so that a dead worker is
//! observed as a disconnected channel instead of a silent hang.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::error::{LifeError, Result};

use super::WorkerId;
use super::gather::BlockPiece;
use super::reduce::{Verdict, Vote};
use super::topology::{Direction, Topology};

/// Worker that roots the reduction and collects gathers.
pub const ROOT: WorkerId = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct LinkKey {
    pub from: WorkerId,
    pub direction: Direction,
    pub slot: usize,
}

/// Sending half of a halo link.
pub(crate) struct SendPort {
    data: Sender<Vec<u8>>,
    ack: Receiver<Vec<u8>>,
}

impl SendPort {
    pub fn post(&self, worker: WorkerId, buf: Vec<u8>) -> Result<()> {
        self.data
            .send(buf)
            .map_err(|_| LifeError::transport(worker, "halo send", "receiver disconnected"))
    }

    /// Block until the receiver hands the buffer back.
    pub fn retire(&self, worker: WorkerId, timeout: Duration) -> Result<Vec<u8>> {
        recv_within(&self.ack, worker, "halo send completion", timeout)
    }
}

/// Receiving half of a halo link.
pub(crate) struct RecvPort {
    data: Receiver<Vec<u8>>,
    ack: Sender<Vec<u8>>,
}

impl RecvPort {
    pub fn take(&self, worker: WorkerId, timeout: Duration) -> Result<Vec<u8>> {
        recv_within(&self.data, worker, "halo receive", timeout)
    }

    /// Return a consumed buffer to its sender.
    pub fn release(&self, worker: WorkerId, buf: Vec<u8>) -> Result<()> {
        self.ack
            .send(buf)
            .map_err(|_| LifeError::transport(worker, "halo release", "sender disconnected"))
    }
}

pub(crate) fn recv_within<T>(
    rx: &Receiver<T>,
    worker: WorkerId,
    operation: &'static str,
    timeout: Duration,
) -> Result<T> {
    rx.recv_timeout(timeout).map_err(|err| match err {
        RecvTimeoutError::Timeout => {
            LifeError::transport(worker, operation, format!("timed out after {timeout:?}"))
        }
        RecvTimeoutError::Disconnected => {
            LifeError::transport(worker, operation, "peer disconnected")
        }
    })
}

/// Ports of the root-directed collectives for one worker.
pub(crate) struct CollectivePorts {
    pub vote_tx: Sender<Vote>,
    pub verdict_rx: Receiver<Verdict>,
    pub piece_tx: Sender<BlockPiece>,
    /// Root only.
    pub root: Option<RootPorts>,
}

pub(crate) struct RootPorts {
    pub vote_rx: Receiver<Vote>,
    pub verdict_tx: Vec<Sender<Verdict>>,
    pub piece_rx: Receiver<BlockPiece>,
}

pub struct Fabric {
    slots: usize,
    timeout: Duration,
    send_ports: HashMap<LinkKey, SendPort>,
    recv_ports: HashMap<LinkKey, RecvPort>,
    vote_tx: Sender<Vote>,
    piece_tx: Sender<BlockPiece>,
    verdict_rx: Vec<Option<Receiver<Verdict>>>,
    root: Option<RootPorts>,
}

impl Fabric {
    /// Wire every link `topology` needs, with `slots` independent halo
    /// buffer generations.
    pub fn wire(topology: &Topology, slots: usize, timeout: Duration) -> Self {
        let workers = topology.worker_count();
        let mut send_ports = HashMap::new();
        let mut recv_ports = HashMap::new();

        for from in 0..workers {
            for direction in Direction::ALL {
                if topology.neighbor(from, direction) == from {
                    continue;
                }
                for slot in 0..slots {
                    let key = LinkKey {
                        from,
                        direction,
                        slot,
                    };
                    let (data_tx, data_rx) = unbounded();
                    let (ack_tx, ack_rx) = unbounded();
                    send_ports.insert(
                        key,
                        SendPort {
                            data: data_tx,
                            ack: ack_rx,
                        },
                    );
                    recv_ports.insert(
                        key,
                        RecvPort {
                            data: data_rx,
                            ack: ack_tx,
                        },
                    );
                }
            }
        }

        let (vote_tx, vote_rx) = unbounded();
        let (piece_tx, piece_rx) = unbounded();
        let mut verdict_tx = Vec::with_capacity(workers);
        let mut verdict_rx = Vec::with_capacity(workers);
        for _ in 0..workers {
            let (tx, rx) = unbounded();
            verdict_tx.push(tx);
            verdict_rx.push(Some(rx));
        }

        Self {
            slots,
            timeout,
            send_ports,
            recv_ports,
            vote_tx,
            piece_tx,
            verdict_rx,
            root: Some(RootPorts {
                vote_rx,
                verdict_tx,
                piece_rx,
            }),
        }
    }

    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of remote halo links still waiting to be claimed.
    pub fn unclaimed_links(&self) -> usize {
        self.send_ports.len() + self.recv_ports.len()
    }

    pub(crate) fn take_send_port(&mut self, key: LinkKey) -> Result<SendPort> {
        self.send_ports.remove(&key).ok_or_else(|| {
            LifeError::transport(
                key.from,
                "channel setup",
                format!("no send link {:?} slot {}", key.direction, key.slot),
            )
        })
    }

    pub(crate) fn take_recv_port(&mut self, key: LinkKey, worker: WorkerId) -> Result<RecvPort> {
        self.recv_ports.remove(&key).ok_or_else(|| {
            LifeError::transport(
                worker,
                "channel setup",
                format!(
                    "no receive link from worker {} {:?} slot {}",
                    key.from, key.direction, key.slot
                ),
            )
        })
    }

    pub(crate) fn take_collective_ports(&mut self, worker: WorkerId) -> Result<CollectivePorts> {
        let verdict_rx = self
            .verdict_rx
            .get_mut(worker)
            .and_then(Option::take)
            .ok_or_else(|| {
                LifeError::transport(worker, "channel setup", "collective ports already claimed")
            })?;
        let root = if worker == ROOT { self.root.take() } else { None };
        Ok(CollectivePorts {
            vote_tx: self.vote_tx.clone(),
            verdict_rx,
            piece_tx: self.piece_tx.clone(),
            root,
        })
    }
}
