//! Halo exchange channel set.
//!
//! For every direction and every buffer slot, a worker owns one persistent
//! send channel (its border cells in that direction, destined for the
//! neighbor there) and one persistent receive channel (its halo cells on
//! that side, filled by the same neighbor's border in the reverse direction).
//! Receives are keyed by the sender's direction, which keeps the north and
//! south halos apart even when both neighbors are the same worker.
//!
//! When the neighbor in a direction is the worker itself, the channel is
//! bound to a loopback peer instead: `start_all` copies the border straight
//! into the opposite halo and the matching receive is a no-op. The hot loop
//! still issues exactly 8 starts and 8 waits per slot.
//!
//! Slot `s` is bound to block allocation `s` of the worker's `BlockPair`, so
//! the slot index is the pair's current slot.

use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{LifeError, Result};

use super::WorkerId;
use super::block::{GridBlock, Region};
use super::fabric::{Fabric, LinkKey, RecvPort, SendPort};
use super::partition::Partition;
use super::topology::{Direction, Topology};

enum SendTarget {
    Remote {
        peer: WorkerId,
        port: SendPort,
        /// `None` while the buffer is in flight.
        staging: Option<Vec<u8>>,
    },
    /// Neighbor is this worker; copy into our own halo on the opposite side.
    Loopback { halo: Region },
}

struct SendChannel {
    direction: Direction,
    source: Region,
    target: SendTarget,
}

enum RecvSource {
    Remote { peer: WorkerId, port: RecvPort },
    Loopback,
}

struct RecvChannel {
    direction: Direction,
    dest: Region,
    source: RecvSource,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum SlotState {
    #[default]
    Idle,
    /// Sends and receives posted.
    Started,
    /// Receives complete; sends may still be draining.
    Received,
}

pub struct HaloChannels {
    worker: WorkerId,
    timeout: Duration,
    sends: Vec<[SendChannel; 8]>,
    recvs: Vec<[RecvChannel; 8]>,
    states: Vec<SlotState>,
}

impl HaloChannels {
    /// Bind the channel set of `worker`, claiming its links from `fabric`.
    pub fn setup(
        worker: WorkerId,
        partition: &Partition,
        topology: &Topology,
        fabric: &mut Fabric,
    ) -> Result<Self> {
        // Every block has the same shape, so a template block yields the
        // regions for both slots.
        let template = GridBlock::new(partition.rows_per_block(), partition.cols_per_block());
        let slots = fabric.slots();
        let mut sends = Vec::with_capacity(slots);
        let mut recvs = Vec::with_capacity(slots);

        for slot in 0..slots {
            let mut slot_sends = Vec::with_capacity(8);
            let mut slot_recvs = Vec::with_capacity(8);
            for direction in Direction::ALL {
                let peer = topology.neighbor(worker, direction);

                let target = if peer == worker {
                    SendTarget::Loopback {
                        halo: template.halo_region(direction.reverse()),
                    }
                } else {
                    let port = fabric.take_send_port(LinkKey {
                        from: worker,
                        direction,
                        slot,
                    })?;
                    SendTarget::Remote {
                        peer,
                        port,
                        staging: Some(Vec::with_capacity(template.border_region(direction).len)),
                    }
                };
                slot_sends.push(SendChannel {
                    direction,
                    source: template.border_region(direction),
                    target,
                });

                let source = if peer == worker {
                    RecvSource::Loopback
                } else {
                    let key = LinkKey {
                        from: peer,
                        direction: direction.reverse(),
                        slot,
                    };
                    RecvSource::Remote {
                        peer,
                        port: fabric.take_recv_port(key, worker)?,
                    }
                };
                slot_recvs.push(RecvChannel {
                    direction,
                    dest: template.halo_region(direction),
                    source,
                });
            }
            sends.push(into_array(slot_sends));
            recvs.push(into_array(slot_recvs));
        }

        let loopbacks = recvs
            .first()
            .map(|slot| {
                slot.iter()
                    .filter(|ch| matches!(ch.source, RecvSource::Loopback))
                    .count()
            })
            .unwrap_or(0);
        debug!(
            worker,
            slots,
            loopbacks,
            neighbors = ?topology.neighbors(worker),
            "halo channels bound"
        );

        Ok(Self {
            worker,
            timeout: fabric.timeout(),
            sends,
            recvs,
            states: vec![SlotState::Idle; slots],
        })
    }

    pub fn slots(&self) -> usize {
        self.states.len()
    }

    /// Post all 8 sends and 8 receives for `slot`. Never blocks.
    ///
    /// `block` must be the allocation bound to `slot`.
    pub fn start_all(&mut self, slot: usize, block: &mut GridBlock) -> Result<()> {
        if self.states[slot] != SlotState::Idle {
            return Err(self.protocol(slot, "started while a previous exchange is still open"));
        }
        let worker = self.worker;
        for channel in self.sends[slot].iter_mut() {
            match &mut channel.target {
                SendTarget::Remote { port, staging, peer } => {
                    let Some(mut buf) = staging.take() else {
                        return Err(LifeError::Protocol {
                            worker,
                            reason: format!(
                                "send {:?} slot {slot} to worker {peer} reused before retiring",
                                channel.direction
                            ),
                        });
                    };
                    block.read_region(channel.source, &mut buf);
                    port.post(worker, buf)?;
                }
                SendTarget::Loopback { halo } => {
                    block.copy_region(channel.source, *halo);
                }
            }
        }
        self.states[slot] = SlotState::Started;
        trace!(worker, slot, "halo exchange started");
        Ok(())
    }

    /// Block until every halo for `slot` has arrived and been unpacked into
    /// `block`. Must complete before any border cell is computed.
    pub fn wait_receives(&mut self, slot: usize, block: &mut GridBlock) -> Result<()> {
        if self.states[slot] != SlotState::Started {
            return Err(self.protocol(slot, "receives awaited without a started exchange"));
        }
        let worker = self.worker;
        for channel in self.recvs[slot].iter() {
            if let RecvSource::Remote { peer, port } = &channel.source {
                let buf = port.take(worker, self.timeout)?;
                if buf.len() != channel.dest.len {
                    return Err(LifeError::Protocol {
                        worker,
                        reason: format!(
                            "halo {:?} from worker {peer} carried {} cells, expected {}",
                            channel.direction,
                            buf.len(),
                            channel.dest.len
                        ),
                    });
                }
                block.write_region(channel.dest, &buf);
                port.release(worker, buf)?;
            }
        }
        self.states[slot] = SlotState::Received;
        Ok(())
    }

    /// Block until every outgoing buffer of `slot` is back in our hands and
    /// safe to overwrite.
    pub fn wait_sends(&mut self, slot: usize) -> Result<()> {
        if self.states[slot] != SlotState::Received {
            return Err(self.protocol(slot, "sends retired before receives completed"));
        }
        let worker = self.worker;
        for channel in self.sends[slot].iter_mut() {
            if let SendTarget::Remote { port, staging, .. } = &mut channel.target {
                if staging.is_none() {
                    *staging = Some(port.retire(worker, self.timeout)?);
                }
            }
        }
        self.states[slot] = SlotState::Idle;
        trace!(worker, slot, "halo sends retired");
        Ok(())
    }

    fn protocol(&self, slot: usize, reason: &str) -> LifeError {
        LifeError::Protocol {
            worker: self.worker,
            reason: format!("halo slot {slot}: {reason}"),
        }
    }
}

fn into_array<T>(channels: Vec<T>) -> [T; 8] {
    match channels.try_into() {
        Ok(array) => array,
        Err(_) => unreachable!("one channel per direction"),
    }
}
