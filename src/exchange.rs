//! Message passing between isolated workers.
//!
//! Every worker owns a contiguous range of units and talks to the nearest
//! worker on each side that owns something. Ghost exchange is a rendezvous
//! over bounded channels of capacity one, gather funnels every worker's
//! owned temperatures to rank 0.

use crate::error::*;
use crate::partition::*;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};

/// Rank that collects gathers.
pub const ROOT: usize = 0;

/// Temperatures of a boundary unit, tagged with the step they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct GhostMessage {
    pub step: usize,
    pub temperatures: Vec<f64>,
}

/// Owned temperatures of one worker at one step.
#[derive(Debug, Clone, PartialEq)]
pub struct GatherMessage {
    pub rank: usize,
    pub step: usize,
    /// Global index of the first temperature.
    pub low: usize,
    pub temperatures: Vec<f64>,
}

/// Ghost units received in one exchange, `None` on a side without partner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ghosts {
    pub left: Option<Vec<f64>>,
    pub right: Option<Vec<f64>>,
}

pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Send the first owned unit to the left partner and the last owned unit
    /// to the right partner, then wait for both partners' values of `step`.
    fn exchange(&mut self, step: usize, first: &[f64], last: &[f64]) -> HeatResult<Ghosts>;

    /// Collective gather. Every rank must call it for the same `step`.
    /// The root receives every contribution ordered by rank, the others
    /// receive `None`.
    fn gather(
        &mut self,
        step: usize,
        low: usize,
        temperatures: &[f64],
    ) -> HeatResult<Option<Vec<GatherMessage>>>;
}

/// One direction of the ghost exchange with a partner.
#[derive(Debug)]
pub struct Link {
    partner: usize,
    tx: SyncSender<GhostMessage>,
    rx: Receiver<GhostMessage>,
}

impl Link {
    fn pair(a: usize, b: usize) -> (Link, Link) {
        let (tx_ab, rx_ab) = mpsc::sync_channel(1);
        let (tx_ba, rx_ba) = mpsc::sync_channel(1);
        (
            Link {
                partner: b,
                tx: tx_ab,
                rx: rx_ba,
            },
            Link {
                partner: a,
                tx: tx_ba,
                rx: rx_ab,
            },
        )
    }

    #[inline]
    pub fn partner(&self) -> usize {
        self.partner
    }

    fn send(&self, step: usize, temperatures: &[f64]) -> HeatResult<()> {
        self.tx
            .send(GhostMessage {
                step,
                temperatures: temperatures.to_vec(),
            })
            .map_err(|_| HeatError::WorkerLost { rank: self.partner })
    }

    fn recv(&self, step: usize) -> HeatResult<Vec<f64>> {
        let message = self
            .rx
            .recv()
            .map_err(|_| HeatError::WorkerLost { rank: self.partner })?;
        if message.step != step {
            return Err(HeatError::OutOfStep {
                rank: self.partner,
                expected: step,
                received: message.step,
            });
        }
        Ok(message.temperatures)
    }
}

enum GatherEnd {
    Root {
        rx: Receiver<GatherMessage>,
        /// Messages of later steps that arrived early, keyed by step.
        pending: BTreeMap<usize, Vec<GatherMessage>>,
    },
    Leaf(Sender<GatherMessage>),
}

/// Communicator backed by std channels, one per worker thread.
pub struct ChannelCommunicator {
    rank: usize,
    size: usize,
    partition: Partition,
    left: Option<Link>,
    right: Option<Link>,
    gather: GatherEnd,
}

impl ChannelCommunicator {
    /// Build a wired communicator for every worker of a run over `units`
    /// decomposition units, in rank order.
    pub fn world(
        units: usize,
        unit_len: usize,
        worker_count: usize,
    ) -> HeatResult<Vec<ChannelCommunicator>> {
        let parts = partitions(units, worker_count)?;
        let mut lefts: Vec<Option<Link>> = (0..worker_count).map(|_| None).collect();
        let mut rights: Vec<Option<Link>> = (0..worker_count).map(|_| None).collect();
        for rank in 0..worker_count {
            if let (_, Some(right)) = active_neighbors(units, worker_count, rank)? {
                let (to_right, to_left) = Link::pair(rank, right);
                rights[rank] = Some(to_right);
                lefts[right] = Some(to_left);
            }
        }

        // The root holds no sender, so its receive fails once every
        // other worker is gone.
        let (tx, rx) = mpsc::channel();
        let mut root_rx = Some(rx);

        let mut world = Vec::with_capacity(worker_count);
        for (rank, (left, right)) in lefts.into_iter().zip(rights).enumerate() {
            debug_assert!((rank == ROOT) == root_rx.is_some());
            let gather = match root_rx.take() {
                Some(rx) => GatherEnd::Root {
                    rx,
                    pending: BTreeMap::new(),
                },
                None => GatherEnd::Leaf(tx.clone()),
            };
            world.push(ChannelCommunicator {
                rank,
                size: worker_count,
                partition: parts[rank].scaled(unit_len),
                left,
                right,
                gather,
            });
        }
        Ok(world)
    }

    /// Node range owned by this worker.
    #[inline]
    pub fn partition(&self) -> Partition {
        self.partition
    }

    #[inline]
    pub fn left_partner(&self) -> Option<usize> {
        self.left.as_ref().map(|l| l.partner())
    }

    #[inline]
    pub fn right_partner(&self) -> Option<usize> {
        self.right.as_ref().map(|l| l.partner())
    }
}

impl Communicator for ChannelCommunicator {
    #[inline]
    fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    fn size(&self) -> usize {
        self.size
    }

    fn exchange(&mut self, step: usize, first: &[f64], last: &[f64]) -> HeatResult<Ghosts> {
        profiling::scope!("exchange::ghosts");
        if let Some(link) = &self.left {
            link.send(step, first)?;
        }
        if let Some(link) = &self.right {
            link.send(step, last)?;
        }
        let left = self.left.as_ref().map(|l| l.recv(step)).transpose()?;
        let right = self.right.as_ref().map(|l| l.recv(step)).transpose()?;
        Ok(Ghosts { left, right })
    }

    fn gather(
        &mut self,
        step: usize,
        low: usize,
        temperatures: &[f64],
    ) -> HeatResult<Option<Vec<GatherMessage>>> {
        profiling::scope!("exchange::gather");
        let own = GatherMessage {
            rank: self.rank,
            step,
            low,
            temperatures: temperatures.to_vec(),
        };
        match &mut self.gather {
            GatherEnd::Leaf(tx) => {
                tx.send(own)
                    .map_err(|_| HeatError::WorkerLost { rank: ROOT })?;
                Ok(None)
            }
            GatherEnd::Root { rx, pending } => {
                let mut received = pending.remove(&step).unwrap_or_default();
                received.push(own);
                while received.len() < self.size {
                    let message = rx.recv().map_err(|_| {
                        let missing = (0..self.size)
                            .find(|r| received.iter().all(|m| m.rank != *r))
                            .unwrap_or(ROOT);
                        HeatError::WorkerLost { rank: missing }
                    })?;
                    if message.step == step {
                        received.push(message);
                    } else if message.step > step {
                        pending.entry(message.step).or_default().push(message);
                    } else {
                        return Err(HeatError::OutOfStep {
                            rank: message.rank,
                            expected: step,
                            received: message.step,
                        });
                    }
                }
                received.sort_by_key(|m| m.rank);
                Ok(Some(received))
            }
        }
    }
}
