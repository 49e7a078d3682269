//! The observing system: owns every node and all live channels, drives
//! the per-tick cascade and arbitrates the radio channels.

use std::error::Error;
use std::fmt;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::clock::SimulationClock;
use crate::earth;
use crate::logging::{DataLog, EdgeRecord, NodeRecord};
use crate::node::{Node, UpdateOptions};
use crate::packet::PacketError;
use crate::platform::Platform;
use crate::processor::DataProcessor;
use crate::scheduler::Scheduler;
use crate::subsystems::{CommSubsystem, PowerSubsystem, SensingSubsystem};
use crate::sun::Sun;

/// Unrecoverable per-tick failures: invariant-violating packets or a
/// failed log write.
#[derive(Debug)]
pub enum SimError {
    Packet(PacketError),
    Log(csv::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Packet(e) => write!(f, "packet error: {}", e),
            SimError::Log(e) => write!(f, "log error: {}", e),
        }
    }
}

impl Error for SimError {}

impl From<PacketError> for SimError {
    fn from(e: PacketError) -> Self {
        SimError::Packet(e)
    }
}

impl From<csv::Error> for SimError {
    fn from(e: csv::Error) -> Self {
        SimError::Log(e)
    }
}

pub struct ObservingSystem {
    nodes: Vec<Node>,
    channels: Vec<Channel>,
    scheduler: Scheduler,
    num_samples: u64,
}

impl ObservingSystem {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            nodes: Vec::new(),
            channels: Vec::new(),
            scheduler,
            num_samples: 0,
        }
    }

    /// Adds one node per platform, stamping copies of the subsystem
    /// prototypes and a fresh processor into each. With `separate`, every
    /// node gets its own constellation id starting at `constellation`.
    #[allow(clippy::too_many_arguments)]
    pub fn launch(
        &mut self,
        platforms: Vec<Platform>,
        constellation: u16,
        separate: bool,
        comm: &CommSubsystem,
        sensing: &SensingSubsystem,
        power: &PowerSubsystem,
        make_processor: &dyn Fn() -> Box<dyn DataProcessor>,
        clock: &SimulationClock,
    ) {
        let mut group = constellation;
        for platform in platforms {
            let index = self.nodes.len() as u16;
            let name = platform.name().to_string();
            self.nodes.push(Node::new(
                name,
                index,
                group,
                platform,
                comm.clone(),
                sensing.clone(),
                power.clone(),
                make_processor(),
                clock,
            ));
            if separate {
                group += 1;
            }
        }
    }

    /// Plans periodic self-initiated measurements for every node across
    /// the span, staggered by a seeded draw.
    pub fn seed(&mut self, span_s: u64, clock: &SimulationClock, rng: &mut impl Rng) {
        let mut planned = 0u64;
        for node in self.nodes.iter_mut() {
            let duration_s = node.sensing().sensor().duration_s();
            let mut time_s = rng.gen_range(0..=span_s / 30);
            while time_s < span_s.saturating_sub(duration_s) {
                node.plan_measurement(time_s, u16::MAX);
                time_s += duration_s + 50;
                planned += 1;
            }
        }
        self.num_samples += planned;
        info!("[{}] planning {} samples", clock, planned);
    }

    /// As [`ObservingSystem::seed`], for one constellation with a longer
    /// rest between integrations.
    pub fn seed_many(
        &mut self,
        span_s: u64,
        constellation: u16,
        clock: &SimulationClock,
        rng: &mut impl Rng,
    ) {
        let mut planned = 0u64;
        for node in self
            .nodes
            .iter_mut()
            .filter(|node| node.constellation() == constellation)
        {
            let duration_s = node.sensing().sensor().duration_s();
            let mut time_s = rng.gen_range(0..=span_s / 30);
            while time_s < span_s.saturating_sub(duration_s) {
                node.plan_measurement(time_s, u16::MAX);
                time_s += duration_s + 400;
                planned += 1;
            }
        }
        self.num_samples += planned;
        info!("[{}] planning {} samples", clock, planned);
    }

    /// One simulation tick: sun, node cascade, scheduler, neighbour
    /// census, logging, channel arbitration.
    pub fn update(
        &mut self,
        clock: &SimulationClock,
        sun: &mut Sun,
        log: &mut DataLog,
    ) -> Result<(), SimError> {
        debug!("[{}] incrementing simulation", clock);
        sun.update(clock, 0);
        for node in self.nodes.iter_mut() {
            node.update(clock, sun, 0, UpdateOptions::ALL);
        }
        debug!("[{}] scheduling communications", clock);
        self.scheduler.update(&mut self.nodes, clock, sun)?;
        self.neighbor_census();
        debug!("[{}] logging node data", clock);
        self.log_nodes(clock, log)?;
        debug!("[{}] performing data transfers", clock);
        self.arbitrate_communication(clock, log)?;
        Ok(())
    }

    /// Fills `num_neighbors` from an all-pairs ellipsoid-visibility
    /// census of the current tick's positions.
    fn neighbor_census(&mut self) {
        let positions: Vec<_> = self
            .nodes
            .iter()
            .map(|node| *node.state().position_m())
            .collect();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            let neighbors = positions
                .iter()
                .enumerate()
                .filter(|&(j, position)| i != j && earth::visible(&positions[i], position))
                .count();
            node.set_num_neighbors(neighbors as u16);
        }
    }

    fn log_nodes(&self, clock: &SimulationClock, log: &mut DataLog) -> Result<(), csv::Error> {
        for node in &self.nodes {
            let geodetic = node.state().geodetic();
            let area = node
                .power()
                .solar_panels()
                .first()
                .map_or(0.0, |panel| panel.effective_area_m2());
            log.log_node(&NodeRecord {
                tick: clock.ticks(),
                index: node.index(),
                constellation: node.constellation(),
                mode: node.mode_code(),
                latitude: geodetic.latitude_rad,
                longitude: geodetic.longitude_rad,
                altitude: geodetic.altitude_m,
                energy: node.power().battery().energy_w_hr(),
                charging: node.power().charging(),
                area,
                num_neighbors: node.num_neighbors(),
            })?;
        }
        Ok(())
    }

    /// Advances live channels, retires the finished or broken ones, then
    /// picks up new transfers from the nodes' matured outbox targets.
    /// Fresh channels get their geometry update this tick; their first
    /// byte moves next tick.
    fn arbitrate_communication(
        &mut self,
        clock: &SimulationClock,
        log: &mut DataLog,
    ) -> Result<(), SimError> {
        let occlusion = self.scheduler.config().occlusion;
        let mut index = 0;
        while index < self.channels.len() {
            let channel = &mut self.channels[index];
            channel.update(clock, &mut self.nodes, occlusion);
            let channel = &mut self.channels[index];
            if channel.success() || channel.error() || !channel.active() {
                let tx = channel.tx();
                let rx = channel.rx();
                if channel.success() {
                    info!("[{}] N{}>N{} OK", clock, tx, rx);
                    let trace = channel.take_trace();
                    log.log_channel_trace(&trace)?;
                    self.nodes[rx as usize].address_comm_buffer(clock)?;
                } else {
                    warn!("[{}] N{}>N{} FAIL", clock, tx, rx);
                }
                self.channels.remove(index);
            } else {
                index += 1;
            }
        }
        for i in 0..self.nodes.len() {
            if let Some(target) = self.nodes[i].target_index() {
                if usize::from(target) == i || usize::from(target) >= self.nodes.len() {
                    warn!("[{}] N{} has unusable target N{}", clock, i, target);
                    continue;
                }
                let mut channel = Channel::new(&self.nodes, i as u16, target);
                channel.update(clock, &mut self.nodes, occlusion);
                channel.start(&mut self.nodes);
                self.channels.push(channel);
            }
        }
        for channel in &self.channels {
            log.log_edge(&EdgeRecord {
                tick: clock.ticks(),
                tx: channel.tx(),
                rx: channel.rx(),
            })?;
        }
        Ok(())
    }

    /// Final flush at the end of a run.
    pub fn complete(&mut self, log: &mut DataLog) -> std::io::Result<()> {
        log.flush()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }
}
