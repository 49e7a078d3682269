use tracing::{info, warn};

use crate::clock::SimulationClock;
use crate::earth::Geodetic;
use crate::packet::{
    decode_raw_buffer, ForwardPacket, PacketError, PacketKind, ReturnPacket, Route,
};
use crate::platform::{OrbitalState, Platform};
use crate::processor::DataProcessor;
use crate::subsystems::{
    CommMode, CommSubsystem, CommunicationEvent, FeedbackEvent, PowerSubsystem, SensingSubsystem,
};
use crate::sun::Sun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMode {
    Free,
    Carrying,
    Sensing,
}

/// Which stages of the per-tick cascade to run. The stage order is fixed;
/// the flags only skip stages.
#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions {
    pub orient_comm: bool,
    pub orient_sensing: bool,
    pub measure: bool,
    pub charge: bool,
    pub power: bool,
    pub communicate: bool,
}

impl UpdateOptions {
    /// Full cascade, run once per tick by the observing system.
    pub const ALL: Self = Self {
        orient_comm: true,
        orient_sensing: true,
        measure: true,
        charge: true,
        power: true,
        communicate: true,
    };

    /// Comm-antenna orientation only, used by the route search.
    pub const ORIENT_COMM: Self = Self {
        orient_comm: true,
        orient_sensing: false,
        measure: false,
        charge: false,
        power: false,
        communicate: false,
    };

    /// Sensing-antenna orientation only, used by visitor prediction.
    pub const ORIENT_SENSING: Self = Self {
        orient_comm: false,
        orient_sensing: true,
        measure: false,
        charge: false,
        power: false,
        communicate: false,
    };

    /// Both orientations, used when the scheduler restores node state.
    pub const RESTORE: Self = Self {
        orient_comm: true,
        orient_sensing: true,
        measure: false,
        charge: false,
        power: false,
        communicate: false,
    };
}

/// A member of the network: platform, three subsystems, a data processor
/// and the per-tick scratch state the scheduler reads.
pub struct Node {
    name: String,
    index: u16,
    constellation: u16,
    platform: Platform,
    processor: Box<dyn DataProcessor>,
    state: OrbitalState,
    comm: CommSubsystem,
    sensing: SensingSubsystem,
    power: PowerSubsystem,
    mode: NodeMode,
    measurements: Vec<(u64, u16)>,
    min_suggestions: Vec<Geodetic>,
    max_suggestions: Vec<Geodetic>,
    feedback: Vec<(bool, u16)>,
    target_index: Option<u16>,
    num_neighbors: u16,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        index: u16,
        constellation: u16,
        platform: Platform,
        comm: CommSubsystem,
        sensing: SensingSubsystem,
        power: PowerSubsystem,
        processor: Box<dyn DataProcessor>,
        clock: &SimulationClock,
    ) -> Self {
        let state = platform.predict(clock, 0);
        Self {
            name: name.into(),
            index,
            constellation,
            platform,
            processor,
            state,
            comm,
            sensing,
            power,
            mode: NodeMode::Free,
            measurements: Vec::new(),
            min_suggestions: Vec::new(),
            max_suggestions: Vec::new(),
            feedback: Vec::new(),
            target_index: None,
            num_neighbors: 0,
        }
    }

    /// One pass of the tick cascade at `offset_s` seconds past the clock
    /// cursor. The orbital state always propagates; everything else is
    /// gated by `options`.
    pub fn update(
        &mut self,
        clock: &SimulationClock,
        sun: &Sun,
        offset_s: u64,
        options: UpdateOptions,
    ) {
        self.platform.predict_into(clock, offset_s, &mut self.state);
        let orbit_frame = *self.state.orbit_frame();
        let body_frame = *self.state.body_frame();
        if options.orient_comm {
            self.comm.orient_antenna(&orbit_frame, &body_frame);
        }
        if options.communicate {
            self.target_index = None;
            if self.comm.mode() == CommMode::Free {
                self.target_index = self.comm.poll_outbox(clock);
            }
        }
        if options.orient_sensing {
            self.sensing.orient_antenna(&orbit_frame, &body_frame);
        }
        if options.measure {
            self.update_measurement(clock);
        }
        if options.power {
            let mut drain_w = self.comm.power_drain_w();
            if self.mode == NodeMode::Sensing {
                drain_w += self.sensing.sensor().power_consumed_w();
            }
            let position = *self.state.position_m();
            self.power.update(
                options.charge,
                clock,
                &body_frame,
                &orbit_frame,
                drain_w,
                &position,
                sun.position_m(),
            );
        }
    }

    fn update_measurement(&mut self, clock: &SimulationClock) {
        let mut index = 0;
        while index < self.measurements.len() {
            let (start_s, informer) = self.measurements[index];
            if clock.elapsed_s() > start_s && !self.sensing.active() {
                self.measurements.remove(index);
                self.mode = NodeMode::Sensing;
                self.sensing.measure(informer);
                info!(
                    "[{}] N{} sensing \"{}\"",
                    clock,
                    self.index,
                    self.sensing.sensor().variable()
                );
            } else {
                index += 1;
            }
        }
        let position = *self.state.position_m();
        self.sensing.update(clock, &position, self.index);
        if self.sensing.complete() {
            let raw_packets = if self.sensing.data_buffer().is_empty() {
                Vec::new()
            } else {
                decode_raw_buffer(self.sensing.data_buffer())
                    .expect("sensing buffer holds whole raw packets")
            };
            self.processor.compute(
                &raw_packets,
                self.index,
                clock,
                &mut self.min_suggestions,
                &mut self.max_suggestions,
                &mut self.feedback,
            );
            self.sensing.set_complete(false);
            self.sensing.erase_data_buffer();
            self.mode = NodeMode::Carrying;
        }
    }

    /// Schedules a measurement at an absolute elapsed time on behalf of
    /// the informer node (`u16::MAX` for self-initiated samples).
    pub fn plan_measurement(&mut self, start_s: u64, informer_index: u16) {
        self.measurements.push((start_s, informer_index));
    }

    /// Dispatches the communication buffer: the buffer size picks the
    /// packet kind, the route decides whether to re-queue the packet or
    /// fulfil it locally.
    pub fn address_comm_buffer(&mut self, clock: &SimulationClock) -> Result<(), PacketError> {
        let buffer = self.comm.data_buffer().to_vec();
        match PacketKind::classify(buffer.len())? {
            PacketKind::Forward => {
                let packet = ForwardPacket::decode(&buffer)?;
                self.comm.erase_data_buffer();
                match self.position_in_route(&packet.route) {
                    None => self.requeue_forward(packet, 0),
                    Some(position) if position + 1 == packet.route.len() => {
                        self.plan_measurement(packet.event.elapsed_s, packet.feedback_origin);
                    }
                    Some(position) => self.requeue_forward(packet, position + 1),
                }
            }
            PacketKind::Return => {
                let packet = ReturnPacket::decode(&buffer)?;
                self.comm.erase_data_buffer();
                match self.position_in_route(&packet.route) {
                    None => self.requeue_return(packet, 0),
                    Some(position) if position + 1 == packet.route.len() => {
                        self.processor
                            .regression(packet.success, packet.origin_constellation);
                    }
                    Some(position) => self.requeue_return(packet, position + 1),
                }
            }
            PacketKind::RawBatch(_) => {
                let raw_packets = decode_raw_buffer(&buffer)?;
                self.comm.erase_data_buffer();
                self.processor.compute(
                    &raw_packets,
                    self.index,
                    clock,
                    &mut self.min_suggestions,
                    &mut self.max_suggestions,
                    &mut self.feedback,
                );
            }
        }
        Ok(())
    }

    fn position_in_route(&self, route: &Route) -> Option<usize> {
        route.iter().position(|transfer| transfer.node == self.index)
    }

    fn requeue_forward(&mut self, packet: ForwardPacket, hop: usize) {
        if let Some(transfer) = packet.route.get(hop).copied() {
            self.comm.queue_event(CommunicationEvent {
                recipient: transfer.node,
                earliest_s: transfer.start_s,
                packet,
            });
        } else {
            warn!("N{} dropping forward packet with no viable hop", self.index);
        }
    }

    fn requeue_return(&mut self, packet: ReturnPacket, hop: usize) {
        if let Some(transfer) = packet.route.get(hop).copied() {
            self.comm.queue_feedback(FeedbackEvent {
                recipient: transfer.node,
                earliest_s: transfer.start_s,
                packet,
            });
        } else {
            warn!("N{} dropping return packet with no viable hop", self.index);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn constellation(&self) -> u16 {
        self.constellation
    }

    pub fn state(&self) -> &OrbitalState {
        &self.state
    }

    pub fn mode(&self) -> NodeMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: NodeMode) {
        self.mode = mode;
    }

    /// Mode code used in the data log: comm activity shadows the node
    /// mode.
    pub fn mode_code(&self) -> u8 {
        match self.comm.mode() {
            CommMode::Transmitting => 2,
            CommMode::Receiving => 3,
            CommMode::Free => match self.mode {
                NodeMode::Sensing => 1,
                _ => 0,
            },
        }
    }

    pub fn comm(&self) -> &CommSubsystem {
        &self.comm
    }

    pub fn comm_mut(&mut self) -> &mut CommSubsystem {
        &mut self.comm
    }

    pub fn sensing(&self) -> &SensingSubsystem {
        &self.sensing
    }

    pub fn power(&self) -> &PowerSubsystem {
        &self.power
    }

    pub fn power_mut(&mut self) -> &mut PowerSubsystem {
        &mut self.power
    }

    pub fn measurements(&self) -> &[(u64, u16)] {
        &self.measurements
    }

    pub fn min_suggestions(&self) -> &[Geodetic] {
        &self.min_suggestions
    }

    pub fn max_suggestions(&self) -> &[Geodetic] {
        &self.max_suggestions
    }

    pub fn take_min_suggestions(&mut self) -> Vec<Geodetic> {
        std::mem::take(&mut self.min_suggestions)
    }

    pub fn take_max_suggestions(&mut self) -> Vec<Geodetic> {
        std::mem::take(&mut self.max_suggestions)
    }

    pub fn take_feedback(&mut self) -> Vec<(bool, u16)> {
        std::mem::take(&mut self.feedback)
    }

    pub fn target_index(&self) -> Option<u16> {
        self.target_index
    }

    pub fn num_neighbors(&self) -> u16 {
        self.num_neighbors
    }

    pub fn set_num_neighbors(&mut self, num_neighbors: u16) {
        self.num_neighbors = num_neighbors;
    }

    pub fn set_comm_buffer(&mut self, buffer: Vec<u8>) {
        self.comm.set_data_buffer(buffer);
    }
}

/// Disjoint mutable access to a transmitter/receiver pair.
pub fn pair_mut(nodes: &mut [Node], a: usize, b: usize) -> (&mut Node, &mut Node) {
    assert!(a != b, "channel endpoints must differ");
    if a < b {
        let (left, right) = nodes.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = nodes.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
