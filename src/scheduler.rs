//! Per-tick scheduling pass: predict which satellite will next overfly a
//! recommended target, search the time-expanded contact graph for a
//! store-and-forward route that beats the overflight, and queue the
//! control packets.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::channel::{Channel, Occlusion};
use crate::clock::SimulationClock;
use crate::earth::{self, Geodetic, SEMI_MAJOR_AXIS_M};
use crate::node::{Node, UpdateOptions};
use crate::packet::{
    ForwardPacket, PacketError, ReturnPacket, Route, SensingEvent, Transfer, FORWARD_PACKET_BYTES,
};
use crate::sun::Sun;
use crate::tree::ContactTree;

/// Fixed measurement radius around a destination (meters).
const MEASUREMENT_RADIUS_M: f64 = 50_000.0;
/// Visitor search window and step (seconds of offset from now).
const VISITOR_SEARCH_START_S: u64 = 300;
const VISITOR_SEARCH_STOP_S: u64 = 5000;
const VISITOR_SEARCH_STEP_S: u64 = 1;
/// Initial contact-tree height.
const INITIAL_TREE_HEIGHT: u16 = 5;
/// Distance charged to a sink whose boresight misses the ellipsoid.
const MISS_DISTANCE_M: f64 = PI * SEMI_MAJOR_AXIS_M;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub source_constellation: u16,
    pub min_sink_constellation: u16,
    pub max_sink_constellation: u16,
    pub feedback_constellation: u16,
    pub feedback_limit_s: u64,
    pub occlusion: Occlusion,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            source_constellation: 0,
            min_sink_constellation: 2,
            max_sink_constellation: 1,
            feedback_constellation: 1,
            feedback_limit_s: 1500,
            occlusion: Occlusion::Ellipsoid,
        }
    }
}

/// The informer -> sink scheduler.
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// One scheduling pass over all nodes. Sources with fresh suggestions
    /// dispatch forward packets; sinks with pending feedback dispatch
    /// return packets. Suggestion and feedback lists are consumed either
    /// way.
    pub fn update(
        &self,
        nodes: &mut [Node],
        clock: &SimulationClock,
        sun: &Sun,
    ) -> Result<(), PacketError> {
        let sources: Vec<u16> = nodes
            .iter()
            .filter(|node| node.constellation() == self.config.source_constellation)
            .map(Node::index)
            .collect();
        let sinks: Vec<u16> = nodes
            .iter()
            .filter(|node| node.constellation() == self.config.feedback_constellation)
            .map(Node::index)
            .collect();
        for &source in &sources {
            let contact_s = nodes[source as usize]
                .comm()
                .required_transfer_duration_s(FORWARD_PACKET_BYTES as u64);
            let min_suggestions = nodes[source as usize].take_min_suggestions();
            if !min_suggestions.is_empty() {
                self.dispatch_forward(
                    nodes,
                    clock,
                    sun,
                    source,
                    &min_suggestions,
                    self.config.min_sink_constellation,
                    contact_s,
                )?;
            }
            let max_suggestions = nodes[source as usize].take_max_suggestions();
            if !max_suggestions.is_empty() {
                self.dispatch_forward(
                    nodes,
                    clock,
                    sun,
                    source,
                    &max_suggestions,
                    self.config.max_sink_constellation,
                    contact_s,
                )?;
            }
        }
        for &sink in &sinks {
            let contact_s = nodes[sink as usize]
                .comm()
                .required_transfer_duration_s(FORWARD_PACKET_BYTES as u64);
            for (success, origin) in nodes[sink as usize].take_feedback() {
                if usize::from(origin) >= nodes.len() {
                    continue;
                }
                info!(
                    "[{}] predicting N{}>...>N{} within {} s",
                    clock, sink, origin, self.config.feedback_limit_s
                );
                let route = self.find_route(
                    nodes,
                    clock,
                    sun,
                    sink,
                    origin,
                    contact_s,
                    self.config.feedback_limit_s,
                );
                if route.is_empty() {
                    continue;
                }
                info!("[{}] route found: {}", clock, route_log(sink, &route));
                let constellation = nodes[sink as usize].constellation();
                let packet = ReturnPacket::new(bounded_route(&route)?, success, constellation);
                nodes[sink as usize].set_comm_buffer(packet.encode());
                nodes[sink as usize].address_comm_buffer(clock)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_forward(
        &self,
        nodes: &mut [Node],
        clock: &SimulationClock,
        sun: &Sun,
        source: u16,
        destinations: &[Geodetic],
        sink_constellation: u16,
        contact_s: u64,
    ) -> Result<(), PacketError> {
        let Some((visitor, prediction_s)) =
            self.next_visitor(nodes, clock, sun, destinations, sink_constellation)
        else {
            return Ok(());
        };
        let half_integration_s = nodes[visitor as usize].sensing().sensor().duration_s() / 2;
        let limit_s = prediction_s.saturating_sub(half_integration_s);
        info!(
            "[{}] predicting N{}>...>N{} within {} s",
            clock, source, visitor, limit_s
        );
        let route = self.find_route(nodes, clock, sun, source, visitor, contact_s, limit_s);
        if route.is_empty() {
            return Ok(());
        }
        info!("[{}] route found: {}", clock, route_log(source, &route));
        let packet = ForwardPacket::new(
            bounded_route(&route)?,
            SensingEvent {
                target: visitor,
                elapsed_s: clock.elapsed_s() + limit_s,
            },
            source,
        );
        nodes[source as usize].set_comm_buffer(packet.encode());
        nodes[source as usize].address_comm_buffer(clock)
    }

    /// Earliest `(node, offset_s)` in the sink constellation whose sensor
    /// boresight passes within the measurement radius of any destination,
    /// scanning destinations in order. Every queried node is restored to
    /// offset zero before returning.
    pub fn next_visitor(
        &self,
        nodes: &mut [Node],
        clock: &SimulationClock,
        sun: &Sun,
        destinations: &[Geodetic],
        sink_constellation: u16,
    ) -> Option<(u16, u64)> {
        if destinations.is_empty() {
            return None;
        }
        let sinks: Vec<u16> = nodes
            .iter()
            .filter(|node| node.constellation() == sink_constellation)
            .map(Node::index)
            .collect();
        if sinks.is_empty() {
            return None;
        }
        // Per-sink wait counters prune re-probing a node until it could
        // plausibly have closed its current miss distance.
        let mut wait_interval = vec![0u64; sinks.len()];
        let mut offset_s = VISITOR_SEARCH_START_S;
        while offset_s < VISITOR_SEARCH_STOP_S {
            for (slot, &sink) in sinks.iter().enumerate() {
                if wait_interval[slot] > 0 {
                    wait_interval[slot] -= 1;
                    continue;
                }
                let mut min_distance_m = f64::MAX;
                for destination in destinations {
                    let distance_m =
                        self.node_sensor_distance(nodes, clock, sun, sink, destination, offset_s);
                    if distance_m < MEASUREMENT_RADIUS_M {
                        return Some((sink, offset_s));
                    }
                    if distance_m < min_distance_m {
                        min_distance_m = distance_m;
                    }
                }
                let mut velocity = *nodes[sink as usize].state().velocity_m_per_s();
                velocity.complete_coordinates();
                let speed_m_per_s = velocity.r_m();
                if speed_m_per_s > 0.0 {
                    wait_interval[slot] =
                        (min_distance_m / speed_m_per_s / VISITOR_SEARCH_STEP_S as f64) as u64;
                }
            }
            offset_s += VISITOR_SEARCH_STEP_S;
        }
        None
    }

    /// Great-circle distance between a destination and the node's
    /// boresight ground point at `offset_s`. The node is re-propagated
    /// for the query and restored to offset zero before returning.
    fn node_sensor_distance(
        &self,
        nodes: &mut [Node],
        clock: &SimulationClock,
        sun: &Sun,
        index: u16,
        destination: &Geodetic,
        offset_s: u64,
    ) -> f64 {
        let node = &mut nodes[index as usize];
        node.update(clock, sun, offset_s, UpdateOptions::ORIENT_SENSING);
        let axis = *node.sensing().antenna_frame().z_axis();
        let position = *node.state().position_m();
        let ground = earth::boresight_intersection(&position, &axis, clock, offset_s);
        node.update(clock, sun, 0, UpdateOptions::ORIENT_SENSING);
        match ground {
            Some(ground) => destination.haversine_m(&ground),
            None => MISS_DISTANCE_M,
        }
    }

    /// Searches the time-expanded contact graph for a route that delivers
    /// a `contact_s`-sized packet from `start` to `end` by `limit_s`.
    /// Returns hops as `(node, absolute start time)`; empty when no route
    /// exists. All nodes are restored to offset zero before returning.
    #[allow(clippy::too_many_arguments)]
    pub fn find_route(
        &self,
        nodes: &mut [Node],
        clock: &SimulationClock,
        sun: &Sun,
        start: u16,
        end: u16,
        contact_s: u64,
        limit_s: u64,
    ) -> Vec<Transfer> {
        let count = nodes.len();
        let mut level = vec![u16::MAX; count];
        let mut rcvd = vec![u64::MAX; count];
        let mut tx_indices: BTreeSet<u16> = BTreeSet::new();
        let mut tree = ContactTree::new(start, INITIAL_TREE_HEIGHT, end);
        tx_indices.insert(start);
        rcvd[start as usize] = 0;
        level[start as usize] = 0;
        let mut finished = false;
        let mut s = 0u64;
        while !finished && limit_s > contact_s && s < limit_s - contact_s {
            // A node transmits only once its first reception is complete.
            for index in 0..count {
                if rcvd[index] <= s {
                    tx_indices.insert(index as u16);
                }
            }
            let transmitting: Vec<u16> = tx_indices.iter().copied().collect();
            for tx in transmitting {
                if finished {
                    break;
                }
                if level[tx as usize] >= tree.height() {
                    continue;
                }
                let candidates: Vec<u16> = (0..count as u16)
                    .filter(|&rx| rx != tx && level[rx as usize] > level[tx as usize] + 1)
                    .collect();
                let reachable = self.find_gains_from(nodes, clock, sun, tx, s, &candidates);
                for rx in reachable {
                    if let Some(window_start_s) =
                        self.confirm(nodes, clock, sun, tx, rx, contact_s, s, rcvd[tx as usize])
                    {
                        let got_s = window_start_s + contact_s;
                        if let Some(parent) = tree.search_specific(tx, rcvd[tx as usize]) {
                            if let Some(child) = tree.add_child(parent, rx, got_s) {
                                level[rx as usize] = tree.branch(child).level;
                                if got_s < rcvd[rx as usize] {
                                    rcvd[rx as usize] = got_s;
                                }
                                if rx == end {
                                    tree.set_height(level[tx as usize].saturating_sub(1));
                                    if tx == start {
                                        finished = true;
                                    }
                                }
                            }
                        }
                    }
                    if rcvd[rx as usize] <= s {
                        tx_indices.insert(rx);
                    }
                    if finished {
                        break;
                    }
                }
            }
            s += contact_s;
        }
        self.restore(nodes, clock, sun);
        make_route(&tree, clock, end, contact_s)
    }

    /// Candidates in sight of `tx` at offset `s` with both antennas
    /// pointed well enough for an open channel.
    fn find_gains_from(
        &self,
        nodes: &mut [Node],
        clock: &SimulationClock,
        sun: &Sun,
        tx: u16,
        offset_s: u64,
        candidates: &[u16],
    ) -> Vec<u16> {
        nodes[tx as usize].update(clock, sun, offset_s, UpdateOptions::ORIENT_COMM);
        let mut reachable = Vec::new();
        for &rx in candidates {
            nodes[rx as usize].update(clock, sun, offset_s, UpdateOptions::ORIENT_COMM);
            let tx_position = *nodes[tx as usize].state().position_m();
            let rx_position = *nodes[rx as usize].state().position_m();
            if self.config.occlusion == Occlusion::Disabled
                || earth::visible(&tx_position, &rx_position)
            {
                let mut channel = Channel::new(nodes, tx, rx);
                channel.update(clock, nodes, self.config.occlusion);
                if channel.open() {
                    reachable.push(rx);
                }
            }
        }
        reachable
    }

    /// Confirms a full `duration_s`-second window around offset
    /// `original_s`: marches backwards one second at a time while the
    /// channel stays open, bounded below by `max(s - duration, rcvd[tx])`,
    /// then re-checks the window end. Returns the window start offset.
    /// Both nodes are restored to `original_s`.
    #[allow(clippy::too_many_arguments)]
    fn confirm(
        &self,
        nodes: &mut [Node],
        clock: &SimulationClock,
        sun: &Sun,
        tx: u16,
        rx: u16,
        duration_s: u64,
        original_s: u64,
        lower_limit_s: u64,
    ) -> Option<u64> {
        let mut channel = Channel::new(nodes, tx, rx);
        channel.update(clock, nodes, self.config.occlusion);
        let earliest_s = original_s.saturating_sub(duration_s).max(lower_limit_s);
        let mut s = original_s;
        while s > earliest_s && channel.open() {
            self.reorient_pair(nodes, clock, sun, tx, rx, s);
            channel.update(clock, nodes, self.config.occlusion);
            s -= 1;
        }
        // The march overshoots by one; step forward to the first open tick.
        while !channel.open() {
            s += 1;
            if s > original_s {
                self.reorient_pair(nodes, clock, sun, tx, rx, original_s);
                return None;
            }
            self.reorient_pair(nodes, clock, sun, tx, rx, s);
            channel.update(clock, nodes, self.config.occlusion);
        }
        let window_start_s = s;
        self.reorient_pair(nodes, clock, sun, tx, rx, window_start_s + duration_s);
        channel.update(clock, nodes, self.config.occlusion);
        let confirmed = channel.open();
        self.reorient_pair(nodes, clock, sun, tx, rx, original_s);
        confirmed.then_some(window_start_s)
    }

    fn reorient_pair(
        &self,
        nodes: &mut [Node],
        clock: &SimulationClock,
        sun: &Sun,
        tx: u16,
        rx: u16,
        offset_s: u64,
    ) {
        nodes[tx as usize].update(clock, sun, offset_s, UpdateOptions::ORIENT_COMM);
        nodes[rx as usize].update(clock, sun, offset_s, UpdateOptions::ORIENT_COMM);
    }

    fn restore(&self, nodes: &mut [Node], clock: &SimulationClock, sun: &Sun) {
        for node in nodes.iter_mut() {
            node.update(clock, sun, 0, UpdateOptions::RESTORE);
        }
    }
}

/// Walks the tree back from the destination and emits the hop list with
/// absolute start times.
fn make_route(
    tree: &ContactTree,
    clock: &SimulationClock,
    end: u16,
    contact_s: u64,
) -> Vec<Transfer> {
    let Some(found) = tree.search(end) else {
        return Vec::new();
    };
    tree.ancestry(found)
        .iter()
        .skip(1)
        .map(|&index| {
            let branch = tree.branch(index);
            Transfer {
                node: branch.node,
                start_s: clock.elapsed_s() + branch.rx_time_s - contact_s,
            }
        })
        .collect()
}

fn bounded_route(transfers: &[Transfer]) -> Result<Route, PacketError> {
    let mut route = Route::new();
    for &transfer in transfers {
        route.push(transfer).map_err(|_| PacketError::RouteOverflow {
            hops: transfers.len(),
        })?;
    }
    Ok(route)
}

fn route_log(start: u16, route: &[Transfer]) -> String {
    let mut text = format!("N{}", start);
    for transfer in route {
        text.push_str(&format!(">N{}", transfer.node));
    }
    text
}
