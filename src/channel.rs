//! One in-flight transfer between a transmitter/receiver node pair.
//!
//! States: Idle -> Opened -> Active -> {Completed, Broken}; `active`,
//! `success` and `error` encode them the way the arbitration loop
//! consumes them.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::antenna::antenna_gain_db;
use crate::clock::SimulationClock;
use crate::earth;
use crate::math::Vector;
use crate::node::{pair_mut, Node, NodeMode};
use crate::subsystems::CommMode;

pub const SPEED_OF_LIGHT_M_PER_S: f64 = 299_792_458.0;
/// Gains at or below this threshold count as a closed link.
const MIN_GAIN_DB: f64 = 0.0001;

/// Line-of-sight model for link geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occlusion {
    /// The WGS84 ellipsoid blocks links (normal operation).
    Ellipsoid,
    /// No occlusion test; links are limited by antenna gain alone.
    Disabled,
}

/// One logged tick of an active transfer.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelTraceRow {
    pub tick: u64,
    pub tx: u16,
    pub rx: u16,
    pub distance_m: f64,
    pub los_speed_m_per_s: f64,
    pub omega_rad_per_s: f64,
    pub delay_s: f64,
    pub data_rate_bits_per_s: f64,
    pub tx_buffer_bytes: u64,
    pub rx_buffer_bytes: u64,
    pub tx_gain_db: f64,
    pub rx_gain_db: f64,
    pub tx_power_w: f64,
    pub rx_power_w: f64,
    pub tx_latitude_rad: f64,
    pub tx_longitude_rad: f64,
    pub tx_altitude_m: f64,
    pub rx_latitude_rad: f64,
    pub rx_longitude_rad: f64,
    pub rx_altitude_m: f64,
}

/// Transfer state machine bound to one (tx, rx) index pair.
pub struct Channel {
    tx: u16,
    rx: u16,
    data_rate_bits_per_s: f64,
    omega_rad_per_s: f64,
    rx_power_w: f64,
    rx_gain_db: f64,
    rx_los_unit: Vector,
    tx_power_w: f64,
    tx_gain_db: f64,
    tx_los_unit: Vector,
    los_speed_m_per_s: f64,
    distance_m: f64,
    delay_s: f64,
    active: bool,
    open: bool,
    error: bool,
    success: bool,
    fake_tx_buffer_bytes: u64,
    fake_rx_buffer_bytes: u64,
    trace: Vec<ChannelTraceRow>,
}

impl Channel {
    /// Binds a channel to a pair; the data rate is the slower of the
    /// transmitter's uplink and the receiver's downlink.
    pub fn new(nodes: &[Node], tx: u16, rx: u16) -> Self {
        let tx_rate = nodes[tx as usize].comm().modem().tx_rate_bits_per_s() as f64;
        let rx_rate = nodes[rx as usize].comm().modem().rx_rate_bits_per_s() as f64;
        Self {
            tx,
            rx,
            data_rate_bits_per_s: tx_rate.min(rx_rate),
            omega_rad_per_s: 0.0,
            rx_power_w: 0.0,
            rx_gain_db: 0.0,
            rx_los_unit: Vector::default(),
            tx_power_w: 0.0,
            tx_gain_db: 0.0,
            tx_los_unit: Vector::default(),
            los_speed_m_per_s: 0.0,
            distance_m: 0.0,
            delay_s: 0.0,
            active: false,
            open: false,
            error: false,
            success: false,
            fake_tx_buffer_bytes: 0,
            fake_rx_buffer_bytes: 0,
            trace: Vec::new(),
        }
    }

    /// Begins the transfer. Requires both endpoints free; snapshots the
    /// transmitter's buffer length as the fake byte counter.
    pub fn start(&mut self, nodes: &mut [Node]) {
        let (tx_node, rx_node) = pair_mut(nodes, self.tx as usize, self.rx as usize);
        if tx_node.mode() != NodeMode::Free || rx_node.mode() != NodeMode::Free {
            self.error = true;
            return;
        }
        self.fake_tx_buffer_bytes = tx_node.comm().data_buffer().len() as u64;
        self.fake_rx_buffer_bytes = 0;
        if self.fake_tx_buffer_bytes == 0 {
            self.error = true;
            return;
        }
        tx_node.set_mode(NodeMode::Carrying);
        rx_node.set_mode(NodeMode::Carrying);
        tx_node.comm_mut().set_mode(CommMode::Transmitting);
        rx_node.comm_mut().set_mode(CommMode::Receiving);
        self.active = true;
    }

    /// Recomputes the link geometry for this tick and, when active,
    /// advances the transfer.
    pub fn update(&mut self, clock: &SimulationClock, nodes: &mut [Node], occlusion: Occlusion) {
        let (tx_node, rx_node) = pair_mut(nodes, self.tx as usize, self.rx as usize);
        let tx_position = *tx_node.state().position_m();
        let rx_position = *rx_node.state().position_m();
        let in_sight =
            occlusion == Occlusion::Disabled || earth::visible(&tx_position, &rx_position);
        if !in_sight {
            self.open = false;
            if self.active {
                self.break_transfer(tx_node, rx_node);
            }
            return;
        }
        self.tx_los_unit = (rx_position - tx_position).unit();
        self.rx_los_unit = (tx_position - rx_position).unit();
        self.update_gains(tx_node, rx_node);
        self.open = self.tx_gain_db > MIN_GAIN_DB && self.rx_gain_db > MIN_GAIN_DB;
        self.distance_m = (tx_position - rx_position).norm();
        self.update_los_speed(tx_node, rx_node);
        self.update_omega(tx_node, rx_node);
        self.delay_s = self.distance_m / SPEED_OF_LIGHT_M_PER_S;
        self.update_power(tx_node);
        if self.active {
            if self.open {
                self.buffer_trace(clock, tx_node, rx_node);
                self.fake_transfer(clock);
                if self.fake_tx_buffer_bytes == 0 {
                    self.success = true;
                    rx_node.set_comm_buffer(tx_node.comm().data_buffer().to_vec());
                    free_pair(tx_node, rx_node);
                }
            } else {
                self.break_transfer(tx_node, rx_node);
            }
        }
    }

    fn break_transfer(&mut self, tx_node: &mut Node, rx_node: &mut Node) {
        self.error = true;
        free_pair(tx_node, rx_node);
    }

    fn update_gains(&mut self, tx_node: &Node, rx_node: &Node) {
        let tx_state = tx_node.state();
        self.tx_gain_db = antenna_gain_db(
            tx_node.comm().antenna(),
            tx_node.comm().antenna_frame(),
            tx_state.orbit_frame(),
            tx_state.body_frame(),
            &self.tx_los_unit,
        );
        let rx_state = rx_node.state();
        self.rx_gain_db = antenna_gain_db(
            rx_node.comm().antenna(),
            rx_node.comm().antenna_frame(),
            rx_state.orbit_frame(),
            rx_state.body_frame(),
            &self.rx_los_unit,
        );
    }

    fn update_los_speed(&mut self, tx_node: &Node, rx_node: &Node) {
        let relative =
            *tx_node.state().velocity_m_per_s() - *rx_node.state().velocity_m_per_s();
        self.los_speed_m_per_s = relative.dot(&self.tx_los_unit);
    }

    /// Channel ω: the slower modem's carrier, Doppler-scaled by
    /// `(1 + v_los/c)` with `v_los = (v_tx - v_rx) · û(tx->rx)`.
    fn update_omega(&mut self, tx_node: &Node, rx_node: &Node) {
        let tx_omega = tx_node.comm().modem().tx_omega_rad_per_s();
        let rx_omega = rx_node.comm().modem().rx_omega_rad_per_s();
        let factor = 1.0 + self.los_speed_m_per_s / SPEED_OF_LIGHT_M_PER_S;
        self.omega_rad_per_s = tx_omega.min(rx_omega) * factor;
    }

    fn update_power(&mut self, tx_node: &Node) {
        self.tx_power_w = tx_node.comm().modem().tx_rf_power_w();
        let lambda_m = SPEED_OF_LIGHT_M_PER_S / (self.omega_rad_per_s / (2.0 * PI));
        let path = (lambda_m / (4.0 * PI * self.distance_m)).powi(2);
        self.rx_power_w = self.tx_power_w * self.tx_gain_db * self.rx_gain_db * path;
    }

    fn fake_transfer(&mut self, clock: &SimulationClock) {
        let drained = (clock.last_increment_s() as f64 * self.data_rate_bits_per_s / 8.0) as u64;
        let drained = drained.min(self.fake_tx_buffer_bytes);
        self.fake_tx_buffer_bytes -= drained;
        self.fake_rx_buffer_bytes += drained;
    }

    fn buffer_trace(&mut self, clock: &SimulationClock, tx_node: &Node, rx_node: &Node) {
        let tx_geo = tx_node.state().geodetic();
        let rx_geo = rx_node.state().geodetic();
        self.trace.push(ChannelTraceRow {
            tick: clock.ticks(),
            tx: self.tx,
            rx: self.rx,
            distance_m: self.distance_m,
            los_speed_m_per_s: self.los_speed_m_per_s,
            omega_rad_per_s: self.omega_rad_per_s,
            delay_s: self.delay_s,
            data_rate_bits_per_s: self.data_rate_bits_per_s,
            tx_buffer_bytes: self.fake_tx_buffer_bytes,
            rx_buffer_bytes: self.fake_rx_buffer_bytes,
            tx_gain_db: self.tx_gain_db,
            rx_gain_db: self.rx_gain_db,
            tx_power_w: self.tx_power_w,
            rx_power_w: self.rx_power_w,
            tx_latitude_rad: tx_geo.latitude_rad,
            tx_longitude_rad: tx_geo.longitude_rad,
            tx_altitude_m: tx_geo.altitude_m,
            rx_latitude_rad: rx_geo.latitude_rad,
            rx_longitude_rad: rx_geo.longitude_rad,
            rx_altitude_m: rx_geo.altitude_m,
        });
    }

    pub fn tx(&self) -> u16 {
        self.tx
    }

    pub fn rx(&self) -> u16 {
        self.rx
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn open(&self) -> bool {
        self.open
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn rx_power_w(&self) -> f64 {
        self.rx_power_w
    }

    /// Whole seconds the transmitter's current buffer needs on this link.
    pub fn predict_transfer_duration_s(&self, nodes: &[Node]) -> u64 {
        let tx_node = &nodes[self.tx as usize];
        tx_node
            .comm()
            .required_transfer_duration_s(tx_node.comm().data_buffer().len() as u64)
    }

    pub fn take_trace(&mut self) -> Vec<ChannelTraceRow> {
        std::mem::take(&mut self.trace)
    }
}

fn free_pair(tx_node: &mut Node, rx_node: &mut Node) {
    tx_node.set_mode(NodeMode::Free);
    rx_node.set_mode(NodeMode::Free);
    tx_node.comm_mut().set_mode(CommMode::Free);
    rx_node.comm_mut().set_mode(CommMode::Free);
}
