use crate::antenna::Antenna;
use crate::clock::SimulationClock;
use crate::math::ReferenceFrame;
use crate::modem::Modem;
use crate::packet::{ForwardPacket, ReturnPacket};

const BITS_PER_BYTE: f64 = 8.0;
/// Fixed guard added to every predicted transfer window (seconds).
const TRANSFER_GUARD_S: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommMode {
    Free,
    Transmitting,
    Receiving,
}

/// A plan to transfer a forward packet to another node no earlier than a
/// given elapsed time.
#[derive(Debug, Clone)]
pub struct CommunicationEvent {
    pub recipient: u16,
    pub earliest_s: u64,
    pub packet: ForwardPacket,
}

/// A plan to return a feedback packet toward its origin.
#[derive(Debug, Clone)]
pub struct FeedbackEvent {
    pub recipient: u16,
    pub earliest_s: u64,
    pub packet: ReturnPacket,
}

/// Communications subsystem: modem, steerable antenna frame, the node's
/// data buffer and the outbox of time-tagged transfer plans.
#[derive(Debug, Clone)]
pub struct CommSubsystem {
    modem: Modem,
    antenna: Antenna,
    antenna_frame: ReferenceFrame,
    mode: CommMode,
    outbox: Vec<CommunicationEvent>,
    feedback_outbox: Vec<FeedbackEvent>,
    data_buffer: Vec<u8>,
}

impl CommSubsystem {
    pub fn new(antenna: Antenna, modem: Modem) -> Self {
        let antenna_frame = antenna.mounting_frame();
        Self {
            modem,
            antenna,
            antenna_frame,
            mode: CommMode::Free,
            outbox: Vec::new(),
            feedback_outbox: Vec::new(),
            data_buffer: Vec::new(),
        }
    }

    /// Drains the first matured outbox entry into the data buffer and
    /// returns its recipient. Forward events are considered before
    /// feedback events; entries mature strictly after their tag.
    pub fn poll_outbox(&mut self, clock: &SimulationClock) -> Option<u16> {
        if let Some(position) = self
            .outbox
            .iter()
            .position(|event| clock.elapsed_s() > event.earliest_s)
        {
            let event = self.outbox.remove(position);
            self.data_buffer = event.packet.encode();
            return Some(event.recipient);
        }
        if let Some(position) = self
            .feedback_outbox
            .iter()
            .position(|event| clock.elapsed_s() > event.earliest_s)
        {
            let event = self.feedback_outbox.remove(position);
            self.data_buffer = event.packet.encode();
            return Some(event.recipient);
        }
        None
    }

    /// Whole seconds needed to move `buffer_bytes` through the slower of
    /// the two modem directions, plus a fixed guard.
    pub fn required_transfer_duration_s(&self, buffer_bytes: u64) -> u64 {
        let tx_seconds =
            buffer_bytes as f64 * BITS_PER_BYTE / self.modem.tx_rate_bits_per_s() as f64;
        let rx_seconds =
            buffer_bytes as f64 * BITS_PER_BYTE / self.modem.rx_rate_bits_per_s() as f64;
        tx_seconds.max(rx_seconds).ceil() as u64 + TRANSFER_GUARD_S
    }

    pub fn power_drain_w(&self) -> f64 {
        match self.mode {
            CommMode::Transmitting => self.modem.tx_consumed_power_w(),
            CommMode::Receiving => self.modem.rx_consumed_power_w(),
            CommMode::Free => 0.0,
        }
    }

    pub fn orient_antenna(&mut self, orbit_frame: &ReferenceFrame, body_frame: &ReferenceFrame) {
        self.antenna_frame.update2(orbit_frame, body_frame);
    }

    pub fn queue_event(&mut self, event: CommunicationEvent) {
        self.outbox.push(event);
    }

    pub fn queue_feedback(&mut self, event: FeedbackEvent) {
        self.feedback_outbox.push(event);
    }

    pub fn modem(&self) -> &Modem {
        &self.modem
    }

    pub fn antenna(&self) -> &Antenna {
        &self.antenna
    }

    pub fn antenna_frame(&self) -> &ReferenceFrame {
        &self.antenna_frame
    }

    pub fn mode(&self) -> CommMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CommMode) {
        self.mode = mode;
    }

    pub fn data_buffer(&self) -> &[u8] {
        &self.data_buffer
    }

    pub fn set_data_buffer(&mut self, buffer: Vec<u8>) {
        self.data_buffer = buffer;
    }

    pub fn erase_data_buffer(&mut self) {
        self.data_buffer.clear();
    }

    pub fn outbox_len(&self) -> usize {
        self.outbox.len() + self.feedback_outbox.len()
    }

    pub fn outbox(&self) -> &[CommunicationEvent] {
        &self.outbox
    }

    pub fn feedback_outbox(&self) -> &[FeedbackEvent] {
        &self.feedback_outbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{route_from_hops, SensingEvent};

    fn subsystem() -> CommSubsystem {
        CommSubsystem::new(Antenna::isotropic(30.0), Modem::uhf_deploy())
    }

    fn forward(recipient: u16, earliest_s: u64) -> CommunicationEvent {
        CommunicationEvent {
            recipient,
            earliest_s,
            packet: ForwardPacket::new(
                route_from_hops(&[(recipient, earliest_s)]).unwrap(),
                SensingEvent {
                    target: recipient,
                    elapsed_s: earliest_s + 100,
                },
                0,
            ),
        }
    }

    #[test]
    fn transfer_duration_has_the_fixed_guard() {
        let comm = subsystem();
        // 1080 bytes at 9600 bit/s both ways: ceil(0.9) + 3.
        assert_eq!(comm.required_transfer_duration_s(1080), 4);
        // 312 bytes: ceil(0.26) + 3.
        assert_eq!(comm.required_transfer_duration_s(312), 4);
        assert_eq!(comm.required_transfer_duration_s(0), 3);
    }

    #[test]
    fn outbox_entries_mature_strictly_after_their_tag() {
        let mut comm = subsystem();
        let mut clock = SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap();
        comm.queue_event(forward(4, 10));
        clock.tick(10);
        assert_eq!(comm.poll_outbox(&clock), None);
        clock.tick(1);
        assert_eq!(comm.poll_outbox(&clock), Some(4));
        assert_eq!(comm.data_buffer().len(), crate::packet::FORWARD_PACKET_BYTES);
        assert_eq!(comm.outbox_len(), 0);
    }

    #[test]
    fn earlier_queued_forward_event_wins() {
        let mut comm = subsystem();
        let mut clock = SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap();
        comm.queue_event(forward(2, 0));
        comm.queue_event(forward(8, 0));
        clock.tick(5);
        assert_eq!(comm.poll_outbox(&clock), Some(2));
        assert_eq!(comm.poll_outbox(&clock), Some(8));
        assert_eq!(comm.poll_outbox(&clock), None);
    }
}
