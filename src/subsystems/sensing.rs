use tracing::debug;

use crate::antenna::Antenna;
use crate::clock::SimulationClock;
use crate::earth;
use crate::math::{ReferenceFrame, Vector};
use crate::packet::RawPacket;
use crate::sensor::Sensor;

const NO_INFORMER: u16 = u16::MAX;

/// Sensing subsystem: one sensor behind a steerable antenna. An
/// integration runs for the sensor's duration, appending one raw packet
/// per tick at the boresight ground point, then flags completion.
#[derive(Debug, Clone)]
pub struct SensingSubsystem {
    sensor: Sensor,
    antenna: Antenna,
    antenna_frame: ReferenceFrame,
    active: bool,
    complete: bool,
    informer_index: u16,
    elapsed_s: u64,
    expiration_s: u64,
    data_buffer: Vec<u8>,
}

impl SensingSubsystem {
    pub fn new(antenna: Antenna, sensor: Sensor) -> Self {
        let antenna_frame = antenna.mounting_frame();
        Self {
            sensor,
            antenna,
            antenna_frame,
            active: false,
            complete: false,
            informer_index: NO_INFORMER,
            elapsed_s: 0,
            expiration_s: u64::MAX,
            data_buffer: Vec::new(),
        }
    }

    /// Starts one integration on behalf of `informer_index` (`u16::MAX`
    /// for self-initiated samples).
    pub fn measure(&mut self, informer_index: u16) {
        self.active = true;
        self.informer_index = informer_index;
        self.elapsed_s = 0;
        self.expiration_s = self.sensor.duration_s();
    }

    /// Advances one tick; returns whether an integration is still running.
    pub fn update(
        &mut self,
        clock: &SimulationClock,
        position_m: &Vector,
        node_index: u16,
    ) -> bool {
        if !self.active {
            return false;
        }
        if let Some(ground) = earth::boresight_intersection(
            position_m,
            self.antenna_frame.z_axis(),
            clock,
            0,
        ) {
            let measurement = self.sensor.measure(
                ground.latitude_rad,
                ground.longitude_rad,
                clock.elapsed_s(),
            );
            let packet = RawPacket::new(
                clock.elapsed_s(),
                clock.calendar(),
                ground,
                measurement,
                0.0,
                self.sensor.variable(),
                node_index,
            );
            self.data_buffer.extend(packet.encode());
        } else {
            debug!("[{}] N{} boresight misses the ellipsoid", clock, node_index);
        }
        if self.elapsed_s < self.expiration_s {
            self.elapsed_s += clock.last_increment_s();
        } else {
            self.active = false;
            self.complete = true;
            self.expiration_s = u64::MAX;
            self.informer_index = NO_INFORMER;
        }
        self.active
    }

    pub fn orient_antenna(&mut self, orbit_frame: &ReferenceFrame, body_frame: &ReferenceFrame) {
        self.antenna_frame.update2(orbit_frame, body_frame);
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn antenna(&self) -> &Antenna {
        &self.antenna
    }

    pub fn antenna_frame(&self) -> &ReferenceFrame {
        &self.antenna_frame
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn complete(&self) -> bool {
        self.complete
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    pub fn informer_index(&self) -> u16 {
        self.informer_index
    }

    pub fn data_buffer(&self) -> &[u8] {
        &self.data_buffer
    }

    pub fn erase_data_buffer(&mut self) {
        self.data_buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antenna::AntennaKind;
    use crate::packet::RAW_PACKET_BYTES;

    fn nadir_subsystem() -> SensingSubsystem {
        SensingSubsystem::new(
            Antenna::new(AntennaKind::Helical, 30.0, 0.0, 0.0, 0.0),
            Sensor::rain_radar(3),
        )
    }

    #[test]
    fn integration_accumulates_raw_packets_until_expiry() {
        let mut clock = SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap();
        let mut sensing = nadir_subsystem();
        // Frame z axis left at the identity points toward +z; place the
        // node over the pole looking down.
        let position = Vector::new(0.0, 0.0, -(earth::SEMI_MINOR_AXIS_M + 500_000.0));
        clock.tick(1);
        sensing.measure(7);
        let mut ticks = 0;
        while sensing.update(&clock, &position, 3) {
            clock.tick(1);
            ticks += 1;
            assert!(ticks < 100, "integration never completed");
        }
        assert!(sensing.complete());
        assert!(!sensing.active());
        // duration 3 at 1 s ticks: samples at elapsed 0..=3.
        assert_eq!(sensing.data_buffer().len(), 4 * RAW_PACKET_BYTES);
        let records = crate::packet::decode_raw_buffer(sensing.data_buffer()).unwrap();
        assert_eq!(records[0].informer_index, 3);
        assert_eq!(records[0].name.as_str(), "PRECTOT");
    }

    #[test]
    fn idle_subsystem_does_nothing() {
        let clock = SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap();
        let mut sensing = nadir_subsystem();
        let position = Vector::new(0.0, 0.0, 7_000_000.0);
        assert!(!sensing.update(&clock, &position, 0));
        assert!(sensing.data_buffer().is_empty());
    }
}
