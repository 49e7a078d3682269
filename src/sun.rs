use crate::clock::SimulationClock;
use crate::math::Vector;

const AU_M: f64 = 1.495978707e11;

/// Inertial solar position, derived from the clock with a low-precision
/// ephemeris (mean elements, good to a few hundredths of a degree).
///
/// Mutated only by the outermost tick loop; everything else reads it.
#[derive(Debug, Clone, Default)]
pub struct Sun {
    position_m: Vector,
}

impl Sun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the position at `offset_s` seconds past the clock cursor.
    pub fn update(&mut self, clock: &SimulationClock, offset_s: u64) {
        let d = clock.julian_date(offset_s) - 2451545.0;
        let mean_longitude_deg = (280.460 + 0.9856474 * d).rem_euclid(360.0);
        let mean_anomaly_rad = (357.528 + 0.9856003 * d).rem_euclid(360.0).to_radians();
        let ecliptic_longitude_rad = (mean_longitude_deg
            + 1.915 * mean_anomaly_rad.sin()
            + 0.020 * (2.0 * mean_anomaly_rad).sin())
        .to_radians();
        let distance_m = AU_M
            * (1.00014 - 0.01671 * mean_anomaly_rad.cos()
                - 0.00014 * (2.0 * mean_anomaly_rad).cos());
        let obliquity_rad = (23.439 - 0.0000004 * d).to_radians();
        self.position_m = Vector::new(
            distance_m * ecliptic_longitude_rad.cos(),
            distance_m * obliquity_rad.cos() * ecliptic_longitude_rad.sin(),
            distance_m * obliquity_rad.sin() * ecliptic_longitude_rad.sin(),
        );
    }

    pub fn position_m(&self) -> &Vector {
        &self.position_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulationClock;

    #[test]
    fn distance_stays_near_one_au() {
        let clock = SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap();
        let mut sun = Sun::new();
        sun.update(&clock, 0);
        let r = sun.position_m().norm();
        assert!(r > 0.97 * AU_M && r < 1.03 * AU_M);
    }

    #[test]
    fn june_sun_sits_north_of_the_equator() {
        let clock = SimulationClock::from_ymd_hms(2020, 6, 21, 12, 0, 0).unwrap();
        let mut sun = Sun::new();
        sun.update(&clock, 0);
        assert!(sun.position_m().z_m > 0.0);
    }

    #[test]
    fn december_sun_sits_south_of_the_equator() {
        let clock = SimulationClock::from_ymd_hms(2020, 12, 21, 12, 0, 0).unwrap();
        let mut sun = Sun::new();
        sun.update(&clock, 0);
        assert!(sun.position_m().z_m < 0.0);
    }
}
