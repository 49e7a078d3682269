use std::f64::consts::FRAC_PI_2;

use crate::clock::SimulationClock;
use crate::earth;
use crate::math::{ReferenceFrame, Vector};

const SOLAR_IRRADIANCE_W_PER_M2: f64 = 1332.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Energy store with a fixed watt-hour capacity and charging efficiency.
#[derive(Debug, Clone)]
pub struct Battery {
    capacity_w_hr: f64,
    charge_efficiency_percent: f64,
    energy_w_hr: f64,
}

impl Battery {
    /// Built from cell chemistry figures; starts full.
    pub fn new(
        cell_amp_hr: f64,
        num_cells: f64,
        voltage_v: f64,
        charge_efficiency_percent: f64,
    ) -> Self {
        let capacity_w_hr = num_cells * cell_amp_hr * voltage_v;
        Self {
            capacity_w_hr,
            charge_efficiency_percent,
            energy_w_hr: capacity_w_hr,
        }
    }

    /// Adds (or, negative, removes) energy, clamped to `[0, capacity]`.
    pub fn introduce_energy(&mut self, energy_w_hr: f64) {
        self.energy_w_hr = (self.energy_w_hr + energy_w_hr).clamp(0.0, self.capacity_w_hr);
    }

    pub fn set_energy(&mut self, energy_w_hr: f64) {
        self.energy_w_hr = energy_w_hr.clamp(0.0, self.capacity_w_hr);
    }

    pub fn capacity_w_hr(&self) -> f64 {
        self.capacity_w_hr
    }

    pub fn charge_efficiency_percent(&self) -> f64 {
        self.charge_efficiency_percent
    }

    pub fn energy_w_hr(&self) -> f64 {
        self.energy_w_hr
    }
}

/// Solar panel with a fixed body-relative mounting. The effective area is
/// recomputed every tick from eclipse visibility and the angle between
/// the panel normal and the panel-to-sun direction.
#[derive(Debug, Clone)]
pub struct SolarPanel {
    efficiency_percent: f64,
    surface_area_m2: f64,
    attitude: ReferenceFrame,
    effective_area_m2: f64,
}

impl SolarPanel {
    pub fn new(
        efficiency_percent: f64,
        surface_area_m2: f64,
        roll_rad: f64,
        pitch_rad: f64,
        yaw_rad: f64,
    ) -> Self {
        Self {
            efficiency_percent,
            surface_area_m2,
            attitude: ReferenceFrame::from_angles(roll_rad, pitch_rad, yaw_rad),
            effective_area_m2: 0.0,
        }
    }

    pub fn update(
        &mut self,
        body_frame: &ReferenceFrame,
        orbit_frame: &ReferenceFrame,
        position_m: &Vector,
        sun_position_m: &Vector,
    ) {
        self.attitude.update2(orbit_frame, body_frame);
        let toward_sun = *sun_position_m - *position_m;
        let angle_rad = self.attitude.z_axis().angle_between(&toward_sun);
        let lit = earth::visible(position_m, sun_position_m);
        if lit && angle_rad < FRAC_PI_2 {
            self.effective_area_m2 = self.surface_area_m2 * angle_rad.cos();
        } else {
            self.effective_area_m2 = 0.0;
        }
    }

    pub fn received_power_w(&self) -> f64 {
        SOLAR_IRRADIANCE_W_PER_M2 * self.effective_area_m2 * self.efficiency_percent / 100.0
    }

    pub fn effective_area_m2(&self) -> f64 {
        self.effective_area_m2
    }
}

/// Power subsystem: battery, panels and the idle drain.
#[derive(Debug, Clone)]
pub struct PowerSubsystem {
    charging: bool,
    battery: Battery,
    solar_panels: Vec<SolarPanel>,
    idle_power_w: f64,
}

impl PowerSubsystem {
    pub fn new(battery: Battery, solar_panels: Vec<SolarPanel>, idle_power_w: f64) -> Self {
        Self {
            charging: false,
            battery,
            solar_panels,
            idle_power_w,
        }
    }

    /// One tick of the power model: drain idle plus active loads, update
    /// the panels and, if `charge` is set, bank the collected energy.
    /// `charging` reflects panel output regardless of `charge`.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        charge: bool,
        clock: &SimulationClock,
        body_frame: &ReferenceFrame,
        orbit_frame: &ReferenceFrame,
        power_drain_w: f64,
        position_m: &Vector,
        sun_position_m: &Vector,
    ) {
        let dt_hr = clock.last_increment_s() as f64 / SECONDS_PER_HOUR;
        self.battery
            .introduce_energy(-(self.idle_power_w + power_drain_w) * dt_hr);
        let mut collected_w_hr = 0.0;
        let mut charging = false;
        for panel in &mut self.solar_panels {
            panel.update(body_frame, orbit_frame, position_m, sun_position_m);
            collected_w_hr += panel.received_power_w() * dt_hr;
            if panel.received_power_w() > 0.0 {
                charging = true;
            }
        }
        self.charging = charging;
        if charge {
            self.battery
                .introduce_energy(collected_w_hr * self.battery.charge_efficiency_percent() / 100.0);
        }
    }

    pub fn charging(&self) -> bool {
        self.charging
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn battery_mut(&mut self) -> &mut Battery {
        &mut self.battery
    }

    pub fn solar_panels(&self) -> &[SolarPanel] {
        &self.solar_panels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_clamps_to_capacity_and_zero() {
        let mut battery = Battery::new(0.9333, 6.0, 12.9, 85.0);
        let capacity = battery.capacity_w_hr();
        battery.introduce_energy(1000.0);
        assert_eq!(battery.energy_w_hr(), capacity);
        battery.introduce_energy(-2.0 * capacity);
        assert_eq!(battery.energy_w_hr(), 0.0);
        battery.introduce_energy(1.0);
        assert!((battery.energy_w_hr() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn idle_drain_empties_the_battery_and_stays_at_zero() {
        let mut clock = SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap();
        let mut battery = Battery::new(1.0, 1.0, 10.0, 85.0);
        battery.set_energy(10.0);
        let mut power = PowerSubsystem::new(battery, Vec::new(), 1.0);
        let frame = ReferenceFrame::from_angles(0.0, 0.0, 0.0);
        let position = Vector::new(7e6, 0.0, 0.0);
        let sun = Vector::new(1.5e11, 0.0, 0.0);
        clock.tick(3600);
        power.update(true, &clock, &frame, &frame, 0.0, &position, &sun);
        assert!((power.battery().energy_w_hr() - 9.0).abs() < 1e-9);
        assert!(!power.charging());
        for _ in 0..20 {
            clock.tick(3600);
            power.update(true, &clock, &frame, &frame, 0.0, &position, &sun);
        }
        assert_eq!(power.battery().energy_w_hr(), 0.0);
    }

    #[test]
    fn sunlit_panel_charges_and_eclipsed_panel_does_not() {
        let mut clock = SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap();
        clock.tick(60);
        let frame = ReferenceFrame::from_angles(0.0, 0.0, 0.0);
        let sun = Vector::new(1.5e11, 0.0, 0.0);
        // Panel normal (+z of the identity frame) has no component toward
        // the sun from this position, so mount it pitched toward +x.
        let mut panel = SolarPanel::new(29.0, 0.06, 0.0, -FRAC_PI_2, 0.0);
        let sunlit = Vector::new(7e6, 0.0, 0.0);
        panel.update(&frame, &frame, &sunlit, &sun);
        assert!(panel.received_power_w() > 0.0);
        let eclipsed = Vector::new(-7e6, 0.0, 0.0);
        panel.update(&frame, &frame, &eclipsed, &sun);
        assert_eq!(panel.received_power_w(), 0.0);
    }
}
