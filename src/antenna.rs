use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::math::{ReferenceFrame, Vector};

/// Radiation pattern family. The variant set is closed and known at
/// construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AntennaKind {
    Isotropic,
    Dipole,
    Helical,
    Patch,
}

/// Directional antenna with a fixed peak gain and body-relative mounting.
#[derive(Debug, Clone, Copy)]
pub struct Antenna {
    kind: AntennaKind,
    max_gain_db: f64,
    roll_rad: f64,
    pitch_rad: f64,
    yaw_rad: f64,
}

impl Antenna {
    pub fn new(
        kind: AntennaKind,
        max_gain_db: f64,
        roll_rad: f64,
        pitch_rad: f64,
        yaw_rad: f64,
    ) -> Self {
        Self {
            kind,
            max_gain_db,
            roll_rad,
            pitch_rad,
            yaw_rad,
        }
    }

    pub fn isotropic(max_gain_db: f64) -> Self {
        Self::new(AntennaKind::Isotropic, max_gain_db, 0.0, 0.0, 0.0)
    }

    /// Pattern gain for a direction in the antenna frame.
    pub fn gain_db(&self, theta_rad: f64, _phi_rad: f64) -> f64 {
        match self.kind {
            AntennaKind::Isotropic => self.max_gain_db,
            AntennaKind::Dipole => self.max_gain_db * theta_rad.sin().powi(2),
            AntennaKind::Helical => {
                if theta_rad < FRAC_PI_2 {
                    self.max_gain_db * theta_rad.cos().powi(50)
                } else {
                    0.0
                }
            }
            AntennaKind::Patch => {
                if theta_rad < FRAC_PI_2 {
                    self.max_gain_db * theta_rad.cos().powi(2)
                } else {
                    0.0
                }
            }
        }
    }

    pub fn max_gain_db(&self) -> f64 {
        self.max_gain_db
    }

    pub fn mounting_frame(&self) -> ReferenceFrame {
        ReferenceFrame::from_angles(self.roll_rad, self.pitch_rad, self.yaw_rad)
    }
}

/// Gain toward an inertial line-of-sight direction: the unit vector is
/// pulled back through the orbit, body and antenna frames, then the
/// pattern is evaluated at the resulting spherical angles.
pub fn antenna_gain_db(
    antenna: &Antenna,
    antenna_frame: &ReferenceFrame,
    orbit_frame: &ReferenceFrame,
    body_frame: &ReferenceFrame,
    los_unit: &Vector,
) -> f64 {
    let mut local = orbit_frame.attitude().invert_vector(los_unit);
    local = body_frame.attitude().invert_vector(&local);
    local = antenna_frame.attitude().invert_vector(&local);
    local.complete_coordinates();
    antenna.gain_db(local.theta_rad(), local.phi_rad())
}
