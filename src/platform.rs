//! Orbit models: SGP4-propagated platforms from two-line element sets and
//! fixed-geodetic ground platforms, plus TLE file handling and
//! constellation duplication.

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::SimulationClock;
use crate::earth::{self, Geodetic};
use crate::math::{ReferenceFrame, Vector};

/// Position, velocity and orientation of a node at one instant.
///
/// The orbit frame has +z toward Earth, +y along `(-p x v)` normalised and
/// +x completing the triad. The body frame is the orbit frame rotated by
/// the platform's roll/pitch/yaw.
#[derive(Debug, Clone)]
pub struct OrbitalState {
    position_m: Vector,
    velocity_m_per_s: Vector,
    geodetic: Geodetic,
    orbit_frame: ReferenceFrame,
    body_frame: ReferenceFrame,
}

impl OrbitalState {
    pub fn new(
        position_m: Vector,
        velocity_m_per_s: Vector,
        geodetic: Geodetic,
        roll_rad: f64,
        pitch_rad: f64,
        yaw_rad: f64,
    ) -> Self {
        let orbit_frame = orbit_frame(&position_m, &velocity_m_per_s);
        let body_frame = ReferenceFrame::nested(&orbit_frame, roll_rad, pitch_rad, yaw_rad);
        Self {
            position_m,
            velocity_m_per_s,
            geodetic,
            orbit_frame,
            body_frame,
        }
    }

    /// In-place update that keeps the body frame's own attitude.
    pub fn update(&mut self, position_m: Vector, velocity_m_per_s: Vector, geodetic: Geodetic) {
        self.position_m = position_m;
        self.velocity_m_per_s = velocity_m_per_s;
        self.geodetic = geodetic;
        self.orbit_frame = orbit_frame(&self.position_m, &self.velocity_m_per_s);
        self.body_frame.update(&self.orbit_frame);
    }

    pub fn position_m(&self) -> &Vector {
        &self.position_m
    }

    pub fn velocity_m_per_s(&self) -> &Vector {
        &self.velocity_m_per_s
    }

    pub fn geodetic(&self) -> &Geodetic {
        &self.geodetic
    }

    pub fn orbit_frame(&self) -> &ReferenceFrame {
        &self.orbit_frame
    }

    pub fn body_frame(&self) -> &ReferenceFrame {
        &self.body_frame
    }
}

fn orbit_frame(position_m: &Vector, velocity_m_per_s: &Vector) -> ReferenceFrame {
    let y_axis = (-*position_m).cross(velocity_m_per_s).unit();
    let z_axis = (-*position_m).unit();
    let x_axis = y_axis.cross(&z_axis);
    ReferenceFrame::from_axes(x_axis, y_axis, z_axis)
}

#[derive(Debug)]
pub struct TleError {
    message: String,
}

impl TleError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TLE error: {}", self.message)
    }
}

impl Error for TleError {}

/// One satellite or ground-station orbit model. Immutable after
/// construction; prediction never mutates the platform.
#[derive(Debug)]
pub enum Platform {
    Orbit(OrbitPlatform),
    Ground(GroundPlatform),
}

impl Platform {
    pub fn name(&self) -> &str {
        match self {
            Platform::Orbit(p) => &p.name,
            Platform::Ground(p) => &p.name,
        }
    }

    /// Pure prediction of the state at `offset_s` past the clock cursor.
    pub fn predict(&self, clock: &SimulationClock, offset_s: u64) -> OrbitalState {
        let (position, velocity, geodetic) = self.state_at(clock, offset_s);
        OrbitalState::new(position, velocity, geodetic, 0.0, 0.0, 0.0)
    }

    pub fn predict_into(&self, clock: &SimulationClock, offset_s: u64, state: &mut OrbitalState) {
        let (position, velocity, geodetic) = self.state_at(clock, offset_s);
        state.update(position, velocity, geodetic);
    }

    fn state_at(&self, clock: &SimulationClock, offset_s: u64) -> (Vector, Vector, Geodetic) {
        match self {
            Platform::Orbit(p) => p.state_at(clock, offset_s),
            Platform::Ground(p) => p.state_at(clock, offset_s),
        }
    }
}

/// SGP4 orbit from a two-line element set.
#[derive(Debug)]
pub struct OrbitPlatform {
    name: String,
    epoch: NaiveDateTime,
    constants: sgp4::Constants,
}

impl OrbitPlatform {
    pub fn from_tle(tle: &TleSet) -> Result<Self, TleError> {
        let elements = sgp4::Elements::from_tle(
            Some(tle.name.clone()),
            tle.line1.as_bytes(),
            tle.line2.as_bytes(),
        )
        .map_err(|e| TleError::new(format!("{}: {}", tle.name, e)))?;
        let epoch = elements.datetime;
        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| TleError::new(format!("{}: {}", tle.name, e)))?;
        Ok(Self {
            name: tle.name.clone(),
            epoch,
            constants,
        })
    }

    fn state_at(&self, clock: &SimulationClock, offset_s: u64) -> (Vector, Vector, Geodetic) {
        let target = clock.date_time(offset_s).naive_utc();
        let minutes = (target - self.epoch).num_milliseconds() as f64 / 60_000.0;
        let prediction = match self.constants.propagate(sgp4::MinutesSinceEpoch(minutes)) {
            Ok(prediction) => prediction,
            Err(e) => panic!("SGP4 propagation failed for validated elements {}: {}", self.name, e),
        };
        let position = Vector::new(
            prediction.position[0] * 1000.0,
            prediction.position[1] * 1000.0,
            prediction.position[2] * 1000.0,
        );
        let velocity = Vector::new(
            prediction.velocity[0] * 1000.0,
            prediction.velocity[1] * 1000.0,
            prediction.velocity[2] * 1000.0,
        );
        let geodetic = Geodetic::from_position(&position, clock, offset_s);
        (position, velocity, geodetic)
    }
}

/// Fixed geodetic point co-rotating with the Earth.
#[derive(Debug, Clone)]
pub struct GroundPlatform {
    name: String,
    geodetic: Geodetic,
}

impl GroundPlatform {
    pub fn new(name: impl Into<String>, geodetic: Geodetic) -> Self {
        Self {
            name: name.into(),
            geodetic,
        }
    }

    fn state_at(&self, clock: &SimulationClock, offset_s: u64) -> (Vector, Vector, Geodetic) {
        let gmst = earth::gmst_rad(clock.julian_date(offset_s));
        let (position, velocity) = earth::geodetic_to_eci(&self.geodetic, gmst);
        (position, velocity, self.geodetic)
    }
}

/// One three-line TLE record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TleSet {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

/// Walker-style duplication pattern applied to one seed TLE.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DuplicationPattern {
    pub orbit_planes: u16,
    pub groups_per_plane: u16,
    pub sats_in_train: u16,
    pub sats_in_tandem: u16,
    pub train_angle_deg: u16,
    pub tandem_angle_deg: u16,
}

impl TleSet {
    pub fn platform(&self) -> Result<Platform, TleError> {
        Ok(Platform::Orbit(OrbitPlatform::from_tle(self)?))
    }

    /// Generates a constellation by editing the right-ascension (columns
    /// 17..25) and mean-anomaly (columns 43..51) fields of line 2 as
    /// fixed-width decimal, recomputing the line checksum.
    pub fn duplicate(&self, pattern: &DuplicationPattern) -> Vec<TleSet> {
        let total = u32::from(pattern.orbit_planes)
            * u32::from(pattern.groups_per_plane)
            * u32::from(pattern.sats_in_train)
            * u32::from(pattern.sats_in_tandem);
        let epoch_raan: f64 = self.line2[17..25].trim().parse().unwrap_or(0.0);
        let epoch_anomaly: f64 = self.line2[43..51].trim().parse().unwrap_or(0.0);
        let mut sets = Vec::with_capacity(total as usize);
        for p in 0..pattern.orbit_planes {
            for g in 0..pattern.groups_per_plane {
                for m in 0..pattern.sats_in_train {
                    for r in 0..pattern.sats_in_tandem {
                        let raan = (epoch_raan
                            + f64::from(r) * f64::from(pattern.tandem_angle_deg)
                            + 360.0 * f64::from(p) / f64::from(pattern.orbit_planes))
                            % 360.0;
                        let anomaly = (epoch_anomaly
                            + f64::from(m) * f64::from(pattern.train_angle_deg)
                            + 360.0 * f64::from(g) / f64::from(pattern.groups_per_plane)
                            + 360.0 * f64::from(p) / f64::from(total))
                            % 360.0;
                        let mut line2 = self.line2.clone();
                        line2.replace_range(17..25, &format!("{:08.4}", raan));
                        line2.replace_range(43..51, &format!("{:08.4}", anomaly));
                        let line2 = with_checksum(&line2);
                        sets.push(TleSet {
                            name: self.name.clone(),
                            line1: self.line1.clone(),
                            line2,
                        });
                    }
                }
            }
        }
        sets
    }
}

/// Reads three-line TLE records (name, line 1, line 2) from a file.
pub fn load_tle_file(path: &Path) -> Result<Vec<TleSet>, TleError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| TleError::new(format!("{}: {}", path.display(), e)))?;
    let lines: Vec<&str> = contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.len() % 3 != 0 {
        return Err(TleError::new(format!(
            "{}: expected records of three lines, found {} lines",
            path.display(),
            lines.len()
        )));
    }
    Ok(lines
        .chunks(3)
        .map(|record| TleSet {
            name: record[0].trim().to_string(),
            line1: record[1].to_string(),
            line2: record[2].to_string(),
        })
        .collect())
}

/// Rewrites the trailing checksum digit of a TLE line (sum of digits plus
/// one per minus sign, modulo 10, over the first 68 columns).
pub fn with_checksum(line: &str) -> String {
    let body: String = line.chars().take(68).collect();
    let sum: u32 = body
        .chars()
        .map(|c| match c {
            '-' => 1,
            _ => c.to_digit(10).unwrap_or(0),
        })
        .sum();
    format!("{}{}", body, sum % 10)
}
