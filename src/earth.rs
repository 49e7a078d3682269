//! WGS84 geometry kernels: ellipsoid visibility, geodetic conversions and
//! the sensor-boresight ground intersection.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::clock::SimulationClock;
use crate::math::Vector;

pub const SEMI_MAJOR_AXIS_M: f64 = 6378137.0;
pub const SEMI_MINOR_AXIS_M: f64 = 6356752.314245;
pub const FLATTENING: f64 = 1.0 / 298.257223563;
pub const ECCENTRICITY_SQ: f64 = FLATTENING * (2.0 - FLATTENING);
pub const ROTATION_RATE_RAD_PER_S: f64 = 7.2921159e-5;

/// Greenwich mean sidereal time (radians) for a Julian date.
pub fn gmst_rad(julian_date: f64) -> f64 {
    let d = julian_date - 2451545.0;
    let t = d / 36525.0;
    let gmst_deg = 280.46061837 + 360.98564736629 * d + 0.000387933 * t * t
        - t * t * t / 38710000.0;
    gmst_deg.rem_euclid(360.0).to_radians()
}

/// Whether the segment between two inertial positions clears the WGS84
/// ellipsoid.
///
/// Each position is scaled by the semi-axes so the ellipsoid becomes the
/// unit sphere, then the sphere-ray quadratic is checked in both
/// directions: the segment is clear iff either direction finds no
/// intersection at all or only intersections behind the ray origin.
pub fn visible(a: &Vector, b: &Vector) -> bool {
    let scaled_a = scale_to_unit_sphere(a);
    let scaled_b = scale_to_unit_sphere(b);
    let mut clear = [false, false];
    let origins = [scaled_a, scaled_b];
    let rays = [scaled_b - scaled_a, scaled_a - scaled_b];
    for i in 0..2 {
        let unit_ray = rays[i].unit();
        let b_coeff = 2.0 * origins[i].dot(&unit_ray);
        let c_coeff = origins[i].dot(&origins[i]) - 1.0;
        let discriminant = b_coeff * b_coeff - 4.0 * c_coeff;
        if discriminant < 0.0 {
            clear[i] = true;
        } else {
            let t1 = (-b_coeff + discriminant.sqrt()) / 2.0;
            let t2 = (-b_coeff - discriminant.sqrt()) / 2.0;
            if t1 < 0.0 && t2 < 0.0 {
                clear[i] = true;
            }
        }
    }
    clear[0] || clear[1]
}

fn scale_to_unit_sphere(v: &Vector) -> Vector {
    Vector::new(
        v.x_m / SEMI_MAJOR_AXIS_M,
        v.y_m / SEMI_MAJOR_AXIS_M,
        v.z_m / SEMI_MINOR_AXIS_M,
    )
}

/// A point on or above the ellipsoid: latitude and longitude in radians,
/// altitude in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub latitude_rad: f64,
    pub longitude_rad: f64,
    pub altitude_m: f64,
}

impl Geodetic {
    pub fn new(latitude_rad: f64, longitude_rad: f64, altitude_m: f64) -> Self {
        Self {
            latitude_rad,
            longitude_rad,
            altitude_m,
        }
    }

    /// Geodetic coordinates of an inertial position at `offset_s` past the
    /// clock cursor.
    pub fn from_position(
        position: &Vector,
        clock: &SimulationClock,
        offset_s: u64,
    ) -> Self {
        eci_to_geodetic(position, gmst_rad(clock.julian_date(offset_s)))
    }

    /// Great-circle distance on a sphere of Earth's equatorial radius.
    pub fn haversine_m(&self, other: &Geodetic) -> f64 {
        let u = ((self.latitude_rad - other.latitude_rad) / 2.0).sin();
        let v = ((self.longitude_rad - other.longitude_rad) / 2.0).sin();
        let w = (u * u + other.latitude_rad.cos() * self.latitude_rad.cos() * v * v)
            .sqrt()
            .asin();
        2.0 * SEMI_MAJOR_AXIS_M * w
    }
}

/// Inertial -> geodetic, accounting for Earth rotation via GMST.
pub fn eci_to_geodetic(position: &Vector, gmst: f64) -> Geodetic {
    let longitude_rad = wrap_longitude(position.y_m.atan2(position.x_m) - gmst);
    let rho = (position.x_m * position.x_m + position.y_m * position.y_m).sqrt();
    let mut latitude_rad = position.z_m.atan2(rho);
    let mut normal = SEMI_MAJOR_AXIS_M;
    for _ in 0..6 {
        let sin_lat = latitude_rad.sin();
        normal = SEMI_MAJOR_AXIS_M / (1.0 - ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        latitude_rad = (position.z_m + ECCENTRICITY_SQ * normal * sin_lat).atan2(rho);
    }
    let altitude_m = if latitude_rad.cos().abs() > 1e-10 {
        rho / latitude_rad.cos() - normal
    } else {
        position.z_m.abs() - normal * (1.0 - ECCENTRICITY_SQ)
    };
    Geodetic::new(latitude_rad, longitude_rad, altitude_m)
}

/// Geodetic -> inertial position and co-rotation velocity.
pub fn geodetic_to_eci(geodetic: &Geodetic, gmst: f64) -> (Vector, Vector) {
    let sin_lat = geodetic.latitude_rad.sin();
    let cos_lat = geodetic.latitude_rad.cos();
    let normal = SEMI_MAJOR_AXIS_M / (1.0 - ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
    let theta = geodetic.longitude_rad + gmst;
    let position = Vector::new(
        (normal + geodetic.altitude_m) * cos_lat * theta.cos(),
        (normal + geodetic.altitude_m) * cos_lat * theta.sin(),
        (normal * (1.0 - ECCENTRICITY_SQ) + geodetic.altitude_m) * sin_lat,
    );
    let velocity = Vector::new(
        -ROTATION_RATE_RAD_PER_S * position.y_m,
        ROTATION_RATE_RAD_PER_S * position.x_m,
        0.0,
    );
    (position, velocity)
}

/// Ground point where a ray from `position` along `direction` first meets
/// the ellipsoid, or `None` when the ray misses it.
pub fn boresight_intersection(
    position: &Vector,
    direction: &Vector,
    clock: &SimulationClock,
    offset_s: u64,
) -> Option<Geodetic> {
    let scaled = scale_to_unit_sphere(position);
    let ray = direction.unit();
    let ray = Vector::new(
        ray.x_m / SEMI_MAJOR_AXIS_M,
        ray.y_m / SEMI_MAJOR_AXIS_M,
        ray.z_m / SEMI_MINOR_AXIS_M,
    )
    .unit();
    let b_coeff = 2.0 * scaled.dot(&ray);
    let c_coeff = scaled.dot(&scaled) - 1.0;
    let discriminant = b_coeff * b_coeff - 4.0 * c_coeff;
    if discriminant <= 0.0 {
        return None;
    }
    let t1 = (-b_coeff + discriminant.sqrt()) / 2.0;
    let t2 = (-b_coeff - discriminant.sqrt()) / 2.0;
    let mut nearest: Option<(f64, Vector)> = None;
    for t in [t1, t2] {
        if t > 0.0 {
            let scaled_hit = scaled + ray * t;
            let hit = Vector::new(
                scaled_hit.x_m * SEMI_MAJOR_AXIS_M,
                scaled_hit.y_m * SEMI_MAJOR_AXIS_M,
                scaled_hit.z_m * SEMI_MINOR_AXIS_M,
            );
            let range = (*position - hit).norm();
            if nearest.map_or(true, |(best, _)| range < best) {
                nearest = Some((range, hit));
            }
        }
    }
    nearest.map(|(_, hit)| Geodetic::from_position(&hit, clock, offset_s))
}

fn wrap_longitude(mut longitude_rad: f64) -> f64 {
    while longitude_rad > PI {
        longitude_rad -= 2.0 * PI;
    }
    while longitude_rad < -PI {
        longitude_rad += 2.0 * PI;
    }
    longitude_rad
}
