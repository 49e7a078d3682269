use std::f64::consts::PI;

/// Deterministic synthetic Earth-surface scalar field.
///
/// Stands in for the archived data cube: a smooth function of latitude,
/// longitude and elapsed time with values in `[0, scale]`, so thresholds
/// tuned for the real variables still partition the samples.
#[derive(Debug, Clone, Copy)]
pub struct EarthField {
    scale: f64,
}

impl EarthField {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    pub fn sample(&self, latitude_rad: f64, longitude_rad: f64, elapsed_s: u64) -> f64 {
        let phase = elapsed_s as f64 * 2.0 * PI / 43_200.0;
        let a = (3.0 * latitude_rad).sin() * (2.0 * longitude_rad + phase).cos();
        let b = (5.0 * longitude_rad).sin() * (4.0 * latitude_rad - 0.5 * phase).cos();
        let normalised = 0.5 + 0.25 * a + 0.25 * b;
        self.scale * normalised * normalised
    }
}

/// Source of scalar Earth-surface samples taken at the sensing boresight
/// ground point.
#[derive(Debug, Clone)]
pub struct Sensor {
    variable: &'static str,
    power_consumed_w: f64,
    duration_s: u64,
    target_value: f64,
    field: EarthField,
}

impl Sensor {
    pub fn new(
        variable: &'static str,
        power_consumed_w: f64,
        duration_s: u64,
        target_value: f64,
        field: EarthField,
    ) -> Self {
        Self {
            variable,
            power_consumed_w,
            duration_s,
            target_value,
            field,
        }
    }

    /// Cloud optical-thickness radar.
    pub fn cloud_radar(duration_s: u64) -> Self {
        Self::new("TAUTOT", 31.0, duration_s, 200.0, EarthField::new(250.0))
    }

    /// Rain-rate radar.
    pub fn rain_radar(duration_s: u64) -> Self {
        Self::new("PRECTOT", 31.0, duration_s, 0.0001, EarthField::new(0.0001))
    }

    pub fn measure(&self, latitude_rad: f64, longitude_rad: f64, elapsed_s: u64) -> f64 {
        self.field.sample(latitude_rad, longitude_rad, elapsed_s)
    }

    pub fn variable(&self) -> &'static str {
        self.variable
    }

    pub fn power_consumed_w(&self) -> f64 {
        self.power_consumed_w
    }

    pub fn duration_s(&self) -> u64 {
        self.duration_s
    }

    pub fn target_value(&self) -> f64 {
        self.target_value
    }
}
