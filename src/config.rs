//! Scenario configuration: a serde description of the run loaded from a
//! JSON file and validated before the system is assembled.

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::antenna::AntennaKind;
use crate::platform::{DuplicationPattern, TleError};
use crate::scheduler::SchedulerConfig;

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
    Tle(TleError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "configuration i/o error: {}", e),
            ConfigError::Parse(e) => write!(f, "configuration parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "invalid configuration: {}", e),
            ConfigError::Tle(e) => write!(f, "{}", e),
        }
    }
}

impl Error for ConfigError {}

impl From<TleError> for ConfigError {
    fn from(e: TleError) -> Self {
        ConfigError::Tle(e)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartEpoch {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AntennaConfig {
    pub kind: AntennaKind,
    pub max_gain_db: f64,
    #[serde(default)]
    pub roll_rad: f64,
    #[serde(default)]
    pub pitch_rad: f64,
    #[serde(default)]
    pub yaw_rad: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    CloudRadar,
    RainRadar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorKind {
    Source,
    SourceSingleSample,
    Sink,
    Template,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstellationConfig {
    pub constellation: u16,
    /// Index of the seed record in the TLE file.
    pub tle_index: usize,
    pub duplication: DuplicationPattern,
    pub sensor: SensorKind,
    pub sensor_duration_s: u64,
    pub processor: ProcessorKind,
    pub comm_antenna: AntennaConfig,
    pub sensing_antenna: AntennaConfig,
    /// Whether to pre-plan periodic measurements for this constellation.
    #[serde(default)]
    pub seed_measurements: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub start: StartEpoch,
    pub num_ticks: u64,
    pub seconds_per_tick: u64,
    #[serde(default)]
    pub seed: u64,
    pub tle_path: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub constellations: Vec<ConstellationConfig>,
}

impl ScenarioConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config: ScenarioConfig = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_ticks == 0 {
            return Err(ConfigError::Invalid("num_ticks must be positive".into()));
        }
        if self.seconds_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "seconds_per_tick must be positive".into(),
            ));
        }
        if self.constellations.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one constellation is required".into(),
            ));
        }
        for block in &self.constellations {
            if block.sensor_duration_s == 0 {
                return Err(ConfigError::Invalid(format!(
                    "constellation {} has a zero sensor duration",
                    block.constellation
                )));
            }
            let pattern = &block.duplication;
            if pattern.orbit_planes == 0
                || pattern.groups_per_plane == 0
                || pattern.sats_in_train == 0
                || pattern.sats_in_tandem == 0
            {
                return Err(ConfigError::Invalid(format!(
                    "constellation {} has an empty duplication pattern",
                    block.constellation
                )));
            }
        }
        Ok(())
    }

    pub fn span_s(&self) -> u64 {
        self.num_ticks * self.seconds_per_tick
    }
}
