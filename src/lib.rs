//! # Orbnet
//!
//! A turn-based simulator for collaborative Earth-observation satellite
//! constellations. Informer satellites detect interesting ground tracks,
//! predict which sink satellite will next overfly them, and route a
//! control packet through the store-and-forward mesh in time for the
//! overflight; sinks measure and route feedback back.
//!
//! ## Architecture
//!
//! - [`clock`] / [`sun`] - the global time cursor and solar position
//! - [`math`] / [`earth`] - vectors, attitude frames and WGS84 kernels
//! - [`platform`] - SGP4 and fixed-geodetic orbit models
//! - [`node`] + [`subsystems`] - a satellite and its comm, sensing and
//!   power subsystems
//! - [`packet`] - forward / return / raw wire formats
//! - [`channel`] - the per-pair transfer state machine
//! - [`scheduler`] + [`tree`] - visitor prediction and the time-dynamic
//!   contact-graph route search
//! - [`system`] - the observing system owning all nodes and channels
//!
//! The engine is single-threaded and tick-driven: one call to
//! [`system::ObservingSystem::update`] per clock tick, in the fixed order
//! sun, nodes, scheduler, logs, channel arbitration.

pub mod antenna;
pub mod channel;
pub mod clock;
pub mod config;
pub mod earth;
pub mod logging;
pub mod math;
pub mod modem;
pub mod node;
pub mod packet;
pub mod platform;
pub mod processor;
pub mod scheduler;
pub mod sensor;
pub mod subsystems;
pub mod sun;
pub mod system;
pub mod tree;

pub use channel::{Channel, Occlusion};
pub use clock::SimulationClock;
pub use node::{Node, NodeMode, UpdateOptions};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use sun::Sun;
pub use system::ObservingSystem;
