pub mod comm;
pub mod power;
pub mod sensing;

pub use comm::{CommMode, CommSubsystem, CommunicationEvent, FeedbackEvent};
pub use power::{Battery, PowerSubsystem, SolarPanel};
pub use sensing::SensingSubsystem;
