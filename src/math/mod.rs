pub mod attitude;
pub mod frame;
pub mod vector;

pub use attitude::AttitudeMatrix;
pub use frame::ReferenceFrame;
pub use vector::Vector;
