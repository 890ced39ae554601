pub mod controller;
pub mod detector;
pub mod loop_worker;

pub use controller::WatchdogController;
pub use detector::{Detection, Detector};
pub use loop_worker::DetectionContext;
