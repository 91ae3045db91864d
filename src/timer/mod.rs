pub mod clock;
pub mod controller;
pub mod segment;

pub use clock::StudyClock;
pub use controller::StudyController;
pub use segment::SegmentTimer;
