pub mod clock;
pub mod geo;
pub mod net;
pub mod presence_tracker;
