pub mod clock;
pub mod codec;
pub mod config;
pub mod gate;
pub mod pacer;
pub mod publisher;
pub mod recorder;
pub mod report;
pub mod stats;
pub mod subscriber;
