pub mod controller;

pub use controller::{
    ReplayController, ReplayOptions, ReplayPhase, BASE_TICK_INTERVAL, DEFAULT_COUNTDOWN_SECS,
    MIN_TICK_INTERVAL,
};
