//! Core business logic abstractions

pub mod advice;
pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod log;
pub mod price;
pub mod render;
pub mod schedule;
pub mod stats;
pub mod tracker;

// Re-export main types for cleaner imports
pub use advice::Signal;
pub use error::TrackerError;
pub use price::{Asset, PriceProvider, PriceSample};
pub use render::Renderer;
pub use schedule::{Event, Scheduler, Trigger};
pub use tracker::Tracker;
