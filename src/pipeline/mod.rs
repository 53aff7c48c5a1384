pub mod collector;

pub use collector::{CollectedData, Collector};
