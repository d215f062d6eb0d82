//! Adapters implementing the domain ports.

pub mod clock;
pub mod file_store;
pub mod simulated;

pub use clock::{ManualClock, TokioClock};
pub use file_store::FileRecordStore;
pub use simulated::{SimulatedGateway, SimulationScript};
