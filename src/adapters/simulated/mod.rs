//! Simulated provider for tests and the `simulate` command.

pub mod gateway;

pub use gateway::{SimulatedGateway, SimulationScript};
