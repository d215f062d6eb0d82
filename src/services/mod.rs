pub mod convergence_poller;
pub mod in_flight;
pub mod lifecycle_controller;

pub use convergence_poller::ConvergencePoller;
pub use in_flight::{InFlightGuard, InFlightRegistry};
pub use lifecycle_controller::{
    LifecycleController, LifecyclePolicies, RefreshOutcome, CREATE_PENDING, DELETE_PENDING,
};
