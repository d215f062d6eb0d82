pub mod config;
pub mod instance;
pub mod poll;
pub mod record;
pub mod status;

pub use config::{
    Config, LifecycleConfig, LoggingConfig, PollPolicyConfig, SimulationConfig, StateConfig,
};
pub use instance::{
    DbInstanceConfig, Endpoint, FinalSnapshot, InstanceSnapshot, Password, ResourceId, TagDiff,
    Tags,
};
pub use poll::{
    PollOutcome, PollPolicy, PollSpec, PollSpecBuilder, ProbeResult, StatusBearing, StatusClass,
};
pub use record::ResourceRecord;
pub use status::{InstanceStatus, TargetState};
