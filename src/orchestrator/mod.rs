mod builder;
mod candidate;
mod core;
mod navigator;

pub use builder::OrchestratorBuilder;
pub use candidate::{
    candidates, AttemptOutcome, CandidateEndpoint, ConnectionAttempt, Scheme, LOCAL_SUFFIX,
};
pub use core::*;
pub use navigator::{BrowserNavigator, Navigator};
