// ABOUTME: Deployment orchestration: state machine, sequencing, and run ownership.
// ABOUTME: Exports the orchestrator, its state snapshots, and subscriber plumbing.

mod error;
mod orchestrator;
mod sequencer;
mod state;
mod subscriber;

pub use error::{DeployError, DeployErrorKind};
pub use orchestrator::{DeployHandle, Orchestrator, Plan, prepare};
pub use sequencer::Sequencer;
pub use state::{AggregateStatus, DeploymentState, ServiceProgress, ServiceStatus};
pub use subscriber::{Discard, Guarded, Liveness, Subscriber, SubscriberExt};
