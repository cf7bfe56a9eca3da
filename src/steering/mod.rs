//! Traffic steering
//!
//! - Rule synthesis (match + single output)
//! - Planning both segments of the detour through the middlebox
//! - Installing the plan over a switch control channel

mod installer;
mod orchestrator;
mod rule;

pub use installer::{InstallMode, InstallReport, RuleInstaller, SwitchSender};
pub use orchestrator::{
    HostPortPolicy, Orchestrator, PlannedRule, Segment, SteeringPlan, SteeringRequest,
};
pub use rule::{build_match, build_rule, FlowKey, FlowMatch, FlowRule, STEERING_PRIORITY};
