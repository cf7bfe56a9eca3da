//! Pushing planned rules to switches

use super::{PlannedRule, SteeringPlan};
use crate::protocol::openflow::FlowMod;
use crate::telemetry::MetricsRegistry;
use crate::topology::Dpid;
use crate::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Control channel to the switches
pub trait SwitchSender {
    /// Queue one FLOW_MOD on the switch's connection
    fn send(&mut self, dpid: Dpid, message: &FlowMod) -> Result<()>;

    /// Wait until the switch has processed everything sent so far.
    ///
    /// Channels without acknowledgements have nothing to wait for.
    fn confirm(&mut self, _dpid: Dpid) -> Result<()> {
        Ok(())
    }
}

/// How failures part-way through an installation are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMode {
    /// Fire-and-forget in plan order. A failure stops the run and leaves the
    /// rules already sent in place (half-steered network).
    #[default]
    BestEffort,
    /// Confirm every rule; on failure remove the rules already installed,
    /// newest first.
    Transactional,
}

/// Outcome of a successful installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: usize,
    pub mode: InstallMode,
}

#[derive(Debug, Default)]
pub struct RuleInstaller {
    mode: InstallMode,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl RuleInstaller {
    pub fn new(mode: InstallMode) -> Self {
        Self {
            mode,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn mode(&self) -> InstallMode {
        self.mode
    }

    pub fn install(&self, sender: &mut dyn SwitchSender, plan: &SteeringPlan) -> Result<InstallReport> {
        let mut installed: Vec<&PlannedRule> = Vec::with_capacity(plan.rules.len());
        // Rules whose FLOW_MOD reached the wire, confirmed or not
        let mut sent: Vec<&PlannedRule> = Vec::with_capacity(plan.rules.len());

        for planned in &plan.rules {
            if let Err(e) = self.install_one(sender, planned, &mut sent) {
                warn!(
                    "Install failed on s{} ({} segment) after {} rules: {}",
                    planned.dpid,
                    planned.segment,
                    installed.len(),
                    e
                );
                if self.mode == InstallMode::Transactional {
                    self.roll_back(sender, &sent);
                }
                return Err(Error::Install {
                    dpid: planned.dpid,
                    installed: installed.len(),
                    source: Box::new(e),
                });
            }

            debug!("s{}: {}", planned.dpid, planned.rule);
            if let Some(metrics) = &self.metrics {
                metrics.rules_installed.inc();
            }
            installed.push(planned);
        }

        info!(
            "Installed {} steering rules ({:?})",
            installed.len(),
            self.mode
        );

        Ok(InstallReport {
            installed: installed.len(),
            mode: self.mode,
        })
    }

    fn install_one<'p>(
        &self,
        sender: &mut dyn SwitchSender,
        planned: &'p PlannedRule,
        sent: &mut Vec<&'p PlannedRule>,
    ) -> Result<()> {
        sender.send(planned.dpid, &planned.rule.install_message())?;
        sent.push(planned);
        if self.mode == InstallMode::Transactional {
            sender.confirm(planned.dpid)?;
        }
        Ok(())
    }

    /// Strict-deletes `sent`, newest first. Returns how many deletes the
    /// switches confirmed.
    fn roll_back(&self, sender: &mut dyn SwitchSender, sent: &[&PlannedRule]) -> usize {
        let mut removed = 0;
        for planned in sent.iter().rev() {
            let result = sender
                .send(planned.dpid, &planned.rule.removal_message())
                .and_then(|_| sender.confirm(planned.dpid));

            match result {
                Ok(()) => {
                    removed += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.rules_rolled_back.inc();
                    }
                }
                Err(e) => warn!("Rollback on s{} failed: {}", planned.dpid, e),
            }
        }

        if removed == sent.len() {
            info!("Rolled back {} steering rules", removed);
        } else {
            warn!(
                "Rolled back {} of {} steering rules",
                removed,
                sent.len()
            );
        }
        removed
    }
}
