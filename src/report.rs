//! Per-scenario run summaries.

use crate::error::FederationResult;
use crate::login::LoginBranch;
use crate::scenario::{Scenario, ScenarioOutcome};
use crate::zone::Zone;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
}

/// Result of one scenario, as printed by the command-line runner.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub zone_id: String,
    pub base_url: String,
    pub status: ScenarioStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_branch: Option<LoginBranch>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ScenarioReport {
    pub fn from_result(
        scenario: Scenario,
        zone: &Zone,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        result: &FederationResult<ScenarioOutcome>,
    ) -> Self {
        let mut report = Self {
            scenario,
            zone_id: zone.id().to_string(),
            base_url: zone.base_url().to_string(),
            status: ScenarioStatus::Failed,
            error: None,
            identity_provider_id: None,
            login_branch: None,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
            notes: Vec::new(),
        };
        match result {
            Ok(outcome) => {
                report.status = ScenarioStatus::Passed;
                report.identity_provider_id = outcome.provider.id.clone();
                report.login_branch = Some(outcome.login);
                report.notes.push(format!(
                    "verified {} attribute(s) for {}",
                    outcome.user_info.user_attributes.len(),
                    outcome.user_info.user_name.as_deref().unwrap_or("<unnamed>")
                ));
            }
            Err(error) => {
                report.error = Some(error.to_string());
                if error.is_browser_failure() {
                    report.notes.push("failed in the browser".to_string());
                }
            }
        }
        report
    }

    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

/// Whether every report passed. An empty run has not passed.
pub fn all_passed(reports: &[ScenarioReport]) -> bool {
    !reports.is_empty() && reports.iter().all(ScenarioReport::passed)
}
