use serde::{Deserialize, Serialize};

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skip,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorState {
    Ready,
    Degraded,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
    pub required: bool,
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    pub generated_at_rfc3339: String,
    pub state: DoctorState,
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    pub fn is_usable(&self) -> bool {
        self.state != DoctorState::Unavailable
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "framecast doctor: {}\ngenerated at {}\n\n",
            state_label(self.state),
            self.generated_at_rfc3339
        );
        out.push_str(&format!("{:<18} {:<6} {:<4} {}\n", "CHECK", "STATUS", "REQ", "DETAIL"));

        for check in &self.checks {
            out.push_str(&format!(
                "{:<18} {:<6} {:<4} {}\n",
                check.name,
                status_label(check.status),
                if check.required { "yes" } else { "no" },
                check.detail
            ));
            if let Some(remediation) = &check.remediation {
                out.push_str(&format!("  -> {remediation}\n"));
            }
        }

        out
    }

    pub fn render_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn state_label(state: DoctorState) -> &'static str {
    match state {
        DoctorState::Ready => "ready",
        DoctorState::Degraded => "degraded",
        DoctorState::Unavailable => "unavailable",
    }
}

fn status_label(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Warn => "WARN",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Skip => "SKIP",
    }
}
