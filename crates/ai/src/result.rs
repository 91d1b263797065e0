use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Successful result of a job body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Work was done; `artifact_id` identifies what was produced (e.g. KB article id).
    Completed { artifact_id: Option<String> },

    /// The job decided there was nothing to do.
    Skipped { reason: Option<String> },
}

impl JobOutcome {
    pub fn completed() -> Self {
        Self::Completed { artifact_id: None }
    }

    pub fn artifact(artifact_id: impl Into<String>) -> Self {
        Self::Completed {
            artifact_id: Some(artifact_id.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: Some(reason.into()),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn artifact_id(&self) -> Option<&str> {
        match self {
            Self::Completed { artifact_id } => artifact_id.as_deref(),
            Self::Skipped { .. } => None,
        }
    }
}

/// Failure of a job body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("invalid job input: {0}")]
    InvalidInput(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The body panicked; the panic was contained to its own task.
    #[error("job panicked: {0}")]
    Panicked(String),

    /// The body's task was aborted before it finished (runtime shutdown).
    #[error("job aborted: {0}")]
    Aborted(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::GenerationFailed(msg.into())
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::InvalidInput(_) => "invalid_input",
            JobError::GenerationFailed(_) => "generation_failed",
            JobError::Panicked(_) => "panicked",
            JobError::Aborted(_) => "aborted",
            JobError::Internal(_) => "internal",
        }
    }
}

/// Loosely typed report some job bodies hand back:
/// `{ "success": bool, "skipped"?: bool, "reason"?: string, "artifactId"?: string }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub success: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
}

impl JobReport {
    /// Collapse the report into the typed result.
    ///
    /// `success = false` is a failure regardless of the other fields.
    pub fn into_result(self) -> Result<JobOutcome, JobError> {
        if !self.success {
            let reason = self
                .reason
                .unwrap_or_else(|| "job reported failure".to_string());
            return Err(JobError::GenerationFailed(reason));
        }

        if self.skipped {
            return Ok(JobOutcome::Skipped {
                reason: self.reason,
            });
        }

        Ok(JobOutcome::Completed {
            artifact_id: self.artifact_id,
        })
    }
}

impl From<JobReport> for Result<JobOutcome, JobError> {
    fn from(report: JobReport) -> Self {
        report.into_result()
    }
}
