use serde::Serialize;

/// State of a background deployment job, as polled by clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum JobStatus {
    Pending,
    /// Rough completion percentage.
    InProgress(u32),
    /// Carries the deployment URL.
    Completed(String),
    /// Carries the error message.
    Failed(String),
}
