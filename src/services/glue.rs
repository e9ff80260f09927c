use crate::core::Outcome;

pub const SERVICE_NAME: &str = "aws_glue";
pub const DISPLAY_NAME: &str = "aws glue job";
pub const NAME_FIELD: &str = "job_name";

/// Documented `JobRunState` values.
pub const STATUSES: &[&str] = &[
    "STARTING",
    "RUNNING",
    "STOPPING",
    "STOPPED",
    "SUCCEEDED",
    "FAILED",
    "ERROR",
    "WAITING",
    "TIMEOUT",
];

pub fn resource_arn(region: &str, account_id: &str, name: &str) -> String {
    format!("arn:aws:glue:{region}:{account_id}:job/{name}")
}

pub fn normalize_status(status: &str) -> Outcome {
    match status {
        "SUCCEEDED" => Outcome::Success,
        "STOPPED" | "FAILED" | "ERROR" | "TIMEOUT" => Outcome::Error,
        _ => Outcome::Running,
    }
}
