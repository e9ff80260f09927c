use crate::core::Outcome;

pub const SERVICE_NAME: &str = "aws_step_functions";
pub const DISPLAY_NAME: &str = "aws step function";
pub const NAME_FIELD: &str = "step_function_name";

/// Documented `ExecutionStatus` values.
pub const STATUSES: &[&str] = &[
    "RUNNING",
    "SUCCEEDED",
    "FAILED",
    "TIMED_OUT",
    "ABORTED",
    "PENDING_REDRIVE",
];

pub fn resource_arn(region: &str, account_id: &str, name: &str) -> String {
    format!("arn:aws:states:{region}:{account_id}:stateMachine:{name}")
}

pub fn normalize_status(status: &str) -> Outcome {
    match status {
        "SUCCEEDED" => Outcome::Success,
        "FAILED" | "TIMED_OUT" | "ABORTED" => Outcome::Error,
        // RUNNING, PENDING_REDRIVE
        _ => Outcome::Running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_arn() {
        assert_eq!(
            resource_arn("us-east-1", "100000000002", "OrderFlow"),
            "arn:aws:states:us-east-1:100000000002:stateMachine:OrderFlow"
        );
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("SUCCEEDED"), Outcome::Success);
        assert_eq!(normalize_status("TIMED_OUT"), Outcome::Error);
        assert_eq!(normalize_status("ABORTED"), Outcome::Error);
        assert_eq!(normalize_status("FAILED"), Outcome::Error);
        assert_eq!(normalize_status("PENDING_REDRIVE"), Outcome::Running);
        assert_eq!(normalize_status(""), Outcome::Running);
    }
}
