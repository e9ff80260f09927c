//! AWS Lambda has no run resource to poll. Executions are asynchronous invocations whose
//! result is tracked locally, so the statuses below are the ones the invocation runner
//! publishes rather than tokens returned by AWS.

use crate::core::Outcome;

pub const SERVICE_NAME: &str = "aws_lambda";
pub const DISPLAY_NAME: &str = "aws lambda function";
pub const NAME_FIELD: &str = "lambda_function_name";

pub const STATUS_RUNNING: &str = "RUNNING";
pub const STATUS_SUCCEEDED: &str = "SUCCEEDED";
pub const STATUS_FAILED: &str = "FAILED";

pub const STATUSES: &[&str] = &[STATUS_RUNNING, STATUS_SUCCEEDED, STATUS_FAILED];

pub fn resource_arn(region: &str, account_id: &str, name: &str) -> String {
    format!("arn:aws:lambda:{region}:{account_id}:function:{name}")
}

pub fn normalize_status(status: &str) -> Outcome {
    match status {
        STATUS_SUCCEEDED => Outcome::Success,
        STATUS_FAILED => Outcome::Error,
        _ => Outcome::Running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_arn() {
        assert_eq!(
            resource_arn("ap-south-1", "100000000002", "resize-images"),
            "arn:aws:lambda:ap-south-1:100000000002:function:resize-images"
        );
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status(STATUS_SUCCEEDED), Outcome::Success);
        assert_eq!(normalize_status(STATUS_FAILED), Outcome::Error);
        assert_eq!(normalize_status(STATUS_RUNNING), Outcome::Running);
        assert_eq!(normalize_status("Pending"), Outcome::Running);
    }
}
