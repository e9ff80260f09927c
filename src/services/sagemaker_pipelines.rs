use crate::core::Outcome;

pub const SERVICE_NAME: &str = "amazon_sagemaker_pipelines";
pub const DISPLAY_NAME: &str = "amazon sagemaker pipeline";
pub const NAME_FIELD: &str = "pipeline_name";

/// Documented `PipelineExecutionStatus` values.
pub const STATUSES: &[&str] = &["Executing", "Stopping", "Stopped", "Failed", "Succeeded"];

pub fn resource_arn(region: &str, account_id: &str, name: &str) -> String {
    format!("arn:aws:sagemaker:{region}:{account_id}:pipeline/{name}")
}

pub fn normalize_status(status: &str) -> Outcome {
    match status {
        "Succeeded" => Outcome::Success,
        "Stopped" | "Failed" => Outcome::Error,
        // Executing, Stopping and anything introduced later
        _ => Outcome::Running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_arn() {
        assert_eq!(
            resource_arn("us-west-2", "100000000002", "MyPipeline"),
            "arn:aws:sagemaker:us-west-2:100000000002:pipeline/MyPipeline"
        );
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("Succeeded"), Outcome::Success);
        assert_eq!(normalize_status("Failed"), Outcome::Error);
        assert_eq!(normalize_status("Stopped"), Outcome::Error);
        assert_eq!(normalize_status("Executing"), Outcome::Running);
        assert_eq!(normalize_status("Stopping"), Outcome::Running);
        // native tokens are case sensitive
        assert_eq!(normalize_status("SUCCEEDED"), Outcome::Running);
    }
}
