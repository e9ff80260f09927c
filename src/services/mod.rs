//! Supported AWS services.
//!
//! Each service lives in its own module with its name field, ARN template and status
//! table. [`ServiceKind`] is the closed set the rest of the plugin dispatches on.

pub mod glue;
pub mod lambda;
pub mod sagemaker_pipelines;
pub mod step_functions;

use std::{fmt, str::FromStr};

use crate::core::Outcome;

/// How the outcome of an `execute` action is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStyle {
    /// The service returns a run id that is polled on every callback.
    Poll,
    /// Fire-and-forget invocation tracked by the async invocation runner.
    Invoke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    SageMakerPipelines,
    Glue,
    StepFunctions,
    Lambda,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::SageMakerPipelines,
        ServiceKind::Glue,
        ServiceKind::StepFunctions,
        ServiceKind::Lambda,
    ];

    /// Name used in the plugin input and in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::SageMakerPipelines => sagemaker_pipelines::SERVICE_NAME,
            ServiceKind::Glue => glue::SERVICE_NAME,
            ServiceKind::StepFunctions => step_functions::SERVICE_NAME,
            ServiceKind::Lambda => lambda::SERVICE_NAME,
        }
    }

    /// Human readable name used in messages and logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::SageMakerPipelines => sagemaker_pipelines::DISPLAY_NAME,
            ServiceKind::Glue => glue::DISPLAY_NAME,
            ServiceKind::StepFunctions => step_functions::DISPLAY_NAME,
            ServiceKind::Lambda => lambda::DISPLAY_NAME,
        }
    }

    /// The plugin input field carrying the resource name for this service.
    pub fn name_field(&self) -> &'static str {
        match self {
            ServiceKind::SageMakerPipelines => sagemaker_pipelines::NAME_FIELD,
            ServiceKind::Glue => glue::NAME_FIELD,
            ServiceKind::StepFunctions => step_functions::NAME_FIELD,
            ServiceKind::Lambda => lambda::NAME_FIELD,
        }
    }

    pub fn resource_arn(&self, region: &str, account_id: &str, name: &str) -> String {
        match self {
            ServiceKind::SageMakerPipelines => {
                sagemaker_pipelines::resource_arn(region, account_id, name)
            }
            ServiceKind::Glue => glue::resource_arn(region, account_id, name),
            ServiceKind::StepFunctions => step_functions::resource_arn(region, account_id, name),
            ServiceKind::Lambda => lambda::resource_arn(region, account_id, name),
        }
    }

    pub fn normalize_status(&self, status: &str) -> Outcome {
        match self {
            ServiceKind::SageMakerPipelines => sagemaker_pipelines::normalize_status(status),
            ServiceKind::Glue => glue::normalize_status(status),
            ServiceKind::StepFunctions => step_functions::normalize_status(status),
            ServiceKind::Lambda => lambda::normalize_status(status),
        }
    }

    pub fn documented_statuses(&self) -> &'static [&'static str] {
        match self {
            ServiceKind::SageMakerPipelines => sagemaker_pipelines::STATUSES,
            ServiceKind::Glue => glue::STATUSES,
            ServiceKind::StepFunctions => step_functions::STATUSES,
            ServiceKind::Lambda => lambda::STATUSES,
        }
    }

    pub fn execution_style(&self) -> ExecutionStyle {
        match self {
            ServiceKind::Lambda => ExecutionStyle::Invoke,
            _ => ExecutionStyle::Poll,
        }
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("service '{s}' is not supported"))
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_names() {
        for kind in ServiceKind::ALL {
            assert_eq!(kind.as_str().parse::<ServiceKind>(), Ok(kind));
        }
        let err = "amazon_s3".parse::<ServiceKind>().unwrap_err();
        assert_eq!(err, "service 'amazon_s3' is not supported");
    }

    #[test]
    fn test_documented_statuses_are_classified() {
        for kind in ServiceKind::ALL {
            let statuses = kind.documented_statuses();
            let successes = statuses
                .iter()
                .filter(|s| kind.normalize_status(s) == Outcome::Success)
                .count();
            assert_eq!(successes, 1, "{kind} must have exactly one success token");
            for status in statuses {
                assert_ne!(kind.normalize_status(status), Outcome::Unknown);
            }
        }
    }

    #[test]
    fn test_undocumented_status_is_running() {
        for kind in ServiceKind::ALL {
            for status in ["", "QUEUED", "Pending", "SOMETHING_NEW"] {
                assert_eq!(kind.normalize_status(status), Outcome::Running, "{kind}");
            }
        }
    }

    #[test]
    fn test_execution_style() {
        assert_eq!(ServiceKind::Lambda.execution_style(), ExecutionStyle::Invoke);
        assert_eq!(ServiceKind::Glue.execution_style(), ExecutionStyle::Poll);
        assert_eq!(
            ServiceKind::SageMakerPipelines.execution_style(),
            ExecutionStyle::Poll
        );
        assert_eq!(ServiceKind::StepFunctions.execution_style(), ExecutionStyle::Poll);
    }
}
