//! Plugin input and the template.execute request envelope.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::{Validate, ValidationErrors};

use super::error::{BridgeError, BridgeResult};
use crate::{services::ServiceKind, validation_error};

/// Body of `POST /api/v1/template.execute`.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteTemplateArgs {
    pub workflow: Option<Workflow>,
    pub template: Option<Template>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub plugin: HashMap<String, JsonValue>,
}

impl ExecuteTemplateArgs {
    pub fn from_slice(body: &[u8]) -> BridgeResult<Self> {
        let args: ExecuteTemplateArgs = serde_json::from_slice(body)?;
        if args.workflow.is_none() || args.template.is_none() {
            return Err(BridgeError::Request(
                "workflow and template are required".to_string(),
            ));
        }
        Ok(args)
    }

    pub fn workflow_meta(&self) -> Option<&ObjectMeta> {
        self.workflow.as_ref().map(|wf| &wf.metadata)
    }

    /// Extracts this plugin's input from the template's plugin map.
    pub fn plugin_input(&self, plugin_key: &str) -> BridgeResult<PluginRequest> {
        let value = self
            .template
            .as_ref()
            .and_then(|template| template.plugin.get(plugin_key))
            .ok_or_else(|| BridgeError::Request("plugin input not found".to_string()))?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Validate,
    Execute,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Validate => "validate",
            Action::Execute => "execute",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate" => Ok(Action::Validate),
            "execute" => Ok(Action::Execute),
            _ => Err(format!("action '{s}' is not supported")),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockState {
    Success,
    Running,
    Error,
}

impl FromStr for MockState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(MockState::Success),
            "running" => Ok(MockState::Running),
            "error" => Ok(MockState::Error),
            _ => Err(format!("mock_state '{s}' is not supported")),
        }
    }
}

/// Required common fields in the order they are checked. The service field is keyed by
/// its wire name or its field name depending on how the derive reports it.
const REQUIRED_FIELDS: [&str; 5] = [
    "account_id",
    "service",
    "service_name",
    "action",
    "region_name",
];

/// Raw plugin input as sent by the workflow author.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct PluginRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "account_id is empty"))]
    pub account_id: String,
    #[serde(default, rename = "service")]
    #[validate(length(min = 1, message = "service is empty"))]
    pub service_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "action is empty"))]
    pub action: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "region_name is empty"))]
    pub region_name: String,
    #[serde(default)]
    pub pipeline_name: String,
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub step_function_name: String,
    #[serde(default)]
    pub lambda_function_name: String,
    #[serde(default)]
    pub parameters: Option<Map<String, JsonValue>>,
    /// Derived during validation; a caller supplied value is discarded.
    #[serde(default, skip_deserializing)]
    pub resource_arn: String,
    #[serde(default)]
    pub mock: bool,
    #[serde(default)]
    pub mock_state: String,
}

impl PluginRequest {
    fn resource_name(&self, service: ServiceKind) -> &str {
        match service {
            ServiceKind::SageMakerPipelines => &self.pipeline_name,
            ServiceKind::Glue => &self.job_name,
            ServiceKind::StepFunctions => &self.step_function_name,
            ServiceKind::Lambda => &self.lambda_function_name,
        }
    }

    /// Validates the input and resolves it into a single target resource.
    ///
    /// Checks run in a fixed order so the first problem found is the one reported.
    pub fn resolve(mut self) -> BridgeResult<ServiceRequest> {
        self.validate().map_err(|errs| first_field_error(&errs))?;

        let service: ServiceKind = self.service_name.parse().map_err(BridgeError::Validation)?;
        let action: Action = self.action.parse().map_err(BridgeError::Validation)?;

        let name = self.resource_name(service).to_string();
        if name.is_empty() {
            return Err(validation_error!("{} is empty", service.name_field()));
        }
        self.resource_arn = service.resource_arn(&self.region_name, &self.account_id, &name);

        let mock = if self.mock {
            if self.mock_state.is_empty() {
                return Err(validation_error!("mock_state is empty"));
            }
            Some(self.mock_state.parse().map_err(BridgeError::Validation)?)
        } else {
            None
        };

        Ok(ServiceRequest {
            service,
            action,
            account_id: self.account_id,
            region: self.region_name,
            name,
            resource_arn: self.resource_arn,
            parameters: self.parameters,
            mock,
        })
    }
}

/// Only the first failing field is reported, bare of the field path.
fn first_field_error(errs: &ValidationErrors) -> BridgeError {
    let field_errors = errs.field_errors();
    REQUIRED_FIELDS
        .iter()
        .filter_map(|field| field_errors.get(*field))
        .flat_map(|errors| errors.iter())
        .find_map(|error| error.message.as_ref().map(|message| message.to_string()))
        .map(BridgeError::Validation)
        .unwrap_or_else(|| BridgeError::from(errs.clone()))
}

/// A validated request bound to exactly one target resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub service: ServiceKind,
    pub action: Action,
    pub account_id: String,
    pub region: String,
    pub name: String,
    pub resource_arn: String,
    pub parameters: Option<Map<String, JsonValue>>,
    pub mock: Option<MockState>,
}

impl ServiceRequest {
    /// Invocation payload: the parameter mapping, or an empty object.
    pub fn payload(&self) -> JsonValue {
        match &self.parameters {
            Some(params) => JsonValue::Object(params.clone()),
            None => JsonValue::Object(Map::new()),
        }
    }
}
