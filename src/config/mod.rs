use std::fs;
use std::net::SocketAddr;
use std::{collections::HashMap, time::Duration};

use log::{debug, trace};
use pingora::server::configuration::{Opt, ServerConf};
use pingora_error::{ErrorType::*, OrErr, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::{Validate, ValidationError};

use crate::services::ServiceKind;

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Config::validate_backend_services"))]
pub struct Config {
    #[serde(default)]
    pub pingora: ServerConf,

    #[serde(default)]
    #[validate(nested)]
    pub bridge: Bridge,

    #[serde(default)]
    pub backends: HashMap<String, Backend>,
}

// Config file load and validation
impl Config {
    // Does not have to be async until we want runtime reload
    pub fn load_from_yaml<P>(path: P) -> Result<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path).or_err_with(ReadError, || {
            format!("Unable to read conf file from {path}")
        })?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    // config file load entry point, defaults apply without a conf file
    pub fn load_yaml_with_opt_override(opt: &Opt) -> Result<Self> {
        let mut conf = match &opt.conf {
            Some(path) => Self::load_from_yaml(path)?,
            None => {
                debug!("No conf file specified, using defaults");
                Self::default()
            }
        };
        conf.merge_with_opt(opt);
        Ok(conf)
    }

    pub fn from_yaml(conf_str: &str) -> Result<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str).or_err_with(ReadError, || {
            format!("Unable to parse yaml conf {conf_str}")
        })?;

        trace!("Loaded conf: {conf:?}");

        // use validator to validate conf file
        conf.validate()
            .or_err_with(FileReadError, || "Conf file valid failed")?;

        Ok(conf)
    }

    #[allow(dead_code)]
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }

    pub fn merge_with_opt(&mut self, opt: &Opt) {
        if opt.daemon {
            self.pingora.daemon = true;
        }
    }

    fn validate_backend_services(&self) -> Result<(), ValidationError> {
        for (service, backend) in &self.backends {
            if service.parse::<ServiceKind>().is_err() {
                let mut err = ValidationError::new("unsupported_backend_service");
                err.add_param("service".into(), &service.to_string());
                return Err(err);
            }
            if let Err(errs) = backend.validate() {
                let mut err = ValidationError::new("invalid_backend");
                err.add_param("service".into(), &service.to_string());
                err.add_param("reason".into(), &errs.to_string());
                return Err(err);
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Bridge {
    #[serde(default = "Bridge::default_address")]
    pub address: SocketAddr,
    #[serde(default = "Bridge::default_plugin_key")]
    #[validate(length(min = 1))]
    pub plugin_key: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    #[validate(nested)]
    pub requeue: Requeue,
    #[serde(default)]
    #[validate(nested)]
    pub tracker: Tracker,
    #[validate(nested)]
    pub log: Option<Log>,
    pub prometheus: Option<Prometheus>,
}

impl Default for Bridge {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
            plugin_key: Self::default_plugin_key(),
            debug: false,
            requeue: Requeue::default(),
            tracker: Tracker::default(),
            log: None,
            prometheus: None,
        }
    }
}

impl Bridge {
    fn default_address() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 7492))
    }

    fn default_plugin_key() -> String {
        "awf-aws-plugin".to_string()
    }
}

/// Requeue intervals in seconds handed back to the engine for running nodes.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Requeue {
    #[serde(default = "Requeue::default_poll")]
    #[validate(range(min = 1))]
    pub poll: u64,
    #[serde(default = "Requeue::default_invoke")]
    #[validate(range(min = 1))]
    pub invoke: u64,
}

impl Default for Requeue {
    fn default() -> Self {
        Self {
            poll: Self::default_poll(),
            invoke: Self::default_invoke(),
        }
    }
}

impl Requeue {
    fn default_poll() -> u64 {
        60
    }

    fn default_invoke() -> u64 {
        5
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll)
    }

    pub fn invoke_interval(&self) -> Duration {
        Duration::from_secs(self.invoke)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Tracker {
    #[serde(default = "Tracker::default_capacity")]
    #[validate(range(min = 1))]
    pub capacity: usize,
    /// Seconds a record is kept after it was created.
    #[serde(default = "Tracker::default_retention")]
    #[validate(range(min = 1))]
    pub retention: u64,
    #[serde(default = "Tracker::default_sweep_interval")]
    #[validate(range(min = 1))]
    pub sweep_interval: u64,
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
            retention: Self::default_retention(),
            sweep_interval: Self::default_sweep_interval(),
        }
    }
}

impl Tracker {
    fn default_capacity() -> usize {
        10_000
    }

    fn default_retention() -> u64 {
        86_400
    }

    fn default_sweep_interval() -> u64 {
        60
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Log {
    #[validate(length(min = 1))]
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Prometheus {
    pub address: SocketAddr,
}

/// Simulated resources served by the in-memory backend of one service.
#[derive(Clone, Default, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Backend::validate_unique_names"))]
pub struct Backend {
    #[serde(default)]
    #[validate(nested)]
    pub resources: Vec<Resource>,
}

impl Backend {
    fn validate_unique_names(&self) -> Result<(), ValidationError> {
        let mut seen = std::collections::HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.name.as_str()) {
                let mut err = ValidationError::new("duplicate_resource_name");
                err.add_param("name".into(), &resource.name);
                return Err(err);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Resource {
    #[validate(length(min = 1))]
    pub name: String,
    /// Native status tokens returned by successive polls; the last one sticks.
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub fail_start: bool,
    pub invoke_error: Option<String>,
    pub result: Option<JsonValue>,
}
