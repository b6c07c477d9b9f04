use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;

use log::{debug, trace};
use pingora::server::configuration::{Opt, ServerConf};
use pingora_error::{Error, ErrorType::*, OrErr, Result};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Config::validate_references"))]
pub struct Config {
    #[serde(default)]
    pub pingora: ServerConf,

    #[validate(length(min = 1))]
    #[validate(nested)]
    pub listeners: Vec<Listener>,

    pub status: Option<Status>,
    pub prometheus: Option<Prometheus>,
    pub log: Option<Log>,

    #[validate(nested)]
    pub reload: Option<Reload>,

    #[serde(default)]
    pub fetch: Fetch,

    #[validate(nested)]
    #[serde(default)]
    pub shapes: Vec<Shape>,

    #[validate(length(min = 1))]
    #[validate(nested)]
    pub mappings: Vec<Mapping>,
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

    // config file load entry point
    pub fn load_yaml_with_opt_override(opt: &Opt) -> Result<Self> {
        if let Some(path) = &opt.conf {
            let mut conf = Self::load_from_yaml(path)?;
            conf.merge_with_opt(opt);
            Ok(conf)
        } else {
            Error::e_explain(ReadError, "No path specified")
        }
    }

    pub fn from_yaml(conf_str: &str) -> Result<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str).or_err_with(ReadError, || {
            format!("Unable to parse yaml conf {conf_str}")
        })?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()
            .or_err_with(FileReadError, || "Conf file valid failed")?;

        Ok(conf)
    }

    pub fn merge_with_opt(&mut self, opt: &Opt) {
        if opt.daemon {
            self.pingora.daemon = true;
        }
    }

    fn validate_references(&self) -> Result<(), ValidationError> {
        self.validate_shapes()?;
        self.validate_legacy_paths()
    }

    fn validate_shapes(&self) -> Result<(), ValidationError> {
        let mut ids = HashSet::new();
        for shape in &self.shapes {
            if !ids.insert(shape.id.as_str()) {
                let mut err = ValidationError::new("duplicate_shape_id");
                err.add_param("id".into(), &shape.id);
                return Err(err);
            }
        }

        for target in self.mappings.iter().flat_map(|m| m.rationalized.iter()) {
            if let Some(model) = &target.response_model {
                if !ids.contains(model.as_str()) {
                    let mut err = ValidationError::new("unknown_response_model");
                    err.add_param("response_model".into(), model);
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    fn validate_legacy_paths(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for mapping in &self.mappings {
            if !seen.insert(mapping.legacy.as_str()) {
                let mut err = ValidationError::new("duplicate_legacy_path");
                err.add_param("legacy".into(), &mapping.legacy);
                return Err(err);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Listener::validate_tls_for_offer_h2"))]
pub struct Listener {
    pub address: SocketAddr,
    pub tls: Option<Tls>,
    #[serde(default)]
    pub offer_h2: bool,
}

impl Listener {
    fn validate_tls_for_offer_h2(&self) -> Result<(), ValidationError> {
        if self.offer_h2 && self.tls.is_none() {
            Err(ValidationError::new("tls_required_for_h2"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Status {
    pub address: SocketAddr,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Prometheus {
    pub address: SocketAddr,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    pub path: String,
    #[serde(default = "Log::default_level")]
    pub level: String,
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }
}

/// Periodic re-read of the config file for mapping changes
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Reload {
    /// Seconds between checks
    #[serde(default = "Reload::default_interval")]
    #[validate(range(min = 1))]
    pub interval: u64,
}

impl Reload {
    fn default_interval() -> u64 {
        5
    }
}

/// Settings of the HTTP client used to call rationalized targets
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fetch {
    #[serde(default = "Fetch::default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
    /// Seconds an idle connection is kept
    #[serde(default = "Fetch::default_pool_idle_timeout")]
    pub pool_idle_timeout: u64,
    /// Seconds between TCP keepalive probes
    pub tcp_keepalive: Option<u64>,
    pub user_agent: Option<String>,
}

impl Default for Fetch {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: Self::default_pool_max_idle_per_host(),
            pool_idle_timeout: Self::default_pool_idle_timeout(),
            tcp_keepalive: None,
            user_agent: None,
        }
    }
}

impl Fetch {
    fn default_pool_max_idle_per_host() -> usize {
        10
    }

    fn default_pool_idle_timeout() -> u64 {
        90
    }
}

/// Named response shape referenced by `response_model`
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Shape {
    #[validate(length(min = 1))]
    pub id: String,
    /// Field holding the item collection
    #[serde(default = "Shape::default_items")]
    #[validate(length(min = 1))]
    pub items: String,
    /// Fields every item must carry
    #[serde(default)]
    pub required: Vec<String>,
}

impl Shape {
    fn default_items() -> String {
        "items".to_string()
    }
}

/// One legacy path and the rationalized targets serving it
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Mapping::validate_dependencies"))]
pub struct Mapping {
    #[validate(custom(function = "Mapping::validate_legacy"))]
    pub legacy: String,

    #[serde(default)]
    #[validate(nested)]
    pub aggregation: Aggregation,

    #[validate(length(min = 1))]
    #[validate(nested)]
    pub rationalized: Vec<Rationalized>,
}

impl Mapping {
    fn validate_legacy(legacy: &str) -> Result<(), ValidationError> {
        if legacy.starts_with('/') {
            Ok(())
        } else {
            Err(ValidationError::new("legacy_path_must_start_with_slash"))
        }
    }

    // every upstream must exist in the mapping and must not be dependent itself
    fn validate_dependencies(&self) -> Result<(), ValidationError> {
        for target in self.rationalized.iter().filter(|t| t.dependent) {
            let Some(depends_on) = target.depends_on.as_deref() else {
                continue;
            };

            match self.rationalized.iter().find(|u| u.url == depends_on) {
                None => {
                    let mut err = ValidationError::new("unresolved_dependency");
                    err.add_param("depends_on".into(), &depends_on);
                    return Err(err);
                }
                Some(upstream) if upstream.dependent => {
                    let mut err = ValidationError::new("chained_dependency");
                    err.add_param("url".into(), &target.url);
                    return Err(err);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Rationalized::validate_dependency"))]
pub struct Rationalized {
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    pub dependent: bool,
    #[validate(length(min = 1))]
    pub depends_on: Option<String>,
    /// Field read from the upstream response
    #[validate(length(min = 1))]
    pub dependency_field: Option<String>,
    /// Request parameter carrying the extracted value
    #[validate(length(min = 1))]
    pub dependency_param: Option<String>,
    pub response_model: Option<String>,
    #[serde(alias = "max_threads")]
    #[validate(range(min = 1))]
    pub max_concurrency: usize,
}

impl Rationalized {
    fn validate_dependency(&self) -> Result<(), ValidationError> {
        match (self.dependent, &self.depends_on, &self.dependency_field) {
            (true, Some(_), Some(_)) | (false, None, None) => {}
            (true, _, _) => return Err(ValidationError::new("dependent_requires_depends_on_and_field")),
            (false, _, _) => return Err(ValidationError::new("independent_has_dependency")),
        }

        if !self.dependent && self.dependency_param.is_some() {
            return Err(ValidationError::new("independent_has_dependency"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Aggregation {
    #[serde(default = "Aggregation::default_correlation_key")]
    #[validate(length(min = 1))]
    pub correlation_key: String,
    #[serde(default = "Aggregation::default_fields")]
    #[validate(nested)]
    pub fields: Vec<FieldRule>,
}

impl Default for Aggregation {
    fn default() -> Self {
        Self {
            correlation_key: Self::default_correlation_key(),
            fields: Self::default_fields(),
        }
    }
}

impl Aggregation {
    fn default_correlation_key() -> String {
        "commonId".to_string()
    }

    fn default_fields() -> Vec<FieldRule> {
        vec![FieldRule {
            output: "property1".to_string(),
            independent: "propertyA".to_string(),
            dependent: "propertyB".to_string(),
            combine: Combine::Concat,
            separator: FieldRule::default_separator(),
        }]
    }
}

/// How one output field is built from a joined pair of items
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct FieldRule {
    #[validate(length(min = 1))]
    pub output: String,
    #[validate(length(min = 1))]
    pub independent: String,
    #[validate(length(min = 1))]
    pub dependent: String,
    #[serde(default)]
    pub combine: Combine,
    #[serde(default = "FieldRule::default_separator")]
    pub separator: String,
}

impl FieldRule {
    fn default_separator() -> String {
        " ".to_string()
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    #[default]
    Concat,
    Independent,
    Dependent,
}
