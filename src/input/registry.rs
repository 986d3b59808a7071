//! Connector type name to factory mapping.
//!
//! Populated explicitly at startup; a configuration object
//! `{"<type>": {...}}` is turned into a boxed [`Input`] by looking up `<type>`.

use std::collections::BTreeMap;
use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{
    ApplicationsInputConfig, GoalsInputConfig, LogsInputConfig, ScheduleInputConfig,
    StatTableInputConfig,
};
use crate::error_handling::ConfigError;
use crate::input::{
    ApplicationsInput, GoalsInput, Input, LogsInput, ScheduleInput, StatTableInput,
};

/// Builds an input from the JSON object found under its type name.
///
/// The registry is passed along so wrapper inputs can build their children.
pub type InputFactory = fn(Value, &InputRegistry) -> Result<Box<dyn Input>, ConfigError>;

#[derive(Default)]
pub struct InputRegistry {
    factories: BTreeMap<&'static str, InputFactory>,
}

impl InputRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every input this crate provides.
    pub fn with_builtin_inputs() -> Self {
        let mut registry = Self::new();
        registry.register(LogsInput::NAME, build_logs);
        registry.register(StatTableInput::METRIKA_NAME, build_metrika_stat_table);
        registry.register(StatTableInput::APPMETRICA_NAME, build_appmetrica_stat_table);
        registry.register(GoalsInput::NAME, build_goals);
        registry.register(ApplicationsInput::NAME, build_applications);
        registry.register(ScheduleInput::NAME, build_schedule);
        registry
    }

    /// Registers a factory, replacing any previous one for `name`.
    pub fn register(&mut self, name: &'static str, factory: InputFactory) {
        debug!("Registered input type {}", name);
        self.factories.insert(name, factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered type names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Builds an input from `{"<type>": {...fields}}`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the object does not have exactly one key,
    /// the type is unknown, or the input's own configuration is invalid.
    pub fn build(&self, config: &Value) -> Result<Box<dyn Input>, ConfigError> {
        let object = config
            .as_object()
            .filter(|o| o.len() == 1)
            .ok_or_else(|| {
                ConfigError::new("input", "expected an object with exactly one input type key")
            })?;
        let Some((name, fields)) = object.iter().next() else {
            return Err(ConfigError::new("input", "missing input type"));
        };

        let factory = self.factories.get(name.as_str()).ok_or_else(|| {
            ConfigError::new(
                name.as_str(),
                format!("unknown input type; expected one of {}", self.names().join(", ")),
            )
        })?;
        factory(fields.clone(), self)
    }
}

fn parse<T: DeserializeOwned>(name: &str, fields: Value) -> Result<T, ConfigError> {
    serde_json::from_value(fields).map_err(|e| ConfigError::new(name, e.to_string()))
}

fn build_logs(fields: Value, _: &InputRegistry) -> Result<Box<dyn Input>, ConfigError> {
    let config: LogsInputConfig = parse(LogsInput::NAME, fields)?;
    Ok(Box::new(LogsInput::from_config(config)?))
}

fn build_metrika_stat_table(fields: Value, _: &InputRegistry) -> Result<Box<dyn Input>, ConfigError> {
    let config: StatTableInputConfig = parse(StatTableInput::METRIKA_NAME, fields)?;
    Ok(Box::new(StatTableInput::metrika(config)?))
}

fn build_appmetrica_stat_table(
    fields: Value,
    _: &InputRegistry,
) -> Result<Box<dyn Input>, ConfigError> {
    let config: StatTableInputConfig = parse(StatTableInput::APPMETRICA_NAME, fields)?;
    Ok(Box::new(StatTableInput::appmetrica(config)?))
}

fn build_goals(fields: Value, _: &InputRegistry) -> Result<Box<dyn Input>, ConfigError> {
    let config: GoalsInputConfig = parse(GoalsInput::NAME, fields)?;
    Ok(Box::new(GoalsInput::from_config(config)?))
}

fn build_applications(fields: Value, _: &InputRegistry) -> Result<Box<dyn Input>, ConfigError> {
    let config: ApplicationsInputConfig = parse(ApplicationsInput::NAME, fields)?;
    Ok(Box::new(ApplicationsInput::from_config(config)?))
}

fn build_schedule(fields: Value, registry: &InputRegistry) -> Result<Box<dyn Input>, ConfigError> {
    let config: ScheduleInputConfig = parse::<ScheduleInputConfig>(ScheduleInput::NAME, fields)?.validated()?;
    let child = registry.build(&config.input)?;
    Ok(Box::new(ScheduleInput::new(
        child,
        Duration::from_secs(config.interval_secs),
    )))
}
