//! Capability schema and record validation
//!
//! A [`Schema`] is an ordered list of typed field descriptors. Validation is
//! pure: the same record and schema always produce the same result.
//!
//! Rules applied to each field:
//!
//! - required and missing: error, field omitted
//! - present with the wrong type or out of range: error, field omitted
//!   (the default is only used for absent fields)
//! - absent with a default: default used
//! - unknown key: warning, value passed through
//! - object fields with `properties` validate recursively with the same rules

use super::{
    ErrorVerbosity, EscapeHandling, OutputFormat, ToolComplexity, DEFAULT_MAX_CONCURRENT_TOOLS,
    DEFAULT_MAX_LIST_ITEMS, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_MAX_TOOLS_PER_CALL,
    DEFAULT_RATE_LIMIT_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_MS, DEFAULT_TIMEOUT_MS,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// JSON type a field must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// JSON string
    String,
    /// JSON number (integer or float)
    Number,
    /// JSON boolean
    Boolean,
    /// JSON object
    Object,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Descriptor for a single schema field
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Expected JSON type
    pub field_type: FieldType,
    /// Whether the field must be present (full validation only)
    pub required: bool,
    /// Value used when the field is absent (full validation only)
    pub default: Option<Value>,
    /// Inclusive lower bound for numbers
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers
    pub max: Option<f64>,
    /// Allowed values for strings
    pub allowed: Option<&'static [&'static str]>,
    /// Nested schema for object fields
    pub properties: Option<Schema>,
}

impl FieldSchema {
    fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            min: None,
            max: None,
            allowed: None,
            properties: None,
        }
    }

    /// String field
    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    /// Number field
    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    /// Boolean field
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Object field validated against `properties`
    pub fn object(properties: Schema) -> Self {
        let mut field = Self::new(FieldType::Object);
        field.properties = Some(properties);
        field
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default used for absent values
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Restrict a number to `[min, max]`
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Restrict a string to a fixed set of values
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// Ordered collection of field descriptors
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSchema)>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field descriptor
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.fields.push((name.into(), schema));
        self
    }

    /// Look up a field descriptor by name
    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, schema)| schema)
    }

    /// Iterate field descriptors in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    /// Validate a record against this schema
    ///
    /// # Arguments
    ///
    /// * `record` - Capability record to check
    /// * `mode` - `Full` for complete records, `Patch` for partial layers
    ///
    /// # Returns
    ///
    /// Returns the validated record together with any errors and warnings
    ///
    /// # Examples
    ///
    /// ```
    /// use clientfit::capability::{capability_schema, ValidationMode};
    /// use serde_json::json;
    ///
    /// let patch = json!({"maxToolsPerCall": 99});
    /// let result = capability_schema().validate(patch.as_object().unwrap(), ValidationMode::Patch);
    /// assert!(!result.valid);
    /// assert!(result.config.get("maxToolsPerCall").is_none());
    /// ```
    pub fn validate(&self, record: &Map<String, Value>, mode: ValidationMode) -> ValidationResult {
        let mut result = ValidationResult::default();
        let mut config = Map::new();
        self.validate_into(record, mode, "", &mut config, &mut result);
        result.config = config;
        result.valid = result.errors.is_empty();
        result
    }

    fn validate_into(
        &self,
        record: &Map<String, Value>,
        mode: ValidationMode,
        prefix: &str,
        out: &mut Map<String, Value>,
        result: &mut ValidationResult,
    ) {
        for (name, field) in self.fields() {
            let path = format!("{}{}", prefix, name);
            match record.get(name) {
                None | Some(Value::Null) => {
                    if mode == ValidationMode::Patch {
                        continue;
                    }
                    if let Some(default) = &field.default {
                        out.insert(name.to_string(), default.clone());
                    } else if field.required {
                        result.errors.push(format!("{}: required field is missing", path));
                    }
                }
                Some(value) => {
                    if let Some(checked) = field.check(&path, value, mode, result) {
                        out.insert(name.to_string(), checked);
                    }
                }
            }
        }

        for (key, value) in record {
            if self.get(key).is_none() {
                result
                    .warnings
                    .push(format!("{}{}: unknown field passed through", prefix, key));
                out.insert(key.clone(), value.clone());
            }
        }
    }
}

impl FieldSchema {
    fn check(
        &self,
        path: &str,
        value: &Value,
        mode: ValidationMode,
        result: &mut ValidationResult,
    ) -> Option<Value> {
        if !self.field_type.matches(value) {
            result
                .errors
                .push(format!("{}: expected {}", path, self.field_type));
            return None;
        }

        match self.field_type {
            FieldType::Number => {
                let n = value.as_f64().unwrap_or(f64::NAN);
                if let Some(min) = self.min {
                    if n < min {
                        result.errors.push(format!("{}: must be >= {}", path, min));
                        return None;
                    }
                }
                if let Some(max) = self.max {
                    if n > max {
                        result.errors.push(format!("{}: must be <= {}", path, max));
                        return None;
                    }
                }
                Some(value.clone())
            }
            FieldType::String => {
                if let (Some(allowed), Some(s)) = (self.allowed, value.as_str()) {
                    if !allowed.contains(&s) {
                        result.errors.push(format!(
                            "{}: must be one of {}",
                            path,
                            allowed.join(", ")
                        ));
                        return None;
                    }
                }
                Some(value.clone())
            }
            FieldType::Object => match (&self.properties, value.as_object()) {
                (Some(properties), Some(nested)) => {
                    let mut out = Map::new();
                    let prefix = format!("{}.", path);
                    properties.validate_into(nested, mode, &prefix, &mut out, result);
                    Some(Value::Object(out))
                }
                _ => Some(value.clone()),
            },
            FieldType::Boolean => Some(value.clone()),
        }
    }
}

/// Whether required fields and defaults apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Complete record: required fields enforced, defaults filled in
    Full,
    /// Partial layer: only fields that are present are checked
    Patch,
}

/// Outcome of validating a record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    /// True when no errors were found
    pub valid: bool,
    /// Validated record with invalid fields removed
    pub config: Map<String, Value>,
    /// Field-level errors
    pub errors: Vec<String>,
    /// Non-fatal findings such as unknown keys
    pub warnings: Vec<String>,
}

/// The schema every client configuration record is validated against
pub fn capability_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(build_capability_schema)
}

fn build_capability_schema() -> Schema {
    let rate_limit = Schema::new()
        .field(
            "requests",
            FieldSchema::number()
                .range(1.0, 10_000.0)
                .with_default(json!(DEFAULT_RATE_LIMIT_REQUESTS)),
        )
        .field(
            "window",
            FieldSchema::number()
                .range(1_000.0, 3_600_000.0)
                .with_default(json!(DEFAULT_RATE_LIMIT_WINDOW_MS)),
        );

    let features = Schema::new()
        .field("progressNotifications", FieldSchema::boolean().with_default(json!(false)))
        .field("resourceSubscriptions", FieldSchema::boolean().with_default(json!(false)))
        .field("prompts", FieldSchema::boolean().with_default(json!(false)));

    let ui = Schema::new()
        .field(
            "maxListItems",
            FieldSchema::number()
                .range(1.0, 1_000.0)
                .with_default(json!(DEFAULT_MAX_LIST_ITEMS)),
        )
        .field("showMetadata", FieldSchema::boolean().with_default(json!(false)))
        .field("codeBlocks", FieldSchema::boolean().with_default(json!(true)));

    Schema::new()
        .field("id", FieldSchema::string().required())
        .field("name", FieldSchema::string().required())
        .field(
            "maxToolsPerCall",
            FieldSchema::number()
                .range(1.0, 50.0)
                .with_default(json!(DEFAULT_MAX_TOOLS_PER_CALL)),
        )
        .field(
            "maxConcurrentTools",
            FieldSchema::number()
                .range(1.0, 10.0)
                .with_default(json!(DEFAULT_MAX_CONCURRENT_TOOLS)),
        )
        .field(
            "timeoutMs",
            FieldSchema::number()
                .range(1_000.0, 300_000.0)
                .with_default(json!(DEFAULT_TIMEOUT_MS)),
        )
        .field(
            "maxResponseSize",
            FieldSchema::number()
                .range(1_000.0, 1_000_000.0)
                .with_default(json!(DEFAULT_MAX_RESPONSE_SIZE)),
        )
        .field("supportsBinaryContent", FieldSchema::boolean().with_default(json!(false)))
        .field("supportsImages", FieldSchema::boolean().with_default(json!(false)))
        .field("supportsStreaming", FieldSchema::boolean().with_default(json!(false)))
        .field(
            "escapeHandling",
            FieldSchema::string()
                .one_of(EscapeHandling::VALUES)
                .with_default(json!(EscapeHandling::default().as_str())),
        )
        .field(
            "outputFormat",
            FieldSchema::string()
                .one_of(OutputFormat::VALUES)
                .with_default(json!(OutputFormat::default().as_str())),
        )
        .field(
            "toolComplexity",
            FieldSchema::string()
                .one_of(ToolComplexity::VALUES)
                .with_default(json!(ToolComplexity::default().as_str())),
        )
        .field(
            "errorVerbosity",
            FieldSchema::string()
                .one_of(ErrorVerbosity::VALUES)
                .with_default(json!(ErrorVerbosity::default().as_str())),
        )
        .field(
            "rateLimit",
            FieldSchema::object(rate_limit).with_default(json!({
                "requests": DEFAULT_RATE_LIMIT_REQUESTS,
                "window": DEFAULT_RATE_LIMIT_WINDOW_MS
            })),
        )
        .field(
            "features",
            FieldSchema::object(features).with_default(json!({
                "progressNotifications": false,
                "resourceSubscriptions": false,
                "prompts": false
            })),
        )
        .field(
            "ui",
            FieldSchema::object(ui).with_default(json!({
                "maxListItems": DEFAULT_MAX_LIST_ITEMS,
                "showMetadata": false,
                "codeBlocks": true
            })),
        )
}
