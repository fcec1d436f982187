//! Schema types and builders for tfplug
//!
//! Schemas describe the shape of provider, resource and data source values.
//! Besides being sent to Terraform, they drive planning (defaults, plan
//! modifiers), validation and shaping of state before it is encoded.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    /// The cty JSON type expression Terraform expects in schema responses
    pub fn to_cty_json(&self) -> serde_json::Value {
        use serde_json::{json, Map, Value};

        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_cty_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_cty_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_cty_json()]),
            AttributeType::Object(fields) => {
                let fields: Map<String, Value> = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_cty_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_cty_json().to_string().into_bytes()
    }

    /// Shapes a value to this type: object values get every declared field
    /// (missing ones null) and lose undeclared ones
    pub fn conform(&self, value: &Dynamic) -> Dynamic {
        match (self, value) {
            (AttributeType::List(elem), Dynamic::List(items))
            | (AttributeType::Set(elem), Dynamic::List(items)) => {
                Dynamic::List(items.iter().map(|item| elem.conform(item)).collect())
            }
            (AttributeType::Map(elem), Dynamic::Map(entries)) => Dynamic::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), elem.conform(v)))
                    .collect(),
            ),
            (AttributeType::Object(fields), Dynamic::Map(entries)) => Dynamic::Map(
                fields
                    .iter()
                    .map(|(name, ty)| {
                        let field = entries.get(name).unwrap_or(&Dynamic::Null);
                        (name.clone(), ty.conform(field))
                    })
                    .collect(),
            ),
            _ => value.clone(),
        }
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    /// Runs attribute validators against known, non-null configuration values
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for attr in &self.block.attributes {
            if attr.validators.is_empty() {
                continue;
            }
            let path = AttributePath::new(&attr.name);
            let value = config.get(&path).cloned().unwrap_or(Dynamic::Null);
            if value.is_null() || !value.is_fully_known() {
                continue;
            }
            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(value.clone()),
                    path: path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }

        diagnostics
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Shapes an object value to this block. Every declared attribute is
    /// present (null when missing), list and set blocks default to empty
    /// lists, undeclared keys are dropped. Null and unknown pass through.
    pub fn conform(&self, value: &Dynamic) -> Dynamic {
        let Dynamic::Map(entries) = value else {
            return value.clone();
        };

        let mut shaped = HashMap::with_capacity(self.attributes.len() + self.block_types.len());
        for attr in &self.attributes {
            let field = entries.get(&attr.name).unwrap_or(&Dynamic::Null);
            shaped.insert(attr.name.clone(), attr.r#type.conform(field));
        }
        for nested in &self.block_types {
            let field = entries.get(&nested.type_name).unwrap_or(&Dynamic::Null);
            shaped.insert(nested.type_name.clone(), nested.conform(field));
        }

        Dynamic::Map(shaped)
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn Default>>,
    pub deprecated: bool,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

impl NestedBlock {
    fn conform(&self, value: &Dynamic) -> Dynamic {
        match (self.nesting, value) {
            (_, Dynamic::Unknown) => Dynamic::Unknown,
            (NestingMode::List | NestingMode::Set, Dynamic::List(items)) => {
                Dynamic::List(items.iter().map(|item| self.block.conform(item)).collect())
            }
            (NestingMode::List | NestingMode::Set, _) => Dynamic::List(Vec::new()),
            (NestingMode::Map, Dynamic::Map(entries)) => Dynamic::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.block.conform(v)))
                    .collect(),
            ),
            (NestingMode::Map, _) => Dynamic::Map(HashMap::new()),
            (NestingMode::Group, Dynamic::Null) => self.block.conform(&Dynamic::Map(HashMap::new())),
            (NestingMode::Single | NestingMode::Group, _) => self.block.conform(value),
            (NestingMode::Invalid, _) => value.clone(),
        }
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Validator checks a configured attribute value during validation
pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier adjusts a planned attribute value
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Default provides the planned value for an optional+computed attribute
/// that is null in configuration
pub trait Default: Send + Sync {
    fn description(&self) -> String;
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                deprecated: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(Arc::from(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(Arc::from(modifier));
        self
    }

    /// Defaults only apply to optional+computed attributes, since Terraform
    /// rejects planned values for attributes it considers config-only
    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(Arc::from(default));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    block_types: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }

    /// Finishes as a nested block body rather than a root schema
    pub fn build_block(self) -> Block {
        self.schema.block
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::StringLengthValidator;

    fn library_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .validator(StringLengthValidator::between(1, 8))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "storage_class_ids",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .required()
                .build(),
            )
            .block(NestedBlock {
                type_name: "subscription_config".to_string(),
                block: SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("subscription_url", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("password", AttributeType::String)
                            .optional()
                            .sensitive()
                            .build(),
                    )
                    .build_block(),
                nesting: NestingMode::List,
                min_items: 0,
                max_items: 1,
            })
            .build()
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn cty_type_encoding() {
        assert_eq!(AttributeType::String.to_bytes(), b"\"string\"".to_vec());
        assert_eq!(
            AttributeType::Set(Box::new(AttributeType::String)).to_cty_json(),
            serde_json::json!(["set", "string"])
        );

        let object = AttributeType::Object(HashMap::from([
            ("name".to_string(), AttributeType::String),
            ("id".to_string(), AttributeType::String),
        ]));
        assert_eq!(
            AttributeType::List(Box::new(object)).to_cty_json(),
            serde_json::json!(["list", ["object", {"name": "string", "id": "string"}]])
        );
    }

    #[test]
    fn conform_fills_missing_attributes_and_blocks() {
        let schema = library_schema();
        let value = Dynamic::Map(HashMap::from([
            ("name".to_string(), Dynamic::String("lib".to_string())),
            ("stale".to_string(), Dynamic::Bool(true)),
        ]));

        let shaped = schema.block.conform(&value);
        let Dynamic::Map(entries) = shaped else {
            panic!("expected object");
        };

        assert_eq!(entries.len(), 4);
        assert_eq!(entries["id"], Dynamic::Null);
        assert_eq!(entries["storage_class_ids"], Dynamic::Null);
        assert_eq!(entries["subscription_config"], Dynamic::List(vec![]));
        assert!(!entries.contains_key("stale"));
    }

    #[test]
    fn conform_shapes_nested_block_elements() {
        let schema = library_schema();
        let value = Dynamic::Map(HashMap::from([(
            "subscription_config".to_string(),
            Dynamic::List(vec![Dynamic::Map(HashMap::from([(
                "subscription_url".to_string(),
                Dynamic::String("https://example.com/lib.json".to_string()),
            )]))]),
        )]));

        let shaped = DynamicValue::new(schema.block.conform(&value));
        let path = AttributePath::new("subscription_config").index(0);
        assert_eq!(
            shaped
                .get_string(&path.clone().attribute("subscription_url"))
                .unwrap(),
            "https://example.com/lib.json"
        );
        assert_eq!(
            shaped.get(&path.attribute("password")),
            Some(&Dynamic::Null)
        );
    }

    #[test]
    fn conform_leaves_null_and_unknown_roots() {
        let schema = library_schema();
        assert_eq!(schema.block.conform(&Dynamic::Null), Dynamic::Null);
        assert_eq!(schema.block.conform(&Dynamic::Unknown), Dynamic::Unknown);
    }

    #[test]
    fn validate_config_runs_attribute_validators() {
        let schema = library_schema();

        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("name"), "far-too-long-name".to_string())
            .unwrap();
        let diagnostics = schema.validate_config(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some(AttributePath::new("name"))
        );

        config.mark_unknown(&AttributePath::new("name")).unwrap();
        assert!(schema.validate_config(&config).is_empty());
    }
}
