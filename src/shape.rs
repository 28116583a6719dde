// Copyright 2025 Cowboy AI, LLC.

//! Runtime payload shapes
//!
//! Rust generics already make the read output and the write input agree at
//! compile time. Dynamically typed payloads (`serde_json::Value`) escape that
//! guarantee, so write operations over them can declare a [`Shape`]: the
//! fields they require and the JSON kinds each field may take. Shapes can be
//! written by hand or derived from any [`JsonSchema`] type.

use std::collections::{BTreeMap, BTreeSet};

use schemars::schema::{InstanceType, Schema, SingleOrVec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON value kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonKind {
    /// `null`
    Null,
    /// `true` / `false`
    Bool,
    /// Any number
    Number,
    /// A string
    String,
    /// An array
    Array,
    /// An object
    Object,
}

impl JsonKind {
    /// Kind of a JSON value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    fn from_instance_type(instance: &InstanceType) -> Self {
        match instance {
            InstanceType::Null => JsonKind::Null,
            InstanceType::Boolean => JsonKind::Bool,
            InstanceType::Number | InstanceType::Integer => JsonKind::Number,
            InstanceType::String => JsonKind::String,
            InstanceType::Array => JsonKind::Array,
            InstanceType::Object => JsonKind::Object,
        }
    }
}

/// Expectation for one field of a shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Accepted kinds; empty means any kind
    pub kinds: BTreeSet<JsonKind>,
    /// Whether the field must be present
    pub required: bool,
}

/// Expected structure of a JSON object payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Name used in messages
    pub name: String,
    fields: BTreeMap<String, FieldSpec>,
}

impl Shape {
    /// Empty shape that accepts any object
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Derive a shape from a JSON Schema type
    ///
    /// Only the top-level properties are used. Nested references accept any
    /// kind.
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let mut shape = Shape::new(T::schema_name());

        if let Some(object) = root.schema.object.as_deref() {
            for (name, schema) in &object.properties {
                let kinds = match schema {
                    Schema::Object(schema) => match &schema.instance_type {
                        Some(SingleOrVec::Single(kind)) => {
                            BTreeSet::from([JsonKind::from_instance_type(kind)])
                        }
                        Some(SingleOrVec::Vec(kinds)) => {
                            kinds.iter().map(JsonKind::from_instance_type).collect()
                        }
                        None => BTreeSet::new(),
                    },
                    Schema::Bool(_) => BTreeSet::new(),
                };
                shape.fields.insert(
                    name.clone(),
                    FieldSpec {
                        kinds,
                        required: object.required.contains(name),
                    },
                );
            }
        }

        shape
    }

    /// Require a field of the given kind
    pub fn require(mut self, field: impl Into<String>, kind: JsonKind) -> Self {
        self.fields.insert(
            field.into(),
            FieldSpec {
                kinds: BTreeSet::from([kind]),
                required: true,
            },
        );
        self
    }

    /// Allow an optional field of the given kind
    pub fn optional(mut self, field: impl Into<String>, kind: JsonKind) -> Self {
        self.fields.insert(
            field.into(),
            FieldSpec {
                kinds: BTreeSet::from([kind, JsonKind::Null]),
                required: false,
            },
        );
        self
    }

    /// Field expectation by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Names of the required fields
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }

    /// Check a payload against the shape
    ///
    /// Arrays are checked element by element. Returns every disagreement found.
    pub fn check(&self, value: &Value) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.check_object(item, &format!("[{index}]."), &mut issues);
                }
            }
            other => self.check_object(other, "", &mut issues),
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    fn check_object(&self, value: &Value, prefix: &str, issues: &mut Vec<String>) {
        let Some(object) = value.as_object() else {
            issues.push(format!(
                "{prefix}expected object for `{}`, found {:?}",
                self.name,
                JsonKind::of(value)
            ));
            return;
        };

        for (name, spec) in &self.fields {
            match object.get(name) {
                None if spec.required => issues.push(format!("{prefix}{name} is missing")),
                None => {}
                Some(field) => {
                    let kind = JsonKind::of(field);
                    if !spec.kinds.is_empty() && !spec.kinds.contains(&kind) {
                        issues.push(format!(
                            "{prefix}{name} has kind {kind:?}, expected one of {:?}",
                            spec.kinds
                        ));
                    }
                }
            }
        }
    }

    /// Check that everything this shape requires is produced by `producer`
    pub fn accepts(&self, producer: &Shape) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();

        for (name, spec) in self.fields.iter().filter(|(_, spec)| spec.required) {
            match producer.fields.get(name) {
                None => issues.push(format!("{name} is not produced by `{}`", producer.name)),
                Some(produced) if !produced.required => issues.push(format!(
                    "{name} is optional in `{}` but required by `{}`",
                    producer.name, self.name
                )),
                Some(produced) => {
                    let disjoint = !spec.kinds.is_empty()
                        && !produced.kinds.is_empty()
                        && spec.kinds.is_disjoint(&produced.kinds);
                    if disjoint {
                        issues.push(format!(
                            "{name} is produced as {:?} but accepted as {:?}",
                            produced.kinds, spec.kinds
                        ));
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}
