// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Query identity: the cache key of one logical list
//!
//! An identity is the pair (resource name, canonical serialization of the base
//! parameters). Two identities are equal iff their serialized forms are equal,
//! regardless of the key order the caller used when building the parameters.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Immutable key identifying one paginated list
#[derive(Debug, Clone)]
pub struct QueryIdentity {
    resource: String,
    params: Value,
    serialized: String,
}

impl QueryIdentity {
    /// Build an identity from any serializable parameter set
    pub fn new<P: Serialize>(resource: impl Into<String>, params: &P) -> Self {
        // Serializing plain data structures into a Value does not fail; anything
        // that does (non-string map keys) degrades to a null parameter set.
        let params = serde_json::to_value(params).unwrap_or(Value::Null);
        Self::from_value(resource, params)
    }

    /// Build an identity from an already-constructed JSON value
    pub fn from_value(resource: impl Into<String>, params: Value) -> Self {
        let mut serialized = String::new();
        write_canonical(&params, &mut serialized);
        Self {
            resource: resource.into(),
            params,
            serialized,
        }
    }

    /// Identity with no base parameters
    pub fn bare(resource: impl Into<String>) -> Self {
        Self::from_value(resource, Value::Object(serde_json::Map::new()))
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Look up one top-level base parameter
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_object().and_then(|map| map.get(key))
    }

    /// Canonical serialization of the base parameters
    pub fn serialized_params(&self) -> &str {
        &self.serialized
    }

    /// Flat string key, `resource:params`
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.resource, self.serialized)
    }
}

impl PartialEq for QueryIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource && self.serialized == other.serialized
    }
}

impl Eq for QueryIdentity {}

impl Hash for QueryIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.serialized.hash(state);
    }
}

impl fmt::Display for QueryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.serialized)
    }
}

/// Write `value` as JSON with object keys sorted at every depth
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Predicate selecting a set of identities, used by mutations that must reach
/// every cached list an item can appear in (e.g. all footprint lists regardless
/// of their type filter).
#[derive(Debug, Clone, Default)]
pub struct IdentityFilter {
    exact: Option<QueryIdentity>,
    resource: Option<String>,
    params: Vec<(String, Value)>,
}

impl IdentityFilter {
    /// Matches every identity
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches exactly one identity
    pub fn exact(identity: &QueryIdentity) -> Self {
        Self {
            exact: Some(identity.clone()),
            ..Self::default()
        }
    }

    /// Matches every identity of a resource
    pub fn resource(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            ..Self::default()
        }
    }

    /// Additionally require a top-level base parameter to equal `value`
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn matches(&self, identity: &QueryIdentity) -> bool {
        if let Some(exact) = &self.exact {
            if exact != identity {
                return false;
            }
        }
        if let Some(resource) = &self.resource {
            if resource != identity.resource() {
                return false;
            }
        }
        self.params
            .iter()
            .all(|(key, value)| identity.param(key) == Some(value))
    }
}
