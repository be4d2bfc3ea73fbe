//! JSON payload dialects
//!
//! OData services speak either the v4 "light" dialect (`value`,
//! `@odata.nextLink`) or the v3 "verbose" dialect (`d`, `results`,
//! `__next`). The engine maps both onto the same proxy graph.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::constants::{
    LIGHT_COLLECTION_KEY, LIGHT_CONTROL_PREFIX, LIGHT_NEXT_LINK_KEY, VERBOSE_COLLECTION_KEY,
    VERBOSE_DEFERRED_KEY, VERBOSE_METADATA_KEY, VERBOSE_NEXT_LINK_KEY, VERBOSE_ROOT_KEY,
};
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonDialect {
    #[default]
    Light,
    Verbose,
}

impl_domain_status_conversions!(JsonDialect {
    Light => "light",
    Verbose => "verbose",
});

/// Casing applied to property names in outgoing payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyCasing {
    #[default]
    AsIs,
    Camel,
    Pascal,
}

impl PropertyCasing {
    pub fn apply(&self, name: &str) -> String {
        let mut chars = name.chars();
        match (self, chars.next()) {
            (Self::AsIs, _) | (_, None) => name.to_string(),
            (Self::Camel, Some(first)) => first.to_lowercase().chain(chars).collect(),
            (Self::Pascal, Some(first)) => first.to_uppercase().chain(chars).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JsonFormat {
    pub dialect: JsonDialect,
    #[serde(default)]
    pub casing: PropertyCasing,
}

impl JsonFormat {
    pub const fn light() -> Self {
        Self { dialect: JsonDialect::Light, casing: PropertyCasing::AsIs }
    }

    pub const fn verbose() -> Self {
        Self { dialect: JsonDialect::Verbose, casing: PropertyCasing::AsIs }
    }

    #[must_use]
    pub const fn with_casing(mut self, casing: PropertyCasing) -> Self {
        self.casing = casing;
        self
    }

    pub const fn accept_header(&self) -> &'static str {
        match self.dialect {
            JsonDialect::Light => "application/json",
            JsonDialect::Verbose => "application/json;odata=verbose",
        }
    }

    pub const fn content_type(&self) -> &'static str {
        self.accept_header()
    }

    /// Strip the dialect envelope (`{"d": ...}` in verbose).
    pub fn unwrap_payload(&self, json: Json) -> Json {
        match (self.dialect, json) {
            (JsonDialect::Verbose, Json::Object(mut map)) if map.contains_key(VERBOSE_ROOT_KEY) => {
                map.remove(VERBOSE_ROOT_KEY).unwrap_or(Json::Null)
            }
            (_, other) => other,
        }
    }

    /// Items of a collection payload, after [`Self::unwrap_payload`].
    pub fn collection_items<'a>(&self, json: &'a Json) -> Option<&'a Vec<Json>> {
        match json {
            Json::Array(items) => Some(items),
            Json::Object(map) => {
                let key = match self.dialect {
                    JsonDialect::Light => LIGHT_COLLECTION_KEY,
                    JsonDialect::Verbose => VERBOSE_COLLECTION_KEY,
                };
                map.get(key).and_then(Json::as_array)
            }
            _ => None,
        }
    }

    /// Server-driven paging continuation link, if present.
    pub fn next_link(&self, json: &Json) -> Option<String> {
        let key = match self.dialect {
            JsonDialect::Light => LIGHT_NEXT_LINK_KEY,
            JsonDialect::Verbose => VERBOSE_NEXT_LINK_KEY,
        };
        json.get(key).and_then(Json::as_str).map(str::to_string)
    }

    /// Whether a payload key carries protocol metadata rather than data.
    pub fn is_control_key(&self, key: &str) -> bool {
        match self.dialect {
            JsonDialect::Light => key.starts_with(LIGHT_CONTROL_PREFIX) || key.contains("@odata."),
            JsonDialect::Verbose => {
                key == VERBOSE_METADATA_KEY
                    || key == VERBOSE_DEFERRED_KEY
                    || key == VERBOSE_NEXT_LINK_KEY
            }
        }
    }

    /// Verbose payloads embed a deferred navigation stub instead of data.
    pub fn is_deferred(&self, json: &Json) -> bool {
        self.dialect == JsonDialect::Verbose
            && json.as_object().is_some_and(|m| m.len() == 1 && m.contains_key(VERBOSE_DEFERRED_KEY))
    }

    /// Scalar result of a service operation: `{"value": x}` in light,
    /// `{"name": x}` in verbose (after the envelope is stripped).
    pub fn unwrap_scalar(&self, json: Json, operation: &str) -> Json {
        let Json::Object(mut map) = json else {
            return json;
        };
        let key = match self.dialect {
            JsonDialect::Light => LIGHT_COLLECTION_KEY,
            JsonDialect::Verbose => operation,
        };
        let mut fields = map.keys().filter(|name| !self.is_control_key(name));
        let only_key = matches!((fields.next(), fields.next()), (Some(name), None) if name == key);
        if only_key {
            if let Some(inner) = map.remove(key) {
                return inner;
            }
        }
        Json::Object(map)
    }

    /// Metadata envelope attached to verbose create/update payloads.
    pub fn type_annotation(&self, type_name: &str) -> Option<(String, Json)> {
        match self.dialect {
            JsonDialect::Light => None,
            JsonDialect::Verbose => Some((
                VERBOSE_METADATA_KEY.to_string(),
                serde_json::json!({ "type": type_name }),
            )),
        }
    }
}
