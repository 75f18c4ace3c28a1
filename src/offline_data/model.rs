//! Serialized records: offline data file, method entries, reflected method info.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

/// Structural description of a TypeScript type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeShape {
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    Any,
    Unknown,
    Array {
        #[serde(rename = "elementType")]
        element_type: Box<TypeShape>,
    },
    Union {
        types: Vec<TypeShape>,
    },
    Intersection {
        types: Vec<TypeShape>,
    },
    Generic {
        name: String,
        #[serde(rename = "typeArguments", default)]
        type_arguments: Vec<TypeShape>,
    },
    Object {
        name: String,
        #[serde(default)]
        properties: Vec<PropertyShape>,
    },
    Reference {
        name: String,
    },
    Other {
        #[serde(default)]
        text: String,
    },
}

impl Default for TypeShape {
    fn default() -> Self {
        TypeShape::Unknown
    }
}

impl TypeShape {
    pub fn other(text: impl Into<String>) -> Self {
        TypeShape::Other { text: text.into() }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeShape::Reference { name: name.into() }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeShape::String => "string",
            TypeShape::Number => "number",
            TypeShape::Boolean => "boolean",
            TypeShape::Null => "null",
            TypeShape::Undefined => "undefined",
            TypeShape::Any => "any",
            TypeShape::Unknown => "unknown",
            TypeShape::Array { .. } => "array",
            TypeShape::Union { .. } => "union",
            TypeShape::Intersection { .. } => "intersection",
            TypeShape::Generic { .. } => "generic",
            TypeShape::Object { .. } => "object",
            TypeShape::Reference { .. } => "reference",
            TypeShape::Other { .. } => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyShape {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_shape: TypeShape,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_shape: TypeShape,
    #[serde(default)]
    pub comment: String,
}

/// Reflected signature of one client-library method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MethodInfo {
    pub class_name: String,
    pub method_name: String,
    pub method_comment: String,
    pub params: Vec<ParamInfo>,
    pub return_type: TypeShape,
    pub return_comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntry {
    #[serde(default)]
    pub doc: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_method_info"
    )]
    pub method_info: Option<MethodInfo>,
}

impl MethodEntry {
    pub fn new(doc: impl Into<String>, method_info: Option<MethodInfo>) -> Self {
        Self {
            doc: doc.into(),
            method_info,
        }
    }
}

/// Contents of `<exchange>-offline-data.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineData {
    #[serde(default, deserialize_with = "deserialize_methods")]
    pub methods: BTreeMap<String, MethodEntry>,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub example: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl OfflineData {
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Number of entries with a non-empty doc
    pub fn documented_count(&self) -> usize {
        self.methods.values().filter(|e| !e.doc.is_empty()).count()
    }

    /// Number of entries carrying reflected method info
    pub fn reflected_count(&self) -> usize {
        self.methods.values().filter(|e| e.method_info.is_some()).count()
    }
}

/// `null`, missing or `{}` all mean "no method info".
fn deserialize_method_info<'de, D>(deserializer: D) -> Result<Option<MethodInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamedEntry {
    name: String,
    #[serde(default)]
    doc: String,
    #[serde(default, deserialize_with = "deserialize_method_info")]
    method_info: Option<MethodInfo>,
}

/// Accepts `{ "<name>": entry }` as well as `[{ name, doc, methodInfo }]`.
fn deserialize_methods<'de, D>(deserializer: D) -> Result<BTreeMap<String, MethodEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MethodsVisitor;

    impl<'de> Visitor<'de> for MethodsVisitor {
        type Value = BTreeMap<String, MethodEntry>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of method entries or an array of named entries")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut methods = BTreeMap::new();
            while let Some((name, entry)) = map.next_entry::<String, MethodEntry>()? {
                methods.insert(name, entry);
            }
            Ok(methods)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut methods = BTreeMap::new();
            while let Some(entry) = seq.next_element::<NamedEntry>()? {
                methods.insert(entry.name, MethodEntry::new(entry.doc, entry.method_info));
            }
            Ok(methods)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(BTreeMap::new())
        }
    }

    deserializer.deserialize_any(MethodsVisitor)
}
