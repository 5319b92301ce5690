//! Builders for Gemini `responseSchema` values (the OpenAPI subset the API accepts).

use serde_json::{json, Map, Value};

pub fn string(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

pub fn number(description: &str) -> Value {
    json!({ "type": "NUMBER", "description": description })
}

pub fn string_array(description: &str) -> Value {
    json!({
        "type": "ARRAY",
        "items": { "type": "STRING" },
        "description": description
    })
}

pub fn array_of(items: Value, description: &str) -> Value {
    json!({ "type": "ARRAY", "items": items, "description": description })
}

/// Object schema. Every listed property is marked required.
pub fn object(properties: &[(&str, Value)]) -> Value {
    let mut props = Map::new();
    for (name, schema) in properties {
        props.insert((*name).to_string(), schema.clone());
    }
    let required: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();
    json!({
        "type": "OBJECT",
        "properties": props,
        "required": required
    })
}
