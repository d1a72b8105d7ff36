//! Logging façade models, written as declaration documents.

use crate::elaborate::library_from_json;
use crate::error::ModelError;
use crate::model::Library;
use serde_json::json;

/// Log levels shared by both façades: (action, method).
const LEVELS: &[(&str, &str)] = &[
    ("Debug", "debug"),
    ("Info", "info"),
    ("Warning", "warn"),
    ("Error", "error"),
];

fn level_constructs() -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    for (action, method) in LEVELS {
        out.push(json!({"kind": "Action", "name": action, "feature": "log"}));
        out.push(json!({
            "kind": "Function",
            "role": "Logger",
            "name": method,
            "actions": [{"name": action, "args": ["message"]}]
        }));
    }
    out
}

pub fn log4j() -> Result<Library, ModelError> {
    let mut constructs = vec![
        json!({"kind": "Type", "role": "Logger", "type": "org.apache.log4j.Logger"}),
        json!({"kind": "Action", "name": "LoggerName", "side_effect": false}),
        json!({
            "kind": "Automaton",
            "role": "Logger",
            "shifts": [{"from": "Init", "to": "Constructed", "functions": ["getLogger"]}]
        }),
        json!({
            "kind": "Function",
            "role": "Logger",
            "name": "getLogger",
            "static": true,
            "returns_value": true,
            "actions": [{"name": "LoggerName", "args": ["loggerName"]}]
        }),
    ];
    constructs.extend(level_constructs());
    library_from_json(&json!({"library": "log4j", "constructs": constructs}))
}

pub fn slf4j() -> Result<Library, ModelError> {
    let mut constructs = vec![
        json!({"kind": "Type", "role": "Logger", "type": "org.slf4j.Logger"}),
        json!({"kind": "Type", "role": "LoggerFactory", "type": "org.slf4j.LoggerFactory"}),
        json!({"kind": "Action", "name": "LoggerName", "side_effect": false}),
        json!({
            "kind": "Function",
            "role": "LoggerFactory",
            "name": "getLogger",
            "static": true,
            "returns_value": true,
            "actions": [{"name": "LoggerName", "args": ["loggerName"]}]
        }),
        json!({
            "kind": "Link",
            "role": "LoggerFactory",
            "function": "getLogger",
            "from": "Init",
            "to_role": "Logger"
        }),
    ];
    constructs.extend(level_constructs());
    library_from_json(&json!({"library": "slf4j", "constructs": constructs}))
}
