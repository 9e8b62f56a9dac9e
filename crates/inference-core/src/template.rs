//! Template Variables
//!
//! `{{name}}` substitution for prompt files. Variables come from an inline
//! YAML mapping and from a YAML mapping of names to files whose contents
//! become the value.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::error::{AgentError, Result};

/// Resolved variable name → value
pub type TemplateVariables = BTreeMap<String, String>;

/// Parse an inline YAML mapping of variables. Scalars are stringified.
pub fn parse_template_variables(yaml: &str) -> Result<TemplateVariables> {
    parse_mapping(yaml, "input")?
        .into_iter()
        .map(|(name, value)| {
            let value = scalar_to_string(&value).ok_or_else(|| {
                AgentError::Config(format!("template variable '{name}' must be a scalar value"))
            })?;
            Ok((name, value))
        })
        .collect()
}

/// Parse a YAML mapping of variable names to file paths and read each file
pub fn parse_file_template_variables(yaml: &str) -> Result<TemplateVariables> {
    parse_mapping(yaml, "file_input")?
        .into_iter()
        .map(|(name, value)| {
            let path = value.as_str().ok_or_else(|| {
                AgentError::Config(format!("file variable '{name}' must be a file path"))
            })?;
            let contents = std::fs::read_to_string(path).map_err(|e| {
                AgentError::Config(format!("cannot read file for variable '{name}' ({path}): {e}"))
            })?;
            Ok((name, contents))
        })
        .collect()
}

/// Combine inline and file-backed variables; a name may only be defined once
pub fn merge_template_variables(
    inline: TemplateVariables,
    files: TemplateVariables,
) -> Result<TemplateVariables> {
    let mut merged = inline;
    for (name, value) in files {
        if merged.contains_key(&name) {
            return Err(AgentError::Config(format!(
                "variable '{name}' is defined in both input and file_input"
            )));
        }
        merged.insert(name, value);
    }
    Ok(merged)
}

/// Replace every `{{name}}` with its value. Unknown names are left as written.
pub fn replace_template_variables(text: &str, vars: &TemplateVariables) -> String {
    let mut out = String::with_capacity(text.len());
    let mut unknown = BTreeSet::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let placeholder = &rest[start..start + 2 + end + 2];
        let name = after[..end].trim();

        match vars.get(name) {
            Some(value) if is_variable_name(name) => out.push_str(value),
            _ => {
                if is_variable_name(name) {
                    unknown.insert(name.to_owned());
                }
                out.push_str(placeholder);
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    for name in unknown {
        warn!(variable = %name, "Template variable has no value");
    }

    out
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn parse_mapping(yaml: &str, input: &str) -> Result<Vec<(String, serde_yml::Value)>> {
    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_yml::Value = serde_yml::from_str(yaml)
        .map_err(|e| AgentError::Config(format!("{input} is not valid YAML: {e}")))?;

    match value {
        serde_yml::Value::Null => Ok(Vec::new()),
        serde_yml::Value::Mapping(map) => map
            .into_iter()
            .map(|(key, value)| {
                let name = scalar_to_string(&key).ok_or_else(|| {
                    AgentError::Config(format!("{input} keys must be plain names"))
                })?;
                Ok((name, value))
            })
            .collect(),
        _ => Err(AgentError::Config(format!(
            "{input} must be a YAML mapping of variable names to values"
        ))),
    }
}

fn scalar_to_string(value: &serde_yml::Value) -> Option<String> {
    match value {
        serde_yml::Value::String(s) => Some(s.clone()),
        serde_yml::Value::Number(n) => Some(n.to_string()),
        serde_yml::Value::Bool(b) => Some(b.to_string()),
        serde_yml::Value::Null => Some(String::new()),
        _ => None,
    }
}
