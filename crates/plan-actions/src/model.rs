//! Action models: the argument schema an action library publishes for
//! each action it exposes (spec §6, "Action registration").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgumentType {
    String,
    Integer,
    Float,
    Bool,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub arg_type: ArgumentType,
}

impl ArgumentDescriptor {
    pub fn required(name: impl Into<String>, arg_type: ArgumentType) -> Self {
        ArgumentDescriptor { name: name.into(), required: true, default: None, arg_type }
    }

    pub fn optional(name: impl Into<String>, arg_type: ArgumentType, default: serde_json::Value) -> Self {
        ArgumentDescriptor { name: name.into(), required: false, default: Some(default), arg_type }
    }
}

/// One action an action library exposes by name, with its argument
/// schema (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionModel {
    pub name: String,
    pub arguments: Vec<ArgumentDescriptor>,
}

impl ActionModel {
    pub fn new(name: impl Into<String>, arguments: Vec<ArgumentDescriptor>) -> Self {
        ActionModel { name: name.into(), arguments }
    }

    /// Fill in declared defaults for any argument the caller omitted
    /// and reject a call missing a required one.
    pub fn resolve_arguments(
        &self,
        mut provided: HashMap<String, serde_json::Value>,
    ) -> crate::error::Result<HashMap<String, serde_json::Value>> {
        for descriptor in &self.arguments {
            if !provided.contains_key(&descriptor.name) {
                match &descriptor.default {
                    Some(default) => {
                        provided.insert(descriptor.name.clone(), default.clone());
                    }
                    None if descriptor.required => {
                        return Err(crate::error::ActionError::MissingArgument(descriptor.name.clone()));
                    }
                    None => {}
                }
            }
        }
        Ok(provided)
    }
}

/// A library of actions published to the interface layer by name
/// (spec §6, "Action libraries expose their actions by name to the
/// interface").
#[derive(Debug, Clone, Default)]
pub struct ActionLibrary {
    actions: HashMap<String, ActionModel>,
}

impl ActionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: ActionModel) {
        self.actions.insert(model.name.clone(), model);
    }

    pub fn get(&self, name: &str) -> Option<&ActionModel> {
        self.actions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_arguments_fills_defaults_and_rejects_missing_required() {
        let model = ActionModel::new(
            "fetch_page",
            vec![
                ArgumentDescriptor::required("url", ArgumentType::String),
                ArgumentDescriptor::optional("timeout_ms", ArgumentType::Integer, serde_json::json!(5000)),
            ],
        );
        let resolved = model
            .resolve_arguments(HashMap::from([("url".to_string(), serde_json::json!("https://x"))]))
            .unwrap();
        assert_eq!(resolved.get("timeout_ms"), Some(&serde_json::json!(5000)));

        let err = model.resolve_arguments(HashMap::new()).unwrap_err();
        assert!(matches!(err, crate::error::ActionError::MissingArgument(name) if name == "url"));
    }
}
