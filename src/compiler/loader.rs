use anyhow::{Result, Context as AnyhowContext};
use std::fs;
use std::path::Path;
use crate::dsl::FlowDefinition;

pub fn load_flow_definition_from_yaml(file_path: impl AsRef<Path>) -> Result<FlowDefinition> {
    let file_path = file_path.as_ref();
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read YAML file from {}", file_path.display()))?;

    parse_flow_definition(&yaml_content)
        .with_context(|| format!("Failed to deserialize YAML content from {}", file_path.display()))
}

pub fn parse_flow_definition(yaml: &str) -> crate::errors::Result<FlowDefinition> {
    Ok(serde_yaml::from_str(yaml)?)
}
