//! Local template definitions.

use std::path::{Path, PathBuf};

use reportobello_api_types::{TemplateRecord, VariableKind};
use serde_json::Value;

use super::error::SchemaError;
use super::fingerprint::{Fingerprint, fingerprint};
use super::schema::VariableSchema;

/// Where the template markup comes from. Exactly one case is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Inline(String),
    File(PathBuf),
}

/// A named template: markup source plus the variables it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    source: TemplateSource,
    variables: VariableSchema,
}

impl Template {
    pub fn builder(name: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            name: name.into(),
            content: None,
            file: None,
            variables: VariableSchema::new(),
        }
    }

    pub fn inline(name: impl Into<String>, content: impl Into<String>) -> Result<Self, SchemaError> {
        Self::builder(name).content(content).build()
    }

    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, SchemaError> {
        Self::builder(name).file(path).build()
    }

    /// Rebuild a template from the latest version stored remotely.
    pub fn from_record(record: TemplateRecord) -> Result<Self, SchemaError> {
        Self::builder(record.name)
            .content(record.content)
            .variables(VariableSchema::from(record.variables))
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn variables(&self) -> &VariableSchema {
        &self.variables
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if let TemplateSource::Inline(content) = &self.source {
            if content.is_empty() {
                return Err(SchemaError::EmptyContent {
                    name: self.name.clone(),
                });
            }
        }
        self.variables.validate()
    }

    /// Load the markup and pair it with the schema.
    pub async fn resolve(&self) -> Result<ResolvedTemplate, SchemaError> {
        self.validate()?;

        let content = match &self.source {
            TemplateSource::Inline(content) => content.clone(),
            TemplateSource::File(path) => read_source(path).await?,
        };
        if content.is_empty() {
            return Err(SchemaError::EmptyContent {
                name: self.name.clone(),
            });
        }

        Ok(ResolvedTemplate {
            name: self.name.clone(),
            content,
            variables: self.variables.clone(),
        })
    }
}

async fn read_source(path: &Path) -> Result<String, SchemaError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SchemaError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    name: String,
    content: Option<String>,
    file: Option<PathBuf>,
    variables: VariableSchema,
}

impl TemplateBuilder {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, kind: VariableKind) -> Self {
        self.variables = self.variables.with(name, kind);
        self
    }

    pub fn variable_with_default(
        mut self,
        name: impl Into<String>,
        kind: VariableKind,
        default: Value,
    ) -> Self {
        self.variables = self.variables.with_default(name, kind, default);
        self
    }

    pub fn variables(mut self, variables: VariableSchema) -> Self {
        self.variables = variables;
        self
    }

    pub fn build(self) -> Result<Template, SchemaError> {
        let source = match (self.content, self.file) {
            (Some(_), Some(_)) => {
                return Err(SchemaError::ConflictingSource { name: self.name });
            }
            (None, None) => return Err(SchemaError::MissingSource { name: self.name }),
            (Some(content), None) => TemplateSource::Inline(content),
            (None, Some(path)) => TemplateSource::File(path),
        };

        let template = Template {
            name: self.name,
            source,
            variables: self.variables,
        };
        template.validate()?;
        Ok(template)
    }
}

/// A template whose markup has been loaded; the unit of comparison with the
/// remote copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplate {
    pub name: String,
    pub content: String,
    pub variables: VariableSchema,
}

impl ResolvedTemplate {
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.content, &self.variables)
    }
}
