//! Tool generation from sampled documents.
//!
//! The `ToolGenerator` turns a collection or table name into a query tool
//! specification: it samples documents, infers their attributes, asks the
//! text generator for a specification and resolves the answer.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toolsmith_spec::{
    AttributePath, Document, ID_FIELD, ObjectKind, ToolSpecification, ToolTarget, discover,
    escape_key,
};
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, Result};
use crate::prompt::{self, PromptContext};
use crate::provider::{SampleProvider, TextGenerator};
use crate::resolver;

/// A request to generate a tool for one collection or table.
///
/// Fields are optional on the wire so missing input surfaces as a
/// validation error instead of a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Kind of object to sample.
    #[serde(rename = "dataType", default)]
    pub kind: Option<ObjectKind>,

    /// Name of the collection or table.
    #[serde(default)]
    pub name: Option<String>,

    /// Database holding the object.
    #[serde(rename = "dbName", default)]
    pub db_name: Option<String>,

    /// Extra instructions for the generator.
    #[serde(default)]
    pub instructions: Option<String>,
}

impl GenerationRequest {
    /// Create a request for `target`.
    pub fn new(target: ToolTarget) -> Self {
        Self {
            kind: Some(target.kind),
            name: Some(target.name),
            db_name: None,
            instructions: None,
        }
    }

    /// Set the database name.
    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = Some(db_name.into());
        self
    }

    /// Add instructions for the generator.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// The result of tool generation.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// The generated tool.
    pub tool: ToolSpecification,

    /// Attributes discovered in the samples.
    pub attributes: Vec<AttributePath>,

    /// Non-fatal issues found in the generated tool.
    pub warnings: Vec<String>,
}

/// Attributes discovered for an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeReport {
    pub attributes: Vec<AttributePath>,
    pub sample_count: usize,
}

/// Orchestrates sampling, discovery, prompting and resolution.
///
/// Holds no per-call state; concurrent calls share only the collaborators.
pub struct ToolGenerator {
    samples: Arc<dyn SampleProvider>,
    text_generator: Arc<dyn TextGenerator>,
    config: GeneratorConfig,
}

impl ToolGenerator {
    /// Create a generator over the given collaborators.
    pub fn new(samples: Arc<dyn SampleProvider>, text_generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            samples,
            text_generator,
            config: GeneratorConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate a tool from a request.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        let target = Self::validate_request(&request)?;
        let db_name = self.resolve_db_name(request.db_name.as_deref());

        let documents = self
            .samples
            .fetch_samples(&target, db_name.as_deref(), self.config.sample_limit)
            .await?;
        let attributes = discover(&documents);

        if documents.is_empty() {
            return Err(GenerationError::NotFound {
                kind: target.kind,
                name: target.name,
            });
        }
        debug!(
            "Sampled {} documents with {} attributes from {target}",
            documents.len(),
            attributes.len()
        );

        let schema = match self.samples.fetch_schema(&target, db_name.as_deref()).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!("Ignoring schema for {target}: {e}");
                None
            }
        };

        let samples = scrub_samples(&documents, self.config.prompt_samples);
        let completion = prompt::build_request(&PromptContext {
            kind: target.kind,
            object_name: &target.name,
            db_name: db_name.as_deref(),
            attributes: &attributes,
            samples: &samples,
            schema: schema.as_ref(),
            instructions: request.instructions.as_deref(),
        });

        let response = self.text_generator.complete(completion).await?;
        let (tool, mut warnings) =
            resolver::resolve_with_repairs(&response, &target, db_name.as_deref())?;

        warnings.extend(review(&tool, &attributes));
        for warning in &warnings {
            warn!("Generated tool {}: {warning}", tool.name);
        }

        info!(
            "Generated tool {} for {target} using {}",
            tool.name,
            self.text_generator.name()
        );

        Ok(GenerationResult {
            tool,
            attributes,
            warnings,
        })
    }

    /// Discover the attributes of `target` from a small sample.
    pub async fn lookup_attributes(
        &self,
        target: &ToolTarget,
        db_name: Option<&str>,
    ) -> Result<AttributeReport> {
        let db_name = self.resolve_db_name(db_name);
        let documents = self
            .samples
            .fetch_samples(target, db_name.as_deref(), self.config.attribute_samples)
            .await?;

        Ok(AttributeReport {
            attributes: discover(&documents),
            sample_count: documents.len(),
        })
    }

    /// Validate a generation request.
    fn validate_request(request: &GenerationRequest) -> Result<ToolTarget> {
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        match (request.kind, name) {
            (Some(kind), Some(name)) => Ok(ToolTarget::new(kind, name)),
            _ => Err(GenerationError::Validation(
                "Collection/table name and data type are required".to_string(),
            )),
        }
    }

    fn resolve_db_name(&self, requested: Option<&str>) -> Option<String> {
        requested
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| self.config.default_db_name.clone())
    }
}

/// The first `count` samples without their catalog identifier.
pub fn scrub_samples(documents: &[Document], count: usize) -> Vec<Document> {
    documents
        .iter()
        .take(count)
        .map(|document| {
            let mut document = document.clone();
            document.remove(ID_FIELD);
            document
        })
        .collect()
}

/// Flag generated references to attributes the samples never showed.
fn review(tool: &ToolSpecification, attributes: &[AttributePath]) -> Vec<String> {
    let known: BTreeSet<&str> = attributes.iter().map(String::as_str).collect();
    let is_known = |path: &str| {
        let escaped = path.split('.').map(escape_key).collect::<Vec<_>>().join(".");
        known.contains(escaped.as_str())
    };

    let mut warnings = Vec::new();
    if tool.parameters.is_empty() {
        warnings.push("Tool has no parameters defined".to_string());
    }
    for parameter in &tool.parameters {
        if !is_known(&parameter.attribute) {
            warnings.push(format!(
                "Parameter {} targets unknown attribute {}",
                parameter.param, parameter.attribute
            ));
        }
    }
    if let Some(projection) = &tool.projection {
        for field in projection.keys().filter(|field| !is_known(field)) {
            warnings.push(format!("Projection field {field} is not a known attribute"));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use toolsmith_spec::ToolParameter;

    #[test]
    fn test_generation_request() {
        let request = GenerationRequest::new(ToolTarget::collection("movies"))
            .with_db_name("cinema")
            .with_instructions("only indexed columns");

        assert_eq!(request.kind, Some(ObjectKind::Collection));
        assert_eq!(request.db_name.as_deref(), Some("cinema"));
    }

    #[test]
    fn test_request_wire_names() {
        let request: GenerationRequest =
            serde_json::from_value(json!({"dataType": "table", "name": "books", "dbName": "lib"}))
                .unwrap();

        assert_eq!(
            ToolGenerator::validate_request(&request).unwrap(),
            ToolTarget::table("books")
        );
    }

    #[test]
    fn test_validation() {
        let missing_kind = GenerationRequest {
            name: Some("books".to_string()),
            ..Default::default()
        };
        let blank_name = GenerationRequest {
            kind: Some(ObjectKind::Table),
            name: Some("  ".to_string()),
            ..Default::default()
        };

        for request in [missing_kind, blank_name] {
            assert!(matches!(
                ToolGenerator::validate_request(&request),
                Err(GenerationError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_scrub_samples() {
        let documents: Vec<Document> = (0..7)
            .map(|i| json!({"_id": i, "n": i}).as_object().cloned().unwrap())
            .collect();

        let scrubbed = scrub_samples(&documents, 5);

        assert_eq!(scrubbed.len(), 5);
        assert!(scrubbed.iter().all(|doc| !doc.contains_key("_id")));
        assert_eq!(scrubbed[4]["n"], json!(4));
    }

    #[test]
    fn test_review_flags_unknown_attributes() {
        let mut tool = ToolSpecification::new("t")
            .with_parameter(ToolParameter::new("year", "year"))
            .with_parameter(ToolParameter::new("vector", "$vector"))
            .with_parameter(ToolParameter::new("ghost", "ghost"));
        tool.add_projection_field();

        let attributes = vec!["_$vector".to_string(), "year".to_string()];
        let warnings = review(&tool, &attributes);

        assert_eq!(
            warnings,
            vec![
                "Parameter ghost targets unknown attribute ghost".to_string(),
                "Projection field field_1 is not a known attribute".to_string(),
            ]
        );
    }

    #[test]
    fn test_review_flags_missing_parameters() {
        let warnings = review(&ToolSpecification::new("t"), &[]);
        assert_eq!(warnings, vec!["Tool has no parameters defined".to_string()]);
    }
}
