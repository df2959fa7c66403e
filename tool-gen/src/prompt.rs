//! Prompt synthesis for tool generation.

use toolsmith_spec::{AttributePath, Document, ObjectKind, Operator, ParamType};

use crate::provider::{CompletionRequest, ObjectSchema};

/// System instruction sent with every generation prompt.
pub const SYSTEM_PROMPT: &str = "You are an expert at creating database query tool specifications. \
Always return valid JSON only, no markdown formatting.";

/// Inputs to the generation prompt.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub kind: ObjectKind,
    pub object_name: &'a str,
    pub db_name: Option<&'a str>,
    pub attributes: &'a [AttributePath],
    /// Samples with the catalog identifier already stripped.
    pub samples: &'a [Document],
    /// Key and index layout, when the store exposes it.
    pub schema: Option<&'a ObjectSchema>,
    /// Extra operator instructions.
    pub instructions: Option<&'a str>,
}

/// Render the generation request for `context`.
pub fn build_request(context: &PromptContext<'_>) -> CompletionRequest {
    CompletionRequest::new(render(context))
        .with_system(SYSTEM_PROMPT)
        .expect_json()
}

/// Render the user prompt.
pub fn render(context: &PromptContext<'_>) -> String {
    let kind = context.kind;
    let name = context.object_name;
    let samples =
        serde_json::to_string_pretty(context.samples).unwrap_or_else(|_| "[]".to_string());
    let operators = join(Operator::ALL.into_iter().map(Operator::as_str));
    let types = join(ParamType::ALL.into_iter().map(ParamType::as_str));
    let target_field = kind.field_name();
    let db_name = context.db_name.unwrap_or("default");

    let mut prompt = format!(
        "You are an expert at creating database query tool specifications. \
Based on the following {kind} structure and sample data, generate a comprehensive \
tool specification in JSON format.

{kind} Name: {name}
Available Attributes: {attributes}

Sample Documents (first {count}):
{samples}

Generate a tool specification JSON with the following structure:
{{
  \"name\": \"descriptive_tool_name\",
  \"description\": \"Clear description of what this tool does\",
  \"type\": \"tool\",
  \"method\": \"find\",
  \"{target_field}\": \"{name}\",
  \"db_name\": \"{db_name}\",
  \"parameters\": [
    {{
      \"param\": \"parameter_name\",
      \"paramMode\": \"tool_param|static|expression\",
      \"type\": \"{types}\",
      \"description\": \"Parameter description\",
      \"attribute\": \"attribute_name_from_list\",
      \"operator\": \"{operators}\",
      \"required\": true|false,
      \"value\": \"fixed value, only when paramMode is static\",
      \"expr\": \"expression, only when paramMode is expression\",
      \"enum\": [\"allowed\", \"values\", \"if enumerable\"],
      \"info\": \"whether the attribute is a partition key, sorting key, indexed or vector column\",
      \"embedding_model\": \"embedding model, only for vector parameters\"
    }}
  ],
  \"projection\": {{
    \"attribute_name\": 1
  }},
  \"limit\": 10,
  \"enabled\": true,
  \"tags\": [\"relevant\", \"tags\"]
}}
",
        attributes = context.attributes.join(", "),
        count = context.samples.len(),
    );

    if let Some(schema) = context.schema.filter(|schema| !schema.is_empty()) {
        prompt.push_str(&schema_section(schema));
    }
    if let Some(instructions) = context.instructions.filter(|text| !text.trim().is_empty()) {
        prompt.push_str(&format!("\nAdditional instructions: {}\n", instructions.trim()));
    }
    prompt.push_str("\nReturn ONLY valid JSON, no markdown, no explanations.");
    prompt
}

fn schema_section(schema: &ObjectSchema) -> String {
    let layout = serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "
Schema:
{layout}

Use only the partition keys, sorting keys and indexed columns as parameters. \
Partition keys are required parameters. Set \"info\" to say whether the attribute \
is a partition key, sorting key, indexed column or vector column. For vector \
columns set \"embedding_model\" to \"text-embedding-3-small\".
"
    )
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join("|")
}
