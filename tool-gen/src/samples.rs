//! Directory-backed sample provider.
//!
//! Reads exported documents from disk so generation can run against a
//! snapshot of a collection or table. Layout:
//!
//! ```text
//! <root>/[<db_name>/]<object>.json    JSON array of objects
//! <root>/[<db_name>/]<object>.jsonl   one object per line
//! <root>/[<db_name>/]<object>.schema.json   optional key and index layout
//! ```
//!
//! The database subdirectory is preferred when it exists.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use toolsmith_spec::{Document, ToolTarget};
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{ObjectSchema, SampleProvider};

/// Sample provider reading document exports from a directory.
pub struct DirectorySampleProvider {
    root: PathBuf,
}

impl DirectorySampleProvider {
    /// Create a provider rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Files for `target` with the given suffixes, database directory first.
    fn candidates(
        &self,
        target: &ToolTarget,
        db_name: Option<&str>,
        suffixes: &[&str],
    ) -> Result<Vec<PathBuf>, ProviderError> {
        let name = path_segment(&target.name)?;
        let mut dirs = Vec::with_capacity(2);
        if let Some(db_name) = db_name {
            dirs.push(self.root.join(path_segment(db_name)?));
        }
        dirs.push(self.root.clone());

        Ok(dirs
            .into_iter()
            .flat_map(|dir| {
                suffixes
                    .iter()
                    .map(move |suffix| dir.join(format!("{name}{suffix}")))
            })
            .collect())
    }
}

/// A name that stays a single component under the root.
fn path_segment(name: &str) -> Result<&str, ProviderError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0'])
        && !Path::new(name).is_absolute();
    if valid {
        Ok(name)
    } else {
        Err(ProviderError::InvalidName(name.to_string()))
    }
}

#[async_trait]
impl SampleProvider for DirectorySampleProvider {
    async fn fetch_samples(
        &self,
        target: &ToolTarget,
        db_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Document>, ProviderError> {
        for path in self.candidates(target, db_name, &[".json", ".jsonl"])? {
            if !fs::try_exists(&path).await? {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            let values = if path.extension().is_some_and(|ext| ext == "jsonl") {
                content
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .take(limit)
                    .map(serde_json::from_str)
                    .collect::<Result<Vec<Value>, _>>()?
            } else {
                match serde_json::from_str(&content)? {
                    Value::Array(values) => values,
                    _ => {
                        return Err(ProviderError::InvalidResponse(format!(
                            "{} does not hold a JSON array",
                            path.display()
                        )));
                    }
                }
            };

            let documents = values
                .into_iter()
                .take(limit)
                .map(|value| match value {
                    Value::Object(document) => Ok(document),
                    other => Err(ProviderError::InvalidResponse(format!(
                        "expected a document object in {}, got {other}",
                        path.display()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;

            debug!(
                "Read {} samples for {target} from {}",
                documents.len(),
                path.display()
            );
            return Ok(documents);
        }

        debug!("No sample file for {target} under {}", self.root.display());
        Ok(Vec::new())
    }

    async fn fetch_schema(
        &self,
        target: &ToolTarget,
        db_name: Option<&str>,
    ) -> Result<Option<ObjectSchema>, ProviderError> {
        for path in self.candidates(target, db_name, &[".schema.json"])? {
            if fs::try_exists(&path).await? {
                let schema = serde_json::from_str(&fs::read_to_string(&path).await?)?;
                debug!("Read schema for {target} from {}", path.display());
                return Ok(Some(schema));
            }
        }
        Ok(None)
    }
}
