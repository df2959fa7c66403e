//! Tool catalog storage.
//!
//! The `FileCatalog` keeps one JSON file per specification. Every read goes
//! back to disk and is normalized, so entries written before binding modes
//! existed load with inferred modes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use toolsmith_spec::{ToolSpecification, normalize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult, StorageError};

/// Persistence for tool specifications.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// All entries of the given type, sorted by name.
    async fn list_by_type(&self, tool_type: &str) -> CatalogResult<Vec<ToolSpecification>>;

    /// One entry by identifier.
    async fn get(&self, id: &str) -> CatalogResult<ToolSpecification>;

    /// Insert or update an entry and return it with its identifier.
    ///
    /// An entry without an identifier replaces a stored entry of the same
    /// name; otherwise a new identifier is assigned.
    async fn upsert(&self, tool: ToolSpecification) -> CatalogResult<ToolSpecification>;

    /// Import one tool or an array of tools, replacing stored tools by name.
    ///
    /// Every entry is normalized before anything is written, so a bad entry
    /// leaves the catalog untouched. Incoming identifiers are ignored.
    async fn import(&self, raw: Value) -> CatalogResult<Vec<ToolSpecification>> {
        let entries = match raw {
            Value::Array(entries) => entries,
            entry @ Value::Object(_) => vec![entry],
            other => {
                return Err(CatalogError::InvalidImport(format!(
                    "expected a tool object or an array of tools, got {other}"
                )));
            }
        };

        let tools = entries
            .into_iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()?;

        let mut imported = Vec::with_capacity(tools.len());
        for mut tool in tools {
            tool.id = None;
            imported.push(self.upsert(tool).await?);
        }

        info!("Imported {} tools", imported.len());
        Ok(imported)
    }
}

/// Directory-backed catalog.
pub struct FileCatalog {
    /// Root directory for tool storage.
    root: PathBuf,
}

impl FileCatalog {
    /// Open a catalog at the given root directory, creating it if needed.
    pub async fn new(root: impl AsRef<Path>) -> CatalogResult<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", root.display())))?;

        Ok(Self { root })
    }

    /// Import a JSON file holding one tool or an array of tools.
    pub async fn import_file(
        &self,
        path: impl AsRef<Path>,
    ) -> CatalogResult<Vec<ToolSpecification>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;
        self.import(serde_json::from_str(&content)?).await
    }

    /// Get the path for a tool file.
    fn tool_path(&self, id: &str) -> CatalogResult<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CatalogError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{id}.json")))
    }

    /// Load all tools from disk, skipping files that fail to load.
    async fn load_all(&self) -> CatalogResult<Vec<ToolSpecification>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", self.root.display())))?;

        let mut tools = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFile(format!("{e}")))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match self.load_file(&path).await {
                    Ok(tool) => tools.push(tool),
                    Err(e) => warn!("Failed to load tool {}: {e}", path.display()),
                }
            }
        }

        debug!("Loaded {} tools", tools.len());
        Ok(tools)
    }

    /// Load a single tool from disk.
    async fn load_file(&self, path: &Path) -> CatalogResult<ToolSpecification> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;

        let mut tool = normalize(serde_json::from_str(&content)?)?;
        if tool.id.is_none() {
            tool.id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string);
        }
        Ok(tool)
    }

    /// Save a tool to disk.
    async fn save_file(&self, path: &Path, tool: &ToolSpecification) -> CatalogResult<()> {
        let content = serde_json::to_string_pretty(tool)?;

        // Write atomically
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", path.display())))?;

        debug!("Saved tool: {}", tool.name);
        Ok(())
    }
}

#[async_trait]
impl ToolCatalog for FileCatalog {
    async fn list_by_type(&self, tool_type: &str) -> CatalogResult<Vec<ToolSpecification>> {
        let mut tools: Vec<_> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|tool| tool.tool_type == tool_type)
            .collect();
        tools.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(tools)
    }

    async fn get(&self, id: &str) -> CatalogResult<ToolSpecification> {
        let path = self.tool_path(id)?;
        if !fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?
        {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        self.load_file(&path).await
    }

    async fn upsert(&self, mut tool: ToolSpecification) -> CatalogResult<ToolSpecification> {
        if tool.id.is_none() {
            let existing = self
                .load_all()
                .await?
                .into_iter()
                .find(|stored| stored.name == tool.name)
                .and_then(|stored| stored.id);
            tool.id = Some(existing.unwrap_or_else(|| Uuid::new_v4().to_string()));
        }

        let id = tool.id.as_deref().unwrap_or_default();
        let path = self.tool_path(id)?;
        self.save_file(&path, &tool).await?;

        info!("Saved tool {} as {id}", tool.name);
        Ok(tool)
    }
}
