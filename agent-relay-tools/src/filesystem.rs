//! Filesystem tools

use crate::base::{Result, Tool, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParams(format!("'{}' must be a string", key)))
}

/// Canonicalize the longest existing prefix of `path` and re-attach the rest
///
/// Lets a not-yet-created file be checked against a directory restriction.
fn canonicalize_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for part in missing.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(e) => match (existing.parent(), existing.components().next_back()) {
                (Some(parent), Some(Component::Normal(name))) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Err(e),
            },
        }
    }
}

/// Resolve path and optionally enforce directory restriction
///
/// Relative paths are taken relative to the allowed directory when there is one.
fn resolve_path(path: &str, allowed_dir: Option<&Path>) -> Result<PathBuf> {
    let Some(allowed) = allowed_dir else {
        return Ok(PathBuf::from(path));
    };

    let candidate = if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        allowed.join(path)
    };

    let allowed_canonical = allowed.canonicalize().map_err(|e| {
        ToolError::ExecutionFailed(format!(
            "Failed to resolve allowed directory {}: {}",
            allowed.display(),
            e
        ))
    })?;
    let resolved = canonicalize_existing_prefix(&candidate)
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to resolve path {}: {}", path, e)))?;

    if !resolved.starts_with(&allowed_canonical) {
        return Err(ToolError::PermissionDenied(format!(
            "Path {} is outside allowed directory {}",
            path,
            allowed.display()
        )));
    }

    Ok(resolved)
}

/// Read file tool
#[derive(Default)]
pub struct ReadFileTool {
    allowed_dir: Option<PathBuf>,
}

impl ReadFileTool {
    /// Create a new read file tool
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let path = required_str(&params, "path")?;
        let file_path = resolve_path(path, self.allowed_dir.as_deref())?;

        if !file_path.is_file() {
            return Err(ToolError::ExecutionFailed(format!(
                "File not found: {}",
                path
            )));
        }

        Ok(tokio::fs::read_to_string(&file_path).await?)
    }
}

/// Write file tool
#[derive(Default)]
pub struct WriteFileTool {
    allowed_dir: Option<PathBuf>,
}

impl WriteFileTool {
    /// Create a new write file tool
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file at the given path. Creates parent directories if needed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write to"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let path = required_str(&params, "path")?;
        let content = required_str(&params, "content")?;
        let file_path = resolve_path(path, self.allowed_dir.as_deref())?;

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file_path, content).await?;

        Ok(format!(
            "Successfully wrote {} bytes to {}",
            content.len(),
            path
        ))
    }
}

/// List directory tool
#[derive(Default)]
pub struct ListDirTool {
    allowed_dir: Option<PathBuf>,
}

impl ListDirTool {
    /// Create a new list dir tool
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the contents of a directory. Subdirectories end with '/'."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The directory path to list"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let path = required_str(&params, "path")?;
        let dir_path = resolve_path(path, self.allowed_dir.as_deref())?;

        if !dir_path.is_dir() {
            return Err(ToolError::ExecutionFailed(format!(
                "Not a directory: {}",
                path
            )));
        }

        let mut items = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            items.push(if is_dir { format!("{}/", name) } else { name });
        }

        if items.is_empty() {
            return Ok(format!("Directory {} is empty", path));
        }

        items.sort();
        Ok(items.join("\n"))
    }
}
