//! Lookup of the builtin tools by configured name

use std::path::PathBuf;
use std::sync::Arc;

use crate::base::Tool;
use crate::filesystem::{ListDirTool, ReadFileTool, WriteFileTool};

/// Instantiate a builtin tool, confined to `allowed_dir` when given
pub fn builtin_tool(name: &str, allowed_dir: Option<PathBuf>) -> Option<Arc<dyn Tool>> {
    let tool: Arc<dyn Tool> = match name {
        "read_file" => Arc::new(ReadFileTool::new(allowed_dir)),
        "write_file" => Arc::new(WriteFileTool::new(allowed_dir)),
        "list_dir" => Arc::new(ListDirTool::new(allowed_dir)),
        _ => return None,
    };
    Some(tool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_relay_core::config::BUILTIN_TOOLS;

    #[test]
    fn test_every_configurable_name_resolves() {
        for name in BUILTIN_TOOLS {
            let tool = builtin_tool(name, None).unwrap();
            assert_eq!(tool.name(), *name);
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin_tool("exec", None).is_none());
    }
}
