//! Aggregated tool catalog across ready providers.

use std::sync::Arc;
use toolmux_domain::{ProviderTool, ToolDescriptor};

/// Catalog of a single ready provider.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    pub provider: String,
    pub tools: Arc<Vec<ToolDescriptor>>,
}

/// Point-in-time view of every ready provider's catalog.
///
/// Built on read from the live provider table, so a stopped provider
/// disappears from the next view. Providers are kept in registration order
/// and tools in the order their provider listed them.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    catalogs: Vec<ProviderCatalog>,
}

impl ToolRegistry {
    pub fn new(catalogs: Vec<ProviderCatalog>) -> Self {
        Self { catalogs }
    }

    /// Every tool, annotated with its owning provider.
    pub fn list_all(&self) -> Vec<ProviderTool> {
        self.catalogs
            .iter()
            .flat_map(|catalog| {
                catalog
                    .tools
                    .iter()
                    .map(|tool| ProviderTool::new(catalog.provider.clone(), tool.clone()))
            })
            .collect()
    }

    pub fn find(&self, provider: &str, tool: &str) -> Option<&ToolDescriptor> {
        self.catalogs
            .iter()
            .find(|c| c.provider == provider)
            .and_then(|c| c.tools.iter().find(|t| t.name == tool))
    }

    pub fn tool_count(&self) -> usize {
        self.catalogs.iter().map(|c| c.tools.len()).sum()
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.catalogs.iter().map(|c| c.provider.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(provider: &str, tools: &[&str]) -> ProviderCatalog {
        ProviderCatalog {
            provider: provider.to_string(),
            tools: Arc::new(
                tools
                    .iter()
                    .map(|t| ToolDescriptor::new(*t, format!("{} tool", t)))
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_list_all_preserves_order() {
        let registry = ToolRegistry::new(vec![
            catalog("jira", &["search_issues", "get_issue"]),
            catalog("docs", &["search_docs"]),
        ]);

        let names: Vec<String> = registry
            .list_all()
            .iter()
            .map(|t| t.qualified_name())
            .collect();
        assert_eq!(
            names,
            vec!["jira.search_issues", "jira.get_issue", "docs.search_docs"]
        );
        assert_eq!(registry.tool_count(), 3);
    }

    #[test]
    fn test_find() {
        let registry = ToolRegistry::new(vec![catalog("docs", &["search_docs"])]);
        assert!(registry.find("docs", "search_docs").is_some());
        assert!(registry.find("docs", "missing").is_none());
        assert!(registry.find("jira", "search_docs").is_none());
    }

    #[test]
    fn test_empty() {
        let registry = ToolRegistry::default();
        assert!(registry.list_all().is_empty());
        assert_eq!(registry.tool_count(), 0);
        assert_eq!(registry.providers().count(), 0);
    }
}
