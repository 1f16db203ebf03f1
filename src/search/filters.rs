use serde::{Deserialize, Serialize};

/// Optional narrowing applied to a search.
///
/// Empty lists mean "use the default": `lang` falls back to the configured
/// default languages and `format` to the configured supported formats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub isbn: Vec<String>,
    pub lang: Vec<String>,
    pub sort: Option<String>,
    pub content: Vec<String>,
    pub format: Vec<String>,
    pub author: Vec<String>,
    pub title: Vec<String>,
}
