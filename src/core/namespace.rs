//! Namespace constants and selector alias tables
//!
//! Selector expressions refer to namespaces through short aliases (`ns:`, `re:`).
//! This module holds the fixed URIs and the alias table that maps them.

use crate::core::error::{PruneError, PruneResult};
use std::collections::HashMap;

/// Well-known namespaces
pub mod ns {
    /// Salesforce Metadata API namespace
    pub const METADATA: &str = "http://soap.sforce.com/2006/04/metadata";
    /// EXSLT regular expressions namespace
    pub const EXSLT_REGEXP: &str = "http://exslt.org/regular-expressions";
    /// XML namespace (for xml:lang, etc.)
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// Namespace of `xmlns` declarations themselves
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
    /// Metadata namespace alias
    pub const METADATA_PREFIX: &str = "ns";
    /// Regular expressions alias
    pub const EXSLT_REGEXP_PREFIX: &str = "re";
    /// XML prefix
    pub const XML_PREFIX: &str = "xml";
}

/// XML declaration written at the top of every canonical document
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Map of alias prefix to namespace URI
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    prefixes: HashMap<String, String>,
}

impl NamespaceMap {
    /// Create an empty alias table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the alias table every removal step is evaluated with
    ///
    /// Binds `ns` to the Metadata API namespace and `re` to EXSLT regular
    /// expressions.
    pub fn defaults() -> Self {
        let mut map = Self::default();
        map.insert(ns::METADATA, ns::METADATA_PREFIX);
        map.insert(ns::EXSLT_REGEXP, ns::EXSLT_REGEXP_PREFIX);
        map
    }

    /// Register a namespace URI with a prefix
    ///
    /// Returns an error if the prefix is already bound to a different URI
    pub fn register(&mut self, uri: &str, prefix: &str) -> PruneResult<()> {
        if prefix.is_empty() {
            return Err(PruneError::Configuration(
                "Namespace prefix cannot be empty".to_string(),
            ));
        }
        if let Some(existing_uri) = self.prefixes.get(prefix) {
            if existing_uri != uri {
                return Err(PruneError::Configuration(format!(
                    "Prefix '{}' is already registered to '{}'",
                    prefix, existing_uri
                )));
            }
            return Ok(());
        }
        self.insert(uri, prefix);
        Ok(())
    }

    fn insert(&mut self, uri: &str, prefix: &str) {
        self.prefixes.insert(prefix.to_string(), uri.to_string());
    }

    /// Get the URI for a namespace prefix
    ///
    /// The `xml` prefix is always bound, as in every XML document.
    pub fn get_uri(&self, prefix: &str) -> Option<&str> {
        if prefix == ns::XML_PREFIX {
            return Some(ns::XML);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let map = NamespaceMap::defaults();
        assert_eq!(map.get_uri("ns"), Some(ns::METADATA));
        assert_eq!(map.get_uri("re"), Some(ns::EXSLT_REGEXP));
        assert_eq!(map.get_uri("xsi"), None);
    }

    #[test]
    fn test_register() {
        let mut map = NamespaceMap::new();
        assert!(map.register("http://example.com/ns", "ex").is_ok());
        assert_eq!(map.get_uri("ex"), Some("http://example.com/ns"));
    }

    #[test]
    fn test_duplicate_prefix() {
        let mut map = NamespaceMap::defaults();
        assert!(map.register("http://example.com/other", "ns").is_err());
        // Same binding again is a no-op
        assert!(map.register(ns::METADATA, "ns").is_ok());
    }

    #[test]
    fn test_xml_prefix_always_bound() {
        assert_eq!(NamespaceMap::new().get_uri("xml"), Some(ns::XML));
    }
}
