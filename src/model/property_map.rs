//! PropertyMap: the attribute store on nodes.

/// A map of attribute names to JSON values.
pub type PropertyMap = serde_json::Map<String, super::Value>;
