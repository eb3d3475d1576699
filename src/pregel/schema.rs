//! Declaration of the per-node properties a computation maintains.

use serde::{Deserialize, Serialize};

/// Storage type of a node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// `i64` per node.
    Long,
    /// `f64` per node.
    Double,
}

/// Whether a property is part of the computation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Returned in [`PregelResult`](super::PregelResult).
    #[default]
    Public,
    /// Scratch state, dropped when the computation finishes.
    Private,
}

/// One declared property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    key: String,
    value_type: ValueType,
    visibility: Visibility,
}

impl Element {
    /// Property name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Storage type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Result visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }
}

/// The ordered set of properties a computation stores per node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSchema {
    elements: Vec<Element>,
}

impl NodeSchema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a public property.
    ///
    /// # Panics
    /// Panics if `key` is already declared.
    pub fn add(self, key: impl Into<String>, value_type: ValueType) -> Self {
        self.add_with_visibility(key, value_type, Visibility::Public)
    }

    /// Adds a property with explicit visibility.
    ///
    /// # Panics
    /// Panics if `key` is already declared.
    pub fn add_with_visibility(
        mut self,
        key: impl Into<String>,
        value_type: ValueType,
        visibility: Visibility,
    ) -> Self {
        let key = key.into();
        assert!(
            self.get(&key).is_none(),
            "node property `{key}` declared twice"
        );
        self.elements.push(Element {
            key,
            value_type,
            visibility,
        });
        self
    }

    /// Looks up a property by name.
    pub fn get(&self, key: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.key == key)
    }

    /// All properties in declaration order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Number of declared properties.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if no property is declared.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
