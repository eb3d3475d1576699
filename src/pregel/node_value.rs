//! Column store for the per-node properties declared by a [`NodeSchema`].
//!
//! Every column is an [`AtomicPagedArray`]. Within a superstep each node is computed
//! by exactly one worker, so writes to a node's own slots never race; the atomics
//! make that safe without any lock and keep cross-node reads well defined.

use std::collections::HashMap;

use super::schema::{Element, NodeSchema, ValueType, Visibility};
use crate::collections::paged::AtomicPagedArray;

/// Error raised when a property is looked up by the wrong name or type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// No property with that name was declared.
    #[error("unknown node property `{0}`")]
    Unknown(String),
    /// The property exists with a different type.
    #[error("node property `{key}` is {actual:?}, not {expected:?}")]
    TypeMismatch {
        /// Property name.
        key: String,
        /// Requested type.
        expected: ValueType,
        /// Declared type.
        actual: ValueType,
    },
}

/// Storage of one property.
#[derive(Debug)]
pub enum PropertyColumn {
    /// `i64` values.
    Long(AtomicPagedArray<i64>),
    /// `f64` values.
    Double(AtomicPagedArray<f64>),
}

impl PropertyColumn {
    fn new(value_type: ValueType, node_count: u64) -> Self {
        match value_type {
            ValueType::Long => Self::Long(AtomicPagedArray::new(node_count)),
            ValueType::Double => Self::Double(AtomicPagedArray::new(node_count)),
        }
    }

    fn value_type(&self) -> ValueType {
        match self {
            Self::Long(_) => ValueType::Long,
            Self::Double(_) => ValueType::Double,
        }
    }
}

/// Per-node property values of one computation.
#[derive(Debug)]
pub struct NodeValue {
    node_count: u64,
    schema: NodeSchema,
    index: HashMap<String, usize>,
    columns: Vec<PropertyColumn>,
}

impl NodeValue {
    /// Allocates one zeroed column per schema element.
    pub fn new(schema: NodeSchema, node_count: u64) -> Self {
        let index = schema
            .elements()
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key().to_owned(), i))
            .collect();
        let columns = schema
            .elements()
            .iter()
            .map(|e| PropertyColumn::new(e.value_type(), node_count))
            .collect();
        Self {
            node_count,
            schema,
            index,
            columns,
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// The schema the columns were built from.
    pub fn schema(&self) -> &NodeSchema {
        &self.schema
    }

    /// The column of `key`.
    ///
    /// # Errors
    /// Returns [`PropertyError::Unknown`] if `key` was not declared.
    pub fn column(&self, key: &str) -> Result<&PropertyColumn, PropertyError> {
        self.index
            .get(key)
            .map(|&i| &self.columns[i])
            .ok_or_else(|| PropertyError::Unknown(key.to_owned()))
    }

    /// The `Double` column of `key`.
    ///
    /// # Errors
    /// Fails if `key` is unknown or not a `Double` property.
    pub fn try_double_properties(&self, key: &str) -> Result<&AtomicPagedArray<f64>, PropertyError> {
        match self.column(key)? {
            PropertyColumn::Double(values) => Ok(values),
            other => Err(mismatch(key, ValueType::Double, other)),
        }
    }

    /// The `Long` column of `key`.
    ///
    /// # Errors
    /// Fails if `key` is unknown or not a `Long` property.
    pub fn try_long_properties(&self, key: &str) -> Result<&AtomicPagedArray<i64>, PropertyError> {
        match self.column(key)? {
            PropertyColumn::Long(values) => Ok(values),
            other => Err(mismatch(key, ValueType::Long, other)),
        }
    }

    /// The `Double` column of `key`.
    ///
    /// # Panics
    /// Panics if `key` is unknown or not a `Double` property.
    #[track_caller]
    pub fn double_properties(&self, key: &str) -> &AtomicPagedArray<f64> {
        self.try_double_properties(key).unwrap_or_else(|e| panic!("{e}"))
    }

    /// The `Long` column of `key`.
    ///
    /// # Panics
    /// Panics if `key` is unknown or not a `Long` property.
    #[track_caller]
    pub fn long_properties(&self, key: &str) -> &AtomicPagedArray<i64> {
        self.try_long_properties(key).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Value of `key` for `node`.
    #[inline]
    #[track_caller]
    pub fn double_value(&self, key: &str, node: u64) -> f64 {
        self.double_properties(key).get(node)
    }

    /// Value of `key` for `node`.
    #[inline]
    #[track_caller]
    pub fn long_value(&self, key: &str, node: u64) -> i64 {
        self.long_properties(key).get(node)
    }

    /// Sets `key` of `node`.
    #[inline]
    #[track_caller]
    pub fn set_double_value(&self, key: &str, node: u64, value: f64) {
        self.double_properties(key).set(node, value);
    }

    /// Sets `key` of `node`.
    #[inline]
    #[track_caller]
    pub fn set_long_value(&self, key: &str, node: u64, value: i64) {
        self.long_properties(key).set(node, value);
    }

    /// Drops every [`Visibility::Private`] column.
    pub(crate) fn retain_public(mut self) -> Self {
        let elements: Vec<Element> = self.schema.elements().to_vec();
        let mut kept_schema = NodeSchema::new();
        let mut kept_columns = Vec::with_capacity(self.columns.len());
        for (element, column) in elements.into_iter().zip(self.columns.drain(..)) {
            if element.visibility() == Visibility::Public {
                kept_schema = kept_schema.add(element.key(), element.value_type());
                kept_columns.push(column);
            }
        }
        Self::from_parts(kept_schema, self.node_count, kept_columns)
    }

    fn from_parts(schema: NodeSchema, node_count: u64, columns: Vec<PropertyColumn>) -> Self {
        let index = schema
            .elements()
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key().to_owned(), i))
            .collect();
        Self {
            node_count,
            schema,
            index,
            columns,
        }
    }
}

fn mismatch(key: &str, expected: ValueType, actual: &PropertyColumn) -> PropertyError {
    PropertyError::TypeMismatch {
        key: key.to_owned(),
        expected,
        actual: actual.value_type(),
    }
}
