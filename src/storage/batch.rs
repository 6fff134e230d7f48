//! Attribute batches applied as one atomic write.

/// Kind of attribute operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOp {
    /// Set the attribute to a value.
    Set(Vec<u8>),
    /// Remove the attribute.
    Delete,
}

/// A batch of attribute writes to be executed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeBatch {
    operations: Vec<(Vec<u8>, AttributeOp)>,
}

impl AttributeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set operation to the batch.
    pub fn set(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.operations
            .push((name.into(), AttributeOp::Set(value.into())));
        self
    }

    /// Add a delete operation to the batch.
    pub fn delete(&mut self, name: impl Into<Vec<u8>>) -> &mut Self {
        self.operations.push((name.into(), AttributeOp::Delete));
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in insertion order; later writes to a name win.
    pub fn operations(&self) -> &[(Vec<u8>, AttributeOp)] {
        &self.operations
    }
}

impl IntoIterator for AttributeBatch {
    type Item = (Vec<u8>, AttributeOp);
    type IntoIter = std::vec::IntoIter<(Vec<u8>, AttributeOp)>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}
