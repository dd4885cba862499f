use crate::collaborators::TypeIdentity;
use crate::error::Result;
use crate::schema_generator::SchemaNode;
use log::debug;
use std::collections::HashMap;

/// Resource schemas computed during one generation run.
///
/// Write-once per resource: the first schema stored for a type is never
/// replaced.
#[derive(Debug, Default)]
pub struct ShapeCache {
    shapes: HashMap<TypeIdentity, SchemaNode>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource: &TypeIdentity) -> Option<&SchemaNode> {
        self.shapes.get(resource)
    }

    /// The cached schema for `resource`, computing and storing it on a miss
    pub fn get_or_try_insert_with<F>(&mut self, resource: &TypeIdentity, compute: F) -> Result<SchemaNode>
    where
        F: FnOnce() -> Result<SchemaNode>,
    {
        if let Some(node) = self.shapes.get(resource) {
            debug!("Reusing cached schema for {}", resource);
            return Ok(node.clone());
        }

        let node = compute()?;
        self.shapes.insert(resource.clone(), node.clone());
        Ok(node)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
