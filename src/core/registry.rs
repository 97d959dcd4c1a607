use std::collections::HashMap;

use crate::core::BodyId;

/// String tags attached to bodies, e.g. `"heavy"`.
///
/// Tags keep insertion order and are never duplicated. The registry carries no
/// physics meaning of its own; force fields and fracture consult it.
#[derive(Debug, Default, Clone)]
pub struct BodyTypeRegistry {
    types: HashMap<BodyId, Vec<String>>,
}

impl BodyTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag; returns false if the body already had it
    pub fn add(&mut self, body: BodyId, body_type: &str) -> bool {
        let tags = self.types.entry(body).or_default();
        if tags.iter().any(|t| t == body_type) {
            return false;
        }
        tags.push(body_type.to_string());
        true
    }

    /// Removes a tag; returns false if the body did not have it
    pub fn remove(&mut self, body: BodyId, body_type: &str) -> bool {
        let Some(tags) = self.types.get_mut(&body) else {
            return false;
        };
        let before = tags.len();
        tags.retain(|t| t != body_type);
        let removed = tags.len() != before;
        if tags.is_empty() {
            self.types.remove(&body);
        }
        removed
    }

    /// Removes every tag of a body
    pub fn clear_body(&mut self, body: BodyId) {
        self.types.remove(&body);
    }

    pub fn has(&self, body: BodyId, body_type: &str) -> bool {
        self.types
            .get(&body)
            .map_or(false, |tags| tags.iter().any(|t| t == body_type))
    }

    /// Tags of a body in insertion order
    pub fn types(&self, body: BodyId) -> &[String] {
        self.types.get(&body).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.types.clear();
    }
}
