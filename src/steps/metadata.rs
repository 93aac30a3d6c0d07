//! Metadata inheritance across nested groupings

use serde_json::Value;

/// Key/value metadata attached to groups, steps and examples
pub type Metadata = serde_json::Map<String, Value>;

/// Build metadata from a JSON object literal
///
/// Anything other than an object yields empty metadata.
pub fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// `parent` with `child` laid over it; child keys win
pub fn merge(parent: &Metadata, child: &Metadata) -> Metadata {
    let mut merged = parent.clone();
    for (key, value) in child {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Stack of inherited metadata maps
///
/// The bottom entry is the root and is never popped. Every `push` must be
/// paired with exactly one `pop` around the nested declaration it guards.
#[derive(Debug, Clone)]
pub struct MetadataStack {
    stack: Vec<Metadata>,
}

impl MetadataStack {
    pub fn new(root: Metadata) -> Self {
        Self { stack: vec![root] }
    }

    /// Push `current().merge(child)`
    pub fn push(&mut self, child: &Metadata) {
        let merged = merge(self.current(), child);
        self.stack.push(merged);
    }

    /// Remove the top entry; the root stays in place
    pub fn pop(&mut self) -> Option<Metadata> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    /// Metadata visible to the example currently being declared
    pub fn current(&self) -> &Metadata {
        // The root is never popped, so the stack is never empty.
        &self.stack[self.stack.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }
}

impl Default for MetadataStack {
    fn default() -> Self {
        Self::new(Metadata::new())
    }
}
