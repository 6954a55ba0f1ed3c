//! Parsed block tree.

use serde::Serialize;
use serde_json::{Map, Value};

/// A block parsed from post content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Fully qualified name, e.g. `core/paragraph` or `content-poll/vote-block`.
    pub name: String,
    /// JSON attributes from the opening delimiter. Empty when absent or malformed.
    pub attrs: Map<String, Value>,
    /// Nested blocks, in document order.
    pub inner_blocks: Vec<Block>,
    /// Markup between the delimiters, excluding nested block markup.
    pub inner_html: String,
}

impl Block {
    pub(crate) fn new(name: String, attrs: Map<String, Value>) -> Self {
        Self {
            name,
            attrs,
            inner_blocks: Vec::new(),
            inner_html: String::new(),
        }
    }

    /// String attribute lookup. Non-string and empty values read as absent.
    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Depth-first iterator over this block and all of its descendants.
    pub fn descendants(&self) -> impl Iterator<Item = &Self> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let block = stack.pop()?;
            stack.extend(block.inner_blocks.iter().rev());
            Some(block)
        })
    }
}
