//! Poll block extraction.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::block::Block;
use crate::parser::parse;

/// Fully qualified name of the poll block.
pub const BLOCK_NAME: &str = "content-poll/vote-block";

/// Raw opening delimiter; a cheap substring filter for content that may hold polls.
pub const MARKER: &str = "<!-- wp:content-poll/vote-block";

/// A poll block found in post content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollBlock {
    /// Canonical identifier: `pollId`, falling back to `blockId`.
    pub poll_id: String,
    /// Legacy `blockId` attribute, when present.
    pub block_id: Option<String>,
    /// Poll question, when set.
    pub question: Option<String>,
    /// Option labels in display order.
    pub options: Vec<String>,
}

impl PollBlock {
    fn from_block(block: &Block) -> Option<Self> {
        let block_id = block.attr_str("blockId").map(str::to_string);
        let poll_id = block
            .attr_str("pollId")
            .map(str::to_string)
            .or_else(|| block_id.clone())?;

        let options = block
            .attrs
            .get("options")
            .and_then(Value::as_array)
            .map(|opts| {
                opts.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            poll_id,
            block_id,
            question: block.attr_str("question").map(str::to_string),
            options,
        })
    }
}

/// All identifiable poll blocks in `content`, in document order.
///
/// Poll blocks nested inside layout blocks are included. Blocks carrying
/// neither `pollId` nor `blockId` are skipped.
#[must_use]
pub fn poll_blocks(content: &str) -> Vec<PollBlock> {
    if !content.contains(MARKER) {
        return Vec::new();
    }

    parse(content)
        .iter()
        .flat_map(Block::descendants)
        .filter(|b| b.name == BLOCK_NAME)
        .filter_map(PollBlock::from_block)
        .collect()
}

/// Distinct poll identifiers embedded in `content`.
#[must_use]
pub fn poll_ids(content: &str) -> BTreeSet<String> {
    poll_blocks(content).into_iter().map(|p| p.poll_id).collect()
}
