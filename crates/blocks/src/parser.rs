//! Block delimiter parser.
//!
//! Blocks are serialized as HTML comments:
//!
//! ```text
//! <!-- wp:ns/name {"attr":1} -->inner<!-- /wp:ns/name -->
//! <!-- wp:ns/name {"attr":1} /-->
//! ```
//!
//! A name without a namespace belongs to `core/`.

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::block::Block;

const DEFAULT_NAMESPACE: &str = "core/";

// Valid static pattern; cannot fail.
#[allow(clippy::unwrap_used)]
static DELIMITER_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(
        r"(?s)<!--\s+(?P<closer>/)?wp:(?P<namespace>[a-z][a-z0-9_-]*/)?(?P<name>[a-z][a-z0-9_-]*)\s+(?P<attrs>\{(?:[^-]|-[^-]|--[^>])*?\}\s+)?(?P<void>/)?-->",
    )
    .unwrap()
});

enum Token {
    Open(Block),
    Void(Block),
    Close(String),
}

fn token(caps: &Captures<'_>) -> Token {
    let namespace = caps
        .name("namespace")
        .map_or(DEFAULT_NAMESPACE, |m| m.as_str());
    let name = format!(
        "{namespace}{}",
        caps.name("name").map_or("", |m| m.as_str())
    );

    if caps.name("closer").is_some() {
        return Token::Close(name);
    }

    let attrs = caps
        .name("attrs")
        .and_then(|m| serde_json::from_str::<Value>(m.as_str().trim()).ok())
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_else(Map::new);

    let block = Block::new(name, attrs);
    if caps.name("void").is_some() {
        Token::Void(block)
    } else {
        Token::Open(block)
    }
}

fn attach(block: Block, stack: &mut [Block], output: &mut Vec<Block>) {
    match stack.last_mut() {
        Some(parent) => parent.inner_blocks.push(block),
        None => output.push(block),
    }
}

/// Parse content into its top-level blocks.
///
/// Markup outside any block is dropped. A closer with no matching opener is
/// ignored, and openers still open at end of input are closed there.
#[must_use]
pub fn parse(content: &str) -> Vec<Block> {
    let mut output = Vec::new();
    let mut stack: Vec<Block> = Vec::new();
    let mut pos = 0;

    for caps in DELIMITER_RE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };

        if let Some(open) = stack.last_mut() {
            open.inner_html.push_str(&content[pos..whole.start()]);
        }
        pos = whole.end();

        match token(&caps) {
            Token::Open(block) => stack.push(block),
            Token::Void(block) => attach(block, &mut stack, &mut output),
            Token::Close(name) => {
                let Some(depth) = stack.iter().rposition(|b| b.name == name) else {
                    continue;
                };
                while stack.len() > depth {
                    if let Some(block) = stack.pop() {
                        attach(block, &mut stack, &mut output);
                    }
                }
            }
        }
    }

    if let Some(open) = stack.last_mut() {
        open.inner_html.push_str(&content[pos..]);
    }
    while let Some(block) = stack.pop() {
        attach(block, &mut stack, &mut output);
    }

    output
}
