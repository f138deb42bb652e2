//! Reader for the pipe-delimited partial-update payload
//!
//! Async postbacks answer with a stream of blocks instead of a full document:
//!
//! ```text
//! 1|#||4|52|updatePanel|ctl00_Main_UpdatePanel1|<select ...>...</select>|0|hiddenField|__EVENTTARGET||
//! ```
//!
//! Each block is `length|type|id|content|`, where `length` counts the UTF-16 code
//! units of `content`. The length prefix lets content contain `|` safely.

/// One block of a partial-update payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaBlock {
    /// Block type (`updatePanel`, `hiddenField`, `pageRedirect`, ...)
    pub kind: String,

    /// Block id (panel client id or hidden field name)
    pub id: String,

    /// Raw block content
    pub content: String,
}

/// Parses a partial-update payload into its blocks
///
/// Returns `None` if the text is not a well-formed block stream, which is the case
/// for full HTML documents and for truncated or hand-edited payloads.
pub fn parse_delta(text: &str) -> Option<Vec<DeltaBlock>> {
    let mut blocks = Vec::new();
    let mut rest = text.trim_start();

    while !rest.trim().is_empty() {
        let (length, after_length) = rest.split_once('|')?;
        let length: usize = length.trim().parse().ok()?;
        let (kind, after_kind) = after_length.split_once('|')?;
        let (id, after_id) = after_kind.split_once('|')?;

        let content_end = utf16_offset(after_id, length)?;
        let content = &after_id[..content_end];
        rest = after_id[content_end..].strip_prefix('|')?;

        blocks.push(DeltaBlock {
            kind: kind.to_string(),
            id: id.to_string(),
            content: content.to_string(),
        });
    }

    if blocks.is_empty() {
        None
    } else {
        Some(blocks)
    }
}

/// Byte offset reached after `units` UTF-16 code units of `text`
fn utf16_offset(text: &str, units: usize) -> Option<usize> {
    let mut consumed = 0;
    for (offset, c) in text.char_indices() {
        if consumed == units {
            return Some(offset);
        }
        consumed += c.len_utf16();
        if consumed > units {
            return None;
        }
    }
    (consumed == units).then_some(text.len())
}
