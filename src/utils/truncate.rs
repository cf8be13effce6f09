//! Truncation Utilities
//!
//! Shortens text on UTF-8 boundaries, keeping the head and the tail.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationPolicy {
    Bytes(usize),
    Chars(usize),
}

impl TruncationPolicy {
    fn fits(&self, content: &str) -> bool {
        match *self {
            TruncationPolicy::Bytes(max) => content.len() <= max,
            TruncationPolicy::Chars(max) => content.chars().count() <= max,
        }
    }

    /// Byte offsets of the kept head end and tail start.
    fn cut_points(&self, content: &str) -> (usize, usize) {
        match *self {
            TruncationPolicy::Bytes(max) => {
                let half = max / 2;
                let head = floor_char_boundary(content, half);
                let tail = ceil_char_boundary(content, content.len().saturating_sub(half));
                (head, tail.max(head))
            }
            TruncationPolicy::Chars(max) => {
                let half = max / 2;
                let total = content.chars().count();
                let head = content.char_indices().nth(half).map(|(i, _)| i).unwrap_or(content.len());
                let tail = content
                    .char_indices()
                    .nth(total.saturating_sub(half))
                    .map(|(i, _)| i)
                    .unwrap_or(content.len());
                (head, tail.max(head))
            }
        }
    }
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

pub fn truncate_text(content: &str, policy: TruncationPolicy) -> String {
    if policy.fits(content) {
        return content.to_string();
    }

    let (head, tail) = policy.cut_points(content);
    let dropped = content[head..tail].chars().count();
    format!("{} ... [{} chars truncated] ... {}", &content[..head], dropped, &content[tail..])
}

/// Short single-line preview of user text for log fields.
pub fn log_preview(content: &str) -> String {
    truncate_text(&content.replace(['\n', '\r'], " "), TruncationPolicy::Chars(80))
}
