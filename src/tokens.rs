//! Token grouping: turns a page's flat drawing-token stream into nested
//! command groups ("items") delimited by graphics-state scope markers.
//!
//! No geometric interpretation happens here. The grouper only pairs each
//! recognized operator with the operands buffered before it and cuts the
//! command list into items at `q`/`Q` scope boundaries, so that each item
//! holds one drawing primitive plus the state-setting commands that precede
//! it. Items also carry an optional color-prefix side channel used by the
//! debug overlay stream; that prefix is not part of the logical model.

/// The drawing/state operator vocabulary recognized by the grouper.
/// Anything outside this list is treated as an operand token.
pub const DRAWING_OPS: &[&str] = &[
    "q", "Q", "ET", "BT", "cm", "Tm", "Tf", "s", "m", "l", "S", "TJ", "f",
    "Tj", "k", "re", "W", "n", "K", "w", "c",
];

/// One operator with the operands that preceded it, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Operator name (e.g., "m", "Tj")
    pub op: String,
    /// Operand tokens in source order (numbers and glyph codes as strings)
    pub operands: Vec<String>,
}

impl Command {
    pub fn new(op: &str, operands: &[&str]) -> Self {
        Self {
            op: op.to_string(),
            operands: operands.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse operand `i` as a number, if present and numeric.
    pub fn number(&self, i: usize) -> Option<f64> {
        self.operands.get(i)?.parse().ok()
    }
}

/// A run of commands between scope boundaries: one semantic drawing action
/// plus its setup state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub commands: Vec<Command>,
    /// Color-prefix annotation for the debug overlay (side channel).
    pub highlight: Option<Command>,
}

impl Item {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            highlight: None,
        }
    }

    /// Operator name of the command at `i`, or "" if absent.
    pub fn op(&self, i: usize) -> &str {
        self.commands.get(i).map_or("", |c| c.op.as_str())
    }

    /// Annotate with a stroke-color prefix (RG) for the overlay stream.
    pub fn set_stroke_highlight(&mut self, rgb: [&str; 3]) {
        self.highlight = Some(Command::new("RG", &rgb));
    }

    /// Annotate with a fill-color prefix (rg) for the overlay stream.
    pub fn set_fill_highlight(&mut self, rgb: [&str; 3]) {
        self.highlight = Some(Command::new("rg", &rgb));
    }
}

// ─── Grouping ────────────────────────────────────────────────────────

/// Group a flat token stream into items at `q`/`Q` scope boundaries.
///
/// `q` flushes the accumulated group if it is non-empty; `Q` flushes it
/// unconditionally, even when empty. Operand tokens buffer until the next
/// recognized operator consumes them; the buffer survives scope markers.
/// An open non-empty group is flushed at end of stream.
pub fn group_items<I>(tokens: I) -> Vec<Item>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut items: Vec<Item> = Vec::new();
    let mut commands: Vec<Command> = Vec::new();
    let mut operands: Vec<String> = Vec::new();
    let mut depth: i32 = 0;

    for token in tokens {
        let token = token.as_ref();
        match token {
            "q" => {
                depth += 1;
                if !commands.is_empty() {
                    items.push(Item::new(std::mem::take(&mut commands)));
                }
            }
            "Q" => {
                depth -= 1;
                items.push(Item::new(std::mem::take(&mut commands)));
            }
            op if DRAWING_OPS.contains(&op) => {
                commands.push(Command {
                    op: op.to_string(),
                    operands: std::mem::take(&mut operands),
                });
            }
            other => operands.push(other.to_string()),
        }
    }
    if !commands.is_empty() {
        items.push(Item::new(commands));
    }
    if depth != 0 {
        log::debug!("unbalanced scope markers at end of stream (depth {depth})");
    }

    items
}

// ─── Tokenizing ──────────────────────────────────────────────────────

/// Split already-decoded content-stream text into tokens.
///
/// Convenience for tests and pre-decoded input; decoding the container
/// document itself is the external tokenizer's job. Tokens are separated by
/// whitespace, except that `(…)`, `<…>`, and `[…]` runs are kept whole so
/// glyph codes and show-text arrays survive as single operands.
pub fn tokenize(content: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // TODO: handle backslash-escaped parentheses inside string operands.
    let mut until: Option<char> = None;

    for ch in content.chars() {
        if let Some(close) = until {
            current.push(ch);
            if ch == close {
                until = None;
            }
            continue;
        }
        match ch {
            '(' | '<' | '[' => {
                current.push(ch);
                until = Some(match ch {
                    '(' => ')',
                    '<' => '>',
                    _ => ']',
                });
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

// ─── Overlay reassembly ──────────────────────────────────────────────

/// Overlay page preamble: clip to the page box, set the stroke width and
/// black stroke/fill so un-annotated items keep their normal appearance.
const OVERLAY_PREAMBLE: &str = "0 -0.2399902 612 792 re W n 1.30291 w 0 0 0 1 K 0 0 0 1 k";

/// Re-emit one item as `q <highlight?> <commands> Q`.
pub fn item_to_stream(item: &Item) -> String {
    let mut parts: Vec<&str> = vec!["q"];
    if let Some(ref hl) = item.highlight {
        for operand in &hl.operands {
            parts.push(operand);
        }
        parts.push(&hl.op);
    }
    for command in &item.commands {
        for operand in &command.operands {
            parts.push(operand);
        }
        parts.push(&command.op);
    }
    parts.push("Q");
    parts.join(" ")
}

/// Reassemble the annotated item list into a drawing-instruction stream for
/// the external document writer. Best-effort debugging channel; the musical
/// reconstruction does not depend on it.
pub fn overlay_stream(items: &[Item]) -> String {
    let mut parts: Vec<String> = vec!["q".to_string(), OVERLAY_PREAMBLE.to_string()];
    for item in items {
        parts.push(item_to_stream(item));
    }
    parts.push("Q".to_string());
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_one_item_per_scope_pop() {
        let tokens = tokenize("q 1.3 w 50 100 m 250 100 l S Q q BT ET Q");
        let items = group_items(&tokens);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].commands.len(), 4);
        assert_eq!(items[0].op(1), "m");
        assert_eq!(items[0].commands[1].operands, vec!["50", "100"]);
        assert_eq!(items[1].commands.len(), 2);
    }

    #[test]
    fn pop_flushes_even_empty_groups() {
        let items = group_items(tokenize("q Q q Q"));
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.commands.is_empty()));
    }

    #[test]
    fn open_group_flushes_at_end_of_stream() {
        let items = group_items(tokenize("q 50 100 m 250 100 l S"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].commands.len(), 3);
    }

    #[test]
    fn operand_buffer_survives_scope_markers() {
        // The "0.24" operand buffered before the scope push belongs to the
        // first command inside the new scope.
        let items = group_items(tokenize("0.24 q 0 cm Q"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].commands[0].operands, vec!["0.24", "0"]);
    }

    #[test]
    fn tokenize_keeps_glyph_codes_whole() {
        let tokens = tokenize("BT (12) Tj <cf> Tj [(a) -3 (b)] TJ ET");
        assert_eq!(
            tokens,
            vec!["BT", "(12)", "Tj", "<cf>", "Tj", "[(a) -3 (b)]", "TJ", "ET"]
        );
    }

    #[test]
    fn reassembly_includes_highlight_prefix() {
        let mut item = Item::new(vec![
            Command::new("m", &["50", "100"]),
            Command::new("l", &["250", "100"]),
            Command::new("S", &[]),
        ]);
        item.set_stroke_highlight(["0", "0.5", "1"]);
        assert_eq!(item_to_stream(&item), "q 0 0.5 1 RG 50 100 m 250 100 l S Q");
    }

    #[test]
    fn overlay_stream_is_scope_balanced() {
        let items = group_items(tokenize("q 50 100 m 250 100 l S Q"));
        let stream = overlay_stream(&items);
        let pushes = stream.split_whitespace().filter(|t| *t == "q").count();
        let pops = stream.split_whitespace().filter(|t| *t == "Q").count();
        assert_eq!(pushes, pops);
    }
}
