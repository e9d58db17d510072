//! Rolling command history used as translation context.

use std::collections::VecDeque;

/// Maximum number of entries kept.
pub const MAX_ENTRIES: usize = 10;
/// Number of most recent entries rendered into the context.
pub const RENDER_WINDOW: usize = 5;
/// Character budget for the rendered context.
pub const MAX_RENDERED_CHARS: usize = 4000;
/// Output longer than this is truncated before storing.
pub const MAX_OUTPUT_CHARS: usize = 500;

const TRUNCATION_MARKER: &str = "...";
const EMPTY_PLACEHOLDER: &str = "(no history)";

/// One executed command and its (possibly truncated) output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub command: String,
    pub output: String,
}

impl HistoryEntry {
    fn render(&self) -> String {
        format!("$ {}\n{}\n", self.command, self.output)
    }
}

/// Bounded FIFO of executed commands.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_ENTRIES + 1),
        }
    }

    /// Records a command, truncating its output and evicting the oldest
    /// entry once over capacity.
    pub fn append(&mut self, command: impl Into<String>, output: impl Into<String>) {
        let output = truncate_output(output.into());
        self.entries.push_back(HistoryEntry {
            command: command.into(),
            output,
        });
        while self.entries.len() > MAX_ENTRIES {
            self.entries.pop_front();
        }
    }

    /// Renders the recent entries as `$ command` / `output` blocks.
    ///
    /// Walks the last [`RENDER_WINDOW`] entries oldest first and stops at the
    /// first entry that would push the total past [`MAX_RENDERED_CHARS`].
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return EMPTY_PLACEHOLDER.to_string();
        }

        let start = self.entries.len().saturating_sub(RENDER_WINDOW);
        let mut rendered = String::new();
        let mut total = 0;

        for entry in self.entries.iter().skip(start) {
            let block = entry.render();
            let len = block.chars().count();
            if total + len > MAX_RENDERED_CHARS {
                break;
            }
            rendered.push_str(&block);
            total += len;
        }

        rendered
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

fn truncate_output(output: String) -> String {
    if output.chars().count() <= MAX_OUTPUT_CHARS {
        return output;
    }
    let mut truncated: String = output.chars().take(MAX_OUTPUT_CHARS).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
