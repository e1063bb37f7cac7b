//! Diff delivery.
//!
//! The orchestrator hands a fully materialized diff set to a sink; what the
//! sink does with it (print, mail, post) is its own business.

use std::io::Write;

use crate::diff::{DiffSet, ItemDiff};
use crate::error::Result;

pub trait DiffSink {
    fn notify(&mut self, diffs: &DiffSet) -> Result<()>;
}

fn describe(diff: &ItemDiff) -> String {
    match (&diff.before, &diff.after) {
        (None, Some(after)) => format!("[+] added {} ({})", after.title, after.external_id),
        (Some(before), None) => format!("[-] removed {} ({})", before.title, before.external_id),
        (Some(before), Some(after)) => format!(
            "[~] updated {} -> {} ({})",
            before.title, after.title, after.external_id
        ),
        (None, None) => String::new(),
    }
}

/// One line per difference, grouped under the roster name.
pub fn render_text(diffs: &DiffSet) -> String {
    let mut out = String::new();
    for (roster, entries) in diffs {
        out.push_str(roster);
        out.push_str(":\n");
        for entry in entries {
            out.push_str("  ");
            out.push_str(&describe(entry));
            out.push('\n');
        }
    }
    out
}

/// Writes the text rendering to any writer, stdout in the CLI.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        ConsoleSink { out }
    }
}

impl<W: Write> DiffSink for ConsoleSink<W> {
    fn notify(&mut self, diffs: &DiffSet) -> Result<()> {
        self.out.write_all(render_text(diffs).as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;

    fn item(external_id: &str, title: &str) -> Item {
        Item {
            id: "m1".to_string(),
            external_id: external_id.to_string(),
            title: title.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn renders_one_line_per_entry_grouped_by_roster() {
        let mut diffs = DiffSet::new();
        diffs.insert(
            "favorites".to_string(),
            vec![
                ItemDiff {
                    before: None,
                    after: Some(item("v1", "Fresh")),
                },
                ItemDiff {
                    before: Some(item("v2", "Old")),
                    after: None,
                },
                ItemDiff {
                    before: Some(item("v3", "Before")),
                    after: Some(item("v3", "After")),
                },
            ],
        );

        let text = render_text(&diffs);
        assert_eq!(
            text,
            "favorites:\n  [+] added Fresh (v1)\n  [-] removed Old (v2)\n  [~] updated Before -> After (v3)\n"
        );
    }

    #[test]
    fn console_sink_writes_the_rendering() {
        let mut diffs = DiffSet::new();
        diffs.insert(
            "queue".to_string(),
            vec![ItemDiff {
                before: None,
                after: Some(item("v1", "New")),
            }],
        );

        let mut buffer = Vec::new();
        ConsoleSink::new(&mut buffer).notify(&diffs).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "queue:\n  [+] added New (v1)\n");
    }
}
