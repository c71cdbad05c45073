//! Decision output.

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]

use crate::models::{Decision, PostRecord};
use crate::services::PostSink;

/// Prints each applied decision to stdout.
///
/// Text lines are `hidden|kept <id> <reason>`; JSON mode prints one
/// decision object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionPrinter {
    json: bool,
}

impl DecisionPrinter {
    /// Creates a printer.
    #[must_use]
    pub const fn new(json: bool) -> Self {
        Self { json }
    }

    /// Formats one decision as a text line.
    #[must_use]
    pub fn format_line(decision: &Decision) -> String {
        let verdict = if decision.hidden { "hidden" } else { "kept" };
        let reason = decision.reason.map_or("-", |r| r.as_str());
        format!("{verdict:<6} {} {reason}", decision.post_id)
    }
}

impl PostSink for DecisionPrinter {
    fn apply(&self, _record: &PostRecord, decision: &Decision) {
        if self.json {
            match serde_json::to_string(decision) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize decision"),
            }
        } else {
            println!("{}", Self::format_line(decision));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HideReason, PipelineStage, PostId};

    #[test]
    fn test_format_line() {
        let kept = Decision::keep(PostId::new("t3_a"), PipelineStage::MediaChecked);
        assert_eq!(DecisionPrinter::format_line(&kept), "kept   t3_a -");

        let hidden = Decision::hide(
            PostId::new("t3_b"),
            HideReason::TitleAuthor,
            PipelineStage::TitleAuthorChecked,
        );
        assert_eq!(
            DecisionPrinter::format_line(&hidden),
            "hidden t3_b title_author"
        );
    }
}
