//! The plan document.
//!
//! Stored as markdown. A revision written for a specific planning round
//! starts with a marker line:
//!
//! ```text
//! <!-- plan-round: 2 -->
//! # Plan
//! ...
//! ```

use regex::Regex;
use std::sync::LazyLock;

static ROUND_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!--\s*plan-round:\s*(\d+)\s*-->\s*$").expect("static regex compiles")
});

/// A plan document, optionally tied to a planning round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanArtifact {
    pub text: String,
    pub round: Option<u32>,
}

impl PlanArtifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            round: None,
        }
    }

    pub fn for_round(text: impl Into<String>, round: u32) -> Self {
        Self {
            text: text.into(),
            round: Some(round),
        }
    }

    /// Split an optional round marker off the first line.
    pub fn parse(content: &str) -> Self {
        let (first, rest) = content.split_once('\n').unwrap_or((content, ""));
        let marker = ROUND_MARKER
            .captures(first.trim_end_matches('\r'))
            .and_then(|caps| caps[1].parse::<u32>().ok());
        match marker {
            Some(round) => Self::for_round(rest, round),
            None => Self::new(content),
        }
    }

    /// Render with the marker line when a round is set.
    pub fn render(&self) -> String {
        match self.round {
            Some(round) => format!("<!-- plan-round: {} -->\n{}", round, self.text),
            None => self.text.clone(),
        }
    }

    /// Whether this revision was produced for `round`.
    pub fn is_for_round(&self, round: u32) -> bool {
        self.round == Some(round)
    }

    /// Top-level bullet items, in document order.
    ///
    /// Recognizes `-`, `*`, `+` and numbered (`1.`, `1)`) list items that
    /// start at column zero, so nested sub-bullets stay with their parent.
    /// Checkbox prefixes (`[ ]`, `[x]`) are stripped.
    pub fn work_items(&self) -> Vec<String> {
        static BULLET: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(?:[-*+]|\d+[.)])\s+(?:\[[ xX]\]\s+)?(.+?)\s*$")
                .expect("static regex compiles")
        });

        let mut in_fence = false;
        let mut items = Vec::new();
        for line in self.text.lines() {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }
            if let Some(caps) = BULLET.captures(line) {
                items.push(caps[1].to_string());
            }
        }
        items
    }
}
