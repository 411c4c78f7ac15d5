//! Plain-text report of threads awaiting a reply.

use std::fmt::Write;

use crate::config::ReportSettings;
use crate::domain::{truncate_chars, ThreadAnalysis};

const RULE_WIDTH: usize = 60;

/// Urgency bucket used to label report entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Score of 70 or more.
    High,
    /// Score from 50 to 69.
    Medium,
    /// Anything below 50.
    Low,
}

impl Tier {
    /// Buckets a score: 70 and up is high, 50 and up medium.
    pub fn for_score(score: u8) -> Self {
        match score {
            70.. => Tier::High,
            50.. => Tier::Medium,
            _ => Tier::Low,
        }
    }

    /// Tag printed in brackets before the score, e.g. `[HIGH]`.
    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "HIGH",
            Tier::Medium => "MEDIUM",
            Tier::Low => "LOW",
        }
    }
}

/// Renders the top entries of `results` as a console report.
pub fn render_report(results: &[ThreadAnalysis], settings: &ReportSettings) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "EMAILS THAT PROBABLY NEED A REPLY");
    let _ = writeln!(out, "{rule}\n");

    if results.is_empty() {
        let _ = writeln!(out, "Nothing found. You're all caught up.");
        return out;
    }

    for analysis in results.iter().take(settings.display_count) {
        render_entry(&mut out, analysis, settings);
    }

    if results.len() > settings.display_count {
        let _ = writeln!(
            out,
            "... and {} more below the display cutoff",
            results.len() - settings.display_count
        );
    }

    out
}

fn render_entry(out: &mut String, analysis: &ThreadAnalysis, settings: &ReportSettings) {
    let status = if analysis.is_read { "read" } else { "UNREAD" };
    let reasons: Vec<&str> = analysis
        .reasons
        .iter()
        .take(settings.reasons_shown)
        .map(String::as_str)
        .collect();

    let _ = writeln!(
        out,
        "[{}] Score: {}",
        Tier::for_score(analysis.score).label(),
        analysis.score
    );
    let _ = writeln!(
        out,
        "   From: {} <{}>",
        analysis.sender_name, analysis.sender_email
    );
    let _ = writeln!(out, "   Subject: {}", analysis.subject);
    let _ = writeln!(
        out,
        "   {} | {} days ago | {} messages",
        status, analysis.days_ago, analysis.message_count
    );
    let _ = writeln!(out, "   Why: {}", reasons.join(", "));
    let _ = writeln!(
        out,
        "   Preview: {}...",
        truncate_chars(&analysis.last_message, settings.preview_chars)
    );
    let _ = writeln!(out);
}
