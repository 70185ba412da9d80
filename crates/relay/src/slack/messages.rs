//! Turns agent replies into Slack messages.
//!
//! Plain text passes through untouched. A structured result becomes an
//! "Error Report" Block Kit message with one block group per report, or a
//! short text message when there is nothing to report.

use chatops_core::{ErrorReport, ProjectId, Reply};

use super::types::{Block, OutboundMessage};

/// Slack rejects messages with more blocks than this.
pub const MAX_BLOCKS: usize = 50;
/// Maximum characters in a section's text.
pub const MAX_SECTION_TEXT: usize = 3000;
/// Maximum characters in a section field.
pub const MAX_FIELD_TEXT: usize = 2000;

/// Blocks rendered per report (see [`report_blocks`]).
const BLOCKS_PER_REPORT: usize = 7;
/// Leading header and divider plus the trailing context line.
const FRAME_BLOCKS: usize = 3;
/// Reports that fit in one message.
pub const MAX_REPORTS: usize = (MAX_BLOCKS - FRAME_BLOCKS) / BLOCKS_PER_REPORT;

const ERROR_REPORTING_CONSOLE: &str = "https://console.cloud.google.com/errors";

/// Format a reply for delivery.
///
/// The reply's variant alone decides the shape: `PlainText` stays text,
/// `StructuredResult` becomes blocks unless it holds no reports.
#[must_use]
pub fn format_reply(reply: &Reply) -> OutboundMessage {
    match reply {
        Reply::PlainText { text } => OutboundMessage::Text(text.clone()),
        Reply::StructuredResult {
            project_id,
            reports,
        } if reports.is_empty() => OutboundMessage::Text(no_errors_text(project_id)),
        Reply::StructuredResult {
            project_id,
            reports,
        } => OutboundMessage::Blocks(error_report_blocks(project_id, reports)),
    }
}

/// Text sent when a project has no open errors.
#[must_use]
pub fn no_errors_text(project_id: &ProjectId) -> String {
    format!("No open errors found in project `{project_id}`.")
}

/// Build the Block Kit layout for a non-empty list of reports.
///
/// Reports beyond [`MAX_REPORTS`] are left out and counted in the footer.
#[must_use]
pub fn error_report_blocks(project_id: &ProjectId, reports: &[ErrorReport]) -> Vec<Block> {
    let shown = reports.len().min(MAX_REPORTS);

    let mut blocks = Vec::with_capacity(FRAME_BLOCKS + shown * BLOCKS_PER_REPORT);
    blocks.push(Block::header("🚨 Error Report"));
    blocks.push(Block::Divider);
    for report in reports.iter().take(shown) {
        blocks.extend(report_blocks(report));
    }
    blocks.push(Block::context(footer(project_id, shown, reports.len())));
    blocks
}

fn report_blocks(report: &ErrorReport) -> [Block; BLOCKS_PER_REPORT] {
    let summary = &report.summary;
    let solution = &report.solution;

    [
        Block::fields([
            field("Project ID", summary.project_id()),
            field("Affected Service", summary.affected_service()),
            field("Service Version", summary.service_version()),
            field("Error Type", summary.error_type()),
            field("Resource Type", summary.resource_type()),
        ]),
        Block::section(labelled("Error Description", summary.error_description())),
        Block::header("💡 Potential Solutions"),
        Block::section(labelled("Suggested Action", solution.suggested_action())),
        Block::section(code_block("Code Snippet", solution.code_snippet())),
        Block::section(labelled("Additional Tip", solution.additional_tip())),
        Block::Divider,
    ]
}

fn footer(project_id: &ProjectId, shown: usize, total: usize) -> String {
    let link = format!("<{ERROR_REPORTING_CONSOLE}?project={project_id}|Error Reporting console>");
    if shown < total {
        format!("Showing {shown} of {total} open errors in `{project_id}`. See the full list in the {link}.")
    } else {
        let noun = if total == 1 { "error" } else { "errors" };
        format!("{total} open {noun} in `{project_id}` • Details in the {link}")
    }
}

fn field(label: &str, value: &str) -> String {
    let prefix = format!("*{label}:*\n");
    let budget = MAX_FIELD_TEXT.saturating_sub(prefix.chars().count());
    format!("{prefix}{}", escape_truncated(value, budget))
}

fn labelled(label: &str, value: &str) -> String {
    let prefix = format!("*{label}:*\n");
    let budget = MAX_SECTION_TEXT.saturating_sub(prefix.chars().count());
    format!("{prefix}{}", escape_truncated(value, budget))
}

fn code_block(label: &str, code: &str) -> String {
    let prefix = format!("*{label}:*\n```\n");
    let suffix = "\n```";
    let budget = MAX_SECTION_TEXT
        .saturating_sub(prefix.chars().count())
        .saturating_sub(suffix.chars().count());
    format!("{prefix}{}{suffix}", escape_truncated(code.trim_matches('\n'), budget))
}

/// The entity Slack expects in place of a mrkdwn control character.
const fn entity(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    }
}

/// Escape `text` for mrkdwn in at most `max_chars` characters.
///
/// Cuts fall between characters of the original text, so an entity is
/// either emitted whole or not at all. A cut is marked with `…`.
fn escape_truncated(text: &str, max_chars: usize) -> String {
    let width = |c: char| entity(c).map_or(1, str::len);
    let fits = text.chars().map(width).sum::<usize>() <= max_chars;
    let budget = if fits { max_chars } else { max_chars.saturating_sub(1) };

    let mut out = String::with_capacity(text.len().min(budget));
    let mut used = 0;
    for c in text.chars() {
        used += width(c);
        if used > budget {
            break;
        }
        match entity(c) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    if !fits {
        out.push('…');
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::slack::types::Text;
    use chatops_core::{ErrorSummary, PotentialSolution, sentinel};

    fn project() -> ProjectId {
        ProjectId::parse("proj-1").unwrap()
    }

    fn report(error_type: &str) -> ErrorReport {
        ErrorReport {
            summary: ErrorSummary {
                project_id: Some("proj-1".to_string()),
                affected_service: Some("api".to_string()),
                service_version: Some("v7".to_string()),
                error_type: Some(error_type.to_string()),
                error_description: Some("Lookup of a missing key".to_string()),
                resource_type: Some("cloud_run_revision".to_string()),
            },
            solution: PotentialSolution {
                suggested_action: Some("Guard the lookup".to_string()),
                code_snippet: Some("user = payload.get('user')".to_string()),
                additional_tip: Some("Add a regression test".to_string()),
            },
        }
    }

    fn texts(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .flat_map(|block| match block {
                Block::Header { text } => vec![text.as_str().to_string()],
                Block::Section { text, fields } => text
                    .iter()
                    .chain(fields.iter().flatten())
                    .map(|t| t.as_str().to_string())
                    .collect(),
                Block::Context { elements } => {
                    elements.iter().map(|t| t.as_str().to_string()).collect()
                }
                Block::Divider => vec![],
            })
            .collect()
    }

    #[test]
    fn test_plain_text_passes_through() {
        let message = format_reply(&Reply::text("Hello *there*"));
        assert_eq!(message, OutboundMessage::Text("Hello *there*".to_string()));
    }

    #[test]
    fn test_empty_result_is_text() {
        let message = format_reply(&Reply::StructuredResult {
            project_id: project(),
            reports: vec![],
        });
        assert_eq!(
            message,
            OutboundMessage::Text("No open errors found in project `proj-1`.".to_string())
        );
    }

    #[test]
    fn test_two_reports_layout() {
        let message = format_reply(&Reply::StructuredResult {
            project_id: project(),
            reports: vec![report("KeyError"), report("TimeoutError")],
        });
        let OutboundMessage::Blocks(blocks) = message else {
            panic!("expected blocks");
        };

        assert_eq!(blocks.len(), FRAME_BLOCKS + 2 * BLOCKS_PER_REPORT);
        assert_eq!(blocks[0], Block::header("🚨 Error Report"));
        assert_eq!(blocks[1], Block::Divider);
        assert!(matches!(blocks.last(), Some(Block::Context { .. })));

        let contexts = blocks
            .iter()
            .filter(|b| matches!(b, Block::Context { .. }))
            .count();
        assert_eq!(contexts, 1);

        let solution_headers = blocks
            .iter()
            .filter(|b| **b == Block::header("💡 Potential Solutions"))
            .count();
        assert_eq!(solution_headers, 2);

        let all = texts(&blocks).join("\n");
        assert!(all.contains("*Error Type:*\nKeyError"));
        assert!(all.contains("*Error Type:*\nTimeoutError"));
        assert!(all.contains("```\nuser = payload.get('user')\n```"));
        assert!(all.contains("2 open errors in `proj-1`"));
        assert!(all.contains("https://console.cloud.google.com/errors?project=proj-1"));
    }

    #[test]
    fn test_missing_fields_render_sentinels() {
        let blocks = error_report_blocks(&project(), &[ErrorReport::default()]);
        let all = texts(&blocks).join("\n");

        assert!(all.contains("*Project ID:*\nN/A"));
        assert!(all.contains(&format!("*Error Description:*\n{}", sentinel::NO_DESCRIPTION)));
        assert!(all.contains(&format!("*Suggested Action:*\n{}", sentinel::NO_ACTION)));
        assert!(all.contains(&format!("```\n{}\n```", sentinel::NO_CODE)));
        assert!(all.contains(&format!("*Additional Tip:*\n{}", sentinel::NO_TIP)));
        assert!(all.contains("1 open error in"));
    }

    #[test]
    fn test_block_count_is_capped() {
        let reports: Vec<_> = (0..20).map(|i| report(&format!("Error{i}"))).collect();
        let blocks = error_report_blocks(&project(), &reports);

        assert!(blocks.len() <= MAX_BLOCKS);
        let footer = texts(&blocks).pop().unwrap();
        assert!(footer.starts_with(&format!("Showing {MAX_REPORTS} of 20 open errors")));
    }

    #[test]
    fn test_long_text_is_truncated() {
        let mut long = report("KeyError");
        long.solution.code_snippet = Some("é".repeat(5000));
        long.summary.error_description = Some("x".repeat(5000));

        let blocks = error_report_blocks(&project(), &[long]);
        for block in &blocks {
            if let Block::Section {
                text: Some(Text::Mrkdwn { text }),
                ..
            } = block
            {
                assert!(text.chars().count() <= MAX_SECTION_TEXT);
            }
        }
        let all = texts(&blocks).join("\n");
        assert!(all.contains("…\n```"));
    }

    #[test]
    fn test_truncation_never_splits_an_entity() {
        let budget = MAX_FIELD_TEXT - "*Error Type:*\n".len();
        for pad in 0..5 {
            let mut r = report("KeyError");
            r.summary.error_type = Some(format!("{}{}", "x".repeat(budget - 3 - pad), "&".repeat(10)));

            let all = texts(&error_report_blocks(&project(), &[r])).join("\n");
            let field = all
                .split("*Error Type:*\n")
                .nth(1)
                .and_then(|rest| rest.split('\n').next())
                .unwrap();

            assert!(field.ends_with('…'), "pad {pad}: {field}");
            assert!(field.chars().count() <= budget);
            let escaped = field.trim_start_matches('x').trim_end_matches('…');
            assert_eq!(escaped.replace("&amp;", ""), "", "pad {pad}: {escaped}");
        }
    }

    #[test]
    fn test_short_escaped_text_is_not_truncated() {
        assert_eq!(escape_truncated("a<b", 6), "a&lt;b");
        assert_eq!(escape_truncated("a<b", 5), "a…");
        assert_eq!(escape_truncated("é&", 7), "é&amp;");
    }

    #[test]
    fn test_control_characters_are_escaped() {
        let mut r = report("KeyError");
        r.solution.code_snippet = Some("if a < b && c > d {}".to_string());
        let all = texts(&error_report_blocks(&project(), &[r])).join("\n");
        assert!(all.contains("if a &lt; b &amp;&amp; c &gt; d {}"));
    }
}
