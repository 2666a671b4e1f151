//! Pull request to Slack message. Pure; no I/O.

use git_context_engine::{FileAction, PullRequest, PullRequestFile, PullRequestState};

use crate::blocks::{
    Block, ButtonStyle, Element, SECTION_TEXT_LIMIT, SlackMessage, TextObject, escape, truncate,
};

/// Action id of the approve button; the interactivity route matches on it.
pub const APPROVE_ACTION_ID: &str = "approve_mr_action";

/// At most this many files get their own blocks.
pub const MAX_RENDERED_FILES: usize = 10;

/// Total added+removed lines above which files are summarized instead of shown.
pub const SUMMARY_THRESHOLD_LINES: usize = 20;

const PERIODS: [(&str, u64); 6] = [
    ("year", 60 * 60 * 24 * 365),
    ("month", 60 * 60 * 24 * 30),
    ("day", 60 * 60 * 24),
    ("hour", 60 * 60),
    ("minute", 60),
    ("second", 1),
];

pub fn render(pr: &PullRequest) -> SlackMessage {
    match pr.state() {
        PullRequestState::Opened => render_opened(pr),
        PullRequestState::Closed => render_closed(pr),
        PullRequestState::Merged => render_merged(pr),
    }
}

/// Button value carried back by Slack on click: `approve-<repository_id>-<iid>`.
pub fn approve_value(repository_id: u64, iid: u64) -> String {
    format!("approve-{repository_id}-{iid}")
}

/// Inverse of [`approve_value`]; `None` for anything else.
pub fn parse_approve_value(value: &str) -> Option<(u64, u64)> {
    let (repository_id, iid) = value.strip_prefix("approve-")?.split_once('-')?;
    Some((repository_id.parse().ok()?, iid.parse().ok()?))
}

/// Human readable duration, largest unit first: `1 hour, 1 minute, 1 second`.
pub fn td_format(seconds: u64) -> String {
    if seconds == 0 {
        return "0 seconds".to_string();
    }
    let mut left = seconds;
    let mut parts = Vec::new();
    for (name, size) in PERIODS {
        if left >= size {
            let value = left / size;
            left %= size;
            let plural = if value > 1 { "s" } else { "" };
            parts.push(format!("{value} {name}{plural}"));
        }
    }
    parts.join(", ")
}

fn link(pr: &PullRequest) -> String {
    format!(
        "*<{}|{} by {}>*",
        pr.pr_url(),
        escape(pr.title()),
        escape(pr.author_name())
    )
}

fn fallback(headline: &str, pr: &PullRequest) -> String {
    format!("{headline}: {} by {}", pr.title(), pr.author_name())
}

fn render_closed(pr: &PullRequest) -> SlackMessage {
    let closer = pr.closed_by().unwrap_or("unknown");
    SlackMessage {
        text: fallback("Pull request closed", pr),
        blocks: vec![Block::section(format!(
            "Pull request has been closed by *{}*\n{}",
            escape(closer),
            link(pr)
        ))],
    }
}

fn render_merged(pr: &PullRequest) -> SlackMessage {
    let merger = pr.merged_by().unwrap_or("unknown");
    let took = td_format(pr.time_to_merge_seconds().unwrap_or(0));
    SlackMessage {
        text: fallback("Pull request merged", pr),
        blocks: vec![Block::section(format!(
            ":fire: Pull request has been merged by *{}* in {took} :fire:\n{}",
            escape(merger),
            link(pr)
        ))],
    }
}

fn render_opened(pr: &PullRequest) -> SlackMessage {
    let mut blocks = vec![Block::section(format!(
        "New pull request is pending review\n{}",
        link(pr)
    ))];

    let changes = pr.changes();
    let total: usize = changes
        .iter()
        .map(|f| f.lines_added() + f.lines_removed())
        .sum();
    let summary = total > SUMMARY_THRESHOLD_LINES;

    for file in changes.iter().take(MAX_RENDERED_FILES) {
        blocks.push(Block::Divider);
        blocks.push(if summary {
            summary_section(file)
        } else {
            diff_section(file)
        });
    }
    if changes.len() > MAX_RENDERED_FILES {
        let more = changes.len() - MAX_RENDERED_FILES;
        let noun = if more == 1 { "file" } else { "files" };
        blocks.push(Block::context(format!("{more} more {noun}...")));
    }

    blocks.push(Block::Actions {
        elements: vec![Element::Button {
            action_id: APPROVE_ACTION_ID.to_string(),
            text: TextObject::PlainText {
                text: "Approve this".to_string(),
                emoji: true,
            },
            style: ButtonStyle::Primary,
            value: approve_value(pr.repository_id(), pr.external_id()),
        }],
    });
    blocks.push(Block::context(approvals_line(pr)));

    SlackMessage {
        text: fallback("New pull request is pending review", pr),
        blocks,
    }
}

fn approvals_line(pr: &PullRequest) -> String {
    if pr.approvals().is_empty() {
        return "Approved by (0)".to_string();
    }
    format!(
        "Approved by ({}): {}",
        pr.approval_count(),
        pr.approvals().join(", ")
    )
}

fn action_label(action: FileAction) -> &'static str {
    match action {
        FileAction::Created => "created",
        FileAction::Removed => "removed",
        FileAction::Renamed => "renamed",
        FileAction::Changed => "changed",
    }
}

fn summary_section(file: &PullRequestFile) -> Block {
    Block::section(format!(
        "*{}* ({}) `+{} -{}`",
        escape(file.filename()),
        action_label(file.action()),
        file.lines_added(),
        file.lines_removed()
    ))
}

fn diff_section(file: &PullRequestFile) -> Block {
    let head = format!("*Filename:* {}\n```", escape(file.filename()));
    const FENCE: &str = "```";

    let body = if file.diff().is_binary {
        "Binary file".to_string()
    } else {
        escape(file.diff().body().trim_end_matches('\n'))
    };
    let budget = SECTION_TEXT_LIMIT
        .saturating_sub(head.chars().count())
        .saturating_sub(FENCE.len());

    Block::section(format!("{head}{}{FENCE}", truncate(&body, budget)))
}
