//! Rebuilds a unified diff from GitLab per-file change descriptors and
//! classifies each file.
//!
//! GitLab returns only the hunk text per file, so a git-style header is
//! synthesized in front of every entry and the whole concatenation is parsed
//! at once. Parsing is not isolated per file: one malformed entry fails the
//! entire change set.

use crate::errors::GitContextEngineResult;
use crate::git_providers::ChangeDescriptor;
use crate::parser::{PatchSet, PatchedFile};
use crate::pull_request::{FileAction, PullRequestFile};

/// Placeholder index line; GitLab does not expose blob ids per file here.
const SYNTHETIC_INDEX: &str = "index 0000000..0000000 100644";

/// Synthesizes the header for one descriptor and appends its diff text.
pub fn push_file_block(out: &mut String, change: &ChangeDescriptor) {
    out.push_str(&format!(
        "diff --git a/{} b/{}\n",
        change.old_path, change.new_path
    ));
    if change.new_file {
        let mode = change.b_mode.as_deref().unwrap_or("100644");
        out.push_str(&format!("new file mode {mode}\n"));
    }
    if change.deleted_file {
        out.push_str("deleted file mode 100644\n");
    }
    out.push_str(SYNTHETIC_INDEX);
    out.push('\n');
    if !change.is_binary_marker_present() {
        out.push_str(&format!("--- a/{}\n", change.old_path));
        out.push_str(&format!("+++ b/{}\n", change.new_path));
    }
    out.push_str(&change.diff);
    if !change.diff.is_empty() && !change.diff.ends_with('\n') {
        out.push('\n');
    }
}

/// Full unified diff document for all descriptors, in input order.
pub fn build_patch_text(changes: &[ChangeDescriptor]) -> String {
    let mut out = String::new();
    for change in changes {
        push_file_block(&mut out, change);
    }
    out
}

/// Parses the reconstructed document into a patch set.
pub fn build_patch_set(changes: &[ChangeDescriptor]) -> GitContextEngineResult<PatchSet> {
    let text = build_patch_text(changes);
    Ok(PatchSet::parse(&text)?)
}

/// Added, then removed, then renamed; anything else is a plain change.
pub fn classify(file: &PatchedFile) -> FileAction {
    if file.is_added_file() {
        FileAction::Created
    } else if file.is_removed_file() {
        FileAction::Removed
    } else if file.is_rename() {
        FileAction::Renamed
    } else {
        FileAction::Changed
    }
}

/// Descriptor list to classified files, preserving order.
pub fn reconstruct(changes: &[ChangeDescriptor]) -> GitContextEngineResult<Vec<PullRequestFile>> {
    let files = build_patch_set(changes)?
        .into_iter()
        .map(|file| {
            let action = classify(&file);
            PullRequestFile::new(file.path().to_string(), action, file)
        })
        .collect();
    Ok(files)
}
