//! Unified diff parsing into a patch set.
//!
//! Understands git-style file blocks (`diff --git`, extended headers such as
//! `new file mode` / `rename from`, `---`/`+++`, `Binary files ... differ`)
//! as well as plain `---`/`+++` blocks. Hunk counters are validated: a hunk
//! whose body does not match its `@@ -a,b +c,d @@` header fails the whole
//! parse.

use std::fmt;

use serde::Serialize;

use crate::errors::DiffParseError;

pub const DEV_NULL: &str = "/dev/null";

/// One changed line inside a diff hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DiffLine {
    Added {
        new_line: u32,
        content: String,
    },
    Removed {
        old_line: u32,
        content: String,
    },
    Context {
        old_line: u32,
        new_line: u32,
        content: String,
    },
}

/// A diff hunk (continuous block of changes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    pub fn added(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, DiffLine::Added { .. }))
            .count()
    }

    pub fn removed(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, DiffLine::Removed { .. }))
            .count()
    }
}

/// A single file entry of a parsed patch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchedFile {
    /// Source as written in the diff, e.g. `a/src/lib.rs` or `/dev/null`.
    pub source_file: String,
    /// Target as written in the diff, e.g. `b/src/lib.rs` or `/dev/null`.
    pub target_file: String,
    pub new_file_mode: Option<String>,
    pub deleted_file_mode: Option<String>,
    pub rename_from: Option<String>,
    pub rename_to: Option<String>,
    pub is_binary: bool,
    pub hunks: Vec<DiffHunk>,
    /// Verbatim text of this file block (headers + hunks).
    text: String,
    /// Byte offset in `text` where the first hunk starts.
    body_start: Option<usize>,
}

impl PatchedFile {
    fn new(source_file: String, target_file: String) -> Self {
        Self {
            source_file,
            target_file,
            new_file_mode: None,
            deleted_file_mode: None,
            rename_from: None,
            rename_to: None,
            is_binary: false,
            hunks: Vec::new(),
            text: String::new(),
            body_start: None,
        }
    }

    /// Source path without the `a/` prefix.
    pub fn source_path(&self) -> &str {
        strip_side_prefix(&self.source_file, "a/")
    }

    /// Target path without the `b/` prefix.
    pub fn target_path(&self) -> &str {
        strip_side_prefix(&self.target_file, "b/")
    }

    /// Path the file is known by after the change (source path for deletions).
    pub fn path(&self) -> &str {
        if self.target_file == DEV_NULL {
            self.source_path()
        } else {
            self.target_path()
        }
    }

    pub fn is_added_file(&self) -> bool {
        self.source_file == DEV_NULL
            || self.new_file_mode.is_some()
            || matches!(self.hunks.as_slice(), [h] if h.old_start == 0 && h.old_lines == 0)
    }

    pub fn is_removed_file(&self) -> bool {
        self.target_file == DEV_NULL
            || self.deleted_file_mode.is_some()
            || matches!(self.hunks.as_slice(), [h] if h.new_start == 0 && h.new_lines == 0)
    }

    pub fn is_rename(&self) -> bool {
        if self.rename_from.is_some() && self.rename_to.is_some() {
            return true;
        }
        self.source_file != DEV_NULL
            && self.target_file != DEV_NULL
            && self.source_path() != self.target_path()
    }

    pub fn added(&self) -> usize {
        self.hunks.iter().map(DiffHunk::added).sum()
    }

    pub fn removed(&self) -> usize {
        self.hunks.iter().map(DiffHunk::removed).sum()
    }

    /// Full unified diff text for this file.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Hunk text only, without the file headers. Empty for binary files.
    pub fn body(&self) -> &str {
        match self.body_start {
            Some(start) => &self.text[start..],
            None => "",
        }
    }
}

impl fmt::Display for PatchedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Parsed representation of one or more unified diffs, one entry per file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchSet {
    pub files: Vec<PatchedFile>,
}

impl PatchSet {
    pub fn parse(diff: &str) -> Result<Self, DiffParseError> {
        Parser::default().run(diff)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchedFile> {
        self.files.iter()
    }
}

impl IntoIterator for PatchSet {
    type Item = PatchedFile;
    type IntoIter = std::vec::IntoIter<PatchedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

/// GitLab and git replace the hunks of a binary file with a single marker
/// line: `Binary files a/x and b/x differ` or `GIT binary patch`.
fn is_binary_marker_line(line: &str) -> bool {
    (line.starts_with("Binary files ") && line.ends_with(" differ")) || line == "GIT binary patch"
}

/// True when the first line of a per-file diff is a binary marker.
/// Text that merely mentions the marker further down is not binary.
pub fn is_binary_diff(diff: &str) -> bool {
    diff.lines()
        .next()
        .is_some_and(|first| is_binary_marker_line(first.trim_end_matches('\r')))
}

struct OpenHunk {
    hunk: DiffHunk,
    old_left: u32,
    new_left: u32,
    next_old: u32,
    next_new: u32,
}

#[derive(Default)]
struct Parser {
    files: Vec<PatchedFile>,
    current: Option<PatchedFile>,
    hunk: Option<OpenHunk>,
    /// `---` seen for the current file, waiting for `+++`.
    pending_source: bool,
    /// `---`/`+++` pair complete for the current file.
    has_file_header: bool,
}

impl Parser {
    fn run(mut self, diff: &str) -> Result<PatchSet, DiffParseError> {
        for (idx, raw) in diff.split_inclusive('\n').enumerate() {
            self.line(idx + 1, raw)?;
        }
        self.finish_file()?;
        Ok(PatchSet { files: self.files })
    }

    fn line(&mut self, line_no: usize, raw: &str) -> Result<(), DiffParseError> {
        let line = raw.trim_end_matches(['\n', '\r']);

        if self.hunk.is_some() {
            return self.hunk_line(line_no, raw, line);
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            self.finish_file()?;
            let (source, target) = split_git_paths(rest);
            self.start_file(PatchedFile::new(source, target));
            self.push_text(raw);
            return Ok(());
        }

        if let Some(rest) = line.strip_prefix("--- ") {
            // A second `---` after hunks opens a new plain (non-git) file block.
            let starts_new = match &self.current {
                None => true,
                Some(f) => self.has_file_header || !f.hunks.is_empty(),
            };
            if starts_new {
                self.finish_file()?;
                self.start_file(PatchedFile::new(String::new(), String::new()));
            }
            if let Some(f) = self.current.as_mut() {
                f.source_file = header_path(rest);
            }
            self.pending_source = true;
            self.push_text(raw);
            return Ok(());
        }

        if let Some(rest) = line.strip_prefix("+++ ") {
            if !self.pending_source {
                return Err(DiffParseError::TargetWithoutSource { line: line_no });
            }
            if let Some(f) = self.current.as_mut() {
                f.target_file = header_path(rest);
            }
            self.pending_source = false;
            self.has_file_header = true;
            self.push_text(raw);
            return Ok(());
        }

        if line.starts_with("@@") {
            if !self.has_file_header {
                return Err(DiffParseError::HunkWithoutFileHeader { line: line_no });
            }
            let header = parse_hunk_header(line)?;
            if let Some(f) = self.current.as_mut() {
                if f.body_start.is_none() {
                    f.body_start = Some(f.text.len());
                }
            }
            self.push_text(raw);
            let open = OpenHunk {
                hunk: DiffHunk {
                    old_start: header.old_start,
                    old_lines: header.old_lines,
                    new_start: header.new_start,
                    new_lines: header.new_lines,
                    lines: Vec::new(),
                },
                old_left: header.old_lines,
                new_left: header.new_lines,
                next_old: header.old_start,
                next_new: header.new_start,
            };
            self.hunk = Some(open);
            self.close_hunk_if_complete();
            return Ok(());
        }

        if let Some(value) = extended_header(line) {
            let Some(f) = self.current.as_mut() else {
                return Err(DiffParseError::OrphanHeader {
                    line: line_no,
                    text: line.to_string(),
                });
            };
            match value {
                ExtendedHeader::NewFileMode(m) => f.new_file_mode = Some(m.to_string()),
                ExtendedHeader::DeletedFileMode(m) => f.deleted_file_mode = Some(m.to_string()),
                ExtendedHeader::RenameFrom(p) => f.rename_from = Some(p.to_string()),
                ExtendedHeader::RenameTo(p) => f.rename_to = Some(p.to_string()),
                ExtendedHeader::Other => {}
            }
            self.push_text(raw);
            return Ok(());
        }

        if is_binary_marker_line(line) {
            if let Some(f) = self.current.as_mut() {
                f.is_binary = true;
            }
            self.push_text(raw);
            return Ok(());
        }

        // "\ No newline at end of file" right after the last line of a hunk.
        if line.starts_with('\\') && self.current.as_ref().is_some_and(|f| !f.hunks.is_empty()) {
            self.push_text(raw);
            return Ok(());
        }

        if line.trim().is_empty() {
            return Ok(());
        }

        match self.current.as_ref().map(|f| f.is_binary && f.hunks.is_empty()) {
            // Preamble (commit message etc.) before the first file.
            None => Ok(()),
            // base85 payload of a `GIT binary patch` block
            Some(true) => {
                self.push_text(raw);
                Ok(())
            }
            Some(false) => Err(DiffParseError::UnexpectedLine {
                line: line_no,
                text: line.to_string(),
            }),
        }
    }

    fn hunk_line(&mut self, line_no: usize, raw: &str, line: &str) -> Result<(), DiffParseError> {
        let Some(open) = self.hunk.as_mut() else {
            return Ok(());
        };

        match line.chars().next() {
            Some('+') if open.new_left > 0 => {
                open.hunk.lines.push(DiffLine::Added {
                    new_line: open.next_new,
                    content: line[1..].to_string(),
                });
                open.next_new += 1;
                open.new_left -= 1;
            }
            Some('-') if open.old_left > 0 => {
                open.hunk.lines.push(DiffLine::Removed {
                    old_line: open.next_old,
                    content: line[1..].to_string(),
                });
                open.next_old += 1;
                open.old_left -= 1;
            }
            // Some producers drop the single space of empty context lines.
            Some(' ') | None if open.old_left > 0 && open.new_left > 0 => {
                let content = line.get(1..).unwrap_or_default().to_string();
                open.hunk.lines.push(DiffLine::Context {
                    old_line: open.next_old,
                    new_line: open.next_new,
                    content,
                });
                open.next_old += 1;
                open.next_new += 1;
                open.old_left -= 1;
                open.new_left -= 1;
            }
            Some('\\') => {}
            _ => {
                return Err(DiffParseError::HunkTooShort {
                    line: line_no,
                    path: current_path(&self.current),
                    old_left: open.old_left,
                    new_left: open.new_left,
                });
            }
        }

        self.push_text(raw);
        self.close_hunk_if_complete();
        Ok(())
    }

    fn close_hunk_if_complete(&mut self) {
        let complete = self
            .hunk
            .as_ref()
            .is_some_and(|h| h.old_left == 0 && h.new_left == 0);
        if complete {
            if let (Some(open), Some(f)) = (self.hunk.take(), self.current.as_mut()) {
                f.hunks.push(open.hunk);
            }
        }
    }

    fn start_file(&mut self, file: PatchedFile) {
        self.current = Some(file);
        self.pending_source = false;
        self.has_file_header = false;
    }

    fn push_text(&mut self, raw: &str) {
        if let Some(f) = self.current.as_mut() {
            f.text.push_str(raw);
        }
    }

    fn finish_file(&mut self) -> Result<(), DiffParseError> {
        if self.hunk.is_some() {
            return Err(DiffParseError::UnexpectedEof {
                path: current_path(&self.current),
            });
        }
        if let Some(f) = self.current.take() {
            self.files.push(f);
        }
        self.pending_source = false;
        self.has_file_header = false;
        Ok(())
    }
}

enum ExtendedHeader<'a> {
    NewFileMode(&'a str),
    DeletedFileMode(&'a str),
    RenameFrom(&'a str),
    RenameTo(&'a str),
    Other,
}

fn extended_header(line: &str) -> Option<ExtendedHeader<'_>> {
    if let Some(m) = line.strip_prefix("new file mode ") {
        return Some(ExtendedHeader::NewFileMode(m.trim()));
    }
    if let Some(m) = line.strip_prefix("deleted file mode ") {
        return Some(ExtendedHeader::DeletedFileMode(m.trim()));
    }
    if let Some(p) = line.strip_prefix("rename from ") {
        return Some(ExtendedHeader::RenameFrom(p.trim()));
    }
    if let Some(p) = line.strip_prefix("rename to ") {
        return Some(ExtendedHeader::RenameTo(p.trim()));
    }
    const OTHERS: [&str; 7] = [
        "index ",
        "old mode ",
        "new mode ",
        "similarity index ",
        "dissimilarity index ",
        "copy from ",
        "copy to ",
    ];
    OTHERS
        .iter()
        .any(|p| line.starts_with(p))
        .then_some(ExtendedHeader::Other)
}

/// Splits `a/<old> b/<new>` from a `diff --git` line.
fn split_git_paths(rest: &str) -> (String, String) {
    match rest.find(" b/") {
        Some(idx) => (rest[..idx].to_string(), rest[idx + 1..].to_string()),
        None => (rest.to_string(), rest.to_string()),
    }
}

/// Path from a `---`/`+++` line, dropping a trailing tab-separated timestamp.
fn header_path(rest: &str) -> String {
    rest.split('\t').next().unwrap_or(rest).trim_end().to_string()
}

fn current_path(current: &Option<PatchedFile>) -> String {
    current
        .as_ref()
        .map(|f| f.path().to_string())
        .unwrap_or_default()
}

fn strip_side_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}

struct HunkHeader {
    old_start: u32,
    old_lines: u32,
    new_start: u32,
    new_lines: u32,
}

fn parse_hunk_header(line: &str) -> Result<HunkHeader, DiffParseError> {
    // line looks like: "@@ -1,5 +1,7 @@ optional text"
    let invalid = || DiffParseError::InvalidHunkHeader(line.to_string());

    let rest = line.strip_prefix("@@").ok_or_else(invalid)?;
    let end = rest.find("@@").ok_or_else(invalid)?;
    let parts: Vec<&str> = rest[..end].split_whitespace().collect();
    if parts.len() != 2 {
        return Err(invalid());
    }

    let old_part = parts[0].strip_prefix('-').ok_or_else(invalid)?;
    let new_part = parts[1].strip_prefix('+').ok_or_else(invalid)?;

    let (old_start, old_lines) = split_range(old_part).ok_or_else(invalid)?;
    let (new_start, new_lines) = split_range(new_part).ok_or_else(invalid)?;
    // Line numbers run up to start + len; reject ranges past u32.
    if old_start.checked_add(old_lines).is_none() || new_start.checked_add(new_lines).is_none() {
        return Err(invalid());
    }

    Ok(HunkHeader {
        old_start,
        old_lines,
        new_start,
        new_lines,
    })
}

/// `start[,len]`; an omitted length means one line.
fn split_range(s: &str) -> Option<(u32, u32)> {
    let mut it = s.split(',');
    let start: u32 = it.next()?.parse().ok()?;
    let len: u32 = match it.next() {
        Some(l) => l.parse().ok()?,
        None => 1,
    };
    if it.next().is_some() {
        return None;
    }
    Some((start, len))
}
