//! Safe file mutation inside a workspace.
//!
//! Every operation is a read-modify-write cycle: resolve the path under the
//! workspace root, copy the pre-mutation contents into
//! `.code_agent_backups/<name>.<timestamp>.backup`, then write. The editor
//! holds no state between calls; tool wrappers turn the structured outcomes
//! returned here into the strings the model sees.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::util::timestamp_compact;

/// Backup directory name under the workspace. Excluded from listings and
/// rejected as a mutation target.
pub const BACKUP_DIR_NAME: &str = ".code_agent_backups";

/// Listing cap: more than this many matches are reported by count only.
pub const LIST_LIMIT: usize = 50;

/// Preview length for `show_file`.
pub const PREVIEW_LINES: usize = 30;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("path escapes the workspace: {0}")]
    OutsideWorkspace(String),

    #[error("path targets the backup directory: {0}")]
    BackupPath(String),

    #[error("{0}")]
    InvalidRange(String),

    #[error("invalid line indices: {0}")]
    InvalidIndices(String),

    #[error("invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("no edits to apply")]
    EmptyBatch,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a protected `write_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Target did not exist; written as-is.
    Created { bytes: usize },
    /// Target already holds exactly this content.
    Unchanged,
    /// Existing content was a prefix of the new content (up to trailing
    /// whitespace); the file was adapted to the longer version.
    Extended { added_lines: usize },
    /// Existing content diverges. Nothing was written.
    Blocked { current_bytes: usize, new_bytes: usize },
}

#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub old_lines: usize,
    pub new_lines: usize,
    pub old_head: Vec<String>,
    pub new_head: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EnsureOutcome {
    pub created: bool,
    pub added: Vec<String>,
    pub present: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchReplaceOutcome {
    pub occurrences: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct LineEditOutcome {
    pub old_total: usize,
    pub new_total: usize,
}

#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    /// Removed line numbers, 1-indexed, ascending.
    pub removed: Vec<usize>,
    pub remaining: usize,
}

#[derive(Debug, Clone)]
pub struct Listing {
    /// Workspace-relative paths, sorted, at most [`LIST_LIMIT`] entries.
    pub files: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct Preview {
    pub lines: Vec<String>,
    pub total: usize,
}

/// Range or index-list selector for `delete_lines`. The two forms are
/// mutually exclusive at the tool layer.
#[derive(Debug, Clone)]
pub enum DeleteSpec {
    /// 1-indexed inclusive range.
    Range { start: usize, end: usize },
    /// 0-indexed individual lines.
    Indices(Vec<usize>),
}

/// One edit in a batch, 1-indexed inclusive.
#[derive(Debug, Clone)]
pub struct FileEdit {
    pub start_line: usize,
    pub end_line: usize,
    pub new_content: String,
    pub description: String,
}

pub struct FileEditor {
    workspace: PathBuf,
    backup_dir: PathBuf,
}

impl FileEditor {
    pub fn new(workspace: impl Into<PathBuf>) -> Result<Self, EditorError> {
        let workspace = workspace.into();
        let backup_dir = workspace.join(BACKUP_DIR_NAME);
        std::fs::create_dir_all(&backup_dir).map_err(|e| EditorError::Io {
            path: backup_dir.display().to_string(),
            source: e,
        })?;
        Ok(Self { workspace, backup_dir })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Interpret `rel` under the workspace, rejecting `..` escapes, absolute
    /// paths, and anything inside the backup directory.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, EditorError> {
        let candidate = Path::new(rel);
        let mut clean = PathBuf::new();
        for component in candidate.components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(EditorError::OutsideWorkspace(rel.to_string()));
                }
            }
        }
        if clean.components().next().map(|c| c.as_os_str()) == Some(BACKUP_DIR_NAME.as_ref()) {
            return Err(EditorError::BackupPath(rel.to_string()));
        }
        Ok(self.workspace.join(clean))
    }

    pub fn exists(&self, rel: &str) -> Result<bool, EditorError> {
        Ok(self.resolve(rel)?.exists())
    }

    pub fn read(&self, rel: &str) -> Result<String, EditorError> {
        let path = self.resolve(rel)?;
        if !path.exists() {
            return Err(EditorError::NotFound(rel.to_string()));
        }
        std::fs::read_to_string(&path).map_err(|e| EditorError::Io {
            path: rel.to_string(),
            source: e,
        })
    }

    /// Timestamped copy of the current contents, taken before every mutation
    /// of an existing file.
    pub fn create_backup(&self, rel: &str) -> Result<PathBuf, EditorError> {
        let path = self.resolve(rel)?;
        if !path.exists() {
            return Err(EditorError::NotFound(rel.to_string()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        let backup = self.backup_dir.join(format!("{}.{}.backup", name, timestamp_compact()));
        std::fs::copy(&path, &backup).map_err(|e| EditorError::Io {
            path: backup.display().to_string(),
            source: e,
        })?;
        Ok(backup)
    }

    /// Protected create. Never overwrites divergent content; an existing file
    /// whose content is a prefix of the new content (after trimming trailing
    /// whitespace from the existing side, byte-exact otherwise) is adapted to
    /// the longer version.
    pub fn write_protected(&self, rel: &str, content: &str) -> Result<WriteOutcome, EditorError> {
        let path = self.resolve(rel)?;
        if !path.exists() {
            self.write_raw(rel, &path, content)?;
            return Ok(WriteOutcome::Created { bytes: content.len() });
        }

        let current = self.read(rel)?;
        if current == content {
            return Ok(WriteOutcome::Unchanged);
        }

        let stem = current.trim_end();
        if content.starts_with(stem) && content.len() > stem.len() {
            self.create_backup(rel)?;
            self.write_raw(rel, &path, content)?;
            let added_lines = line_count(&content[stem.len()..]);
            return Ok(WriteOutcome::Extended { added_lines });
        }

        Ok(WriteOutcome::Blocked {
            current_bytes: current.len(),
            new_bytes: content.len(),
        })
    }

    /// Unconditional overwrite of an existing file. Callers verify existence
    /// first; a missing target is an error here.
    pub fn force_write(&self, rel: &str, content: &str) -> Result<ReplaceOutcome, EditorError> {
        self.replace_existing(rel, content)
    }

    /// Atomic whole-file replace of an existing file.
    pub fn update(&self, rel: &str, content: &str) -> Result<ReplaceOutcome, EditorError> {
        self.replace_existing(rel, content)
    }

    fn replace_existing(&self, rel: &str, content: &str) -> Result<ReplaceOutcome, EditorError> {
        let path = self.resolve(rel)?;
        if !path.exists() {
            return Err(EditorError::NotFound(rel.to_string()));
        }
        let old = self.read(rel)?;
        self.create_backup(rel)?;
        self.write_raw(rel, &path, content)?;
        Ok(ReplaceOutcome {
            old_lines: line_count(&old),
            new_lines: line_count(content),
            old_head: head_lines(&old, 5),
            new_head: head_lines(content, 5),
        })
    }

    /// Idempotent line-set union. Creates the file when absent; otherwise
    /// appends each input line not already present (comparison on trimmed,
    /// non-empty lines).
    pub fn ensure_lines(&self, rel: &str, lines: &[String]) -> Result<EnsureOutcome, EditorError> {
        let path = self.resolve(rel)?;
        let wanted: Vec<String> = lines
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        if !path.exists() {
            let mut content = wanted.join("\n");
            if !content.is_empty() {
                content.push('\n');
            }
            self.write_raw(rel, &path, &content)?;
            return Ok(EnsureOutcome {
                created: true,
                added: wanted,
                present: Vec::new(),
            });
        }

        let current = self.read(rel)?;
        let have: BTreeSet<&str> = current.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        let mut added = Vec::new();
        let mut present = Vec::new();
        for line in wanted {
            if have.contains(line.as_str()) {
                present.push(line);
            } else {
                added.push(line);
            }
        }

        if !added.is_empty() {
            self.create_backup(rel)?;
            let mut next = current;
            if !next.is_empty() && !next.ends_with('\n') {
                next.push('\n');
            }
            for line in &added {
                next.push_str(line);
                next.push('\n');
            }
            self.write_raw(rel, &path, &next)?;
        }

        Ok(EnsureOutcome {
            created: false,
            added,
            present,
        })
    }

    /// Literal, non-regex replacement of every occurrence. Zero occurrences
    /// leaves the file untouched.
    pub fn search_replace(&self, rel: &str, search: &str, replace: &str) -> Result<SearchReplaceOutcome, EditorError> {
        let content = self.read(rel)?;
        let occurrences = content.matches(search).count();
        if occurrences == 0 {
            return Ok(SearchReplaceOutcome { occurrences: 0 });
        }
        self.create_backup(rel)?;
        let path = self.resolve(rel)?;
        self.write_raw(rel, &path, &content.replace(search, replace))?;
        Ok(SearchReplaceOutcome { occurrences })
    }

    /// Replace the 1-indexed inclusive range `start..=end` with `new_content`.
    /// `start = line_count + 1` (with `end = line_count`) is a pure append.
    pub fn edit_lines(
        &self,
        rel: &str,
        start: usize,
        end: usize,
        new_content: &str,
    ) -> Result<LineEditOutcome, EditorError> {
        let content = self.read(rel)?;
        let lines = split_keepends(&content);
        let total = lines.len();

        validate_range(start, end, total)?;

        let mut replacement = new_content.to_string();
        if !replacement.is_empty() && !replacement.ends_with('\n') {
            replacement.push('\n');
        }

        // Appending to a file whose last line has no terminator must not glue
        // the new content onto that line.
        let appending = start == total + 1;
        let needs_glue = appending && total > 0 && !content.ends_with('\n') && !replacement.is_empty();
        let mut next: Vec<&str> = Vec::with_capacity(total + 2);
        next.extend_from_slice(&lines[..start - 1]);
        if needs_glue {
            next.push("\n");
        }
        if !replacement.is_empty() {
            next.push(&replacement);
        }
        next.extend_from_slice(&lines[end.min(total)..]);
        let next_content: String = next.concat();

        self.create_backup(rel)?;
        let path = self.resolve(rel)?;
        self.write_raw(rel, &path, &next_content)?;
        Ok(LineEditOutcome {
            old_total: total,
            new_total: line_count(&next_content),
        })
    }

    /// Insert `content` between line `after` and `after + 1`. `after = 0`
    /// prepends, `after = line_count` appends. No existing line is removed or
    /// replaced.
    pub fn insert_lines(&self, rel: &str, after: usize, content: &str) -> Result<LineEditOutcome, EditorError> {
        let current = self.read(rel)?;
        let lines = split_keepends(&current);
        let total = lines.len();

        if after > total {
            return Err(EditorError::InvalidRange(format!(
                "after_line {} is beyond the file ({} lines; use 0..={})",
                after, total, total
            )));
        }

        let mut block = content.to_string();
        if !block.is_empty() && !block.ends_with('\n') {
            block.push('\n');
        }

        // Inserting after the final line of a file without a trailing newline
        // must not glue the new content onto it.
        let needs_glue = after == total && total > 0 && !current.ends_with('\n') && !block.is_empty();
        let mut next: Vec<&str> = Vec::with_capacity(total + 2);
        next.extend_from_slice(&lines[..after]);
        if needs_glue {
            next.push("\n");
        }
        if !block.is_empty() {
            next.push(&block);
        }
        next.extend_from_slice(&lines[after..]);
        let next_content: String = next.concat();

        self.create_backup(rel)?;
        let path = self.resolve(rel)?;
        self.write_raw(rel, &path, &next_content)?;
        Ok(LineEditOutcome {
            old_total: total,
            new_total: line_count(&next_content),
        })
    }

    /// Remove the selected lines. Index-list deletions are applied in
    /// descending order so earlier indices stay valid during removal.
    pub fn delete_lines(&self, rel: &str, spec: DeleteSpec) -> Result<DeleteOutcome, EditorError> {
        let content = self.read(rel)?;
        let lines = split_keepends(&content);
        let total = lines.len();

        let targets: BTreeSet<usize> = match &spec {
            DeleteSpec::Range { start, end } => {
                if *start < 1 || *end < 1 {
                    return Err(EditorError::InvalidRange("line numbers must be >= 1".to_string()));
                }
                if start > end {
                    return Err(EditorError::InvalidRange(format!(
                        "start_line {} is greater than end_line {}",
                        start, end
                    )));
                }
                if *end > total {
                    return Err(EditorError::InvalidRange(format!(
                        "lines {}-{} are beyond the file ({} lines)",
                        start, end, total
                    )));
                }
                (*start - 1..*end).collect()
            }
            DeleteSpec::Indices(indices) => {
                if indices.is_empty() {
                    return Err(EditorError::InvalidIndices("no indices given".to_string()));
                }
                for &idx in indices {
                    if idx >= total {
                        return Err(EditorError::InvalidIndices(format!(
                            "index {} is beyond the file (valid: 0..={})",
                            idx,
                            total.saturating_sub(1)
                        )));
                    }
                }
                indices.iter().copied().collect()
            }
        };

        let mut kept: Vec<&str> = lines.clone();
        for idx in targets.iter().rev() {
            kept.remove(*idx);
        }
        let next_content: String = kept.concat();

        self.create_backup(rel)?;
        let path = self.resolve(rel)?;
        self.write_raw(rel, &path, &next_content)?;
        Ok(DeleteOutcome {
            removed: targets.iter().map(|i| i + 1).collect(),
            remaining: line_count(&next_content),
        })
    }

    /// Apply a batch of edits to one file. All edits are validated against
    /// the pre-batch snapshot, then applied sorted by `start_line` descending
    /// so index shifts from earlier-applied edits cannot invalidate later
    /// ones.
    pub fn apply_edits(&self, rel: &str, edits: &[FileEdit]) -> Result<usize, EditorError> {
        if edits.is_empty() {
            return Err(EditorError::EmptyBatch);
        }

        let content = self.read(rel)?;
        let total = split_keepends(&content).len();
        for (i, edit) in edits.iter().enumerate() {
            validate_range(edit.start_line, edit.end_line, total).map_err(|e| {
                EditorError::InvalidRange(format!("edit {} ({}): {}", i + 1, edit.description, e))
            })?;
        }

        let mut ordered: Vec<&FileEdit> = edits.iter().collect();
        ordered.sort_by(|a, b| b.start_line.cmp(&a.start_line));

        self.create_backup(rel)?;
        let path = self.resolve(rel)?;
        let mut lines: Vec<String> = split_keepends(&content).into_iter().map(String::from).collect();
        for edit in &ordered {
            let mut replacement = edit.new_content.clone();
            if !replacement.is_empty() && !replacement.ends_with('\n') {
                replacement.push('\n');
            }
            let end = edit.end_line.min(lines.len());
            let insert = if replacement.is_empty() {
                Vec::new()
            } else {
                vec![replacement]
            };
            lines.splice(edit.start_line - 1..end, insert);
        }
        self.write_raw(rel, &path, &lines.concat())?;
        Ok(edits.len())
    }

    /// Bounded file listing. `**` patterns recurse; the backup directory is
    /// always excluded.
    pub fn list(&self, pattern: &str) -> Result<Listing, EditorError> {
        let full = self.workspace.join(pattern);
        let full = full.to_string_lossy();
        let paths = glob::glob(&full).map_err(|e| EditorError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut files: Vec<String> = Vec::new();
        for entry in paths.flatten() {
            if !entry.is_file() {
                continue;
            }
            let rel = entry.strip_prefix(&self.workspace).unwrap_or(&entry);
            if rel.components().next().map(|c| c.as_os_str()) == Some(BACKUP_DIR_NAME.as_ref()) {
                continue;
            }
            files.push(rel.to_string_lossy().to_string());
        }
        files.sort();
        let total = files.len();
        files.truncate(LIST_LIMIT);
        Ok(Listing { files, total })
    }

    /// First [`PREVIEW_LINES`] lines plus the total line count.
    pub fn preview(&self, rel: &str) -> Result<Preview, EditorError> {
        let content = self.read(rel)?;
        let total = content.lines().count();
        let lines = content.lines().take(PREVIEW_LINES).map(String::from).collect();
        Ok(Preview { lines, total })
    }

    fn write_raw(&self, rel: &str, path: &Path, content: &str) -> Result<(), EditorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EditorError::Io {
                path: rel.to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| EditorError::Io {
            path: rel.to_string(),
            source: e,
        })
    }
}

/// Split preserving line terminators, like the classic keepends split.
fn split_keepends(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

fn line_count(content: &str) -> usize {
    split_keepends(content).len()
}

fn head_lines(content: &str, n: usize) -> Vec<String> {
    content.lines().take(n).map(String::from).collect()
}

fn validate_range(start: usize, end: usize, total: usize) -> Result<(), EditorError> {
    if start < 1 || end < 1 {
        return Err(EditorError::InvalidRange("line numbers must be >= 1".to_string()));
    }
    if start > total + 1 {
        return Err(EditorError::InvalidRange(format!(
            "start_line {} is beyond the file ({} lines; append with start_line {})",
            start,
            total,
            total + 1
        )));
    }
    if start == total + 1 {
        // Pure append: the replaced range must be empty.
        if end != total {
            return Err(EditorError::InvalidRange(format!(
                "appending at line {} requires end_line {}",
                start, total
            )));
        }
        return Ok(());
    }
    if end < start {
        return Err(EditorError::InvalidRange(format!(
            "end_line {} is before start_line {}",
            end, start
        )));
    }
    if end > total {
        return Err(EditorError::InvalidRange(format!(
            "end_line {} is beyond the file ({} lines)",
            end, total
        )));
    }
    Ok(())
}
