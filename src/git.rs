//! Repository facts for the generated declaration.
//!
//! Every query has its own fallback. A failed query never aborts collection;
//! it leaves its field unset in [`RepositoryMetadataBuilder`], which fills in
//! the sentinel and applies the length limits when the record is built.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use crate::command::CommandRunner;
use crate::utils::truncate_utf8;

pub const UNKNOWN: &str = "Unknown";
pub const NONE: &str = "None";

pub const MAX_URL_LEN: usize = 255;
pub const MAX_FIELD_LEN: usize = 80;

const GIT_VERSION: &[&str] = &["--version"];
const GIT_LOCAL_CONFIG: &[&str] = &["config", "--local", "--list"];
const GIT_REMOTE_URL: &[&str] = &["config", "--get", "remote.origin.url"];
const GIT_BRANCH: &[&str] = &["branch", "--show-current"];
const GIT_TAG: &[&str] = &["describe", "--tags", "--abbrev=0"];
const GIT_DESCRIBE: &[&str] = &["describe", "--tags", "--long"];
const GIT_SHA: &[&str] = &["rev-parse", "HEAD"];
const GIT_SHORTSTAT: &[&str] = &["diff", "HEAD", "--shortstat"];
const GIT_COMMIT_DATE: &[&str] = &["log", "-1", "--format=%cd", "--date=iso"];
const GIT_AUTHOR: &[&str] = &["log", "-1", "--format=%an%n%ae"];

const ISO_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Stand-in for an unknown commit date: 1970-01-01 00:00:00.
pub fn default_date() -> NaiveDateTime {
    NaiveDateTime::default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    pub remote_url: String,
    pub branch: String,
    pub tag: String,
    pub additional_commits: u32,
    pub version: String,
    pub sha1: String,
    pub describe: String,
    pub uncommitted_changes: String,
    pub has_uncommitted_changes: bool,
    pub commit_date: NaiveDateTime,
    pub author_name: String,
    pub author_email: String,
}

impl RepositoryMetadata {
    /// Record used when repository facts cannot be determined at all.
    pub fn unavailable() -> Self {
        RepositoryMetadataBuilder::default().build()
    }
}

/// Whether collection got past the environment checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepositoryStatus {
    Available,
    ToolMissing,
    NoRepository,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub metadata: RepositoryMetadata,
    pub status: RepositoryStatus,
    pub warnings: Vec<FieldWarning>,
}

/// Accumulates whatever the queries managed to find.
#[derive(Debug, Default)]
pub struct RepositoryMetadataBuilder {
    remote_url: Option<String>,
    branch: Option<String>,
    tag: Option<String>,
    additional_commits: Option<u32>,
    sha1: Option<String>,
    describe: Option<String>,
    /// `Some(None)` is a clean tree, `Some(Some(stat))` a dirty one.
    changes: Option<Option<String>>,
    commit_date: Option<NaiveDateTime>,
    author: Option<(String, String)>,
    warnings: Vec<FieldWarning>,
}

impl RepositoryMetadataBuilder {
    pub fn remote_url(&mut self, url: String) -> &mut Self {
        self.remote_url = Some(url);
        self
    }

    pub fn branch(&mut self, branch: String) -> &mut Self {
        self.branch = Some(branch);
        self
    }

    pub fn tag(&mut self, tag: String) -> &mut Self {
        self.tag = Some(tag);
        self
    }

    pub fn describe(&mut self, describe: String, additional_commits: Option<u32>) -> &mut Self {
        self.describe = Some(describe);
        self.additional_commits = additional_commits;
        self
    }

    pub fn sha1(&mut self, sha1: String) -> &mut Self {
        self.sha1 = Some(sha1);
        self
    }

    pub fn clean(&mut self) -> &mut Self {
        self.changes = Some(None);
        self
    }

    pub fn dirty(&mut self, shortstat: String) -> &mut Self {
        self.changes = Some(Some(shortstat));
        self
    }

    pub fn commit_date(&mut self, date: NaiveDateTime) -> &mut Self {
        self.commit_date = Some(date);
        self
    }

    pub fn author(&mut self, name: String, email: String) -> &mut Self {
        self.author = Some((name, email));
        self
    }

    pub fn warn(&mut self, field: &'static str, message: impl Into<String>) -> &mut Self {
        let warning = FieldWarning { field, message: message.into() };
        log::warn!("{}", warning);
        self.warnings.push(warning);
        self
    }

    pub fn warnings(&self) -> &[FieldWarning] {
        &self.warnings
    }

    /// Substitute sentinels for everything missing, then truncate.
    pub fn build(self) -> RepositoryMetadata {
        let text = |v: Option<String>, sentinel: &str, max: usize| {
            let v = v.unwrap_or_else(|| sentinel.to_string());
            truncate_utf8(&v, max).to_string()
        };

        let additional_commits = match &self.tag {
            Some(_) => self.additional_commits.unwrap_or(0),
            None => 0,
        };
        let version = match &self.tag {
            Some(tag) if additional_commits > 0 => {
                // shorten the tag, not the commit count
                let suffix = format!("-{}", additional_commits);
                format!("{}{}", truncate_utf8(tag, MAX_FIELD_LEN - suffix.len()), suffix)
            }
            Some(tag) => tag.clone(),
            None => NONE.to_string(),
        };
        let (has_uncommitted_changes, uncommitted_changes) = match self.changes {
            Some(Some(stat)) => (true, stat),
            Some(None) => (false, NONE.to_string()),
            None => (false, UNKNOWN.to_string()),
        };
        let (author_name, author_email) = match self.author {
            Some((name, email)) => (Some(name), Some(email)),
            None => (None, None),
        };

        RepositoryMetadata {
            remote_url: text(self.remote_url, UNKNOWN, MAX_URL_LEN),
            branch: text(self.branch, UNKNOWN, MAX_FIELD_LEN),
            tag: text(self.tag, NONE, MAX_FIELD_LEN),
            additional_commits,
            version: text(Some(version), NONE, MAX_FIELD_LEN),
            sha1: text(self.sha1, UNKNOWN, MAX_FIELD_LEN),
            describe: text(self.describe, NONE, MAX_FIELD_LEN),
            uncommitted_changes: text(Some(uncommitted_changes), NONE, MAX_FIELD_LEN),
            has_uncommitted_changes,
            commit_date: self.commit_date.unwrap_or_else(default_date),
            author_name: text(author_name, UNKNOWN, MAX_FIELD_LEN),
            author_email: text(author_email, UNKNOWN, MAX_FIELD_LEN),
        }
    }
}

/// Number of commits after `tag` encoded in a long describe string.
///
/// `git describe --tags --long` prints `<tag>-<count>-g<hash>`. With the tag
/// stripped the rest must split on `-` into exactly three segments (empty,
/// count, hash); anything else yields `None`. Tags containing `-` are fine
/// since the tag is removed as a prefix before splitting.
pub fn commits_since_tag(describe: &str, tag: &str) -> Option<u32> {
    let suffix = describe.strip_prefix(tag)?;
    let segments: Vec<&str> = suffix.split('-').collect();
    if segments.len() != 3 {
        return None;
    }
    segments[1].parse().ok()
}

/// Parse `git log --date=iso` output, keeping the wall-clock time of the
/// commit's own offset.
pub fn parse_commit_date(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_str(s.trim(), ISO_DATE_FORMAT)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Run the fixed query sequence against the repository at `dir`.
pub fn collect<R: CommandRunner + ?Sized>(runner: &R, dir: &Path) -> Collection {
    let git = |args: &[&str]| runner.run(dir, args);
    let mut b = RepositoryMetadataBuilder::default();

    if !git(GIT_VERSION).ok {
        b.warn("repository", "git is not available");
        return finish(b, RepositoryStatus::ToolMissing);
    }
    if !git(GIT_LOCAL_CONFIG).ok {
        b.warn("repository", format!("{} is not inside a git repository", dir.display()));
        return finish(b, RepositoryStatus::NoRepository);
    }

    match git(GIT_REMOTE_URL).non_empty() {
        Some(url) => b.remote_url(url),
        None => b.warn("remote URL", "no origin remote configured, using Unknown"),
    };

    match git(GIT_BRANCH).non_empty() {
        Some(branch) => b.branch(branch),
        None => b.warn("branch", "HEAD is detached, using Unknown"),
    };

    match git(GIT_TAG).non_empty() {
        Some(tag) => {
            match git(GIT_DESCRIBE).non_empty() {
                Some(describe) => {
                    let commits = commits_since_tag(&describe, &tag);
                    if commits.is_none() {
                        let message =
                            format!("unexpected describe output {:?} for tag {:?}, using 0", describe, tag);
                        b.warn("additional commits", message);
                    }
                    b.describe(describe, commits);
                }
                None => {
                    b.warn("describe", "describe failed, using None");
                }
            }
            b.tag(tag);
        }
        None => {
            b.warn("tag", "no tag reachable from HEAD, using None");
        }
    }

    match git(GIT_SHA).non_empty() {
        Some(sha) => b.sha1(sha),
        None => b.warn("sha1", "commit hash unavailable, using Unknown"),
    };

    let stat = git(GIT_SHORTSTAT);
    if !stat.ok {
        b.warn("uncommitted changes", "diff failed, using Unknown");
    } else if stat.stdout.is_empty() {
        b.clean();
    } else {
        log::info!("uncommitted changes: {}", stat.stdout);
        b.dirty(stat.stdout);
    }

    match git(GIT_COMMIT_DATE).non_empty() {
        Some(raw) => match parse_commit_date(&raw) {
            Some(date) => b.commit_date(date),
            None => b.warn("commit date", format!("cannot parse {:?}, using default date", raw)),
        },
        None => b.warn("commit date", "commit date unavailable, using default date"),
    };

    let author = git(GIT_AUTHOR).non_empty().and_then(|out| {
        let mut lines = out.lines().map(str::trim);
        match (lines.next(), lines.next()) {
            (Some(name), Some(email)) if !name.is_empty() && !email.is_empty() => {
                Some((name.to_string(), email.to_string()))
            }
            _ => None,
        }
    });
    match author {
        Some((name, email)) => b.author(name, email),
        None => b.warn("commit author", "author name and email unavailable, using Unknown"),
    };

    finish(b, RepositoryStatus::Available)
}

fn finish(b: RepositoryMetadataBuilder, status: RepositoryStatus) -> Collection {
    let warnings = b.warnings().to_vec();
    Collection { metadata: b.build(), status, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::scripted::ScriptedRunner;

    fn repo() -> ScriptedRunner {
        ScriptedRunner::new()
            .ok("--version", "git version 2.43.0")
            .ok("config --local --list", "core.bare=false")
            .ok("config --get remote.origin.url", "https://example.com/r.git")
            .ok("branch --show-current", "main")
            .ok("describe --tags --abbrev=0", "1.2.0")
            .ok("describe --tags --long", "1.2.0-3-g1a2b3c4")
            .ok("rev-parse HEAD", "1a2b3c4d5e6f70819a2b3c4d5e6f70819a2b3c4d")
            .ok("diff HEAD --shortstat", "")
            .ok("log -1 --format=%cd --date=iso", "2024-03-05 14:07:09 +0100")
            .ok("log -1 --format=%an%n%ae", "Ada Lovelace\nada@example.com")
    }

    #[test]
    fn tagged_clean_repository() {
        let c = collect(&repo(), Path::new("."));
        let m = &c.metadata;
        assert_eq!(c.status, RepositoryStatus::Available);
        assert!(c.warnings.is_empty(), "{:?}", c.warnings);
        assert_eq!(m.remote_url, "https://example.com/r.git");
        assert_eq!(m.branch, "main");
        assert_eq!(m.tag, "1.2.0");
        assert_eq!(m.additional_commits, 3);
        assert_eq!(m.version, "1.2.0-3");
        assert_eq!(m.describe, "1.2.0-3-g1a2b3c4");
        assert!(!m.has_uncommitted_changes);
        assert_eq!(m.uncommitted_changes, NONE);
        assert_eq!(m.commit_date.to_string(), "2024-03-05 14:07:09");
        assert_eq!(m.author_name, "Ada Lovelace");
        assert_eq!(m.author_email, "ada@example.com");
    }

    #[test]
    fn missing_tool_aborts_with_sentinels() {
        let runner = ScriptedRunner::new().fail("--version");
        let c = collect(&runner, Path::new("."));
        assert_eq!(c.status, RepositoryStatus::ToolMissing);
        assert_eq!(c.metadata, RepositoryMetadata::unavailable());
        assert_eq!(runner.calls.borrow().len(), 1);
        assert_eq!(c.metadata.remote_url, UNKNOWN);
        assert_eq!(c.metadata.tag, NONE);
        assert_eq!(c.metadata.version, NONE);
        assert_eq!(c.metadata.additional_commits, 0);
        assert_eq!(c.metadata.commit_date, default_date());
    }

    #[test]
    fn outside_repository_aborts_after_presence_check() {
        let runner = ScriptedRunner::new()
            .ok("--version", "git version 2.43.0")
            .fail("config --local --list");
        let c = collect(&runner, Path::new("."));
        assert_eq!(c.status, RepositoryStatus::NoRepository);
        assert_eq!(c.metadata, RepositoryMetadata::unavailable());
        assert_eq!(runner.calls.borrow().len(), 2);
    }

    #[test]
    fn untagged_repository_uses_none() {
        let runner = repo().fail("describe --tags --abbrev=0");
        let c = collect(&runner, Path::new("."));
        assert_eq!(c.metadata.tag, NONE);
        assert_eq!(c.metadata.describe, NONE);
        assert_eq!(c.metadata.version, NONE);
        assert_eq!(c.metadata.additional_commits, 0);
        assert!(c.warnings.iter().any(|w| w.field == "tag"));
        assert!(!runner.calls.borrow().iter().any(|c| c == "describe --tags --long"));
    }

    #[test]
    fn tag_on_head_has_bare_version() {
        let runner = repo().ok("describe --tags --long", "1.2.0-0-g1a2b3c4");
        let m = collect(&runner, Path::new(".")).metadata;
        assert_eq!(m.additional_commits, 0);
        assert_eq!(m.version, "1.2.0");
    }

    #[test]
    fn hyphenated_tag_is_parsed() {
        let runner = repo()
            .ok("describe --tags --abbrev=0", "v2.0-rc-1")
            .ok("describe --tags --long", "v2.0-rc-1-12-gdeadbee");
        let m = collect(&runner, Path::new(".")).metadata;
        assert_eq!(m.additional_commits, 12);
        assert_eq!(m.version, "v2.0-rc-1-12");
    }

    #[test]
    fn malformed_describe_falls_back_to_tag() {
        let runner = repo().ok("describe --tags --long", "1.2.0-3-g1a2b3c4-dirty");
        let c = collect(&runner, Path::new("."));
        assert_eq!(c.metadata.additional_commits, 0);
        assert_eq!(c.metadata.version, "1.2.0");
        assert_eq!(c.metadata.describe, "1.2.0-3-g1a2b3c4-dirty");
        assert!(c.warnings.iter().any(|w| w.field == "additional commits"));
    }

    #[test]
    fn commits_since_tag_edge_cases() {
        assert_eq!(commits_since_tag("1.0-5-gabc", "1.0"), Some(5));
        assert_eq!(commits_since_tag("1.0-x-gabc", "1.0"), None);
        assert_eq!(commits_since_tag("2.0-5-gabc", "1.0"), None);
        assert_eq!(commits_since_tag("1.0", "1.0"), None);
        assert_eq!(commits_since_tag("1.0-5", "1.0"), None);
    }

    #[test]
    fn detached_head_and_missing_remote() {
        let runner = repo()
            .ok("branch --show-current", "")
            .fail("config --get remote.origin.url");
        let c = collect(&runner, Path::new("."));
        assert_eq!(c.metadata.branch, UNKNOWN);
        assert_eq!(c.metadata.remote_url, UNKNOWN);
        let fields: Vec<_> = c.warnings.iter().map(|w| w.field).collect();
        assert_eq!(fields, vec!["remote URL", "branch"]);
    }

    #[test]
    fn dirty_tree_is_flagged_and_truncated() {
        let stat = format!(" 3 files changed, 10 insertions(+), 2 deletions(-) {}", "x".repeat(100));
        let runner = repo().ok("diff HEAD --shortstat", &stat);
        let m = collect(&runner, Path::new(".")).metadata;
        assert!(m.has_uncommitted_changes);
        assert!(m.uncommitted_changes.starts_with("3 files changed"));
        assert_eq!(m.uncommitted_changes.len(), MAX_FIELD_LEN);
    }

    #[test]
    fn author_fails_as_a_unit() {
        let runner = repo().ok("log -1 --format=%an%n%ae", "Ada Lovelace");
        let m = collect(&runner, Path::new(".")).metadata;
        assert_eq!(m.author_name, UNKNOWN);
        assert_eq!(m.author_email, UNKNOWN);
    }

    #[test]
    fn unparseable_commit_date_uses_default() {
        let runner = repo().ok("log -1 --format=%cd --date=iso", "yesterday-ish");
        let c = collect(&runner, Path::new("."));
        assert_eq!(c.metadata.commit_date, default_date());
        assert!(c.warnings.iter().any(|w| w.field == "commit date"));
    }

    #[test]
    fn long_fields_respect_limits() {
        let url = format!("https://example.com/{}.git", "ü".repeat(200));
        let runner = repo()
            .ok("config --get remote.origin.url", &url)
            .ok("branch --show-current", &"feature/".repeat(20));
        let m = collect(&runner, Path::new(".")).metadata;
        assert!(m.remote_url.len() <= MAX_URL_LEN);
        assert!(url.starts_with(&m.remote_url));
        assert_eq!(m.branch.len(), MAX_FIELD_LEN);
    }

    #[test]
    fn long_tag_keeps_commit_count_in_version() {
        let tag = format!("release/{}", "x".repeat(75));
        let runner = repo()
            .ok("describe --tags --abbrev=0", &tag)
            .ok("describe --tags --long", &format!("{}-12-gabc1234", tag));
        let m = collect(&runner, Path::new(".")).metadata;
        assert_eq!(m.additional_commits, 12);
        assert_eq!(m.tag.len(), MAX_FIELD_LEN);
        assert_eq!(m.version.len(), MAX_FIELD_LEN);
        assert!(m.version.ends_with("x-12"));
        assert!(tag.starts_with(m.version.trim_end_matches("-12")));
    }
}
