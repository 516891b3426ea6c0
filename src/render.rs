//! Structured Text literals for the version structure.

use chrono::NaiveDateTime;

use crate::git::RepositoryMetadata;
use crate::project::BuildMetadata;

pub const HEADER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_LITERAL_FORMAT: &str = "DT#%Y-%m-%d-%H:%M:%S";

/// Who is writing the file, for the header comment and the Script payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generator {
    pub name: String,
    pub version: String,
}

impl Generator {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Generator { name: name.into(), version: version.into() }
    }
}

/// Single-quoted STRING literal; `$` and `'` are escaped with `$`.
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '$' => out.push_str("$$"),
            '\'' => out.push_str("$'"),
            '\n' => out.push_str("$N"),
            '\r' => out.push_str("$R"),
            '\t' => out.push_str("$T"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub fn date_literal(date: &NaiveDateTime) -> String {
    date.format(DATE_LITERAL_FORMAT).to_string()
}

pub fn header_date(date: &NaiveDateTime) -> String {
    date.format(HEADER_DATE_FORMAT).to_string()
}

/// Members of `Script:=( ... )`.
pub fn script_payload(generator: &Generator) -> String {
    format!(
        "Name:={},Version:={}",
        string_literal(&generator.name),
        string_literal(&generator.version),
    )
}

/// Members of `Git:=( ... )`.
pub fn git_payload(repo: &RepositoryMetadata) -> String {
    format!(
        "URL:={},Branch:={},Tag:={},AdditionalCommits:={},Version:={},Sha1:={},Describe:={},\
         UncommittedChanges:={},ChangeWarning:={},CommitDate:={},CommitAuthorName:={},CommitAuthorEmail:={}",
        string_literal(&repo.remote_url),
        string_literal(&repo.branch),
        string_literal(&repo.tag),
        repo.additional_commits,
        string_literal(&repo.version),
        string_literal(&repo.sha1),
        string_literal(&repo.describe),
        string_literal(&repo.uncommitted_changes),
        u8::from(repo.has_uncommitted_changes),
        date_literal(&repo.commit_date),
        string_literal(&repo.author_name),
        string_literal(&repo.author_email),
    )
}

/// Members of `Project:=( ... )`.
pub fn project_payload(build: &BuildMetadata) -> String {
    format!(
        "ASVersion:={},UserName:={},ProjectName:={},Configuration:={},BuildMode:={},BuildDate:={}",
        string_literal(&build.tool_version),
        string_literal(&build.user_name),
        string_literal(&build.project_name),
        string_literal(&build.configuration),
        string_literal(&build.build_mode),
        date_literal(&build.build_date),
    )
}

/// The whole initializer, `(Script:=(..),Git:=(..),Project:=(..))`.
pub fn composite_literal(
    generator: &Generator,
    repo: &RepositoryMetadata,
    build: &BuildMetadata,
) -> String {
    format!(
        "(Script:=({}),Git:=({}),Project:=({}))",
        script_payload(generator),
        git_payload(repo),
        project_payload(build),
    )
}
