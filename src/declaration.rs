//! The generated declaration file.
//!
//! A generated file looks like
//!
//! ```text
//! (*This file was automatically generated by <generator> on <date>.*)
//! (*Do not modify the contents of this file.*)
//! VAR
//!     BuildVersion : BuildVersionType := (Script:=(..),Git:=(..),Project:=(..));
//! END_VAR
//! ```
//!
//! [`match_block`] recognizes that shape anywhere in a file and returns the
//! byte ranges of the four parts that change between runs. Updating a file
//! splices new text into exactly those ranges, so whatever else the file
//! holds survives byte for byte.

use std::io::ErrorKind;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::bytes::Regex;

use crate::git::RepositoryMetadata;
use crate::project::BuildMetadata;
use crate::render::{composite_literal, git_payload, header_date, project_payload, Generator};
use crate::types::{read_error, write_error, BuildVersionError};

/// Name of the variable declared in a freshly created file.
pub const VARIABLE_NAME: &str = "BuildVersion";

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?-u)\(\*This file was automatically generated by ",
        r"(?<generator>[^\r\n]+?) on (?<date>[^\r\n]*?)\.\*\)",
    ))
    .expect("header pattern")
});

/// Byte ranges of the mutable parts of a generated block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBlock {
    pub generator: Range<usize>,
    pub date: Range<usize>,
    /// Inside the parentheses of `Git:=( ... )`.
    pub git: Range<usize>,
    /// Inside the parentheses of `Project:=( ... )`.
    pub project: Range<usize>,
}

/// Locate a generated block: the header comment followed by a declaration of
/// `type_name` whose initializer has exactly the members `Script`, `Git` and
/// `Project`, in that order.
///
/// Works on raw bytes, so files in a legacy 8-bit encoding match as long as
/// the block itself is ASCII.
pub fn match_block(content: &[u8], type_name: &str) -> Option<GeneratedBlock> {
    let header = HEADER.captures(content)?;
    let generator = header.name("generator")?.range();
    let date = header.name("date")?.range();
    let rest = header.get(0)?.end();

    // comments are consumed whole so a declaration inside one never matches
    let decl = Regex::new(&format!(
        r"(?i-u)\(\*(?s:.)*?\*\)|(?<init>\b[a-z_][a-z0-9_]*\s*:\s*{}\s*:=\s*)",
        regex::escape(type_name)
    ))
    .ok()?;
    let init = decl
        .captures_iter(&content[rest..])
        .find_map(|caps| caps.name("init"))?;

    let mut cur = Cursor::new(content, rest + init.end());
    cur.eat(b"(")?;
    cur.member(b"Script")?;
    cur.eat(b",")?;
    let git = cur.member(b"Git")?;
    cur.eat(b",")?;
    let project = cur.member(b"Project")?;
    cur.eat(b")")?;

    Some(GeneratedBlock { generator, date, git, project })
}

struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a [u8], pos: usize) -> Self {
        Cursor { src, pos }
    }

    fn rest(&self) -> &'a [u8] {
        &self.src[self.pos..]
    }

    /// Whitespace and `(* ... *)` comments.
    fn skip_trivia(&mut self) {
        loop {
            let blank = self.rest().iter().take_while(|b| b.is_ascii_whitespace()).count();
            self.pos += blank;
            if !self.rest().starts_with(b"(*") {
                return;
            }
            match self.rest().windows(2).position(|w| w == b"*)") {
                Some(end) => self.pos += end + 2,
                None => return,
            }
        }
    }

    /// Consume `token`, ignoring ASCII case as identifiers do.
    fn eat(&mut self, token: &[u8]) -> Option<()> {
        self.skip_trivia();
        let head = self.rest().get(..token.len())?;
        if !head.eq_ignore_ascii_case(token) {
            return None;
        }
        self.pos += token.len();
        Some(())
    }

    /// `<name> := ( ... )`, returning the range inside the parentheses.
    fn member(&mut self, name: &[u8]) -> Option<Range<usize>> {
        self.eat(name)?;
        // reject `Gitx` when asked for `Git`
        if matches!(self.rest().first(), Some(b) if b.is_ascii_alphanumeric() || *b == b'_') {
            return None;
        }
        self.eat(b":=")?;
        self.group()
    }

    /// A balanced parenthesized group. Quoted strings may contain anything.
    fn group(&mut self) -> Option<Range<usize>> {
        self.eat(b"(")?;
        let start = self.pos;
        let bytes = self.src;
        let mut depth = 1usize;
        let mut quote: Option<u8> = None;
        let mut i = start;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(_) if b == b'$' => i += 1,
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'\'' | b'"' => quote = Some(b),
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            self.pos = i + 1;
                            return Some(start..i);
                        }
                    }
                    _ => {}
                },
            }
            i += 1;
        }
        None
    }
}

/// What [`synthesize`] did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthesis {
    /// An existing block was updated in place.
    Updated,
    /// The file was missing or unrecognized and has been rewritten.
    Created,
}

/// The canonical file written when no block can be matched.
pub fn render_template(
    type_name: &str,
    generator: &Generator,
    generated_at: &NaiveDateTime,
    repo: &RepositoryMetadata,
    build: &BuildMetadata,
) -> String {
    format!(
        "(*This file was automatically generated by {} on {}.*)\n\
         (*Do not modify the contents of this file.*)\n\
         VAR\n\
         \t{} : {} := {};\n\
         END_VAR\n",
        generator.name,
        header_date(generated_at),
        VARIABLE_NAME,
        type_name,
        composite_literal(generator, repo, build),
    )
}

/// Replace the four mutable parts of `block` in `content`.
pub fn update_block(
    content: &[u8],
    block: &GeneratedBlock,
    generator: &Generator,
    generated_at: &NaiveDateTime,
    repo: &RepositoryMetadata,
    build: &BuildMetadata,
) -> Vec<u8> {
    let replacements = [
        (&block.generator, generator.name.clone()),
        (&block.date, header_date(generated_at)),
        (&block.git, git_payload(repo)),
        (&block.project, project_payload(build)),
    ];
    let mut out = Vec::with_capacity(content.len() + 64);
    let mut last = 0;
    for (range, text) in replacements {
        out.extend_from_slice(&content[last..range.start]);
        out.extend_from_slice(text.as_bytes());
        last = range.end;
    }
    out.extend_from_slice(&content[last..]);
    out
}

/// Merge the metadata into the declaration file at `path`.
pub fn synthesize(
    path: &Path,
    type_name: &str,
    generator: &Generator,
    generated_at: &NaiveDateTime,
    repo: &RepositoryMetadata,
    build: &BuildMetadata,
) -> Result<Synthesis, BuildVersionError> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(read_error(path)(e)),
    };

    let (text, outcome) = match match_block(&content, type_name) {
        Some(block) => {
            log::debug!("generated block found in {}", path.display());
            let text = update_block(&content, &block, generator, generated_at, repo, build);
            (text, Synthesis::Updated)
        }
        None => {
            if !content.is_empty() {
                log::warn!("{} has no recognizable generated block, rewriting it", path.display());
            }
            let text = render_template(type_name, generator, generated_at, repo, build);
            (text.into_bytes(), Synthesis::Created)
        }
    };

    std::fs::write(path, text).map_err(write_error(path))?;
    let verb = match outcome {
        Synthesis::Updated => "updated",
        Synthesis::Created => "created",
    };
    log::info!("{} {}", verb, path.display());
    Ok(outcome)
}
