//! Patch the version variable in a shared declarations file such as
//! `Global.var`. The variable must already be declared; it is never created.

use std::io::ErrorKind;
use std::path::Path;

use regex::bytes::Regex;

use crate::git::RepositoryMetadata;
use crate::project::BuildMetadata;
use crate::render::{composite_literal, Generator};
use crate::types::{read_error, write_error, BuildVersionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// The declaration of this variable was rewritten.
    Patched(String),
    NotFound,
}

/// `<ident> : <type_name> [:= <initializer>] ;`, with quoted strings in the
/// initializer allowed to contain `;`. Comments and string literals are
/// alternatives of their own so nothing inside them is taken for the
/// declaration.
fn declaration_pattern(type_name: &str) -> Regex {
    let pattern = format!(
        concat!(
            r#"(?i-u)\(\*(?s:.)*?\*\)|'(?:\$.|[^'$])*'|"(?:\$.|[^"$])*"|"#,
            r#"(?<decl>\b(?<ident>[a-z_][a-z0-9_]*)\s*:\s*{}\b"#,
            r#"(?:\s*:=(?:'(?:\$.|[^'$])*'|"(?:\$.|[^"$])*"|[^;'"])*)?\s*;)"#,
        ),
        regex::escape(type_name)
    );
    Regex::new(&pattern).expect("declaration pattern")
}

/// Rewrite the first declaration of `type_name` in `content` to initialize it
/// with `literal`. Returns the new text and the variable name. Bytes outside
/// the declaration are copied unchanged, whatever their encoding.
pub fn patch_text(content: &[u8], type_name: &str, literal: &str) -> Option<(Vec<u8>, String)> {
    let caps = declaration_pattern(type_name)
        .captures_iter(content)
        .find(|caps| caps.name("decl").is_some())?;
    let whole = caps.name("decl")?;
    let ident = String::from_utf8_lossy(caps.name("ident")?.as_bytes()).into_owned();

    let replacement = format!("{} : {} := {};", ident, type_name, literal);
    let mut out = Vec::with_capacity(content.len() + replacement.len());
    out.extend_from_slice(&content[..whole.start()]);
    out.extend_from_slice(replacement.as_bytes());
    out.extend_from_slice(&content[whole.end()..]);
    Some((out, ident))
}

/// Patch the variable declared with `type_name` in the file at `path`.
///
/// A missing file or a file without such a declaration is left alone.
pub fn patch(
    path: &Path,
    type_name: &str,
    generator: &Generator,
    repo: &RepositoryMetadata,
    build: &BuildMetadata,
) -> Result<Patch, BuildVersionError> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("{} does not exist", path.display());
            return Ok(Patch::NotFound);
        }
        Err(e) => return Err(read_error(path)(e)),
    };

    let literal = composite_literal(generator, repo, build);
    let Some((text, ident)) = patch_text(&content, type_name, &literal) else {
        log::debug!("no variable of type {} in {}", type_name, path.display());
        return Ok(Patch::NotFound);
    };

    std::fs::write(path, text).map_err(write_error(path))?;
    log::info!("initialized {} in {}", ident, path.display());
    Ok(Patch::Patched(ident))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::default_date;
    use tempfile::TempDir;

    const TYPE: &str = "BuildVersionType";

    fn patched(content: &str, literal: &str) -> Option<(String, String)> {
        let (out, ident) = patch_text(content.as_bytes(), TYPE, literal)?;
        Some((String::from_utf8(out).unwrap(), ident))
    }

    #[test]
    fn patches_bare_declaration() {
        let content = "VAR\n\tgCounter : UDINT;\n\tgBuildVersion : BuildVersionType;\n\tgOther : BOOL;\nEND_VAR\n";
        let (out, ident) = patched(content, "(X:=1)").unwrap();
        assert_eq!(ident, "gBuildVersion");
        assert_eq!(
            out,
            "VAR\n\tgCounter : UDINT;\n\tgBuildVersion : BuildVersionType := (X:=1);\n\tgOther : BOOL;\nEND_VAR\n"
        );
    }

    #[test]
    fn replaces_existing_initializer() {
        let content = "VAR\n\tgVer:BuildVersionType:=(Git:=(URL:='a;b', Branch:='it$'s')) ; (*keep*)\nEND_VAR\n";
        let (out, ident) = patched(content, "(X:=2)").unwrap();
        assert_eq!(ident, "gVer");
        assert_eq!(out, "VAR\n\tgVer : BuildVersionType := (X:=2); (*keep*)\nEND_VAR\n");
    }

    #[test]
    fn only_first_declaration_is_patched() {
        let content = "a : BuildVersionType;\nb : BuildVersionType;\n";
        let (out, ident) = patched(content, "(X:=3)").unwrap();
        assert_eq!(ident, "a");
        assert_eq!(out, "a : BuildVersionType := (X:=3);\nb : BuildVersionType;\n");
    }

    #[test]
    fn declarations_in_comments_and_strings_are_skipped() {
        let content = "VAR\n\t(* gOld : BuildVersionType; retired *)\n\
                       \tgNote : STRING[40] := 'x : BuildVersionType;';\n\
                       \tgBuildVersion : BuildVersionType;\nEND_VAR\n";
        let (out, ident) = patched(content, "(X:=1)").unwrap();
        assert_eq!(ident, "gBuildVersion");
        assert_eq!(
            out,
            "VAR\n\t(* gOld : BuildVersionType; retired *)\n\
             \tgNote : STRING[40] := 'x : BuildVersionType;';\n\
             \tgBuildVersion : BuildVersionType := (X:=1);\nEND_VAR\n"
        );
        assert!(patched("(* a : BuildVersionType; *)\n", "()").is_none());
    }

    #[test]
    fn ignores_other_types() {
        assert!(patched("v : BuildVersionTypeV2;\nw : INT;\n", "()").is_none());
        assert!(patched("", "()").is_none());
    }

    #[test]
    fn missing_file_is_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Global.var");
        let outcome = patch(
            &path,
            TYPE,
            &Generator::new("BuildVersion", "0.1.0"),
            &RepositoryMetadata::unavailable(),
            &BuildMetadata::unknown(default_date()),
        )
        .unwrap();
        assert_eq!(outcome, Patch::NotFound);
        assert!(!path.exists());
    }

    #[test]
    fn patches_file_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Global.var");
        std::fs::write(&path, "VAR\n\tgVersion : BuildVersionType;\nEND_VAR\n").unwrap();
        let generator = Generator::new("BuildVersion", "0.1.0");
        let repo = RepositoryMetadata::unavailable();
        let build = BuildMetadata::unknown(default_date());
        let outcome = patch(&path, TYPE, &generator, &repo, &build).unwrap();
        assert_eq!(outcome, Patch::Patched("gVersion".into()));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            format!(
                "VAR\n\tgVersion : BuildVersionType := {};\nEND_VAR\n",
                composite_literal(&generator, &repo, &build)
            )
        );
    }

    #[test]
    fn latin1_file_is_patched_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Global.var");
        // "Zähler" in Windows-1252
        let original: &[u8] = b"VAR\n\tgCount : UDINT; (*Z\xE4hler*)\n\tgVer : BuildVersionType;\nEND_VAR\n";
        std::fs::write(&path, original).unwrap();
        let generator = Generator::new("BuildVersion", "0.1.0");
        let repo = RepositoryMetadata::unavailable();
        let build = BuildMetadata::unknown(default_date());

        let outcome = patch(&path, TYPE, &generator, &repo, &build).unwrap();
        assert_eq!(outcome, Patch::Patched("gVer".into()));

        let mut expected = b"VAR\n\tgCount : UDINT; (*Z\xE4hler*)\n\tgVer : BuildVersionType := "
            .to_vec();
        expected.extend_from_slice(composite_literal(&generator, &repo, &build).as_bytes());
        expected.extend_from_slice(b";\nEND_VAR\n");
        assert_eq!(std::fs::read(&path).unwrap(), expected);
    }
}
