//! Recursion-guarded script expansion.
//!
//! A script file is a sequence of instruction lines with two special forms:
//! lines starting with `;` are comments, and lines starting with `:` supply
//! one canned answer for a later interactive prompt (a `:` line of length
//! two or less supplies an explicit empty answer). Everything else,
//! trimmed, is a candidate instruction.
//!
//! Nested `execute_script` lines are expanded eagerly, depth-first, while
//! the current script's path is still on the [`CallStackGuard`]. The guard
//! is scoped to one top-level expansion and passed down explicitly — never
//! process-global — so concurrent requests cannot trample each other, and a
//! sibling script invoked twice in sequence does not spuriously collide.
//! Direct or indirect self-reentry fails the whole expansion before any
//! instruction from it executes.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProtocolError, Result};
use crate::protocol::instruction::split_quoted;

/// Name of the command that expands a script file.
pub const SCRIPT_COMMAND: &str = "execute_script";

/// Script paths active in one top-level expansion.
#[derive(Debug, Default)]
pub struct CallStackGuard {
    active: Vec<PathBuf>,
}

impl CallStackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.active.iter().any(|p| p == path)
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    fn push(&mut self, path: PathBuf) {
        self.active.push(path);
    }

    fn pop(&mut self) {
        self.active.pop();
    }

    /// The active paths as text, for the recursion failure message.
    pub fn render(&self) -> String {
        let mut out = String::from("[");
        for (i, path) in self.active.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}", path.display());
        }
        out.push(']');
        out
    }
}

/// Result of expanding one script: the flattened instruction sequence and
/// the canned answers collected for subsequent prompts.
#[derive(Debug, Default)]
pub struct ScriptExpansion {
    pub instructions: Vec<String>,
    pub prompts: Vec<Option<String>>,
}

/// Expand the script at `path` into an ordered instruction sequence.
///
/// The resolved path is pushed onto the guard for the duration of its own
/// body — including nested expansions — and popped on every exit, success
/// or failure.
pub fn expand(path: &Path, guard: &mut CallStackGuard) -> Result<ScriptExpansion> {
    let resolved = resolve(path);
    if guard.contains(&resolved) {
        return Err(ProtocolError::RecursionDetected(guard.render()));
    }

    guard.push(resolved.clone());
    let result = expand_body(&resolved, guard);
    guard.pop();
    result
}

fn expand_body(path: &Path, guard: &mut CallStackGuard) -> Result<ScriptExpansion> {
    let text = fs::read_to_string(path)?;
    let mut expansion = ScriptExpansion::default();

    for line in text.lines() {
        if line.starts_with(';') {
            continue;
        }
        if line.starts_with(':') {
            if line.chars().count() <= 2 {
                expansion.prompts.push(None);
            } else {
                expansion.prompts.push(Some(line.chars().skip(2).collect()));
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tokens = split_quoted(trimmed);
        if tokens.first().map(String::as_str) == Some(SCRIPT_COMMAND) {
            let Some(target_raw) = tokens.get(1) else {
                // Malformed invocation; let the handler report it.
                expansion.instructions.push(trimmed.to_string());
                continue;
            };

            let target = resolve(Path::new(target_raw.trim_matches('"')));
            if guard.contains(&target) {
                return Err(ProtocolError::RecursionDetected(guard.render()));
            }

            let nested = expand(&target, guard)?;
            expansion.instructions.extend(nested.instructions);
            expansion.prompts.extend(nested.prompts);
            continue;
        }

        expansion.instructions.push(trimmed.to_string());
    }

    Ok(expansion)
}

/// Textual path resolution: absolutize without touching the filesystem, so
/// two spellings of the same script compare equal on the guard.
fn resolve(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn script(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp script");
        file.write_all(contents.as_bytes()).expect("write script");
        file
    }

    #[test]
    fn comments_prompts_and_blanks_are_not_instructions() {
        let file = script("; a comment\n: canned answer\n:\n\n  info  \nshow\n");
        let mut guard = CallStackGuard::new();
        let expansion = expand(file.path(), &mut guard).unwrap();

        assert_eq!(expansion.instructions, vec!["info", "show"]);
        assert_eq!(
            expansion.prompts,
            vec![Some("canned answer".to_string()), None]
        );
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn self_invocation_is_detected() {
        let mut file = NamedTempFile::new().expect("temp script");
        let body = format!("info\nexecute_script {}\n", file.path().display());
        file.write_all(body.as_bytes()).expect("write script");

        let mut guard = CallStackGuard::new();
        let err = expand(file.path(), &mut guard).unwrap_err();
        assert!(matches!(err, ProtocolError::RecursionDetected(_)));
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn indirect_recursion_is_detected() {
        let mut a = NamedTempFile::new().expect("script a");
        let mut b = NamedTempFile::new().expect("script b");
        a.write_all(format!("execute_script {}\n", b.path().display()).as_bytes())
            .expect("write a");
        b.write_all(format!("execute_script {}\n", a.path().display()).as_bytes())
            .expect("write b");

        let mut guard = CallStackGuard::new();
        let err = expand(a.path(), &mut guard).unwrap_err();
        assert!(matches!(err, ProtocolError::RecursionDetected(_)));
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn sibling_scripts_do_not_collide() {
        let inner = script("show\n");
        let outer_body = format!(
            "execute_script {p}\nexecute_script {p}\n",
            p = inner.path().display()
        );
        let outer = script(&outer_body);

        let mut guard = CallStackGuard::new();
        let expansion = expand(outer.path(), &mut guard).unwrap();
        assert_eq!(expansion.instructions, vec!["show", "show"]);
    }

    #[test]
    fn nested_scripts_flatten_in_order() {
        let inner = script("print_ascending\n");
        let outer_body = format!("info\nexecute_script {}\nshow\n", inner.path().display());
        let outer = script(&outer_body);

        let mut guard = CallStackGuard::new();
        let expansion = expand(outer.path(), &mut guard).unwrap();
        assert_eq!(expansion.instructions, vec!["info", "print_ascending", "show"]);
    }

    #[test]
    fn missing_script_surfaces_io_error() {
        let mut guard = CallStackGuard::new();
        let err = expand(Path::new("/definitely/not/here.txt"), &mut guard).unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
        assert_eq!(guard.depth(), 0);
    }
}
