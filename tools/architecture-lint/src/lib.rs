//! Dependency rules for the college backend's hexagonal layout.
//!
//! Every file under `backend/src/{domain,inbound,outbound}` is placed in a
//! [`Zone`] from its path, parsed with `syn`, and each path it names is
//! resolved (`crate`, `self`, and `super` included) and checked:
//!
//! - domain model files reach neither ports nor services, and ports never
//!   reach the services that drive them
//! - nothing in `domain` reaches an adapter or an infrastructure crate
//! - inbound HTTP code reaches no outbound adapter, database, gateway
//!   client, or webhook signing crate
//! - each outbound adapter (memory, persistence, paystack, metrics) stays
//!   out of the others and out of the web framework
//!
//! Run it with `cargo run -p architecture-lint [backend-dir]`.

mod paths;
mod zones;

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use zones::{Adapter, CrateFamily, Target, Zone};

use paths::Resolved;

/// A file naming something its zone may not use.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Violation {
    /// File path relative to `backend/src`.
    pub file: PathBuf,
    /// What was named and why it is out of bounds.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Why a lint run did not pass.
#[derive(Debug)]
pub enum LintError {
    /// The tree could not be read.
    Io(io::Error),
    /// A file is outside every zone or is not valid Rust.
    Unreadable { file: PathBuf, reason: String },
    /// Boundary violations, sorted by file.
    Violations(Vec<Violation>),
}

impl fmt::Display for LintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "could not read the backend tree: {err}"),
            Self::Unreadable { file, reason } => {
                write!(f, "{}: {reason}", file.display())
            }
            Self::Violations(violations) => {
                writeln!(f, "{} boundary violation(s):", violations.len())?;
                violations
                    .iter()
                    .try_for_each(|violation| writeln!(f, "  {violation}"))
            }
        }
    }
}

impl std::error::Error for LintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Unreadable { .. } | Self::Violations(_) => None,
        }
    }
}

impl From<io::Error> for LintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A Rust file and its path relative to `backend/src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file: PathBuf,
    pub contents: String,
}

impl SourceFile {
    /// Wrap in-memory source, mostly for tests.
    pub fn new(file: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            contents: contents.into(),
        }
    }
}

/// Lint the `src/` tree of the backend crate at `backend_dir`.
///
/// Returns the number of files checked.
pub fn lint_backend(backend_dir: &Path) -> Result<usize, LintError> {
    let src = backend_dir.join("src");
    let mut sources = Vec::new();
    for layer in ["domain", "inbound", "outbound"] {
        let dir = src.join(layer);
        if dir.is_dir() {
            read_tree(&src, &dir, &mut sources)?;
        }
    }
    lint(&sources)?;
    Ok(sources.len())
}

/// Lint already-loaded sources.
pub fn lint(sources: &[SourceFile]) -> Result<(), LintError> {
    let mut violations = Vec::new();
    for source in sources {
        violations.extend(check(source)?);
    }
    if violations.is_empty() {
        Ok(())
    } else {
        violations.sort();
        Err(LintError::Violations(violations))
    }
}

fn check(source: &SourceFile) -> Result<Vec<Violation>, LintError> {
    let unreadable = |reason: String| LintError::Unreadable {
        file: source.file.clone(),
        reason,
    };
    let zone = Zone::of(&source.file)
        .ok_or_else(|| unreadable("not inside a domain, inbound, or outbound zone".into()))?;
    let parsed = syn::parse_file(&source.contents).map_err(|err| unreadable(err.to_string()))?;
    let module = paths::module_of(&source.file);

    let mut messages = BTreeSet::new();
    for segments in paths::collect(&parsed) {
        match paths::resolve(&module, &segments) {
            Some(Resolved::Internal(absolute)) => {
                if let Some(target) = Target::of(&absolute)
                    && !zone.may_reach(target)
                {
                    messages.insert(format!("{zone} must not depend on {target}"));
                }
            }
            Some(Resolved::External(root)) => {
                if let Some(family) = CrateFamily::of(&root)
                    && zone.banned_families().contains(&family)
                {
                    messages.insert(format!(
                        "{zone} must not use {} crate `{root}`",
                        family.label()
                    ));
                }
            }
            None => {}
        }
    }
    Ok(messages
        .into_iter()
        .map(|message| Violation {
            file: source.file.clone(),
            message,
        })
        .collect())
}

fn read_tree(src: &Path, dir: &Path, sources: &mut Vec<SourceFile>) -> Result<(), LintError> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(fs::DirEntry::path);
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            read_tree(src, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let file = path
                .strip_prefix(src)
                .map_err(|err| LintError::Unreadable {
                    file: path.clone(),
                    reason: err.to_string(),
                })?
                .to_path_buf();
            sources.push(SourceFile::new(file, fs::read_to_string(&path)?));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
