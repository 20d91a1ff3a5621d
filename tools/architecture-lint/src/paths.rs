//! Collects the paths a file names and resolves them against its module.

use std::collections::BTreeSet;
use std::path::Path;

use syn::visit::Visit;

const LAYERS: [&str; 3] = ["domain", "inbound", "outbound"];

/// Where a path leads once `crate`, `self`, and `super` are resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Resolved {
    /// A module path inside the backend crate, without `crate`.
    Internal(Vec<String>),
    /// The root of a third-party crate or a prelude name.
    External(String),
}

/// Module path of a file relative to `backend/src`.
///
/// `ledger/mod.rs` and `ledger.rs` both map to `ledger`. Files pulled in
/// with `#[path]` resolve as siblings of their parent module.
pub fn module_of(relative: &Path) -> Vec<String> {
    let mut module: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    if module.last().is_some_and(|last| last == "mod") {
        module.pop();
    }
    module
}

/// Resolve `segments` as written inside `module`.
pub fn resolve(module: &[String], segments: &[String]) -> Option<Resolved> {
    let first = segments.first()?.as_str();
    match first {
        "crate" | "college_backend" => {
            Some(Resolved::Internal(segments.iter().skip(1).cloned().collect()))
        }
        "self" => {
            let mut absolute = module.to_vec();
            absolute.extend(segments.iter().skip(1).cloned());
            Some(Resolved::Internal(absolute))
        }
        "super" => {
            let supers = segments.iter().take_while(|s| *s == "super").count();
            let keep = module.len().checked_sub(supers)?;
            let mut absolute: Vec<String> = module.iter().take(keep).cloned().collect();
            absolute.extend(segments.iter().skip(supers).cloned());
            Some(Resolved::Internal(absolute))
        }
        layer if LAYERS.contains(&layer) => Some(Resolved::Internal(segments.to_vec())),
        root => Some(Resolved::External(root.to_owned())),
    }
}

/// Every path named by a parsed file, in `use` trees and expressions.
pub fn collect(parsed: &syn::File) -> BTreeSet<Vec<String>> {
    let mut collector = Collector::default();
    collector.visit_file(parsed);
    collector.paths
}

#[derive(Default)]
struct Collector {
    paths: BTreeSet<Vec<String>>,
}

impl Collector {
    fn walk_use(&mut self, tree: &syn::UseTree, prefix: &mut Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.walk_use(&path.tree, prefix);
                prefix.pop();
            }
            syn::UseTree::Name(syn::UseName { ident })
            | syn::UseTree::Rename(syn::UseRename { ident, .. }) => {
                self.leaf(prefix, ident.to_string());
            }
            syn::UseTree::Glob(_) => self.leaf(prefix, "*".to_owned()),
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.walk_use(item, prefix);
                }
            }
        }
    }

    fn leaf(&mut self, prefix: &[String], last: String) {
        let mut segments = prefix.to_vec();
        // `use crate::domain::{self, ...}` names the prefix itself.
        if last != "self" || segments.is_empty() {
            segments.push(last);
        }
        self.paths.insert(segments);
    }
}

impl<'ast> Visit<'ast> for Collector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.walk_use(&node.tree, &mut Vec::new());
    }
}
