//! Lints backend trees written to disk, plus the real backend crate.

use std::fs;
use std::path::Path;

use architecture_lint::{LintError, lint_backend};
use rstest::{fixture, rstest};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join("src").join(relative);
    fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    fs::write(path, contents).expect("write source");
}

#[fixture]
fn clean_tree() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let files = [
        ("domain/mod.rs", "mod ledger_service; pub use ledger_service::LedgerService;"),
        ("domain/ledger.rs", "pub struct Invoice;"),
        ("domain/ports/ledger_repository.rs", "use crate::domain::Invoice; pub trait R {}"),
        (
            "domain/ledger_service.rs",
            "use super::ports::LedgerRepository; use tracing::info; pub struct LedgerService;",
        ),
        (
            "inbound/http/ledger.rs",
            "use actix_web::HttpResponse; use crate::domain::ports::LedgerWorkflow;",
        ),
        ("outbound/mod.rs", "pub mod memory; pub mod persistence;"),
        ("outbound/memory/ledger.rs", "use crate::domain::ports::LedgerRepository;"),
        ("outbound/memory/tests.rs", "use super::*; use super::ledger::InMemoryLedger;"),
        (
            "outbound/persistence/diesel_ledger_repository.rs",
            "use diesel_async::RunQueryDsl; use crate::domain::Invoice;",
        ),
        ("main.rs", "use actix_web::App; use college_backend::outbound::memory; fn main() {}"),
    ];
    for (relative, contents) in files {
        write(dir.path(), relative, contents);
    }
    dir
}

#[rstest]
fn clean_tree_passes_and_skips_the_server_entry(clean_tree: TempDir) {
    let checked = lint_backend(clean_tree.path()).expect("clean tree");
    assert_eq!(checked, 9);
}

#[rstest]
fn violations_across_zones_are_all_reported(clean_tree: TempDir) {
    write(
        clean_tree.path(),
        "inbound/http/cross.rs",
        "use college_backend::outbound::persistence::DbPool;",
    );
    write(clean_tree.path(), "outbound/memory/cross.rs", "use super::super::paystack::Gateway;");
    write(clean_tree.path(), "domain/grading.rs", "use super::LedgerService;");

    let Err(LintError::Violations(violations)) = lint_backend(clean_tree.path()) else {
        panic!("expected violations");
    };
    let reported: Vec<String> = violations.iter().map(ToString::to_string).collect();
    assert_eq!(
        reported,
        [
            "domain/grading.rs: domain model must not depend on domain services",
            "inbound/http/cross.rs: inbound adapter must not depend on the persistence adapter",
            "outbound/memory/cross.rs: memory adapter must not depend on the paystack adapter",
        ]
    );
}

#[rstest]
fn the_backend_crate_respects_its_boundaries() {
    let backend = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../backend");
    let result = lint_backend(&backend);
    assert!(result.is_ok(), "{}", result.err().map(|err| err.to_string()).unwrap_or_default());
}
