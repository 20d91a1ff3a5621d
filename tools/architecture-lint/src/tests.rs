//! Unit tests for the zone rules.

use std::path::Path;

use rstest::rstest;

use super::*;

fn lint_one(file: &str, contents: &str) -> Result<(), LintError> {
    lint(&[SourceFile::new(file, contents)])
}

fn messages(file: &str, contents: &str) -> Vec<String> {
    match lint_one(file, contents) {
        Ok(()) => Vec::new(),
        Err(LintError::Violations(violations)) => {
            violations.into_iter().map(|violation| violation.message).collect()
        }
        Err(other) => panic!("expected violations, got {other:?}"),
    }
}

#[rstest]
#[case::handler_uses_domain(
    "inbound/http/ledger.rs",
    "use crate::domain::{InvoiceId, ports::LedgerWorkflow}; fn h() {}",
    true
)]
#[case::handler_names_gateway(
    "inbound/http/ledger.rs",
    "use crate::outbound::paystack::PaystackGateway; fn h() {}",
    false
)]
#[case::handler_builds_store_inline(
    "inbound/http/ledger.rs",
    "fn h() { let _ = crate::outbound::memory::InMemoryLedger::default(); }",
    false
)]
#[case::handler_queries_database("inbound/http/grades.rs", "use diesel::prelude::*;", false)]
#[case::model_reaches_ports(
    "domain/ledger.rs",
    "use super::ports::LedgerRepository; pub struct Invoice;",
    false
)]
#[case::model_derives_schema("domain/grading.rs", "use utoipa::ToSchema;", false)]
#[case::port_names_service(
    "domain/ports/ledger_workflow.rs",
    "use crate::domain::LedgerService;",
    false
)]
#[case::port_reaches_service_module(
    "domain/ports/ledger_workflow.rs",
    "use super::super::ledger_service::LedgerService;",
    false
)]
#[case::service_drives_ports(
    "domain/registration_service.rs",
    "use crate::domain::ports::RegistrationRepository; use tracing::info;",
    true
)]
#[case::service_tests_glob_parent(
    "domain/ledger_service_tests.rs",
    "use super::*; use crate::domain::ports::MockLedgerRepository;",
    true
)]
#[case::service_calls_http(
    "domain/ledger_service.rs",
    "fn f() { let _ = reqwest::Client::new(); }",
    false
)]
#[case::domain_root_reexports(
    "domain/mod.rs",
    "pub use self::ledger_service::LedgerService; pub use ports::LedgerRepository;",
    true
)]
#[case::memory_tests_glob_parent(
    "outbound/memory/tests.rs",
    "use super::*; use super::ledger::InMemoryLedger;",
    true
)]
#[case::memory_reaches_persistence(
    "outbound/memory/ledger.rs",
    "use super::super::persistence::DbPool;",
    false
)]
#[case::paystack_signs_and_calls(
    "outbound/paystack/http_gateway.rs",
    "use hmac::Mac; use reqwest::Client; use crate::domain::ports::PaymentGateway;",
    true
)]
#[case::paystack_touches_database("outbound/paystack/dto.rs", "use diesel::prelude::*;", false)]
#[case::persistence_implements_port(
    "outbound/persistence/models.rs",
    "use diesel::prelude::*; use crate::domain::ports::LedgerRepository;",
    true
)]
#[case::persistence_reaches_inbound(
    "outbound/persistence/diesel_grade_repository.rs",
    "use crate::inbound::http::HttpState;",
    false
)]
#[case::metrics_uses_web_framework(
    "outbound/metrics/mod.rs",
    "use prometheus::Registry; use actix_web::web;",
    false
)]
#[case::outbound_root_declares_adapters(
    "outbound/mod.rs",
    "pub mod memory; pub mod paystack;",
    true
)]
fn zone_rules(#[case] file: &str, #[case] contents: &str, #[case] ok: bool) {
    let result = lint_one(file, contents);
    assert_eq!(result.is_ok(), ok, "result: {result:?}");
}

#[rstest]
fn violation_names_zone_and_crate_once_per_file() {
    let found = messages(
        "domain/ledger.rs",
        "use diesel::prelude::*; use diesel::Queryable; fn a() { diesel::sql_query(\"x\"); }",
    );
    assert_eq!(found, ["domain model must not use database crate `diesel`"]);
}

#[rstest]
fn adapter_crossing_names_both_sides() {
    let found = messages("outbound/memory/cross.rs", "use super::paystack::HttpGateway;");
    assert_eq!(found, ["memory adapter must not depend on the paystack adapter"]);
}

#[rstest]
#[case::outside_the_layers("server/mod.rs", "fn main() {}")]
#[case::unknown_adapter("outbound/cache/mod.rs", "pub struct Cache;")]
#[case::invalid_rust("domain/ledger.rs", "fn (")]
fn unplaceable_or_unparsable_files_are_unreadable(#[case] file: &str, #[case] contents: &str) {
    let result = lint_one(file, contents);
    assert!(matches!(result, Err(LintError::Unreadable { .. })), "result: {result:?}");
}

#[rstest]
#[case::file_module("domain/ledger.rs", &["domain", "ledger"])]
#[case::mod_file("outbound/memory/mod.rs", &["outbound", "memory"])]
#[case::nested("inbound/http/error/tests.rs", &["inbound", "http", "error", "tests"])]
fn module_paths_follow_the_file_tree(#[case] file: &str, #[case] expected: &[&str]) {
    assert_eq!(paths::module_of(Path::new(file)), expected);
}

#[rstest]
#[case::crate_root(&["crate", "domain", "Invoice"], Some(&["domain", "Invoice"][..]))]
#[case::by_crate_name(
    &["college_backend", "outbound", "memory"],
    Some(&["outbound", "memory"][..])
)]
#[case::self_relative(&["self", "tests"], Some(&["outbound", "memory", "ledger", "tests"][..]))]
#[case::one_super(&["super", "directory"], Some(&["outbound", "memory", "directory"][..]))]
#[case::two_supers(&["super", "super", "paystack"], Some(&["outbound", "paystack"][..]))]
#[case::too_many_supers(&["super", "super", "super", "super", "x"], None)]
fn relative_paths_resolve_inside_the_crate(
    #[case] segments: &[&str],
    #[case] expected: Option<&[&str]>,
) {
    let module: Vec<String> = ["outbound", "memory", "ledger"].map(str::to_owned).to_vec();
    let segments: Vec<String> = segments.iter().map(|s| (*s).to_owned()).collect();
    let expected: Option<Vec<String>> =
        expected.map(|parts| parts.iter().map(|s| (*s).to_owned()).collect());
    assert_eq!(paths::resolve(&module, &segments), expected.map(paths::Resolved::Internal));
}

#[rstest]
fn third_party_roots_resolve_as_external() {
    let module = vec!["domain".to_owned()];
    let resolved = paths::resolve(&module, &["serde".to_owned(), "Serialize".to_owned()]);
    assert_eq!(resolved, Some(paths::Resolved::External("serde".to_owned())));
}

#[rstest]
#[case::domain_root("domain/mod.rs", Zone::DomainRoot)]
#[case::service_tests("domain/grading_service_tests.rs", Zone::Services)]
#[case::port_named_service("domain/ports/login_service.rs", Zone::Ports)]
#[case::nested_model("domain/access/tests.rs", Zone::Model)]
#[case::single_file_adapter("outbound/paystack.rs", Zone::Adapter(Adapter::Paystack))]
fn files_land_in_their_zone(#[case] file: &str, #[case] zone: Zone) {
    assert_eq!(Zone::of(Path::new(file)), Some(zone));
}
