//! Registration of every `/api/v1` handler.
//!
//! Literal segments are registered before the `{id}` routes they would
//! otherwise be captured by (`/registrations/summary`, `/payments/webhook`).
//! `/payments/{reference}` only answers GET, so the webhook POST passes it.

use actix_web::web;

use super::{catalogue, grades, ledger, principals, registrations};

/// Register the API handlers on a scope mounted at `/api/v1`.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use college_backend::inbound::http::routes::api_routes;
///
/// let app = App::new().service(web::scope("/api/v1").configure(api_routes));
/// ```
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(principals::login)
        .service(principals::logout)
        .service(principals::current_principal)
        .service(principals::register_principal)
        .service(catalogue::open_offering)
        .service(catalogue::list_offerings)
        .service(registrations::submit_registration)
        .service(registrations::list_own_registrations)
        .service(registrations::registration_summary)
        .service(registrations::get_registration)
        .service(registrations::approve_as_lecturer)
        .service(registrations::reject_as_lecturer)
        .service(registrations::approve_as_exam_officer)
        .service(registrations::reject_as_exam_officer)
        .service(registrations::list_offering_registrations)
        .service(grades::enter_score)
        .service(grades::get_grade)
        .service(grades::submit_grade)
        .service(grades::hod_approve_grade)
        .service(grades::verify_grade)
        .service(grades::publish_grade)
        .service(grades::reject_grade)
        .service(grades::list_offering_grades)
        .service(grades::list_student_grades)
        .service(grades::student_standing)
        .service(ledger::define_fee_structure)
        .service(ledger::list_fee_structures)
        .service(ledger::generate_invoice)
        .service(ledger::list_invoices)
        .service(ledger::get_invoice)
        .service(ledger::payment_webhook)
        .service(ledger::initiate_payment)
        .service(ledger::list_payments)
        .service(ledger::get_payment)
        .service(ledger::reconcile_payment)
        .service(ledger::tuition_status)
        .service(ledger::ledger_summary);
}
