//! End-to-end fee ledger: invoices, partial payments, payment lookups, the
//! bursar summary, and tuition status.

mod support;

use actix_web::http::StatusCode;
use actix_web::test;
use college_backend::domain::RegistrationPolicy;
use serde_json::{Value, json};

use support::{
    ADMIN_PASSWORD, ADMIN_USERNAME, PASSWORD, college_app, college_state, get, login, post,
    register, send, staff_body, student_body,
};

const TUITION_QUERY: &str = "session=2024/2025&semester=first";

#[actix_web::test]
async fn partial_then_full_payment_settles_the_invoice() {
    let app = test::init_service(college_app(college_state(RegistrationPolicy::default()).await))
        .await;
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    register(&app, &admin, staff_body("purse", "bursar")).await;
    let learner = register(&app, &admin, student_body("ada", "CSC/2024/001")).await;
    let student_id = learner["student"]["studentId"]
        .as_str()
        .expect("student id")
        .to_owned();

    let bursar = login(&app, "purse", PASSWORD).await;
    define_fees(&app, &bursar).await;

    let student = login(&app, "ada", PASSWORD).await;
    let (status, invoice) = send(
        &app,
        post("/api/v1/invoices", &student)
            .set_json(json!({ "session": "2024/2025", "semester": "first" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["status"], "unpaid");
    assert_eq!(invoice["amountDue"], "50000.00");
    let invoice_id = invoice["id"].as_str().expect("invoice id").to_owned();

    let after_first = pay(&app, &student, &invoice_id, Some(json!(30000))).await;
    assert_eq!(after_first["status"], "partial");
    assert_eq!(after_first["amountPaid"], "30000.00");
    assert_eq!(after_first["balance"], "20000.00");
    assert!(!tuition_paid(&app, &student, &student_id).await);

    let after_second = pay(&app, &student, &invoice_id, None).await;
    assert_eq!(after_second["status"], "paid");
    assert_eq!(after_second["balance"], "0.00");
    assert!(tuition_paid(&app, &bursar, &student_id).await);
}

#[actix_web::test]
async fn repeated_checkout_cannot_pay_twice() {
    let app = test::init_service(college_app(college_state(RegistrationPolicy::default()).await))
        .await;
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    register(&app, &admin, staff_body("purse", "bursar")).await;
    register(&app, &admin, student_body("ada", "CSC/2024/001")).await;
    let bursar = login(&app, "purse", PASSWORD).await;
    define_fees(&app, &bursar).await;
    let student = login(&app, "ada", PASSWORD).await;
    let invoice_id = issue_invoice(&app, &student).await;

    let open = |amount: Option<Value>| {
        let mut body = json!({ "invoiceId": invoice_id });
        if let Some(amount) = amount {
            body["amount"] = amount;
        }
        post("/api/v1/payments", &student).set_json(body)
    };
    let (status, first) = send(&app, open(None)).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    let (status, again) = send(&app, open(Some(json!(50000)))).await;
    assert_eq!(status, StatusCode::CREATED, "{again}");
    assert_eq!(again["reference"], first["reference"]);
    let (status, conflict) = send(&app, open(Some(json!(20000)))).await;
    assert_eq!(status, StatusCode::CONFLICT, "{conflict}");
    assert_eq!(conflict["details"]["code"], "payment_in_progress");
    assert_eq!(conflict["details"]["reference"], first["reference"]);

    let reference = first["reference"].as_str().expect("reference");
    let (status, settled) = send(
        &app,
        post(&format!("/api/v1/payments/{reference}/verification"), &student),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{settled}");
    let (status, invoice) =
        send(&app, get(&format!("/api/v1/invoices/{invoice_id}"), &student)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["amountPaid"], "50000.00");
    assert_eq!(invoice["status"], "paid");

    let (status, listed) = send(&app, get("/api/v1/payments", &student)).await;
    assert_eq!(status, StatusCode::OK, "{listed}");
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    let (status, found) = send(&app, get(&format!("/api/v1/payments/{reference}"), &bursar)).await;
    assert_eq!(status, StatusCode::OK, "{found}");
    assert_eq!(found["status"], "completed");

    let (status, summary) =
        send(&app, get(&format!("/api/v1/ledger/summary?{TUITION_QUERY}"), &bursar)).await;
    assert_eq!(status, StatusCode::OK, "{summary}");
    assert_eq!(summary["totalInvoices"], 1);
    assert_eq!(summary["totalPaid"], "50000.00");
    assert_eq!(summary["totalOutstanding"], "0.00");
    assert_eq!(summary["statusBreakdown"]["paid"], 1);
    assert_eq!(summary["completedPayments"]["count"], 1);
    assert_eq!(summary["pendingPayments"]["count"], 0);

    let (status, _) =
        send(&app, get(&format!("/api/v1/ledger/summary?{TUITION_QUERY}"), &student)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn invoice_without_fee_structure_is_unprocessable() {
    let app = test::init_service(college_app(college_state(RegistrationPolicy::default()).await))
        .await;
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    register(&app, &admin, student_body("ada", "CSC/2024/001")).await;
    let student = login(&app, "ada", PASSWORD).await;

    let (status, body) = send(
        &app,
        post("/api/v1/invoices", &student)
            .set_json(json!({ "session": "2024/2025", "semester": "second" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no_fee_structure_defined");
}

#[actix_web::test]
async fn sandbox_gateway_rejects_webhooks() {
    let app = test::init_service(college_app(college_state(RegistrationPolicy::default()).await))
        .await;

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/payments/webhook")
            .insert_header(("x-paystack-signature", "forged"))
            .set_payload(r#"{"event":"charge.success"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

async fn define_fees<S, B>(app: &S, bursar: &actix_web::cookie::Cookie<'static>)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let (status, structure) = send(
        app,
        post("/api/v1/fee-structures", bursar).set_json(json!({
            "name": "CSC 100L first semester",
            "department": "CSC",
            "level": 100,
            "session": "2024/2025",
            "semester": "first",
            "components": { "tuition": 45000, "library": 5000 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{structure}");
}

async fn issue_invoice<S, B>(app: &S, student: &actix_web::cookie::Cookie<'static>) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let (status, invoice) = send(
        app,
        post("/api/v1/invoices", student)
            .set_json(json!({ "session": "2024/2025", "semester": "first" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{invoice}");
    invoice["id"].as_str().expect("invoice id").to_owned()
}

async fn pay<S, B>(
    app: &S,
    student: &actix_web::cookie::Cookie<'static>,
    invoice_id: &str,
    amount: Option<Value>,
) -> Value
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let mut body = json!({ "invoiceId": invoice_id });
    if let Some(amount) = amount {
        body["amount"] = amount;
    }
    let (status, payment) = send(app, post("/api/v1/payments", student).set_json(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{payment}");
    assert_eq!(payment["status"], "pending");
    let reference = payment["reference"].as_str().expect("reference");

    let (status, settled) = send(
        app,
        post(&format!("/api/v1/payments/{reference}/verification"), student),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{settled}");
    assert_eq!(settled["status"], "completed");
    assert!(settled["receiptNumber"].is_string());

    let (status, invoice) =
        send(app, get(&format!("/api/v1/invoices/{invoice_id}"), student)).await;
    assert_eq!(status, StatusCode::OK);
    invoice
}

async fn tuition_paid<S, B>(
    app: &S,
    viewer: &actix_web::cookie::Cookie<'static>,
    student_id: &str,
) -> bool
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let (status, body) = send(
        app,
        get(
            &format!("/api/v1/students/{student_id}/tuition-status?{TUITION_QUERY}"),
            viewer,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["paid"].as_bool().expect("paid flag")
}
