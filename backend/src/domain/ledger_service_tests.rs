//! Tests for the fee ledger service.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::domain::fixtures::{
    dept, fee_structure, fixture_clock, fixture_timestamp, staff, student, student_profile, term,
};
use crate::domain::ports::{
    CheckoutSession, MockLedgerRepository, MockPaymentGateway, MockPrincipalRepository,
    NoOpWorkflowMetrics,
};
use crate::domain::{ErrorCode, FeeComponents, Level, Role};

struct Harness {
    ledger: MockLedgerRepository,
    principals: MockPrincipalRepository,
    gateway: MockPaymentGateway,
}

impl Harness {
    fn new() -> Self {
        Self {
            ledger: MockLedgerRepository::new(),
            principals: MockPrincipalRepository::new(),
            gateway: MockPaymentGateway::new(),
        }
    }

    fn with_student(mut self, principal: &Principal) -> Self {
        let principal = principal.clone();
        self.principals
            .expect_find_by_student()
            .returning(move |_| Ok(Some(principal.clone())));
        self
    }

    fn with_invoice(mut self, invoice: &Invoice) -> Self {
        let invoice = invoice.clone();
        self.ledger
            .expect_find_invoice()
            .returning(move |_| Ok(Some(invoice.clone())));
        self
    }

    fn with_student_payments(mut self, payments: &[Payment]) -> Self {
        let payments = payments.to_vec();
        self.ledger
            .expect_list_student_payments()
            .returning(move |_| Ok(payments.clone()));
        self
    }

    fn with_payment(mut self, payment: &Payment) -> Self {
        let payment = payment.clone();
        self.ledger
            .expect_find_payment()
            .returning(move |_| Ok(Some(payment.clone())));
        self
    }

    fn build(self) -> LedgerService {
        LedgerService::new(
            LedgerServicePorts {
                ledger: Arc::new(self.ledger),
                principals: Arc::new(self.principals),
                gateway: Arc::new(self.gateway),
                metrics: Arc::new(NoOpWorkflowMetrics),
            },
            fixture_clock(),
        )
        .with_callback_url(Some("https://college.test/payments/callback".to_owned()))
    }
}

fn invoice_for(owner: &Principal, tuition_naira: i64) -> Invoice {
    Invoice::issue(
        InvoiceId::random(),
        student_profile(owner).id,
        &fee_structure(tuition_naira),
        fixture_timestamp(),
    )
}

fn pending_payment(invoice: &Invoice, naira: i64) -> Payment {
    Payment::open(
        PaymentId::random(),
        invoice.student,
        invoice.id,
        Money::naira(naira),
        fixture_timestamp(),
    )
}

fn confirmation(payment: &Payment, amount: Money, outcome: GatewayOutcome) -> PaymentConfirmation {
    PaymentConfirmation {
        reference: payment.reference.clone(),
        amount,
        outcome,
    }
}

fn succeeded() -> GatewayOutcome {
    GatewayOutcome::Succeeded {
        transaction_id: "txn-1".to_owned(),
    }
}

fn fee_draft() -> FeeStructureDraft {
    FeeStructureDraft {
        name: "CSC 100L first semester".to_owned(),
        department: dept("CSC"),
        level: Level::new(100).expect("level"),
        term: term(),
        components: FeeComponents {
            tuition: Money::naira(45_000),
            library: Money::naira(5_000),
            ..FeeComponents::default()
        },
    }
}

#[rstest]
#[case::bursar(Role::Bursar)]
#[case::super_admin(Role::SuperAdmin)]
#[tokio::test]
async fn finance_staff_define_fee_structures(#[case] role: Role) {
    let mut harness = Harness::new();
    harness
        .ledger
        .expect_insert_fee_structure()
        .times(1)
        .return_once(|_| Ok(()));

    let structure = harness
        .build()
        .define_fee_structure(&staff(role), fee_draft())
        .await
        .expect("defined");

    assert_eq!(structure.total, Money::naira(50_000));
}

#[rstest]
#[case::registrar(staff(Role::Registrar))]
#[case::student(student())]
#[tokio::test]
async fn others_cannot_define_fee_structures(#[case] actor: Principal) {
    let mut harness = Harness::new();
    harness.ledger.expect_insert_fee_structure().times(0);

    let error = harness
        .build()
        .define_fee_structure(&actor, fee_draft())
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn duplicate_fee_structure_is_conflict() {
    let mut harness = Harness::new();
    harness
        .ledger
        .expect_insert_fee_structure()
        .return_once(|_| Err(LedgerRepositoryError::duplicate("CSC/100/2024")));

    let error = harness
        .build()
        .define_fee_structure(&staff(Role::Bursar), fee_draft())
        .await
        .expect_err("duplicate");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        error.details().and_then(|details| details.get("code")),
        Some(&serde_json::json!("fee_structure_exists"))
    );
}

#[tokio::test]
async fn invoice_is_issued_from_matching_fee_structure() {
    let owner = student();
    let mut harness = Harness::new().with_student(&owner);
    harness
        .ledger
        .expect_find_invoice_for_term()
        .times(1)
        .return_once(|_, _| Ok(None));
    harness
        .ledger
        .expect_find_fee_structure()
        .withf(|department, level, _| department.as_str() == "CSC" && level.value() == 100)
        .times(1)
        .return_once(|_, _, _| Ok(Some(fee_structure(50_000))));
    harness
        .ledger
        .expect_insert_invoice()
        .times(1)
        .return_once(|_| Ok(()));

    let invoice = harness
        .build()
        .generate_invoice(&owner, &student_profile(&owner).id, term())
        .await
        .expect("invoice issued");

    assert_eq!(invoice.amount_due, Money::naira(50_000));
    assert_eq!(invoice.amount_paid, Money::ZERO);
    assert_eq!(invoice.status(), InvoiceStatus::Unpaid);
    assert!(invoice.invoice_number.starts_with("INV-2024-"));
}

#[tokio::test]
async fn existing_invoice_is_returned_unchanged() {
    let owner = student();
    let existing = invoice_for(&owner, 50_000);
    let expected = existing.clone();
    let mut harness = Harness::new().with_student(&owner);
    harness
        .ledger
        .expect_find_invoice_for_term()
        .return_once(move |_, _| Ok(Some(existing)));
    harness.ledger.expect_find_fee_structure().times(0);
    harness.ledger.expect_insert_invoice().times(0);

    let invoice = harness
        .build()
        .generate_invoice(&staff(Role::Bursar), &student_profile(&owner).id, term())
        .await
        .expect("invoice returned");

    assert_eq!(invoice, expected);
}

#[tokio::test]
async fn concurrent_issue_returns_the_stored_invoice() {
    let owner = student();
    let stored = invoice_for(&owner, 50_000);
    let expected = stored.clone();
    let mut harness = Harness::new().with_student(&owner);
    let mut lookups = 0;
    harness
        .ledger
        .expect_find_invoice_for_term()
        .times(2)
        .returning(move |_, _| {
            lookups += 1;
            Ok((lookups > 1).then(|| stored.clone()))
        });
    harness
        .ledger
        .expect_find_fee_structure()
        .return_once(|_, _, _| Ok(Some(fee_structure(50_000))));
    harness
        .ledger
        .expect_insert_invoice()
        .return_once(|_| Err(LedgerRepositoryError::duplicate("student term")));

    let invoice = harness
        .build()
        .generate_invoice(&owner, &student_profile(&owner).id, term())
        .await
        .expect("invoice returned");

    assert_eq!(invoice.id, expected.id);
}

#[tokio::test]
async fn missing_fee_structure_is_reported() {
    let owner = student();
    let mut harness = Harness::new().with_student(&owner);
    harness
        .ledger
        .expect_find_invoice_for_term()
        .return_once(|_, _| Ok(None));
    harness
        .ledger
        .expect_find_fee_structure()
        .return_once(|_, _, _| Ok(None));
    harness.ledger.expect_insert_invoice().times(0);

    let error = harness
        .build()
        .generate_invoice(&owner, &student_profile(&owner).id, term())
        .await
        .expect_err("no structure");

    assert_eq!(error.code(), ErrorCode::NoFeeStructureDefined);
}

#[tokio::test]
async fn student_cannot_invoice_someone_else() {
    let owner = student();
    let mut harness = Harness::new().with_student(&owner);
    harness.ledger.expect_find_invoice_for_term().times(0);

    let error = harness
        .build()
        .generate_invoice(&student(), &student_profile(&owner).id, term())
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn payment_defaults_to_outstanding_balance_and_opens_checkout() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000).credited(Money::naira(30_000)).expect("credit");
    let mut harness = Harness::new()
        .with_student(&owner)
        .with_invoice(&invoice)
        .with_student_payments(&[]);
    harness
        .ledger
        .expect_insert_payment()
        .withf(|payment| {
            payment.amount == Money::naira(20_000) && payment.status == PaymentStatus::Pending
        })
        .times(1)
        .return_once(|_| Ok(()));
    let email = owner.email().to_owned();
    harness
        .gateway
        .expect_initialize()
        .withf(move |request| {
            request.email == email
                && request.amount == Money::naira(20_000)
                && request.callback_url.as_deref()
                    == Some("https://college.test/payments/callback")
        })
        .times(1)
        .return_once(|request| {
            Ok(CheckoutSession {
                authorization_url: format!("https://checkout.test/{}", request.reference),
                access_code: "code-1".to_owned(),
            })
        });
    harness
        .ledger
        .expect_attach_checkout()
        .times(1)
        .returning(|reference, url, code| {
            let mut payment = Payment::open(
                PaymentId::random(),
                StudentId::random(),
                InvoiceId::random(),
                Money::naira(20_000),
                fixture_timestamp(),
            );
            payment.reference = reference.clone();
            payment.authorization_url = Some(url.to_owned());
            payment.access_code = Some(code.to_owned());
            Ok(payment)
        });

    let payment = harness
        .build()
        .initiate_payment(&owner, &invoice.id, None)
        .await
        .expect("payment initiated");

    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.access_code.as_deref(), Some("code-1"));
}

#[rstest]
#[case::zero(Money::ZERO)]
#[case::over_balance(Money::naira(50_001))]
#[tokio::test]
async fn payment_amount_must_fit_balance(#[case] amount: Money) {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let mut harness = Harness::new()
        .with_student(&owner)
        .with_invoice(&invoice)
        .with_student_payments(&[]);
    harness.ledger.expect_insert_payment().times(0);

    let error = harness
        .build()
        .initiate_payment(&owner, &invoice.id, Some(amount))
        .await
        .expect_err("invalid amount");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[case::balance(None)]
#[case::same_amount(Some(Money::naira(20_000)))]
#[tokio::test]
async fn repeated_payment_request_reuses_open_checkout(#[case] amount: Option<Money>) {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000).credited(Money::naira(30_000)).expect("credit");
    let open = Payment {
        authorization_url: Some("https://checkout.test/open".to_owned()),
        ..pending_payment(&invoice, 20_000)
    };
    let mut harness = Harness::new()
        .with_student(&owner)
        .with_invoice(&invoice)
        .with_student_payments(&[open.clone()]);
    harness.ledger.expect_insert_payment().times(0);
    harness.gateway.expect_initialize().times(0);

    let payment = harness
        .build()
        .initiate_payment(&owner, &invoice.id, amount)
        .await
        .expect("open checkout returned");

    assert_eq!(payment, open);
}

#[tokio::test]
async fn different_amount_while_a_payment_is_pending_is_conflict() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let open = pending_payment(&invoice, 50_000);
    let settled_elsewhere = Payment {
        status: PaymentStatus::Failed,
        ..pending_payment(&invoice, 10_000)
    };
    let mut harness = Harness::new()
        .with_student(&owner)
        .with_invoice(&invoice)
        .with_student_payments(&[settled_elsewhere, open.clone()]);
    harness.ledger.expect_insert_payment().times(0);

    let error = harness
        .build()
        .initiate_payment(&owner, &invoice.id, Some(Money::naira(10_000)))
        .await
        .expect_err("in progress");

    assert_eq!(error.code(), ErrorCode::Conflict);
    let details = error.details().expect("conflict details");
    assert_eq!(details["code"], "payment_in_progress");
    assert_eq!(details["reference"], open.reference.as_str());
}

#[tokio::test]
async fn racing_payment_request_is_refused_by_the_ledger() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let rival = pending_payment(&invoice, 50_000).reference;
    let mut harness = Harness::new()
        .with_student(&owner)
        .with_invoice(&invoice)
        .with_student_payments(&[]);
    harness
        .ledger
        .expect_insert_payment()
        .times(1)
        .return_once(move |_| Err(LedgerRepositoryError::payment_in_progress(rival)));
    harness.gateway.expect_initialize().times(0);

    let error = harness
        .build()
        .initiate_payment(&owner, &invoice.id, None)
        .await
        .expect_err("in progress");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        error.details().expect("details")["code"],
        "payment_in_progress"
    );
}

#[tokio::test]
async fn paid_invoice_accepts_no_more_payments() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000).credited(Money::naira(50_000)).expect("credit");
    let mut harness = Harness::new().with_student(&owner).with_invoice(&invoice);
    harness.ledger.expect_insert_payment().times(0);

    let error = harness
        .build()
        .initiate_payment(&owner, &invoice.id, None)
        .await
        .expect_err("settled");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn bursar_cannot_pay_for_a_student() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let mut harness = Harness::new().with_student(&owner).with_invoice(&invoice);
    harness.ledger.expect_insert_payment().times(0);

    let error = harness
        .build()
        .initiate_payment(&staff(Role::Bursar), &invoice.id, None)
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
#[case::timeout(PaymentGatewayError::timeout("10s elapsed"), ErrorCode::GatewayTimeout)]
#[case::refused(PaymentGatewayError::rejected("invalid key"), ErrorCode::ServiceUnavailable)]
#[tokio::test]
async fn checkout_failure_marks_payment_failed(
    #[case] failure: PaymentGatewayError,
    #[case] expected: ErrorCode,
) {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let failed = pending_payment(&invoice, 50_000);
    let mut harness = Harness::new()
        .with_student(&owner)
        .with_invoice(&invoice)
        .with_student_payments(&[]);
    harness
        .ledger
        .expect_insert_payment()
        .return_once(|_| Ok(()));
    harness
        .gateway
        .expect_initialize()
        .return_once(move |_| Err(failure));
    harness
        .ledger
        .expect_mark_payment_failed()
        .times(1)
        .return_once(move |_, reason, _| {
            Ok(Payment {
                status: PaymentStatus::Failed,
                failure_reason: Some(reason.to_owned()),
                ..failed
            })
        });
    harness.ledger.expect_attach_checkout().times(0);

    let error = harness
        .build()
        .initiate_payment(&owner, &invoice.id, None)
        .await
        .expect_err("checkout failed");

    assert_eq!(error.code(), expected);
}

#[tokio::test]
async fn matching_success_completes_payment_and_credits_invoice() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let payment = pending_payment(&invoice, 30_000);
    let mut harness = Harness::new().with_payment(&payment);
    let completed = Payment {
        status: PaymentStatus::Completed,
        ..payment.clone()
    };
    let credited = invoice.clone().credited(payment.amount).expect("credit");
    harness
        .ledger
        .expect_complete_payment()
        .withf(|_, settlement| {
            settlement.transaction_id == "txn-1" && settlement.receipt_number.starts_with("REC-")
        })
        .times(1)
        .return_once(move |_, settlement| {
            Ok(PaymentCompletion::Completed {
                payment: Payment {
                    receipt_number: Some(settlement.receipt_number.clone()),
                    ..completed
                },
                invoice: credited,
            })
        });
    harness.ledger.expect_mark_payment_failed().times(0);

    let recorded = harness
        .build()
        .record_payment(confirmation(&payment, payment.amount, succeeded()))
        .await
        .expect("recorded");

    assert_eq!(recorded.status, PaymentStatus::Completed);
    assert!(recorded.receipt_number.is_some());
}

#[tokio::test]
async fn completion_past_the_balance_is_conflict() {
    let owner = student();
    let payment = pending_payment(&invoice_for(&owner, 50_000), 30_000);
    let mut harness = Harness::new().with_payment(&payment);
    harness
        .ledger
        .expect_complete_payment()
        .times(1)
        .return_once(|_, _| {
            Err(LedgerRepositoryError::balance_exceeded(Money::naira(20_000)))
        });

    let error = harness
        .build()
        .record_payment(confirmation(&payment, payment.amount, succeeded()))
        .await
        .expect_err("overpaid");

    assert_eq!(error.code(), ErrorCode::Conflict);
    let details = error.details().expect("details");
    assert_eq!(details["code"], "balance_exceeded");
    assert_eq!(details["balance"], "20000.00");
}

#[tokio::test]
async fn amount_mismatch_fails_payment_without_credit() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let payment = pending_payment(&invoice, 30_000);
    let failed = Payment {
        status: PaymentStatus::Failed,
        ..payment.clone()
    };
    let mut harness = Harness::new().with_payment(&payment);
    harness.ledger.expect_complete_payment().times(0);
    harness
        .ledger
        .expect_mark_payment_failed()
        .withf(|_, reason, _| reason.starts_with("amount mismatch"))
        .times(1)
        .return_once(move |_, _, _| Ok(failed));

    let recorded = harness
        .build()
        .record_payment(confirmation(&payment, Money::naira(3_000), succeeded()))
        .await
        .expect("recorded");

    assert_eq!(recorded.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn gateway_failure_outcome_marks_payment_failed() {
    let owner = student();
    let payment = pending_payment(&invoice_for(&owner, 50_000), 30_000);
    let failed = Payment {
        status: PaymentStatus::Failed,
        ..payment.clone()
    };
    let mut harness = Harness::new().with_payment(&payment);
    harness
        .ledger
        .expect_mark_payment_failed()
        .withf(|_, reason, _| reason == "Declined")
        .times(1)
        .return_once(move |_, _, _| Ok(failed));

    let recorded = harness
        .build()
        .record_payment(confirmation(
            &payment,
            payment.amount,
            GatewayOutcome::Failed {
                reason: "Declined".to_owned(),
            },
        ))
        .await
        .expect("recorded");

    assert_eq!(recorded.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn repeated_confirmation_is_a_no_op() {
    let owner = student();
    let payment = Payment {
        status: PaymentStatus::Completed,
        ..pending_payment(&invoice_for(&owner, 50_000), 30_000)
    };
    let mut harness = Harness::new().with_payment(&payment);
    harness.ledger.expect_complete_payment().times(0);
    harness.ledger.expect_mark_payment_failed().times(0);

    let recorded = harness
        .build()
        .record_payment(confirmation(&payment, payment.amount, succeeded()))
        .await
        .expect("no-op");

    assert_eq!(recorded, payment);
}

#[rstest]
#[case::timeout(
    PaymentGatewayError::timeout("read timed out"),
    ErrorCode::GatewayTimeout,
    "gateway_timeout"
)]
#[case::transport(
    PaymentGatewayError::transport("connection refused"),
    ErrorCode::ServiceUnavailable,
    "gateway_transport"
)]
#[tokio::test]
async fn unreachable_gateway_leaves_records_untouched(
    #[case] failure: PaymentGatewayError,
    #[case] expected: ErrorCode,
    #[case] detail_code: &str,
) {
    let owner = student();
    let payment = pending_payment(&invoice_for(&owner, 50_000), 30_000);
    let mut harness = Harness::new().with_student(&owner).with_payment(&payment);
    harness
        .gateway
        .expect_verify()
        .times(1)
        .return_once(move |_| Err(failure));
    harness.ledger.expect_complete_payment().times(0);
    harness.ledger.expect_mark_payment_failed().times(0);

    let error = harness
        .build()
        .reconcile_payment(&owner, &payment.reference)
        .await
        .expect_err("gateway unavailable");

    assert_eq!(error.code(), expected);
    let details = error.details().expect("gateway details");
    assert_eq!(details["code"], detail_code);
    assert_eq!(details["reference"], payment.reference.as_str());
}

#[tokio::test]
async fn reconciling_settled_payment_skips_gateway() {
    let owner = student();
    let payment = Payment {
        status: PaymentStatus::Failed,
        ..pending_payment(&invoice_for(&owner, 50_000), 30_000)
    };
    let mut harness = Harness::new().with_payment(&payment);
    harness.gateway.expect_verify().times(0);

    let reconciled = harness
        .build()
        .reconcile(&payment.reference)
        .await
        .expect("settled");

    assert_eq!(reconciled.status, PaymentStatus::Failed);
}

#[rstest]
#[case::unpaid(0, false)]
#[case::partial(30_000, false)]
#[case::paid(50_000, true)]
#[tokio::test]
async fn tuition_is_paid_only_when_invoice_is_settled(#[case] paid: i64, #[case] expected: bool) {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000)
        .credited(Money::naira(paid))
        .expect("credit");
    let mut harness = Harness::new();
    harness
        .ledger
        .expect_find_invoice_for_term()
        .return_once(move |_, _| Ok(Some(invoice)));

    let result = harness
        .build()
        .tuition_paid(&student_profile(&owner).id, &term())
        .await
        .expect("status");

    assert_eq!(result, expected);
}

#[tokio::test]
async fn tuition_without_invoice_is_unpaid() {
    let mut harness = Harness::new();
    harness
        .ledger
        .expect_find_invoice_for_term()
        .return_once(|_, _| Ok(None));

    let result = harness
        .build()
        .tuition_paid(&StudentId::random(), &term())
        .await
        .expect("status");

    assert!(!result);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_unauthorized() {
    let mut harness = Harness::new();
    harness
        .gateway
        .expect_decode_webhook()
        .return_once(|_, _| Err(PaymentGatewayError::signature("digest mismatch")));
    harness.ledger.expect_find_payment().times(0);

    let error = harness
        .build()
        .accept_webhook(b"{}", Some("00".to_owned()))
        .await
        .expect_err("rejected");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn webhook_without_outcome_is_acknowledged() {
    let mut harness = Harness::new();
    harness
        .gateway
        .expect_decode_webhook()
        .return_once(|_, _| Ok(None));
    harness.ledger.expect_find_payment().times(0);

    let recorded = harness
        .build()
        .accept_webhook(br#"{"event":"transfer.success"}"#, Some("ab".to_owned()))
        .await
        .expect("acknowledged");

    assert!(recorded.is_none());
}

#[tokio::test]
async fn webhook_for_completed_payment_is_idempotent() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let payment = Payment {
        status: PaymentStatus::Completed,
        ..pending_payment(&invoice, 50_000)
    };
    let decoded = confirmation(&payment, payment.amount, succeeded());
    let mut harness = Harness::new().with_payment(&payment);
    harness
        .gateway
        .expect_decode_webhook()
        .return_once(move |_, _| Ok(Some(decoded)));
    harness.ledger.expect_complete_payment().times(0);

    let recorded = harness
        .build()
        .accept_webhook(b"{}", Some("ab".to_owned()))
        .await
        .expect("recorded")
        .expect("payment returned");

    assert_eq!(recorded.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn unfinished_checkout_stays_pending_until_the_webhook_succeeds() {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let payment = pending_payment(&invoice, 50_000);
    let mut harness = Harness::new().with_student(&owner).with_payment(&payment);
    let verified = confirmation(&payment, payment.amount, GatewayOutcome::Pending);
    harness
        .gateway
        .expect_verify()
        .times(1)
        .return_once(move |_| Ok(verified));
    let decoded = confirmation(&payment, payment.amount, succeeded());
    harness
        .gateway
        .expect_decode_webhook()
        .times(1)
        .return_once(move |_, _| Ok(Some(decoded)));
    harness.ledger.expect_mark_payment_failed().times(0);
    let completed = Payment {
        status: PaymentStatus::Completed,
        ..payment.clone()
    };
    let credited = invoice.clone().credited(payment.amount).expect("credit");
    harness
        .ledger
        .expect_complete_payment()
        .times(1)
        .return_once(move |_, _| {
            Ok(PaymentCompletion::Completed {
                payment: completed,
                invoice: credited,
            })
        });
    let service = harness.build();

    let reconciled = service
        .reconcile_payment(&owner, &payment.reference)
        .await
        .expect("reconciled");
    assert_eq!(reconciled.status, PaymentStatus::Pending);

    let recorded = service
        .accept_webhook(b"{}", Some("ab".to_owned()))
        .await
        .expect("recorded")
        .expect("payment returned");
    assert_eq!(recorded.status, PaymentStatus::Completed);
}

#[rstest]
#[case::owner(None, true)]
#[case::desk_officer(Some(Role::DeskOfficer), true)]
#[case::ict(Some(Role::Ict), false)]
#[tokio::test]
async fn payments_are_listed_for_owner_and_finance_staff(
    #[case] role: Option<Role>,
    #[case] allowed: bool,
) {
    let owner = student();
    let invoice = invoice_for(&owner, 50_000);
    let payments = [pending_payment(&invoice, 50_000)];
    let harness = Harness::new()
        .with_student(&owner)
        .with_student_payments(&payments);
    let actor = role.map_or_else(|| owner.clone(), staff);

    let result = harness
        .build()
        .list_payments(&actor, &student_profile(&owner).id)
        .await;

    match result {
        Ok(listed) => {
            assert!(allowed);
            assert_eq!(listed, payments);
        }
        Err(error) => {
            assert!(!allowed);
            assert_eq!(error.code(), ErrorCode::Forbidden);
        }
    }
}

#[tokio::test]
async fn payment_lookup_hides_other_students_payments() {
    let owner = student();
    let payment = pending_payment(&invoice_for(&owner, 50_000), 50_000);
    let service = Harness::new()
        .with_student(&owner)
        .with_payment(&payment)
        .build();

    let found = service
        .get_payment(&owner, &payment.reference)
        .await
        .expect("owner sees it");
    assert_eq!(found, payment);

    let error = service
        .get_payment(&student(), &payment.reference)
        .await
        .expect_err("forbidden");
    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn bursar_summary_totals_the_term() {
    let owner = student();
    let unpaid = invoice_for(&owner, 50_000);
    let partial = invoice_for(&owner, 50_000)
        .credited(Money::naira(30_000))
        .expect("credit");
    let payments = vec![
        Payment {
            status: PaymentStatus::Completed,
            ..pending_payment(&partial, 30_000)
        },
        pending_payment(&unpaid, 50_000),
    ];
    let mut harness = Harness::new();
    harness
        .ledger
        .expect_list_term_invoices()
        .times(1)
        .return_once(move |_| Ok(vec![unpaid, partial]));
    harness
        .ledger
        .expect_list_term_payments()
        .times(1)
        .return_once(move |_| Ok(payments));

    let summary = harness
        .build()
        .ledger_summary(&staff(Role::Bursar), term())
        .await
        .expect("summary");

    assert_eq!(summary.invoices, 2);
    assert_eq!(summary.total_due, Money::naira(100_000));
    assert_eq!(summary.total_paid, Money::naira(30_000));
    assert_eq!(summary.total_outstanding, Money::naira(70_000));
    assert_eq!((summary.unpaid, summary.partial, summary.paid), (1, 1, 0));
    assert_eq!(summary.completed.amount, Money::naira(30_000));
    assert_eq!(summary.pending.count, 1);
}

#[tokio::test]
async fn desk_officer_cannot_read_the_bursar_summary() {
    let mut harness = Harness::new();
    harness.ledger.expect_list_term_invoices().times(0);

    let error = harness
        .build()
        .ledger_summary(&staff(Role::DeskOfficer), term())
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}
