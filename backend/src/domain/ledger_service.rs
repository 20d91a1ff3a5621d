//! Fee ledger and payment reconciliation service.
//!
//! Payments open a gateway checkout and stay `pending` until a
//! confirmation arrives, either from a signed webhook or from an explicit
//! verification call. An invoice carries at most one pending payment; asking
//! again for the same amount hands back the open checkout. Only a successful
//! confirmation whose amount matches the payment credits the invoice.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::ports::{
    CheckoutRequest, GatewayOutcome, LedgerRepository, LedgerRepositoryError, LedgerWorkflow,
    PaymentCompletion, PaymentConfirmation, PaymentGateway, PaymentGatewayError,
    PaymentSettlement, PrincipalRepository, PrincipalRepositoryError, TuitionStatus, Workflow,
    WorkflowEvent, WorkflowMetrics,
};
use crate::domain::{
    Action, Error, FeeStructure, FeeStructureDraft, FeeStructureId, Invoice, InvoiceId,
    InvoiceStatus, LedgerSummary, Money, Payment, PaymentId, PaymentReference, PaymentStatus,
    Principal, Resource, StudentId, StudentProfile, Term, authorize, receipt_number,
};

/// Driven ports used by [`LedgerService`].
#[derive(Clone)]
pub struct LedgerServicePorts {
    /// Fee structure, invoice and payment persistence.
    pub ledger: Arc<dyn LedgerRepository>,
    /// Student lookups.
    pub principals: Arc<dyn PrincipalRepository>,
    /// External payment gateway.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Outcome counters.
    pub metrics: Arc<dyn WorkflowMetrics>,
}

fn map_ledger_error(error: LedgerRepositoryError) -> Error {
    match error {
        LedgerRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("ledger repository unavailable: {message}"))
        }
        LedgerRepositoryError::Query { message } => {
            Error::internal(format!("ledger repository error: {message}"))
        }
        LedgerRepositoryError::Duplicate { message } => {
            Error::conflict(format!("ledger record already exists: {message}"))
                .with_details(json!({ "code": "duplicate" }))
        }
        LedgerRepositoryError::Missing { message } => {
            Error::not_found(format!("ledger record not found: {message}"))
        }
        LedgerRepositoryError::PaymentSettled { status } => {
            Error::conflict(format!("payment is already {status}"))
                .with_details(json!({ "code": "payment_settled", "status": status.as_str() }))
        }
        LedgerRepositoryError::PaymentInProgress { reference } => {
            Error::conflict(format!("payment {reference} is still pending on this invoice"))
                .with_details(json!({
                    "code": "payment_in_progress",
                    "reference": reference.as_str(),
                }))
        }
        LedgerRepositoryError::BalanceExceeded { balance } => {
            Error::conflict(format!("amount exceeds the outstanding balance of {balance}"))
                .with_details(json!({
                    "code": "balance_exceeded",
                    "balance": balance.to_string(),
                }))
        }
    }
}

fn map_principal_error(error: PrincipalRepositoryError) -> Error {
    match error {
        PrincipalRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("principal repository unavailable: {message}"))
        }
        other => Error::internal(format!("principal repository error: {other}")),
    }
}

fn map_gateway_error(error: &PaymentGatewayError, reference: &PaymentReference) -> Error {
    let details = json!({
        "code": format!("gateway_{}", error.variant_name()),
        "reference": reference.as_str(),
    });
    let mapped = match error {
        PaymentGatewayError::Timeout { .. } => {
            Error::gateway_timeout(format!("payment gateway timed out; retry {reference}"))
        }
        PaymentGatewayError::Transport { .. } => {
            Error::service_unavailable("payment gateway is unreachable")
        }
        PaymentGatewayError::Rejected { message } => {
            Error::service_unavailable(format!("payment gateway refused the request: {message}"))
        }
        PaymentGatewayError::Decode { .. } => {
            Error::service_unavailable("payment gateway answered with an unreadable response")
        }
        PaymentGatewayError::Signature { .. } => {
            Error::unauthorized("payment webhook signature rejected")
        }
    };
    mapped.with_details(details)
}

/// Ledger workflow over the driven ports.
pub struct LedgerService {
    ledger: Arc<dyn LedgerRepository>,
    principals: Arc<dyn PrincipalRepository>,
    gateway: Arc<dyn PaymentGateway>,
    metrics: Arc<dyn WorkflowMetrics>,
    clock: Arc<dyn Clock>,
    callback_url: Option<String>,
}

impl LedgerService {
    /// Build the service.
    pub fn new(ports: LedgerServicePorts, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: ports.ledger,
            principals: ports.principals,
            gateway: ports.gateway,
            metrics: ports.metrics,
            clock,
            callback_url: None,
        }
    }

    /// Page the gateway redirects payers to after checkout.
    #[must_use]
    pub fn with_callback_url(mut self, callback_url: Option<String>) -> Self {
        self.callback_url = callback_url;
        self
    }

    /// Verify a reference with the gateway and record the outcome.
    ///
    /// Used by operators through the admin CLI, so no actor is checked.
    /// Settled payments are returned unchanged without contacting the
    /// gateway. Timeouts and transport failures leave every record
    /// untouched so the call can be retried with the same reference.
    pub async fn reconcile(&self, reference: &PaymentReference) -> Result<Payment, Error> {
        let payment = self.payment(reference).await?;
        if payment.status != PaymentStatus::Pending {
            return Ok(payment);
        }

        let confirmation = match self.gateway.verify(reference).await {
            Ok(confirmation) => confirmation,
            Err(err) => {
                warn!(error = %err, %reference, "payment verification failed");
                self.count("verification_failed").await;
                return Err(map_gateway_error(&err, reference));
            }
        };
        if confirmation.reference != *reference {
            error!(
                %reference,
                reported = %confirmation.reference,
                "gateway verified a different reference"
            );
            return Err(Error::internal("gateway verified a different reference"));
        }
        self.record_payment(confirmation).await
    }

    async fn payment(&self, reference: &PaymentReference) -> Result<Payment, Error> {
        self.ledger
            .find_payment(reference)
            .await
            .map_err(map_ledger_error)?
            .ok_or_else(|| Error::not_found(format!("payment {reference} not found")))
    }

    async fn invoice(&self, id: &InvoiceId) -> Result<Invoice, Error> {
        self.ledger
            .find_invoice(id)
            .await
            .map_err(map_ledger_error)?
            .ok_or_else(|| Error::not_found(format!("invoice {id} not found")))
    }

    async fn pending_payment(
        &self,
        student: &StudentId,
        invoice: &InvoiceId,
    ) -> Result<Option<Payment>, Error> {
        let payments = self
            .ledger
            .list_student_payments(student)
            .await
            .map_err(map_ledger_error)?;
        Ok(payments.into_iter().find(|payment| {
            payment.invoice == *invoice && payment.status == PaymentStatus::Pending
        }))
    }

    async fn student(&self, id: &StudentId) -> Result<(Principal, StudentProfile), Error> {
        let principal = self
            .principals
            .find_by_student(id)
            .await
            .map_err(map_principal_error)?
            .ok_or_else(|| Error::not_found(format!("student {id} not found")))?;
        let profile = principal
            .student()
            .cloned()
            .ok_or_else(|| Error::internal(format!("principal for student {id} has no profile")))?;
        Ok((principal, profile))
    }

    async fn count(&self, outcome: &'static str) {
        let event = WorkflowEvent::new(Workflow::Payment, outcome);
        if let Err(err) = self.metrics.record(event).await {
            warn!(error = %err, outcome, "failed to record payment metric");
        }
    }

    async fn fail_payment(&self, payment: &Payment, reason: &str) -> Result<Payment, Error> {
        let failed = self
            .ledger
            .mark_payment_failed(&payment.reference, reason, self.clock.utc())
            .await
            .map_err(map_ledger_error)?;
        info!(reference = %failed.reference, reason, "payment failed");
        Ok(failed)
    }

    async fn complete(
        &self,
        payment: &Payment,
        transaction_id: String,
    ) -> Result<Payment, Error> {
        let settlement = PaymentSettlement {
            transaction_id,
            receipt_number: receipt_number(),
            at: self.clock.utc(),
        };
        match self
            .ledger
            .complete_payment(&payment.reference, &settlement)
            .await
        {
            Ok(PaymentCompletion::Completed { payment, invoice }) => {
                info!(
                    reference = %payment.reference,
                    invoice = %invoice.invoice_number,
                    amount = %payment.amount,
                    amount_paid = %invoice.amount_paid,
                    status = invoice.status().as_str(),
                    "payment completed"
                );
                self.count("completed").await;
                Ok(payment)
            }
            Ok(PaymentCompletion::AlreadyCompleted { payment, .. }) => Ok(payment),
            Err(LedgerRepositoryError::PaymentSettled {
                status: PaymentStatus::Completed,
            }) => self.payment(&payment.reference).await,
            Err(err) => Err(map_ledger_error(err)),
        }
    }
}

#[async_trait]
impl LedgerWorkflow for LedgerService {
    async fn define_fee_structure(
        &self,
        actor: &Principal,
        draft: FeeStructureDraft,
    ) -> Result<FeeStructure, Error> {
        authorize(actor, Action::DefineFeeStructure, Resource::Institution)?;
        let structure = FeeStructure::define(FeeStructureId::random(), draft, self.clock.utc())
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        self.ledger
            .insert_fee_structure(&structure)
            .await
            .map_err(|err| match err {
                LedgerRepositoryError::Duplicate { .. } => Error::conflict(format!(
                    "a fee structure for {} level {} in {} already exists",
                    structure.department.as_str(),
                    structure.level,
                    structure.term
                ))
                .with_details(json!({ "code": "fee_structure_exists" })),
                other => map_ledger_error(other),
            })?;
        info!(
            fee_structure = %structure.id,
            department = structure.department.as_str(),
            level = %structure.level,
            term = %structure.term,
            total = %structure.total,
            "fee structure defined"
        );
        Ok(structure)
    }

    async fn list_fee_structures(
        &self,
        actor: &Principal,
        term: Term,
    ) -> Result<Vec<FeeStructure>, Error> {
        authorize(actor, Action::ViewFinance, Resource::Institution)?;
        self.ledger
            .list_fee_structures(&term)
            .await
            .map_err(map_ledger_error)
    }

    async fn generate_invoice(
        &self,
        actor: &Principal,
        student: &StudentId,
        term: Term,
    ) -> Result<Invoice, Error> {
        let (_, profile) = self.student(student).await?;
        authorize(actor, Action::GenerateInvoice, Resource::Student(&profile))?;

        if let Some(existing) = self
            .ledger
            .find_invoice_for_term(&profile.id, &term)
            .await
            .map_err(map_ledger_error)?
        {
            return Ok(existing);
        }

        let structure = self
            .ledger
            .find_fee_structure(&profile.department, profile.level, &term)
            .await
            .map_err(map_ledger_error)?
            .ok_or_else(|| {
                Error::no_fee_structure_defined(format!(
                    "no fee structure for {} level {} in {term}",
                    profile.department.as_str(),
                    profile.level
                ))
                .with_details(json!({
                    "department": profile.department.as_str(),
                    "level": profile.level.value(),
                    "session": term.session.to_string(),
                    "semester": term.semester.as_str(),
                }))
            })?;

        let invoice = Invoice::issue(InvoiceId::random(), profile.id, &structure, self.clock.utc());
        match self.ledger.insert_invoice(&invoice).await {
            Ok(()) => {
                info!(
                    invoice = %invoice.invoice_number,
                    student = %profile.id,
                    amount_due = %invoice.amount_due,
                    "invoice issued"
                );
                Ok(invoice)
            }
            // A concurrent request issued it first.
            Err(LedgerRepositoryError::Duplicate { .. }) => self
                .ledger
                .find_invoice_for_term(&profile.id, &term)
                .await
                .map_err(map_ledger_error)?
                .ok_or_else(|| Error::internal("invoice vanished after a duplicate insert")),
            Err(err) => Err(map_ledger_error(err)),
        }
    }

    async fn get_invoice(&self, actor: &Principal, id: &InvoiceId) -> Result<Invoice, Error> {
        let invoice = self.invoice(id).await?;
        let (_, profile) = self.student(&invoice.student).await?;
        authorize(actor, Action::ViewFinance, Resource::Student(&profile))?;
        Ok(invoice)
    }

    async fn list_invoices(
        &self,
        actor: &Principal,
        student: &StudentId,
    ) -> Result<Vec<Invoice>, Error> {
        let (_, profile) = self.student(student).await?;
        authorize(actor, Action::ViewFinance, Resource::Student(&profile))?;
        self.ledger
            .list_invoices(&profile.id)
            .await
            .map_err(map_ledger_error)
    }

    async fn initiate_payment(
        &self,
        actor: &Principal,
        invoice_id: &InvoiceId,
        amount: Option<Money>,
    ) -> Result<Payment, Error> {
        let invoice = self.invoice(invoice_id).await?;
        let (payer, profile) = self.student(&invoice.student).await?;
        authorize(actor, Action::InitiatePayment, Resource::Student(&profile))?;

        let balance = invoice.balance();
        if !balance.is_positive() {
            return Err(Error::conflict(format!(
                "invoice {} is already paid",
                invoice.invoice_number
            ))
            .with_details(json!({ "code": "invoice_settled" })));
        }
        if let Some(open) = self.pending_payment(&profile.id, &invoice.id).await? {
            if amount.is_none_or(|wanted| wanted == open.amount) {
                info!(
                    reference = %open.reference,
                    invoice = %invoice.invoice_number,
                    "payment checkout reused"
                );
                return Ok(open);
            }
            return Err(map_ledger_error(LedgerRepositoryError::payment_in_progress(
                open.reference,
            )));
        }
        let amount = amount.unwrap_or(balance);
        if !amount.is_positive() || amount > balance {
            return Err(Error::invalid_request(format!(
                "amount must be positive and at most the outstanding balance of {balance}"
            ))
            .with_details(json!({
                "field": "amount",
                "code": "invalid_amount",
                "balance": balance,
            })));
        }

        let payment = Payment::open(
            PaymentId::random(),
            profile.id,
            invoice.id,
            amount,
            self.clock.utc(),
        );
        self.ledger
            .insert_payment(&payment)
            .await
            .map_err(map_ledger_error)?;

        let request = CheckoutRequest {
            reference: payment.reference.clone(),
            email: payer.email().to_owned(),
            amount,
            callback_url: self.callback_url.clone(),
            metadata: json!({
                "invoiceNumber": invoice.invoice_number,
                "studentId": profile.id,
                "matricNumber": profile.matric_number,
            }),
        };
        match self.gateway.initialize(&request).await {
            Ok(session) => {
                let opened = self
                    .ledger
                    .attach_checkout(
                        &payment.reference,
                        &session.authorization_url,
                        &session.access_code,
                    )
                    .await
                    .map_err(map_ledger_error)?;
                info!(
                    reference = %opened.reference,
                    invoice = %invoice.invoice_number,
                    amount = %opened.amount,
                    "payment initiated"
                );
                self.count("initiated").await;
                Ok(opened)
            }
            Err(err) => {
                warn!(error = %err, reference = %payment.reference, "checkout could not be opened");
                self.fail_payment(&payment, &err.to_string()).await?;
                self.count("checkout_failed").await;
                Err(map_gateway_error(&err, &payment.reference))
            }
        }
    }

    async fn list_payments(
        &self,
        actor: &Principal,
        student: &StudentId,
    ) -> Result<Vec<Payment>, Error> {
        let (_, profile) = self.student(student).await?;
        authorize(actor, Action::ViewFinance, Resource::Student(&profile))?;
        self.ledger
            .list_student_payments(&profile.id)
            .await
            .map_err(map_ledger_error)
    }

    async fn get_payment(
        &self,
        actor: &Principal,
        reference: &PaymentReference,
    ) -> Result<Payment, Error> {
        let payment = self.payment(reference).await?;
        let (_, profile) = self.student(&payment.student).await?;
        authorize(actor, Action::ViewFinance, Resource::Student(&profile))?;
        Ok(payment)
    }

    async fn ledger_summary(&self, actor: &Principal, term: Term) -> Result<LedgerSummary, Error> {
        authorize(actor, Action::ViewLedgerSummary, Resource::Institution)?;
        let invoices = self
            .ledger
            .list_term_invoices(&term)
            .await
            .map_err(map_ledger_error)?;
        let payments = self
            .ledger
            .list_term_payments(&term)
            .await
            .map_err(map_ledger_error)?;
        Ok(LedgerSummary::tally(&invoices, &payments))
    }

    async fn record_payment(&self, confirmation: PaymentConfirmation) -> Result<Payment, Error> {
        let payment = self.payment(&confirmation.reference).await?;
        match payment.status {
            PaymentStatus::Completed => return Ok(payment),
            PaymentStatus::Failed => {
                return Err(Error::conflict(format!(
                    "payment {} has already failed",
                    payment.reference
                ))
                .with_details(json!({ "code": "payment_settled", "status": "failed" })));
            }
            PaymentStatus::Pending => {}
        }

        match confirmation.outcome {
            GatewayOutcome::Pending => Ok(payment),
            GatewayOutcome::Failed { reason } => {
                let failed = self.fail_payment(&payment, &reason).await?;
                self.count("failed").await;
                Ok(failed)
            }
            GatewayOutcome::Succeeded { .. } if confirmation.amount != payment.amount => {
                warn!(
                    reference = %payment.reference,
                    expected = %payment.amount,
                    reported = %confirmation.amount,
                    "gateway amount does not match payment"
                );
                let reason = format!(
                    "amount mismatch: expected {}, gateway reported {}",
                    payment.amount, confirmation.amount
                );
                let failed = self.fail_payment(&payment, &reason).await?;
                self.count("amount_mismatch").await;
                Ok(failed)
            }
            GatewayOutcome::Succeeded { transaction_id } => {
                self.complete(&payment, transaction_id).await
            }
        }
    }

    async fn accept_webhook(
        &self,
        body: &[u8],
        signature: Option<String>,
    ) -> Result<Option<Payment>, Error> {
        let confirmation = match self.gateway.decode_webhook(body, signature) {
            Ok(Some(confirmation)) => confirmation,
            Ok(None) => return Ok(None),
            Err(PaymentGatewayError::Signature { message }) => {
                warn!(reason = %message, "webhook signature rejected");
                self.count("webhook_rejected").await;
                return Err(Error::unauthorized("payment webhook signature rejected")
                    .with_details(json!({ "code": "invalid_signature" })));
            }
            Err(err) => {
                warn!(error = %err, "webhook body could not be decoded");
                return Err(Error::invalid_request(format!("unreadable webhook: {err}"))
                    .with_details(json!({ "code": "invalid_webhook" })));
            }
        };
        self.record_payment(confirmation).await.map(Some)
    }

    async fn reconcile_payment(
        &self,
        actor: &Principal,
        reference: &PaymentReference,
    ) -> Result<Payment, Error> {
        let payment = self.payment(reference).await?;
        let (_, profile) = self.student(&payment.student).await?;
        authorize(actor, Action::ReconcilePayment, Resource::Student(&profile))?;
        self.reconcile(reference).await
    }

    async fn is_tuition_paid(
        &self,
        actor: &Principal,
        student: &StudentId,
        term: Term,
    ) -> Result<bool, Error> {
        let (_, profile) = self.student(student).await?;
        authorize(actor, Action::ViewFinance, Resource::Student(&profile))?;
        self.tuition_paid(&profile.id, &term).await
    }
}

#[async_trait]
impl TuitionStatus for LedgerService {
    async fn tuition_paid(&self, student: &StudentId, term: &Term) -> Result<bool, Error> {
        let invoice = self
            .ledger
            .find_invoice_for_term(student, term)
            .await
            .map_err(map_ledger_error)?;
        Ok(invoice.is_some_and(|invoice| invoice.status() == InvoiceStatus::Paid))
    }
}

#[cfg(test)]
#[path = "ledger_service_tests.rs"]
mod tests;
