//! Driving ports for the fee ledger and payment reconciliation.

use async_trait::async_trait;

use crate::domain::{
    Error, FeeStructure, FeeStructureDraft, Invoice, InvoiceId, LedgerSummary, Money, Payment,
    PaymentReference, Principal, StudentId, Term,
};

use super::PaymentConfirmation;

/// Ledger use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerWorkflow: Send + Sync {
    /// Define the fees for a department, level, and term.
    async fn define_fee_structure(
        &self,
        actor: &Principal,
        draft: FeeStructureDraft,
    ) -> Result<FeeStructure, Error>;

    /// List a term's fee structures.
    async fn list_fee_structures(
        &self,
        actor: &Principal,
        term: Term,
    ) -> Result<Vec<FeeStructure>, Error>;

    /// Issue (or return the existing) invoice for a student's term.
    async fn generate_invoice(
        &self,
        actor: &Principal,
        student: &StudentId,
        term: Term,
    ) -> Result<Invoice, Error>;

    /// Fetch one invoice.
    async fn get_invoice(&self, actor: &Principal, id: &InvoiceId) -> Result<Invoice, Error>;

    /// A student's invoices.
    async fn list_invoices(
        &self,
        actor: &Principal,
        student: &StudentId,
    ) -> Result<Vec<Invoice>, Error>;

    /// Open a pending payment and its gateway checkout.
    ///
    /// An invoice has at most one pending payment: repeating the request
    /// with no amount or the same amount returns the open payment.
    async fn initiate_payment(
        &self,
        actor: &Principal,
        invoice: &InvoiceId,
        amount: Option<Money>,
    ) -> Result<Payment, Error>;

    /// A student's payments, newest first.
    async fn list_payments(
        &self,
        actor: &Principal,
        student: &StudentId,
    ) -> Result<Vec<Payment>, Error>;

    /// Fetch one payment by reference.
    async fn get_payment(
        &self,
        actor: &Principal,
        reference: &PaymentReference,
    ) -> Result<Payment, Error>;

    /// Invoice and payment totals for a term.
    async fn ledger_summary(&self, actor: &Principal, term: Term) -> Result<LedgerSummary, Error>;

    /// Apply a gateway confirmation to its pending payment.
    async fn record_payment(&self, confirmation: PaymentConfirmation) -> Result<Payment, Error>;

    /// Authenticate a gateway webhook and record the confirmation it carries.
    ///
    /// Returns `None` for events without a payment outcome.
    async fn accept_webhook(
        &self,
        body: &[u8],
        signature: Option<String>,
    ) -> Result<Option<Payment>, Error>;

    /// Verify a reference with the gateway and record the result.
    async fn reconcile_payment(
        &self,
        actor: &Principal,
        reference: &PaymentReference,
    ) -> Result<Payment, Error>;

    /// Whether the student's invoice for the term is paid.
    async fn is_tuition_paid(
        &self,
        actor: &Principal,
        student: &StudentId,
        term: Term,
    ) -> Result<bool, Error>;
}

/// The paid signal consulted by registration finalisation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TuitionStatus: Send + Sync {
    /// Whether the student's invoice for the term is `paid`.
    async fn tuition_paid(&self, student: &StudentId, term: &Term) -> Result<bool, Error>;
}
