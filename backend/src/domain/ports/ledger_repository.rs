//! Port for fee structures, invoices and payments.
//!
//! Payment completion is the only path that credits an invoice. Adapters
//! lock the payment row and then the invoice row and apply both updates in
//! one transaction. An invoice carries at most one pending payment, and no
//! credit takes its amount paid past its amount due.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    DepartmentCode, FeeStructure, Invoice, InvoiceId, Level, Money, Payment, PaymentReference,
    PaymentStatus, StudentId, Term,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger repository adapters.
    pub enum LedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "ledger repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "ledger repository query failed: {message}",
        /// A unique key is already taken.
        Duplicate { message: String } =>
            "ledger record already exists: {message}",
        /// A referenced record does not exist.
        Missing { message: String } =>
            "ledger record not found: {message}",
        /// The payment already left `pending`.
        PaymentSettled { status: PaymentStatus } =>
            "payment is already {status}",
        /// The invoice already has a pending payment.
        PaymentInProgress { reference: PaymentReference } =>
            "payment {reference} is still pending on this invoice",
        /// The amount is more than the invoice's outstanding balance.
        BalanceExceeded { balance: Money } =>
            "amount exceeds the outstanding balance of {balance}",
    }
}

/// Gateway details recorded when a payment completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettlement {
    /// Gateway transaction identifier.
    pub transaction_id: String,
    /// Receipt number to issue.
    pub receipt_number: String,
    /// Completion time.
    pub at: DateTime<Utc>,
}

/// Result of completing a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCompletion {
    /// This call completed the payment and credited the invoice.
    Completed {
        /// Completed payment.
        payment: Payment,
        /// Credited invoice.
        invoice: Invoice,
    },
    /// The payment had already completed; nothing changed.
    AlreadyCompleted {
        /// Stored payment.
        payment: Payment,
        /// Stored invoice.
        invoice: Invoice,
    },
}

impl PaymentCompletion {
    /// Payment after the call.
    pub fn payment(&self) -> &Payment {
        match self {
            Self::Completed { payment, .. } | Self::AlreadyCompleted { payment, .. } => payment,
        }
    }

    /// Invoice after the call.
    pub fn invoice(&self) -> &Invoice {
        match self {
            Self::Completed { invoice, .. } | Self::AlreadyCompleted { invoice, .. } => invoice,
        }
    }
}

/// Port for reading and writing ledger records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Persist a fee structure; `Duplicate` on a clashing department,
    /// level, and term.
    async fn insert_fee_structure(
        &self,
        structure: &FeeStructure,
    ) -> Result<(), LedgerRepositoryError>;

    /// Find the fee structure for a department, level, and term.
    async fn find_fee_structure(
        &self,
        department: &DepartmentCode,
        level: Level,
        term: &Term,
    ) -> Result<Option<FeeStructure>, LedgerRepositoryError>;

    /// List fee structures of a term.
    async fn list_fee_structures(
        &self,
        term: &Term,
    ) -> Result<Vec<FeeStructure>, LedgerRepositoryError>;

    /// Persist an invoice; `Duplicate` when the student already has one for
    /// the term.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), LedgerRepositoryError>;

    /// Find an invoice by id.
    async fn find_invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, LedgerRepositoryError>;

    /// Find a student's invoice for a term.
    async fn find_invoice_for_term(
        &self,
        student: &StudentId,
        term: &Term,
    ) -> Result<Option<Invoice>, LedgerRepositoryError>;

    /// List a student's invoices, newest term first.
    async fn list_invoices(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Invoice>, LedgerRepositoryError>;

    /// Persist a pending payment.
    ///
    /// Refused with `PaymentInProgress` while the invoice has another
    /// pending payment and with `BalanceExceeded` when the amount is more
    /// than the invoice's balance. Both checks run under the invoice lock.
    async fn insert_payment(&self, payment: &Payment) -> Result<(), LedgerRepositoryError>;

    /// A student's payments, newest first.
    async fn list_student_payments(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Payment>, LedgerRepositoryError>;

    /// Every invoice issued for a term.
    async fn list_term_invoices(&self, term: &Term) -> Result<Vec<Invoice>, LedgerRepositoryError>;

    /// Every payment made against a term's invoices.
    async fn list_term_payments(&self, term: &Term) -> Result<Vec<Payment>, LedgerRepositoryError>;

    /// Find a payment by reference.
    async fn find_payment(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Payment>, LedgerRepositoryError>;

    /// Record the gateway checkout on a pending payment.
    async fn attach_checkout(
        &self,
        reference: &PaymentReference,
        authorization_url: &str,
        access_code: &str,
    ) -> Result<Payment, LedgerRepositoryError>;

    /// Move a pending payment to `failed`.
    async fn mark_payment_failed(
        &self,
        reference: &PaymentReference,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Payment, LedgerRepositoryError>;

    /// Complete a pending payment, issue its receipt, and credit its
    /// invoice in one atomic unit.
    ///
    /// A credit larger than the invoice's balance is refused with
    /// `BalanceExceeded` and nothing changes.
    async fn complete_payment(
        &self,
        reference: &PaymentReference,
        settlement: &PaymentSettlement,
    ) -> Result<PaymentCompletion, LedgerRepositoryError>;
}
