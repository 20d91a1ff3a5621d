//! Fee structures, invoices and payments.
//!
//! Money is held in kobo as `i64`. Invoice status is never stored; it is
//! derived from the amounts on every read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::academic::{DepartmentCode, Level, Term};
use super::ids::{FeeStructureId, InvoiceId, PaymentId, StudentId};

/// Validation failures for ledger values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerValidationError {
    /// Amount string was not a decimal number.
    #[error("amount must be a decimal number of naira")]
    InvalidAmount,
    /// Amount had more than two decimal places.
    #[error("amount must have at most two decimal places")]
    TooPrecise,
    /// Amount was negative.
    #[error("amount must not be negative")]
    Negative,
    /// Amount overflowed the ledger range.
    #[error("amount is too large")]
    Overflow,
    /// A credit would take the amount paid past the amount due.
    #[error("credit exceeds the outstanding balance of {balance}")]
    ExceedsBalance {
        /// Balance left before the credit.
        balance: Money,
    },
    /// Fee structure name was blank.
    #[error("fee structure name must not be empty")]
    EmptyName,
    /// Fee structure components summed to zero.
    #[error("fee structure total must be positive")]
    ZeroTotal,
    /// Payment reference did not match `PAY-` plus ten hex digits.
    #[error("payment reference must be PAY- followed by ten upper-case hex digits")]
    InvalidReference,
    /// Payment status string was not recognised.
    #[error("unknown payment status `{0}`")]
    UnknownStatus(String),
}

/// Amount of money in kobo.
///
/// Serialised as a naira string with two decimal places, e.g. `"50000.00"`.
///
/// # Examples
/// ```
/// use college_backend::domain::Money;
///
/// let fee: Money = "50000".parse().unwrap();
/// assert_eq!(fee.kobo(), 5_000_000);
/// assert_eq!(fee.to_string(), "50000.00");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Money(i64);

impl Money {
    /// Zero naira.
    pub const ZERO: Self = Self(0);

    /// Wrap a kobo amount.
    pub const fn from_kobo(kobo: i64) -> Self {
        Self(kobo)
    }

    /// Whole naira.
    pub const fn naira(naira: i64) -> Self {
        Self(naira * 100)
    }

    /// Amount in kobo.
    pub const fn kobo(self) -> i64 {
        self.0
    }

    /// Whether the amount is strictly positive.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Sum, failing on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Difference clamped at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0).max(0))
    }

    /// Amount as an exact decimal of naira.
    pub fn as_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl FromStr for Money {
    type Err = LedgerValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| LedgerValidationError::InvalidAmount)?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(LedgerValidationError::Negative);
        }
        if value.normalize().scale() > 2 {
            return Err(LedgerValidationError::TooPrecise);
        }
        (value * Decimal::ONE_HUNDRED)
            .to_i64()
            .map(Self)
            .ok_or(LedgerValidationError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_decimal())
    }
}

impl TryFrom<String> for Money {
    type Error = LedgerValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_string()
    }
}

/// Line items of a fee structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeComponents {
    /// Tuition.
    pub tuition: Money,
    /// Library levy.
    pub library: Money,
    /// Laboratory levy.
    pub lab: Money,
    /// Sports levy.
    pub sports: Money,
    /// Medical levy.
    pub medical: Money,
    /// Anything else.
    pub other: Money,
}

impl FeeComponents {
    /// Sum of all components.
    pub fn total(&self) -> Result<Money, LedgerValidationError> {
        [
            self.library,
            self.lab,
            self.sports,
            self.medical,
            self.other,
        ]
        .into_iter()
        .try_fold(self.tuition, Money::checked_add)
        .ok_or(LedgerValidationError::Overflow)
    }
}

/// Fields supplied by the bursar.
#[derive(Debug, Clone)]
pub struct FeeStructureDraft {
    /// Display name.
    pub name: String,
    /// Department charged.
    pub department: DepartmentCode,
    /// Level charged.
    pub level: Level,
    /// Term charged.
    pub term: Term,
    /// Line items.
    pub components: FeeComponents,
}

/// Amount owed by every student of a department and level for a term.
///
/// ## Invariants
/// - `total` equals the sum of `components` and is positive.
/// - Unique per (department, level, term).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStructure {
    /// Identifier.
    pub id: FeeStructureId,
    /// Display name.
    pub name: String,
    /// Department charged.
    pub department: DepartmentCode,
    /// Level charged.
    pub level: Level,
    /// Term charged.
    pub term: Term,
    /// Line items.
    pub components: FeeComponents,
    /// Sum of the line items.
    pub total: Money,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl FeeStructure {
    /// Validate a draft.
    pub fn define(
        id: FeeStructureId,
        draft: FeeStructureDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerValidationError> {
        let name = draft.name.trim().to_owned();
        if name.is_empty() {
            return Err(LedgerValidationError::EmptyName);
        }
        let total = draft.components.total()?;
        if !total.is_positive() {
            return Err(LedgerValidationError::ZeroTotal);
        }
        Ok(Self {
            id,
            name,
            department: draft.department,
            level: draft.level,
            term: draft.term,
            components: draft.components,
            total,
            created_at,
        })
    }
}

/// Payment state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Nothing paid.
    Unpaid,
    /// Something paid, balance outstanding.
    Partial,
    /// Fully paid.
    Paid,
}

impl InvoiceStatus {
    /// Derive the status from the amounts.
    ///
    /// # Examples
    /// ```
    /// use college_backend::domain::{InvoiceStatus, Money};
    ///
    /// let due = Money::naira(50_000);
    /// assert_eq!(InvoiceStatus::from_amounts(Money::ZERO, due), InvoiceStatus::Unpaid);
    /// assert_eq!(InvoiceStatus::from_amounts(Money::naira(30_000), due), InvoiceStatus::Partial);
    /// assert_eq!(InvoiceStatus::from_amounts(due, due), InvoiceStatus::Paid);
    /// ```
    pub fn from_amounts(paid: Money, due: Money) -> Self {
        if paid >= due {
            Self::Paid
        } else if paid.is_positive() {
            Self::Partial
        } else {
            Self::Unpaid
        }
    }

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }
}

/// Bill for one student's term.
///
/// ## Invariants
/// - `amount_paid` never decreases and never exceeds `amount_due`.
/// - Status is always [`InvoiceStatus::from_amounts`] of the amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Identifier.
    pub id: InvoiceId,
    /// Human-facing number, `INV-<year>-<hex>`.
    pub invoice_number: String,
    /// Billed student.
    pub student: StudentId,
    /// Billed term.
    pub term: Term,
    /// Fee structure the amount came from.
    pub fee_structure: FeeStructureId,
    /// Amount owed.
    pub amount_due: Money,
    /// Amount received so far.
    pub amount_paid: Money,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
}

impl Invoice {
    /// Issue an unpaid invoice from a fee structure.
    pub fn issue(
        id: InvoiceId,
        student: StudentId,
        fee_structure: &FeeStructure,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            invoice_number: invoice_number(fee_structure.term),
            student,
            term: fee_structure.term,
            fee_structure: fee_structure.id,
            amount_due: fee_structure.total,
            amount_paid: Money::ZERO,
            issued_at,
        }
    }

    /// Current status.
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_amounts(self.amount_paid, self.amount_due)
    }

    /// Outstanding balance, never negative.
    pub fn balance(&self) -> Money {
        self.amount_due.saturating_sub(self.amount_paid)
    }

    /// Return the invoice after crediting `amount`.
    ///
    /// # Errors
    /// [`LedgerValidationError::ExceedsBalance`] when `amount` is more than
    /// the outstanding balance.
    pub fn credited(mut self, amount: Money) -> Result<Self, LedgerValidationError> {
        let balance = self.balance();
        if amount > balance {
            return Err(LedgerValidationError::ExceedsBalance { balance });
        }
        self.amount_paid = self
            .amount_paid
            .checked_add(amount)
            .ok_or(LedgerValidationError::Overflow)?;
        Ok(self)
    }
}

fn short_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex.to_ascii_uppercase()
}

fn invoice_number(term: Term) -> String {
    format!("INV-{}-{}", term.session.start_year(), short_hex(8))
}

/// Receipt number issued when a payment completes.
pub fn receipt_number() -> String {
    format!("REC-{}", short_hex(8))
}

/// Merchant reference shared with the gateway, `PAY-` plus ten hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Generate a fresh reference.
    pub fn generate() -> Self {
        Self(format!("PAY-{}", short_hex(10)))
    }

    /// Borrow the reference text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for PaymentReference {
    type Err = LedgerValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid = trimmed.strip_prefix("PAY-").is_some_and(|digits| {
            digits.len() == 10
                && digits
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        });
        if valid {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(LedgerValidationError::InvalidReference)
        }
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = LedgerValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentReference> for String {
    fn from(value: PaymentReference) -> Self {
        value.0
    }
}

/// Lifecycle of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting gateway confirmation.
    Pending,
    /// Confirmed and credited to the invoice.
    Completed,
    /// Declined, reversed, or mismatched.
    Failed,
}

impl PaymentStatus {
    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = LedgerValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(LedgerValidationError::UnknownStatus(other.to_owned())),
        }
    }
}

/// A payment attempt against an invoice.
///
/// Leaves `pending` exactly once and is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Identifier.
    pub id: PaymentId,
    /// Gateway reference.
    pub reference: PaymentReference,
    /// Paying student.
    pub student: StudentId,
    /// Invoice credited on success.
    pub invoice: InvoiceId,
    /// Amount requested.
    pub amount: Money,
    /// Current status.
    pub status: PaymentStatus,
    /// Gateway checkout page.
    pub authorization_url: Option<String>,
    /// Gateway access code.
    pub access_code: Option<String>,
    /// Gateway transaction identifier, set on completion.
    pub gateway_transaction_id: Option<String>,
    /// Reason recorded on failure.
    pub failure_reason: Option<String>,
    /// Receipt number, set on completion.
    pub receipt_number: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time the payment left `pending`.
    pub settled_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Open a pending payment.
    pub fn open(
        id: PaymentId,
        student: StudentId,
        invoice: InvoiceId,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            reference: PaymentReference::generate(),
            student,
            invoice,
            amount,
            status: PaymentStatus::Pending,
            authorization_url: None,
            access_code: None,
            gateway_transaction_id: None,
            failure_reason: None,
            receipt_number: None,
            created_at,
            settled_at: None,
        }
    }
}

/// Count and amount of a group of payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTotals {
    /// Number of payments.
    pub count: u32,
    /// Sum of their amounts.
    pub amount: Money,
}

impl PaymentTotals {
    fn add(&mut self, amount: Money) {
        self.count += 1;
        self.amount = saturating_sum(self.amount, amount);
    }
}

/// Bursary totals for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Invoices issued.
    pub invoices: u32,
    /// Sum of amounts due.
    pub total_due: Money,
    /// Sum of amounts credited.
    pub total_paid: Money,
    /// Sum of outstanding balances.
    pub total_outstanding: Money,
    /// Invoices with nothing paid.
    pub unpaid: u32,
    /// Invoices partly paid.
    pub partial: u32,
    /// Invoices fully paid.
    pub paid: u32,
    /// Payments that credited an invoice.
    pub completed: PaymentTotals,
    /// Payments awaiting the gateway.
    pub pending: PaymentTotals,
    /// Payments that failed.
    pub failed: PaymentTotals,
}

impl LedgerSummary {
    /// Tally a term's invoices and payments.
    pub fn tally<'a>(
        invoices: impl IntoIterator<Item = &'a Invoice>,
        payments: impl IntoIterator<Item = &'a Payment>,
    ) -> Self {
        let mut summary = invoices
            .into_iter()
            .fold(Self::default(), |mut summary, invoice| {
                summary.invoices += 1;
                summary.total_due = saturating_sum(summary.total_due, invoice.amount_due);
                summary.total_paid = saturating_sum(summary.total_paid, invoice.amount_paid);
                summary.total_outstanding =
                    saturating_sum(summary.total_outstanding, invoice.balance());
                match invoice.status() {
                    InvoiceStatus::Unpaid => summary.unpaid += 1,
                    InvoiceStatus::Partial => summary.partial += 1,
                    InvoiceStatus::Paid => summary.paid += 1,
                }
                summary
            });
        for payment in payments {
            match payment.status {
                PaymentStatus::Completed => summary.completed.add(payment.amount),
                PaymentStatus::Pending => summary.pending.add(payment.amount),
                PaymentStatus::Failed => summary.failed.add(payment.amount),
            }
        }
        summary
    }
}

fn saturating_sum(total: Money, amount: Money) -> Money {
    total.checked_add(amount).unwrap_or(Money(i64::MAX))
}
