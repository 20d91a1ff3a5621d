//! PostgreSQL-backed fee ledger adapter.
//!
//! Payment state changes lock the payment row; completion also locks the
//! invoice so the credit and the status change commit together. Opening a
//! payment locks the invoice while it checks for another pending payment
//! and for the balance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    LedgerRepository, LedgerRepositoryError, PaymentCompletion, PaymentSettlement,
};
use crate::domain::{
    DepartmentCode, FeeStructure, Invoice, InvoiceId, LedgerValidationError, Level, Payment,
    PaymentReference, PaymentStatus, StudentId, Term,
};

use super::diesel_error_mapping::{RepositoryError, TxError};
use super::models::{FeeStructureRow, InvoiceRow, PaymentRow, term_columns};
use super::pool::DbPool;
use super::schema::{fee_structures, invoices, payments};

type Tx = TxError<LedgerRepositoryError>;

/// Diesel-backed implementation of [`LedgerRepository`].
#[derive(Clone)]
pub struct DieselLedgerRepository {
    pool: DbPool,
}

impl DieselLedgerRepository {
    /// Create a repository over the given pool.
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Lock a pending payment, apply `change` and write it back.
    async fn update_pending<F>(
        &self,
        reference: &PaymentReference,
        change: F,
    ) -> Result<Payment, LedgerRepositoryError>
    where
        F: FnOnce(Payment) -> Payment + Send,
    {
        let reference = reference.as_str().to_owned();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        conn.transaction::<_, Tx, _>(|conn| {
            async move {
                let current = lock_payment(conn, &reference).await?;
                if current.status != PaymentStatus::Pending {
                    return Err(Tx::Refused(LedgerRepositoryError::payment_settled(
                        current.status,
                    )));
                }
                let updated = change(current);
                write_payment(conn, &updated).await?;
                Ok(updated)
            }
            .scope_boxed()
        })
        .await
        .map_err(Tx::into_repository_error)
    }
}

async fn lock_payment(conn: &mut AsyncPgConnection, reference: &str) -> Result<Payment, Tx> {
    let row = payments::table
        .filter(payments::reference.eq(reference))
        .select(PaymentRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| {
            Tx::Refused(LedgerRepositoryError::missing(format!("payment {reference}")))
        })?;
    row.into_domain().map_err(Tx::corrupt)
}

async fn lock_invoice(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Invoice, Tx> {
    let row = invoices::table
        .find(id)
        .select(InvoiceRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| Tx::Refused(LedgerRepositoryError::missing(format!("invoice {id}"))))?;
    row.into_domain().map_err(Tx::corrupt)
}

async fn write_payment(conn: &mut AsyncPgConnection, payment: &Payment) -> Result<(), Tx> {
    let row = PaymentRow::from_domain(payment);
    diesel::update(payments::table.find(row.id))
        .set((
            payments::status.eq(&row.status),
            payments::authorization_url.eq(&row.authorization_url),
            payments::access_code.eq(&row.access_code),
            payments::gateway_transaction_id.eq(&row.gateway_transaction_id),
            payments::failure_reason.eq(&row.failure_reason),
            payments::receipt_number.eq(&row.receipt_number),
            payments::settled_at.eq(row.settled_at),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

fn convert_invoice(row: Option<InvoiceRow>) -> Result<Option<Invoice>, LedgerRepositoryError> {
    row.map(InvoiceRow::into_domain)
        .transpose()
        .map_err(LedgerRepositoryError::query)
}

fn convert_payments(rows: Vec<PaymentRow>) -> Result<Vec<Payment>, LedgerRepositoryError> {
    rows.into_iter()
        .map(PaymentRow::into_domain)
        .collect::<Result<Vec<_>, _>>()
        .map_err(LedgerRepositoryError::query)
}

#[async_trait]
impl LedgerRepository for DieselLedgerRepository {
    async fn insert_fee_structure(
        &self,
        structure: &FeeStructure,
    ) -> Result<(), LedgerRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        diesel::insert_into(fee_structures::table)
            .values(&FeeStructureRow::from_domain(structure))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(LedgerRepositoryError::from_diesel)
    }

    async fn find_fee_structure(
        &self,
        department: &DepartmentCode,
        level: Level,
        term: &Term,
    ) -> Result<Option<FeeStructure>, LedgerRepositoryError> {
        let (session_start, semester) = term_columns(term);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let row = fee_structures::table
            .filter(fee_structures::department.eq(department.as_str()))
            .filter(fee_structures::level.eq(i32::from(level.value())))
            .filter(fee_structures::session_start.eq(session_start))
            .filter(fee_structures::semester.eq(semester))
            .select(FeeStructureRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(LedgerRepositoryError::from_diesel)?;
        row.map(FeeStructureRow::into_domain)
            .transpose()
            .map_err(LedgerRepositoryError::query)
    }

    async fn list_fee_structures(
        &self,
        term: &Term,
    ) -> Result<Vec<FeeStructure>, LedgerRepositoryError> {
        let (session_start, semester) = term_columns(term);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let rows: Vec<FeeStructureRow> = fee_structures::table
            .filter(fee_structures::session_start.eq(session_start))
            .filter(fee_structures::semester.eq(semester))
            .order_by((fee_structures::department.asc(), fee_structures::level.asc()))
            .select(FeeStructureRow::as_select())
            .load(&mut conn)
            .await
            .map_err(LedgerRepositoryError::from_diesel)?;
        rows.into_iter()
            .map(FeeStructureRow::into_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerRepositoryError::query)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), LedgerRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        diesel::insert_into(invoices::table)
            .values(&InvoiceRow::from_domain(invoice))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(LedgerRepositoryError::from_diesel)
    }

    async fn find_invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, LedgerRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let row = invoices::table
            .find(*id.as_uuid())
            .select(InvoiceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(LedgerRepositoryError::from_diesel)?;
        convert_invoice(row)
    }

    async fn find_invoice_for_term(
        &self,
        student: &StudentId,
        term: &Term,
    ) -> Result<Option<Invoice>, LedgerRepositoryError> {
        let (session_start, semester) = term_columns(term);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let row = invoices::table
            .filter(invoices::student_id.eq(*student.as_uuid()))
            .filter(invoices::session_start.eq(session_start))
            .filter(invoices::semester.eq(semester))
            .select(InvoiceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(LedgerRepositoryError::from_diesel)?;
        convert_invoice(row)
    }

    async fn list_invoices(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Invoice>, LedgerRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let rows: Vec<InvoiceRow> = invoices::table
            .filter(invoices::student_id.eq(*student.as_uuid()))
            .order_by((invoices::session_start.desc(), invoices::semester.desc()))
            .select(InvoiceRow::as_select())
            .load(&mut conn)
            .await
            .map_err(LedgerRepositoryError::from_diesel)?;
        rows.into_iter()
            .map(InvoiceRow::into_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerRepositoryError::query)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), LedgerRepositoryError> {
        let row = PaymentRow::from_domain(payment);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        conn.transaction::<_, Tx, _>(|conn| {
            async move {
                let invoice = lock_invoice(conn, row.invoice_id).await?;
                let open: Option<String> = payments::table
                    .filter(payments::invoice_id.eq(row.invoice_id))
                    .filter(payments::status.eq(PaymentStatus::Pending.as_str()))
                    .select(payments::reference)
                    .first(conn)
                    .await
                    .optional()?;
                if let Some(reference) = open {
                    let reference = reference
                        .parse::<PaymentReference>()
                        .map_err(|err| Tx::corrupt(err.to_string()))?;
                    return Err(Tx::Refused(LedgerRepositoryError::payment_in_progress(
                        reference,
                    )));
                }
                if row.amount_kobo > invoice.balance().kobo() {
                    return Err(Tx::Refused(LedgerRepositoryError::balance_exceeded(
                        invoice.balance(),
                    )));
                }
                diesel::insert_into(payments::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(Tx::into_repository_error)
    }

    async fn list_student_payments(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Payment>, LedgerRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let rows: Vec<PaymentRow> = payments::table
            .filter(payments::student_id.eq(*student.as_uuid()))
            .order_by(payments::created_at.desc())
            .select(PaymentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(LedgerRepositoryError::from_diesel)?;
        convert_payments(rows)
    }

    async fn list_term_invoices(&self, term: &Term) -> Result<Vec<Invoice>, LedgerRepositoryError> {
        let (session_start, semester) = term_columns(term);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let rows: Vec<InvoiceRow> = invoices::table
            .filter(invoices::session_start.eq(session_start))
            .filter(invoices::semester.eq(semester))
            .order_by(invoices::invoice_number.asc())
            .select(InvoiceRow::as_select())
            .load(&mut conn)
            .await
            .map_err(LedgerRepositoryError::from_diesel)?;
        rows.into_iter()
            .map(InvoiceRow::into_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerRepositoryError::query)
    }

    async fn list_term_payments(&self, term: &Term) -> Result<Vec<Payment>, LedgerRepositoryError> {
        let (session_start, semester) = term_columns(term);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let rows: Vec<PaymentRow> = payments::table
            .inner_join(invoices::table)
            .filter(invoices::session_start.eq(session_start))
            .filter(invoices::semester.eq(semester))
            .order_by(payments::created_at.desc())
            .select(PaymentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(LedgerRepositoryError::from_diesel)?;
        convert_payments(rows)
    }

    async fn find_payment(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Payment>, LedgerRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        let row = payments::table
            .filter(payments::reference.eq(reference.as_str()))
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(LedgerRepositoryError::from_diesel)?;
        row.map(PaymentRow::into_domain)
            .transpose()
            .map_err(LedgerRepositoryError::query)
    }

    async fn attach_checkout(
        &self,
        reference: &PaymentReference,
        authorization_url: &str,
        access_code: &str,
    ) -> Result<Payment, LedgerRepositoryError> {
        let authorization_url = authorization_url.to_owned();
        let access_code = access_code.to_owned();
        self.update_pending(reference, move |payment| Payment {
            authorization_url: Some(authorization_url),
            access_code: Some(access_code),
            ..payment
        })
        .await
    }

    async fn mark_payment_failed(
        &self,
        reference: &PaymentReference,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Payment, LedgerRepositoryError> {
        let reason = reason.to_owned();
        self.update_pending(reference, move |payment| Payment {
            status: PaymentStatus::Failed,
            failure_reason: Some(reason),
            settled_at: Some(at),
            ..payment
        })
        .await
    }

    async fn complete_payment(
        &self,
        reference: &PaymentReference,
        settlement: &PaymentSettlement,
    ) -> Result<PaymentCompletion, LedgerRepositoryError> {
        let reference = reference.as_str().to_owned();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(LedgerRepositoryError::from_pool)?;
        conn.transaction::<_, Tx, _>(|conn| {
            async move {
                let payment = lock_payment(conn, &reference).await?;
                let invoice = lock_invoice(conn, *payment.invoice.as_uuid()).await?;

                match payment.status {
                    PaymentStatus::Completed => {
                        return Ok(PaymentCompletion::AlreadyCompleted { payment, invoice });
                    }
                    PaymentStatus::Failed => {
                        return Err(Tx::Refused(LedgerRepositoryError::payment_settled(
                            PaymentStatus::Failed,
                        )));
                    }
                    PaymentStatus::Pending => {}
                }

                let invoice = invoice.credited(payment.amount).map_err(|err| match err {
                    LedgerValidationError::ExceedsBalance { balance } => {
                        Tx::Refused(LedgerRepositoryError::balance_exceeded(balance))
                    }
                    other => Tx::corrupt(other.to_string()),
                })?;
                diesel::update(invoices::table.find(*invoice.id.as_uuid()))
                    .set(invoices::amount_paid_kobo.eq(invoice.amount_paid.kobo()))
                    .execute(conn)
                    .await?;
                let payment = Payment {
                    status: PaymentStatus::Completed,
                    gateway_transaction_id: Some(settlement.transaction_id.clone()),
                    receipt_number: Some(settlement.receipt_number.clone()),
                    settled_at: Some(settlement.at),
                    ..payment
                };
                write_payment(conn, &payment).await?;
                Ok(PaymentCompletion::Completed { payment, invoice })
            }
            .scope_boxed()
        })
        .await
        .map_err(Tx::into_repository_error)
    }
}
