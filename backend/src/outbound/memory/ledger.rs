//! Ledger port over the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    LedgerRepository, LedgerRepositoryError, PaymentCompletion, PaymentSettlement,
};
use crate::domain::{
    DepartmentCode, FeeStructure, Invoice, InvoiceId, LedgerValidationError, Level, Payment,
    PaymentReference, PaymentStatus, StudentId, Term,
};

use super::{InMemoryCollegeStore, StoreState};

fn pending_payment<'a>(
    state: &'a mut StoreState,
    reference: &PaymentReference,
) -> Result<&'a mut Payment, LedgerRepositoryError> {
    let payment = state
        .payments
        .get_mut(reference)
        .ok_or_else(|| LedgerRepositoryError::missing(format!("payment {reference}")))?;
    if payment.status != PaymentStatus::Pending {
        return Err(LedgerRepositoryError::payment_settled(payment.status));
    }
    Ok(payment)
}

fn credit_error(error: LedgerValidationError) -> LedgerRepositoryError {
    match error {
        LedgerValidationError::ExceedsBalance { balance } => {
            LedgerRepositoryError::balance_exceeded(balance)
        }
        other => LedgerRepositoryError::query(other.to_string()),
    }
}

#[async_trait]
impl LedgerRepository for InMemoryCollegeStore {
    async fn insert_fee_structure(
        &self,
        structure: &FeeStructure,
    ) -> Result<(), LedgerRepositoryError> {
        let mut state = self.lock().await;
        let clash = state.fee_structures.iter().any(|existing| {
            existing.id == structure.id
                || (existing.department == structure.department
                    && existing.level == structure.level
                    && existing.term == structure.term)
        });
        if clash {
            return Err(LedgerRepositoryError::duplicate(format!(
                "fee structure for {} level {} in {}",
                structure.department, structure.level, structure.term
            )));
        }
        state.fee_structures.push(structure.clone());
        Ok(())
    }

    async fn find_fee_structure(
        &self,
        department: &DepartmentCode,
        level: Level,
        term: &Term,
    ) -> Result<Option<FeeStructure>, LedgerRepositoryError> {
        let state = self.lock().await;
        Ok(state
            .fee_structures
            .iter()
            .find(|s| s.department == *department && s.level == level && s.term == *term)
            .cloned())
    }

    async fn list_fee_structures(
        &self,
        term: &Term,
    ) -> Result<Vec<FeeStructure>, LedgerRepositoryError> {
        let state = self.lock().await;
        let mut structures: Vec<FeeStructure> = state
            .fee_structures
            .iter()
            .filter(|s| s.term == *term)
            .cloned()
            .collect();
        structures.sort_by(|a, b| {
            a.department
                .cmp(&b.department)
                .then_with(|| a.level.cmp(&b.level))
        });
        Ok(structures)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), LedgerRepositoryError> {
        let mut state = self.lock().await;
        let clash = state.invoices.values().any(|existing| {
            existing.invoice_number == invoice.invoice_number
                || (existing.student == invoice.student && existing.term == invoice.term)
        });
        if clash || state.invoices.contains_key(&invoice.id) {
            return Err(LedgerRepositoryError::duplicate(format!(
                "invoice for student {} in {}",
                invoice.student, invoice.term
            )));
        }
        state.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn find_invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, LedgerRepositoryError> {
        Ok(self.lock().await.invoices.get(id).cloned())
    }

    async fn find_invoice_for_term(
        &self,
        student: &StudentId,
        term: &Term,
    ) -> Result<Option<Invoice>, LedgerRepositoryError> {
        let state = self.lock().await;
        Ok(state
            .invoices
            .values()
            .find(|i| i.student == *student && i.term == *term)
            .cloned())
    }

    async fn list_invoices(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Invoice>, LedgerRepositoryError> {
        let state = self.lock().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|i| i.student == *student)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.term.cmp(&a.term));
        Ok(invoices)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), LedgerRepositoryError> {
        let mut state = self.lock().await;
        if state.payments.contains_key(&payment.reference) {
            return Err(LedgerRepositoryError::duplicate(format!(
                "payment {}",
                payment.reference
            )));
        }
        let invoice = state.invoices.get(&payment.invoice).ok_or_else(|| {
            LedgerRepositoryError::missing(format!("invoice {}", payment.invoice))
        })?;
        if let Some(open) = state
            .payments
            .values()
            .find(|p| p.invoice == payment.invoice && p.status == PaymentStatus::Pending)
        {
            return Err(LedgerRepositoryError::payment_in_progress(
                open.reference.clone(),
            ));
        }
        if payment.amount > invoice.balance() {
            return Err(LedgerRepositoryError::balance_exceeded(invoice.balance()));
        }
        state
            .payments
            .insert(payment.reference.clone(), payment.clone());
        Ok(())
    }

    async fn list_student_payments(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Payment>, LedgerRepositoryError> {
        let state = self.lock().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.student == *student)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn list_term_invoices(&self, term: &Term) -> Result<Vec<Invoice>, LedgerRepositoryError> {
        let state = self.lock().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|i| i.term == *term)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));
        Ok(invoices)
    }

    async fn list_term_payments(&self, term: &Term) -> Result<Vec<Payment>, LedgerRepositoryError> {
        let state = self.lock().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| {
                state
                    .invoices
                    .get(&p.invoice)
                    .is_some_and(|invoice| invoice.term == *term)
            })
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn find_payment(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Payment>, LedgerRepositoryError> {
        Ok(self.lock().await.payments.get(reference).cloned())
    }

    async fn attach_checkout(
        &self,
        reference: &PaymentReference,
        authorization_url: &str,
        access_code: &str,
    ) -> Result<Payment, LedgerRepositoryError> {
        let mut state = self.lock().await;
        let payment = pending_payment(&mut state, reference)?;
        payment.authorization_url = Some(authorization_url.to_owned());
        payment.access_code = Some(access_code.to_owned());
        Ok(payment.clone())
    }

    async fn mark_payment_failed(
        &self,
        reference: &PaymentReference,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Payment, LedgerRepositoryError> {
        let mut state = self.lock().await;
        let payment = pending_payment(&mut state, reference)?;
        payment.status = PaymentStatus::Failed;
        payment.failure_reason = Some(reason.to_owned());
        payment.settled_at = Some(at);
        Ok(payment.clone())
    }

    async fn complete_payment(
        &self,
        reference: &PaymentReference,
        settlement: &PaymentSettlement,
    ) -> Result<PaymentCompletion, LedgerRepositoryError> {
        let mut state = self.lock().await;
        let payment = state
            .payments
            .get(reference)
            .cloned()
            .ok_or_else(|| LedgerRepositoryError::missing(format!("payment {reference}")))?;
        let invoice = state.invoices.get(&payment.invoice).cloned().ok_or_else(|| {
            LedgerRepositoryError::missing(format!("invoice {}", payment.invoice))
        })?;

        match payment.status {
            PaymentStatus::Completed => {
                return Ok(PaymentCompletion::AlreadyCompleted { payment, invoice });
            }
            PaymentStatus::Failed => {
                return Err(LedgerRepositoryError::payment_settled(PaymentStatus::Failed));
            }
            PaymentStatus::Pending => {}
        }

        let invoice = invoice.credited(payment.amount).map_err(credit_error)?;
        let payment = Payment {
            status: PaymentStatus::Completed,
            gateway_transaction_id: Some(settlement.transaction_id.clone()),
            receipt_number: Some(settlement.receipt_number.clone()),
            settled_at: Some(settlement.at),
            ..payment
        };
        state.invoices.insert(invoice.id, invoice.clone());
        state.payments.insert(reference.clone(), payment.clone());
        Ok(PaymentCompletion::Completed { payment, invoice })
    }
}
