//! In-process store implementing every repository port.
//!
//! Used when no database URL is configured and by integration tests. All
//! state sits behind one async mutex, so each port call is a single atomic
//! unit with the same compare-and-set, capacity, and waiver semantics as
//! the PostgreSQL adapters.

use std::collections::HashMap;

use tokio::sync::{Mutex, MutexGuard};

use crate::domain::{
    CourseOffering, CourseRegistration, FeeStructure, GradeRecord, GradeRecordId, Invoice,
    InvoiceId, OfferingId, PasswordDigest, Payment, PaymentReference, Principal, PrincipalId,
    RegistrationId,
};

mod directory;
mod grades;
mod ledger;
mod registrations;

#[derive(Debug, Default)]
struct StoreState {
    principals: HashMap<PrincipalId, Principal>,
    digests: HashMap<PrincipalId, PasswordDigest>,
    offerings: HashMap<OfferingId, CourseOffering>,
    registrations: HashMap<RegistrationId, CourseRegistration>,
    grades: HashMap<GradeRecordId, GradeRecord>,
    fee_structures: Vec<FeeStructure>,
    invoices: HashMap<InvoiceId, Invoice>,
    payments: HashMap<PaymentReference, Payment>,
}

/// Shared in-memory store.
///
/// Wrap it in an `Arc` and hand the same instance to every service port.
#[derive(Debug, Default)]
pub struct InMemoryCollegeStore {
    state: Mutex<StoreState>,
}

impl InMemoryCollegeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().await
    }
}
