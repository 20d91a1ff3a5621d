//! Registration port over the in-memory store.

use async_trait::async_trait;

use crate::domain::ports::{RegistrationRepository, RegistrationRepositoryError};
use crate::domain::{
    CourseRegistration, Finalization, OfferingId, RegistrationId, RegistrationStatus,
    StatusChange, StudentId, Term, WaiverScope,
};

use super::{InMemoryCollegeStore, StoreState};

fn waivers_used(state: &StoreState, student: &StudentId, term: Term, scope: WaiverScope) -> u32 {
    let used = state
        .registrations
        .values()
        .filter(|r| r.student == *student && r.payment_waived)
        .filter(|r| r.status == RegistrationStatus::Registered)
        .filter(|r| scope == WaiverScope::Lifetime || r.term == term)
        .count();
    u32::try_from(used).unwrap_or(u32::MAX)
}

fn sorted(mut registrations: Vec<CourseRegistration>) -> Vec<CourseRegistration> {
    registrations.sort_by(|a, b| {
        a.submitted_at
            .cmp(&b.submitted_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    registrations
}

#[async_trait]
impl RegistrationRepository for InMemoryCollegeStore {
    async fn find(
        &self,
        id: &RegistrationId,
    ) -> Result<Option<CourseRegistration>, RegistrationRepositoryError> {
        Ok(self.lock().await.registrations.get(id).cloned())
    }

    async fn find_active(
        &self,
        student: &StudentId,
        offering: &OfferingId,
    ) -> Result<Option<CourseRegistration>, RegistrationRepositoryError> {
        let state = self.lock().await;
        Ok(state
            .registrations
            .values()
            .find(|r| r.student == *student && r.offering == *offering && r.status.is_active())
            .cloned())
    }

    async fn count_active_in_term(
        &self,
        student: &StudentId,
        term: &Term,
    ) -> Result<u32, RegistrationRepositoryError> {
        let state = self.lock().await;
        let count = state
            .registrations
            .values()
            .filter(|r| r.student == *student && r.term == *term && r.status.is_active())
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn insert(
        &self,
        registration: &CourseRegistration,
    ) -> Result<(), RegistrationRepositoryError> {
        let mut state = self.lock().await;
        let clash = state.registrations.values().any(|r| {
            r.student == registration.student
                && r.offering == registration.offering
                && r.status.is_active()
        });
        if clash || state.registrations.contains_key(&registration.id) {
            return Err(RegistrationRepositoryError::duplicate(format!(
                "student {} already holds a registration for offering {}",
                registration.student, registration.offering
            )));
        }
        state
            .registrations
            .insert(registration.id, registration.clone());
        Ok(())
    }

    async fn list_for_student(
        &self,
        student: &StudentId,
        term: Option<Term>,
    ) -> Result<Vec<CourseRegistration>, RegistrationRepositoryError> {
        let state = self.lock().await;
        let found = state
            .registrations
            .values()
            .filter(|r| r.student == *student && term.is_none_or(|t| r.term == t))
            .cloned()
            .collect();
        Ok(sorted(found))
    }

    async fn list_for_offering(
        &self,
        offering: &OfferingId,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<CourseRegistration>, RegistrationRepositoryError> {
        let state = self.lock().await;
        let found = state
            .registrations
            .values()
            .filter(|r| r.offering == *offering && status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        Ok(sorted(found))
    }

    async fn apply_decision(
        &self,
        id: &RegistrationId,
        expected: RegistrationStatus,
        change: &StatusChange,
    ) -> Result<CourseRegistration, RegistrationRepositoryError> {
        let mut state = self.lock().await;
        let current = state
            .registrations
            .get(id)
            .cloned()
            .ok_or_else(|| RegistrationRepositoryError::missing(id.to_string()))?;
        if current.status != expected {
            return Err(RegistrationRepositoryError::stale_status(expected));
        }
        let updated = current.with_change(change);
        state.registrations.insert(*id, updated.clone());
        Ok(updated)
    }

    async fn finalize(
        &self,
        id: &RegistrationId,
        finalization: &Finalization,
    ) -> Result<CourseRegistration, RegistrationRepositoryError> {
        let mut state = self.lock().await;
        let current = state
            .registrations
            .get(id)
            .cloned()
            .ok_or_else(|| RegistrationRepositoryError::missing(id.to_string()))?;
        if current.status != RegistrationStatus::LecturerApproved {
            return Err(RegistrationRepositoryError::stale_status(
                RegistrationStatus::LecturerApproved,
            ));
        }

        let offering = state.offerings.get(&current.offering).ok_or_else(|| {
            RegistrationRepositoryError::missing(format!("offering {}", current.offering))
        })?;
        if !offering.has_free_seat() {
            return Err(RegistrationRepositoryError::capacity_exceeded(offering.id));
        }

        if let Some(allowance) = finalization.waiver {
            let used = waivers_used(&state, &current.student, current.term, allowance.scope);
            if used >= allowance.limit {
                return Err(RegistrationRepositoryError::waiver_exhausted(allowance.limit));
            }
        }

        let mut updated = current.with_change(&finalization.change);
        updated.payment_waived = finalization.waiver.is_some();
        if let Some(offering) = state.offerings.get_mut(&updated.offering) {
            offering.enrolled_count += 1;
        }
        state.registrations.insert(*id, updated.clone());
        Ok(updated)
    }
}
