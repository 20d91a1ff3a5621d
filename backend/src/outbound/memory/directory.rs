//! Principal and catalogue ports over the in-memory store.

use async_trait::async_trait;

use crate::domain::ports::{
    CatalogueRepository, CatalogueRepositoryError, PrincipalRepository, PrincipalRepositoryError,
    StoredCredentials,
};
use crate::domain::{
    Affiliation, CourseOffering, LecturerId, OfferingId, PasswordDigest, Principal, PrincipalId,
    StudentId, Term,
};

use super::{InMemoryCollegeStore, StoreState};

fn profile_clash(state: &StoreState, candidate: &Principal) -> Option<String> {
    state.principals.values().find_map(|existing| {
        match (existing.affiliation(), candidate.affiliation()) {
            (Affiliation::Student(a), Affiliation::Student(b)) if a.id == b.id => {
                Some(format!("student {}", b.id))
            }
            (Affiliation::Student(a), Affiliation::Student(b))
                if a.matric_number == b.matric_number =>
            {
                Some(format!("matric number {}", b.matric_number))
            }
            (Affiliation::Lecturer(a), Affiliation::Lecturer(b)) if a.id == b.id => {
                Some(format!("lecturer {}", b.id))
            }
            _ => None,
        }
    })
}

#[async_trait]
impl PrincipalRepository for InMemoryCollegeStore {
    async fn insert(
        &self,
        principal: &Principal,
        digest: &PasswordDigest,
    ) -> Result<(), PrincipalRepositoryError> {
        let mut state = self.lock().await;
        if state.principals.contains_key(&principal.id()) {
            return Err(PrincipalRepositoryError::duplicate(format!(
                "id {}",
                principal.id()
            )));
        }
        if state
            .principals
            .values()
            .any(|existing| existing.username() == principal.username())
        {
            return Err(PrincipalRepositoryError::duplicate(format!(
                "username {}",
                principal.username()
            )));
        }
        if let Some(clash) = profile_clash(&state, principal) {
            return Err(PrincipalRepositoryError::duplicate(clash));
        }
        state.principals.insert(principal.id(), principal.clone());
        state.digests.insert(principal.id(), digest.clone());
        Ok(())
    }

    async fn find(&self, id: &PrincipalId) -> Result<Option<Principal>, PrincipalRepositoryError> {
        Ok(self.lock().await.principals.get(id).cloned())
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StoredCredentials>, PrincipalRepositoryError> {
        let state = self.lock().await;
        let found = state
            .principals
            .values()
            .find(|principal| principal.username() == username)
            .and_then(|principal| {
                state
                    .digests
                    .get(&principal.id())
                    .map(|digest| StoredCredentials {
                        principal: principal.id(),
                        digest: digest.clone(),
                    })
            });
        Ok(found)
    }

    async fn find_by_student(
        &self,
        student: &StudentId,
    ) -> Result<Option<Principal>, PrincipalRepositoryError> {
        let state = self.lock().await;
        Ok(state
            .principals
            .values()
            .find(|principal| principal.student().is_some_and(|p| p.id == *student))
            .cloned())
    }

    async fn find_by_lecturer(
        &self,
        lecturer: &LecturerId,
    ) -> Result<Option<Principal>, PrincipalRepositoryError> {
        let state = self.lock().await;
        Ok(state
            .principals
            .values()
            .find(|principal| principal.lecturer().is_some_and(|p| p.id == *lecturer))
            .cloned())
    }
}

#[async_trait]
impl CatalogueRepository for InMemoryCollegeStore {
    async fn insert(&self, offering: &CourseOffering) -> Result<(), CatalogueRepositoryError> {
        let mut state = self.lock().await;
        let clash = state
            .offerings
            .values()
            .any(|existing| existing.code == offering.code && existing.term == offering.term);
        if clash || state.offerings.contains_key(&offering.id) {
            return Err(CatalogueRepositoryError::duplicate(format!(
                "{} in {}",
                offering.code, offering.term
            )));
        }
        state.offerings.insert(offering.id, offering.clone());
        Ok(())
    }

    async fn find(
        &self,
        id: &OfferingId,
    ) -> Result<Option<CourseOffering>, CatalogueRepositoryError> {
        Ok(self.lock().await.offerings.get(id).cloned())
    }

    async fn list_for_term(
        &self,
        term: &Term,
    ) -> Result<Vec<CourseOffering>, CatalogueRepositoryError> {
        let state = self.lock().await;
        let mut offerings: Vec<CourseOffering> = state
            .offerings
            .values()
            .filter(|offering| offering.term == *term)
            .cloned()
            .collect();
        offerings.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(offerings)
    }
}
