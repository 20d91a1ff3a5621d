//! Course offering service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    CatalogueRepository, CatalogueRepositoryError, OfferingCatalogue, PrincipalRepository,
    PrincipalRepositoryError,
};
use crate::domain::{
    Action, CourseOffering, Error, OfferingDraft, OfferingId, Principal, Resource, Term, authorize,
};

fn map_catalogue_error(error: CatalogueRepositoryError) -> Error {
    match error {
        CatalogueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("catalogue repository unavailable: {message}"))
        }
        CatalogueRepositoryError::Query { message } => {
            Error::internal(format!("catalogue repository error: {message}"))
        }
        CatalogueRepositoryError::Duplicate { message } => {
            Error::conflict(format!("offering already exists: {message}"))
                .with_details(json!({ "code": "offering_exists" }))
        }
    }
}

fn map_principal_error(error: PrincipalRepositoryError) -> Error {
    match error {
        PrincipalRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("principal repository unavailable: {message}"))
        }
        PrincipalRepositoryError::Query { message }
        | PrincipalRepositoryError::Duplicate { message } => {
            Error::internal(format!("principal repository error: {message}"))
        }
    }
}

/// Offering service backed by the catalogue and principal repositories.
#[derive(Clone)]
pub struct CatalogueService<C, P> {
    catalogue_repo: Arc<C>,
    principal_repo: Arc<P>,
}

impl<C, P> CatalogueService<C, P> {
    /// Create a new service.
    pub fn new(catalogue_repo: Arc<C>, principal_repo: Arc<P>) -> Self {
        Self {
            catalogue_repo,
            principal_repo,
        }
    }
}

#[async_trait]
impl<C, P> OfferingCatalogue for CatalogueService<C, P>
where
    C: CatalogueRepository,
    P: PrincipalRepository,
{
    async fn open(&self, actor: &Principal, draft: OfferingDraft) -> Result<CourseOffering, Error> {
        authorize(
            actor,
            Action::ManageOfferings,
            Resource::Department(&draft.department),
        )?;

        let lecturer = self
            .principal_repo
            .find_by_lecturer(&draft.lecturer)
            .await
            .map_err(map_principal_error)?;
        if lecturer.is_none() {
            return Err(Error::invalid_request(format!(
                "lecturer {} does not exist",
                draft.lecturer
            ))
            .with_details(json!({ "field": "lecturerId", "code": "unknown_lecturer" })));
        }

        let offering = CourseOffering::open(OfferingId::random(), draft)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        self.catalogue_repo
            .insert(&offering)
            .await
            .map_err(map_catalogue_error)?;
        info!(
            offering = %offering.id,
            course = offering.code.as_str(),
            term = %offering.term,
            capacity = offering.capacity,
            "offering opened"
        );
        Ok(offering)
    }

    async fn get(&self, id: &OfferingId) -> Result<CourseOffering, Error> {
        self.catalogue_repo
            .find(id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("offering {id} not found")))
    }

    async fn list(&self, term: &Term) -> Result<Vec<CourseOffering>, Error> {
        self.catalogue_repo
            .list_for_term(term)
            .await
            .map_err(map_catalogue_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::fixtures::{course, dept, hod_of, lecturer, staff, term};
    use crate::domain::ports::{MockCatalogueRepository, MockPrincipalRepository};
    use crate::domain::{CreditUnits, Role};
    use rstest::rstest;

    fn draft_for(tutor: &Principal, department: &str) -> OfferingDraft {
        OfferingDraft {
            code: course("CSC301"),
            title: "Operating Systems".to_owned(),
            credit_units: CreditUnits::new(3).expect("units"),
            department: dept(department),
            term: term(),
            lecturer: tutor.lecturer().expect("profile").id,
            capacity: 40,
            prerequisites: vec![course("CSC201")],
        }
    }

    fn service(
        catalogue: MockCatalogueRepository,
        principals: MockPrincipalRepository,
    ) -> CatalogueService<MockCatalogueRepository, MockPrincipalRepository> {
        CatalogueService::new(Arc::new(catalogue), Arc::new(principals))
    }

    #[rstest]
    #[case::registrar(staff(Role::Registrar))]
    #[case::own_hod(hod_of("CSC"))]
    #[case::super_admin(staff(Role::SuperAdmin))]
    #[tokio::test]
    async fn open_persists_offering_for_academic_staff(#[case] actor: Principal) {
        let tutor = lecturer();
        let found = tutor.clone();
        let mut principals = MockPrincipalRepository::new();
        principals
            .expect_find_by_lecturer()
            .times(1)
            .return_once(move |_| Ok(Some(found)));
        let mut catalogue = MockCatalogueRepository::new();
        catalogue.expect_insert().times(1).return_once(|_| Ok(()));

        let offering = service(catalogue, principals)
            .open(&actor, draft_for(&tutor, "CSC"))
            .await
            .expect("offering opened");

        assert_eq!(offering.enrolled_count, 0);
        assert_eq!(offering.capacity, 40);
    }

    #[rstest]
    #[case::other_hod(hod_of("MTH"))]
    #[case::bursar(staff(Role::Bursar))]
    #[case::lecturer(lecturer())]
    #[tokio::test]
    async fn open_is_forbidden_for_others(#[case] actor: Principal) {
        let mut catalogue = MockCatalogueRepository::new();
        catalogue.expect_insert().times(0);

        let error = service(catalogue, MockPrincipalRepository::new())
            .open(&actor, draft_for(&lecturer(), "CSC"))
            .await
            .expect_err("forbidden");

        assert_eq!(error.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn open_rejects_unknown_lecturer() {
        let mut principals = MockPrincipalRepository::new();
        principals
            .expect_find_by_lecturer()
            .times(1)
            .return_once(|_| Ok(None));
        let mut catalogue = MockCatalogueRepository::new();
        catalogue.expect_insert().times(0);

        let error = service(catalogue, principals)
            .open(&staff(Role::Registrar), draft_for(&lecturer(), "CSC"))
            .await
            .expect_err("unknown lecturer");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn open_maps_duplicate_to_conflict() {
        let tutor = lecturer();
        let found = tutor.clone();
        let mut principals = MockPrincipalRepository::new();
        principals
            .expect_find_by_lecturer()
            .times(1)
            .return_once(move |_| Ok(Some(found)));
        let mut catalogue = MockCatalogueRepository::new();
        catalogue
            .expect_insert()
            .times(1)
            .return_once(|_| Err(CatalogueRepositoryError::duplicate("CSC301 2024/2025 first")));

        let error = service(catalogue, principals)
            .open(&staff(Role::Registrar), draft_for(&tutor, "CSC"))
            .await
            .expect_err("conflict");

        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn get_missing_offering_is_not_found() {
        let mut catalogue = MockCatalogueRepository::new();
        catalogue.expect_find().times(1).return_once(|_| Ok(None));

        let error = service(catalogue, MockPrincipalRepository::new())
            .get(&OfferingId::random())
            .await
            .expect_err("missing");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
