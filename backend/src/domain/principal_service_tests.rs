//! Tests for the principal directory service.

use std::sync::Arc;

use rstest::rstest;
use zeroize::Zeroizing;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::fixtures::{staff, student};
use crate::domain::ports::{MockPrincipalRepository, StoredCredentials};

fn register_request(role: Role, password: &str) -> RegisterPrincipalRequest {
    RegisterPrincipalRequest {
        username: "registrar1".to_owned(),
        password: Zeroizing::new(password.to_owned()),
        full_name: "Grace Okafor".to_owned(),
        email: "registrar1@college.test".to_owned(),
        role,
        affiliation: Affiliation::None,
    }
}

fn credentials(password: &str) -> LoginCredentials {
    LoginCredentials::try_from_parts("registrar1", password).expect("valid credentials")
}

#[tokio::test]
async fn authenticate_accepts_matching_password() {
    let principal = PrincipalId::random();
    let digest = PasswordDigest::derive("correct horse");
    let mut repo = MockPrincipalRepository::new();
    repo.expect_find_credentials()
        .times(1)
        .return_once(move |_| Ok(Some(StoredCredentials { principal, digest })));

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let resolved = service
        .authenticate(&credentials("correct horse"))
        .await
        .expect("login succeeds");

    assert_eq!(resolved, principal);
}

#[rstest]
#[case::wrong_password(true)]
#[case::unknown_user(false)]
#[tokio::test]
async fn authenticate_rejects_bad_credentials(#[case] user_exists: bool) {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_find_credentials().times(1).return_once(move |_| {
        Ok(user_exists.then(|| StoredCredentials {
            principal: PrincipalId::random(),
            digest: PasswordDigest::derive("correct horse"),
        }))
    });

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let error = service
        .authenticate(&credentials("battery staple"))
        .await
        .expect_err("login fails");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
    assert_eq!(error.message(), "invalid credentials");
}

#[rstest]
#[case::super_admin(Role::SuperAdmin)]
#[case::ict(Role::Ict)]
#[tokio::test]
async fn register_persists_principal_for_administrators(#[case] actor_role: Role) {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_insert()
        .withf(|principal, digest| {
            principal.role() == Role::Registrar && digest.matches("s3cret-pass")
        })
        .times(1)
        .return_once(|_, _| Ok(()));

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let created = service
        .register(&staff(actor_role), register_request(Role::Registrar, "s3cret-pass"))
        .await
        .expect("registration succeeds");

    assert_eq!(created.username(), "registrar1");
    assert_eq!(created.role(), Role::Registrar);
}

#[tokio::test]
async fn register_is_forbidden_for_other_roles() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_insert().times(0);

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let error = service
        .register(&staff(Role::Registrar), register_request(Role::Bursar, "s3cret-pass"))
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn register_rejects_short_password() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_insert().times(0);

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let error = service
        .register(&staff(Role::Ict), register_request(Role::Bursar, "short"))
        .await
        .expect_err("invalid");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        error.details().and_then(|details| details.get("field")),
        Some(&serde_json::json!("password"))
    );
}

#[tokio::test]
async fn register_rejects_student_without_profile() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_insert().times(0);

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let error = service
        .register(&staff(Role::Ict), register_request(Role::Student, "s3cret-pass"))
        .await
        .expect_err("invalid");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn register_maps_duplicate_to_conflict() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_insert()
        .times(1)
        .return_once(|_, _| Err(PrincipalRepositoryError::duplicate("registrar1")));

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let error = service
        .register(&staff(Role::SuperAdmin), register_request(Role::Registrar, "s3cret-pass"))
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        error.details().and_then(|details| details.get("code")),
        Some(&serde_json::json!("principal_exists"))
    );
}

#[tokio::test]
async fn resolve_missing_principal_is_unauthorized() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_find().times(1).return_once(|_| Ok(None));

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let error = service
        .resolve(&PrincipalId::random())
        .await
        .expect_err("unknown session principal");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn resolve_maps_connection_error_to_service_unavailable() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_find()
        .times(1)
        .return_once(|_| Err(PrincipalRepositoryError::connection("pool exhausted")));

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let error = service
        .resolve(&PrincipalId::random())
        .await
        .expect_err("unavailable");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[tokio::test]
async fn student_returns_profile() {
    let principal = student();
    let expected = principal.student().cloned().expect("profile");
    let mut repo = MockPrincipalRepository::new();
    repo.expect_find_by_student()
        .times(1)
        .return_once(move |_| Ok(Some(principal)));

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let profile = service.student(&expected.id).await.expect("profile found");

    assert_eq!(profile, expected);
}

#[tokio::test]
async fn student_missing_is_not_found() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_find_by_student()
        .times(1)
        .return_once(|_| Ok(None));

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let error = service
        .student(&StudentId::random())
        .await
        .expect_err("missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn bootstrap_admin_is_created_once() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_find_credentials()
        .times(1)
        .return_once(|_| Ok(None));
    repo.expect_insert()
        .withf(|principal, _| principal.role() == Role::SuperAdmin)
        .times(1)
        .return_once(|_, _| Ok(()));

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let created = service
        .ensure_bootstrap_admin("root", "bootstrap-pass")
        .await
        .expect("bootstrap succeeds");

    assert!(created.is_some());
}

#[tokio::test]
async fn bootstrap_admin_skips_existing_username() {
    let mut repo = MockPrincipalRepository::new();
    repo.expect_find_credentials().times(1).return_once(|_| {
        Ok(Some(StoredCredentials {
            principal: PrincipalId::random(),
            digest: PasswordDigest::derive("bootstrap-pass"),
        }))
    });
    repo.expect_insert().times(0);

    let service = PrincipalDirectoryService::new(Arc::new(repo));
    let created = service
        .ensure_bootstrap_admin("root", "bootstrap-pass")
        .await
        .expect("bootstrap succeeds");

    assert!(created.is_none());
}
