//! Tests for the grade workflow service.

use std::sync::Arc;

use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::domain::fixtures::{
    fixture_clock, fixture_timestamp, hod_of, lecturer, offering_taught_by, published_grade,
    staff, student, student_profile,
};
use crate::domain::ports::{
    MockCatalogueRepository, MockGradeRepository, MockPrincipalRepository,
    MockRegistrationRepository, NoOpWorkflowMetrics,
};
use crate::domain::{
    Classification, CourseRegistration, ErrorCode, GradeLetter, RegistrationId, Role,
    ScoreBreakdown,
};

struct Harness {
    grades: MockGradeRepository,
    catalogue: MockCatalogueRepository,
    registrations: MockRegistrationRepository,
    principals: MockPrincipalRepository,
}

impl Harness {
    fn new() -> Self {
        Self {
            grades: MockGradeRepository::new(),
            catalogue: MockCatalogueRepository::new(),
            registrations: MockRegistrationRepository::new(),
            principals: MockPrincipalRepository::new(),
        }
    }

    fn with_offering(mut self, offering: &CourseOffering) -> Self {
        let offering = offering.clone();
        self.catalogue
            .expect_find()
            .returning(move |_| Ok(Some(offering.clone())));
        self
    }

    fn with_record(mut self, record: &GradeRecord) -> Self {
        let record = record.clone();
        self.grades
            .expect_find()
            .returning(move |_| Ok(Some(record.clone())));
        self
    }

    fn with_registration_status(mut self, status: Option<RegistrationStatus>) -> Self {
        self.registrations
            .expect_find_active()
            .returning(move |student, offering| {
                Ok(status.map(|status| CourseRegistration {
                    status,
                    ..CourseRegistration::submit(
                        RegistrationId::random(),
                        *student,
                        *offering,
                        crate::domain::fixtures::term(),
                        fixture_timestamp(),
                    )
                }))
            });
        self
    }

    fn build(self) -> GradingService {
        GradingService::new(
            GradingServicePorts {
                grades: Arc::new(self.grades),
                catalogue: Arc::new(self.catalogue),
                registrations: Arc::new(self.registrations),
                principals: Arc::new(self.principals),
                metrics: Arc::new(NoOpWorkflowMetrics),
            },
            fixture_clock(),
            GradingScale::default(),
        )
    }
}

fn score(continuous_assessment: Decimal, exam: Decimal) -> ScoreBreakdown {
    ScoreBreakdown::try_new(continuous_assessment, exam).expect("valid score")
}

fn draft_record(tutor: &Principal, offering: &CourseOffering, student: StudentId) -> GradeRecord {
    GradeRecord::draft(
        GradeRecordId::random(),
        offering,
        student,
        score(dec!(25), dec!(50)),
        &GradingScale::default(),
        tutor.id(),
        fixture_timestamp(),
    )
}

fn at_stage(record: GradeRecord, stage: GradeStage) -> GradeRecord {
    GradeRecord { stage, ..record }
}

fn advance_returns_change(harness: &mut Harness, record: &GradeRecord, expected: GradeStage) {
    let stored = record.clone();
    harness
        .grades
        .expect_advance()
        .withf(move |_, from, _| *from == expected)
        .times(1)
        .return_once(move |_, _, change| Ok(stored.with_stage(change)));
}

#[tokio::test]
async fn score_of_75_enters_draft_with_grade_a() {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let pupil = student_profile(&student()).id;
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_registration_status(Some(RegistrationStatus::Registered));
    harness
        .grades
        .expect_find_current()
        .times(1)
        .return_once(|_, _| Ok(None));
    harness
        .grades
        .expect_insert()
        .withf(|record| record.stage == GradeStage::Draft)
        .times(1)
        .return_once(|_| Ok(()));

    let record = harness
        .build()
        .enter_score(
            &tutor,
            ScoreEntry {
                offering: offering.id,
                student: pupil,
                score: score(dec!(25), dec!(50)),
            },
        )
        .await
        .expect("score entered");

    assert_eq!(record.letter, GradeLetter::A);
    assert_eq!(record.points, dec!(4.0));
    assert_eq!(record.score.total(), dec!(75));
}

#[tokio::test]
async fn entering_again_rescores_the_draft() {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let pupil = student_profile(&student()).id;
    let existing = draft_record(&tutor, &offering, pupil);
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_registration_status(Some(RegistrationStatus::Registered));
    harness
        .grades
        .expect_find_current()
        .return_once(move |_, _| Ok(Some(existing)));
    harness.grades.expect_insert().times(0);
    harness
        .grades
        .expect_update_draft()
        .times(1)
        .return_once(|record| Ok(record.clone()));

    let record = harness
        .build()
        .enter_score(
            &tutor,
            ScoreEntry {
                offering: offering.id,
                student: pupil,
                score: score(dec!(20), dec!(35)),
            },
        )
        .await
        .expect("rescored");

    assert_eq!(record.letter, GradeLetter::C);
    assert_eq!(record.stage, GradeStage::Draft);
}

#[rstest]
#[case::submitted(GradeStage::Submitted)]
#[case::published(GradeStage::Published)]
#[tokio::test]
async fn entering_over_a_record_in_review_is_conflict(#[case] stage: GradeStage) {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let pupil = student_profile(&student()).id;
    let existing = at_stage(draft_record(&tutor, &offering, pupil), stage);
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_registration_status(Some(RegistrationStatus::Registered));
    harness
        .grades
        .expect_find_current()
        .return_once(move |_, _| Ok(Some(existing)));
    harness.grades.expect_update_draft().times(0);

    let error = harness
        .build()
        .enter_score(
            &tutor,
            ScoreEntry {
                offering: offering.id,
                student: pupil,
                score: score(dec!(20), dec!(35)),
            },
        )
        .await
        .expect_err("locked");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[case::no_registration(None)]
#[case::still_pending(Some(RegistrationStatus::Pending))]
#[case::awaiting_exam_officer(Some(RegistrationStatus::LecturerApproved))]
#[tokio::test]
async fn score_entry_requires_registered_student(#[case] status: Option<RegistrationStatus>) {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_registration_status(status);
    harness.grades.expect_find_current().times(0);

    let error = harness
        .build()
        .enter_score(
            &tutor,
            ScoreEntry {
                offering: offering.id,
                student: StudentId::random(),
                score: score(dec!(20), dec!(35)),
            },
        )
        .await
        .expect_err("not registered");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        error.details().and_then(|details| details.get("code")),
        Some(&serde_json::json!("student_not_registered"))
    );
}

#[tokio::test]
async fn other_lecturer_cannot_enter_scores() {
    let offering = offering_taught_by(&lecturer(), 30, &[]);
    let mut harness = Harness::new().with_offering(&offering);
    harness.registrations.expect_find_active().times(0);

    let error = harness
        .build()
        .enter_score(
            &lecturer(),
            ScoreEntry {
                offering: offering.id,
                student: StudentId::random(),
                score: score(dec!(20), dec!(35)),
            },
        )
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn approval_chain_moves_one_gate_at_a_time() {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let record = draft_record(&tutor, &offering, StudentId::random());

    let steps = [
        (GradeStage::Draft, GradeStage::Submitted, tutor.clone()),
        (GradeStage::Submitted, GradeStage::HodApproved, hod_of("CSC")),
        (GradeStage::HodApproved, GradeStage::Verified, staff(Role::ExamOfficer)),
        (GradeStage::Verified, GradeStage::Published, staff(Role::Registrar)),
    ];
    for (from, to, actor) in steps {
        let current = at_stage(record.clone(), from);
        let mut harness = Harness::new()
            .with_offering(&offering)
            .with_record(&current);
        advance_returns_change(&mut harness, &current, from);
        let service = harness.build();

        let updated = match to {
            GradeStage::Submitted => service.submit(&actor, &current.id).await,
            GradeStage::HodApproved => service.hod_approve(&actor, &current.id).await,
            GradeStage::Verified => service.verify(&actor, &current.id).await,
            _ => service.publish(&actor, &current.id).await,
        }
        .expect("step succeeds");

        assert_eq!(updated.stage, to);
    }
}

#[rstest]
#[case::other_department_hod(hod_of("MTH"))]
#[case::exam_officer(staff(Role::ExamOfficer))]
#[case::lecturer(lecturer())]
#[tokio::test]
async fn hod_approval_needs_the_owning_hod(#[case] actor: Principal) {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let record = at_stage(
        draft_record(&tutor, &offering, StudentId::random()),
        GradeStage::Submitted,
    );
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_record(&record);
    harness.grades.expect_advance().times(0);

    let error = harness
        .build()
        .hod_approve(&actor, &record.id)
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn publishing_before_verification_is_conflict() {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let record = at_stage(
        draft_record(&tutor, &offering, StudentId::random()),
        GradeStage::HodApproved,
    );
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_record(&record);
    harness.grades.expect_advance().times(0);

    let error = harness
        .build()
        .publish(&staff(Role::Registrar), &record.id)
        .await
        .expect_err("not verified");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[case::by_hod(GradeStage::Submitted, hod_of("CSC"))]
#[case::by_exam_officer(GradeStage::HodApproved, staff(Role::ExamOfficer))]
#[case::by_registrar(GradeStage::Verified, staff(Role::Registrar))]
#[tokio::test]
async fn stage_owner_rejects_record(#[case] stage: GradeStage, #[case] actor: Principal) {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let record = at_stage(
        draft_record(&tutor, &offering, StudentId::random()),
        stage,
    );
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_record(&record);
    advance_returns_change(&mut harness, &record, stage);

    let updated = harness
        .build()
        .reject(&actor, &record.id, "scores do not add up".to_owned())
        .await
        .expect("rejected");

    assert_eq!(updated.stage, GradeStage::Rejected);
    assert_eq!(updated.rejection_reason.as_deref(), Some("scores do not add up"));
}

#[rstest]
#[case::draft(GradeStage::Draft)]
#[case::published(GradeStage::Published)]
#[case::rejected(GradeStage::Rejected)]
#[tokio::test]
async fn records_outside_review_cannot_be_rejected(#[case] stage: GradeStage) {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let record = at_stage(
        draft_record(&tutor, &offering, StudentId::random()),
        stage,
    );
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_record(&record);
    harness.grades.expect_advance().times(0);

    let error = harness
        .build()
        .reject(&staff(Role::Registrar), &record.id, "late".to_owned())
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn concurrent_duplicate_approval_loses_with_conflict() {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let record = at_stage(
        draft_record(&tutor, &offering, StudentId::random()),
        GradeStage::HodApproved,
    );
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_record(&record);
    harness
        .grades
        .expect_advance()
        .times(1)
        .return_once(|_, _, _| Err(GradeRepositoryError::stale_stage(GradeStage::HodApproved)));

    let error = harness
        .build()
        .verify(&staff(Role::ExamOfficer), &record.id)
        .await
        .expect_err("stale");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[case::published(GradeStage::Published, true)]
#[case::verified(GradeStage::Verified, false)]
#[tokio::test]
async fn students_only_see_their_published_records(
    #[case] stage: GradeStage,
    #[case] visible: bool,
) {
    let owner = student();
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let record = at_stage(
        draft_record(&tutor, &offering, student_profile(&owner).id),
        stage,
    );
    let harness = Harness::new().with_record(&record);

    let result = harness.build().get(&owner, &record.id).await;

    match result {
        Ok(fetched) => {
            assert!(visible);
            assert_eq!(fetched.id, record.id);
        }
        Err(error) => {
            assert!(!visible);
            assert_eq!(error.code(), ErrorCode::NotFound);
        }
    }
}

#[tokio::test]
async fn standing_is_computed_from_published_records() {
    let owner = student();
    let profile = student_profile(&owner);
    let found = owner.clone();
    let mut harness = Harness::new();
    harness
        .principals
        .expect_find_by_student()
        .times(1)
        .return_once(move |_| Ok(Some(found)));
    harness
        .grades
        .expect_list_published_for_student()
        .times(1)
        .return_once(move |student| {
            Ok(vec![
                published_grade(*student, "CSC101", 30, 45),
                published_grade(*student, "CSC102", 20, 35),
            ])
        });

    let standing = harness
        .build()
        .standing(&owner, &profile.id)
        .await
        .expect("standing");

    assert_eq!(standing.cgpa, dec!(3.00));
    assert_eq!(standing.total_credits, 6);
    assert_eq!(standing.classification, Classification::SecondClassUpper);
}

#[tokio::test]
async fn other_student_cannot_read_standing() {
    let owner = student();
    let found = owner.clone();
    let mut harness = Harness::new();
    harness
        .principals
        .expect_find_by_student()
        .return_once(move |_| Ok(Some(found)));
    harness.grades.expect_list_published_for_student().times(0);

    let error = harness
        .build()
        .standing(&student(), &student_profile(&owner).id)
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn unknown_student_standing_is_not_found() {
    let mut harness = Harness::new();
    harness
        .principals
        .expect_find_by_student()
        .return_once(|_| Ok(None));

    let error = harness
        .build()
        .standing(&staff(Role::Registrar), &StudentId::random())
        .await
        .expect_err("missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn approval_stamps_acting_principal() {
    let tutor = lecturer();
    let offering = offering_taught_by(&tutor, 30, &[]);
    let record = draft_record(&tutor, &offering, StudentId::random());
    let mut harness = Harness::new()
        .with_offering(&offering)
        .with_record(&record);
    advance_returns_change(&mut harness, &record, GradeStage::Draft);

    let updated = harness
        .build()
        .submit(&tutor, &record.id)
        .await
        .expect("submitted");

    let stamp = updated.history.submitted.expect("submission stamp");
    assert_eq!(stamp.by, tutor.id());
    assert_eq!(stamp.at, fixture_timestamp());
}
