//! PostgreSQL-backed course registration adapter.
//!
//! Decisions and finalisation run in transactions that lock the
//! registration row first, so a stale status is detected before any write.
//! Finalisation also locks the offering row, and the student's principal
//! row when a tuition waiver is requested, so seat and waiver counts cannot
//! be exceeded by concurrent exam officers.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{RegistrationRepository, RegistrationRepositoryError};
use crate::domain::{
    CourseRegistration, Finalization, OfferingId, RegistrationId, RegistrationStatus,
    StatusChange, StudentId, Term, WaiverAllowance, WaiverScope,
};

use super::diesel_error_mapping::{RepositoryError, TxError};
use super::models::{RegistrationRow, RegistrationStatusUpdate, term_columns};
use super::pool::DbPool;
use super::schema::{offerings, principals, registrations};

type Tx = TxError<RegistrationRepositoryError>;

const REJECTED: [&str; 2] = [
    RegistrationStatus::RejectedByLecturer.as_str(),
    RegistrationStatus::RejectedByExamOfficer.as_str(),
];

/// Diesel-backed implementation of [`RegistrationRepository`].
#[derive(Clone)]
pub struct DieselRegistrationRepository {
    pool: DbPool,
}

impl DieselRegistrationRepository {
    /// Create a repository over the given pool.
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn convert_all(
    rows: Vec<RegistrationRow>,
) -> Result<Vec<CourseRegistration>, RegistrationRepositoryError> {
    rows.into_iter()
        .map(RegistrationRow::into_domain)
        .collect::<Result<Vec<_>, _>>()
        .map_err(RegistrationRepositoryError::query)
}

async fn lock_registration(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    expected: RegistrationStatus,
) -> Result<CourseRegistration, Tx> {
    let row = registrations::table
        .find(id)
        .select(RegistrationRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| Tx::Refused(RegistrationRepositoryError::missing(id.to_string())))?;
    let current = row.into_domain().map_err(Tx::corrupt)?;
    if current.status != expected {
        return Err(Tx::Refused(RegistrationRepositoryError::stale_status(
            expected,
        )));
    }
    Ok(current)
}

async fn write_status(
    conn: &mut AsyncPgConnection,
    updated: &CourseRegistration,
) -> Result<(), Tx> {
    diesel::update(registrations::table.find(*updated.id.as_uuid()))
        .set(&RegistrationStatusUpdate::from_domain(updated))
        .execute(conn)
        .await?;
    Ok(())
}

async fn check_waiver(
    conn: &mut AsyncPgConnection,
    current: &CourseRegistration,
    allowance: WaiverAllowance,
) -> Result<(), Tx> {
    let student = *current.student.as_uuid();
    // Serialises waiver decisions for one student.
    principals::table
        .filter(principals::student_id.eq(student))
        .select(principals::id)
        .for_update()
        .first::<Uuid>(conn)
        .await
        .optional()?;

    let mut used = registrations::table
        .filter(registrations::student_id.eq(student))
        .filter(registrations::payment_waived.eq(true))
        .filter(registrations::status.eq(RegistrationStatus::Registered.as_str()))
        .select(diesel::dsl::count_star())
        .into_boxed();
    if allowance.scope == WaiverScope::PerTerm {
        let (session_start, semester) = term_columns(&current.term);
        used = used
            .filter(registrations::session_start.eq(session_start))
            .filter(registrations::semester.eq(semester));
    }
    let used: i64 = used.get_result(conn).await?;
    if used >= i64::from(allowance.limit) {
        return Err(Tx::Refused(RegistrationRepositoryError::waiver_exhausted(
            allowance.limit,
        )));
    }
    Ok(())
}

#[async_trait]
impl RegistrationRepository for DieselRegistrationRepository {
    async fn find(
        &self,
        id: &RegistrationId,
    ) -> Result<Option<CourseRegistration>, RegistrationRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RegistrationRepositoryError::from_pool)?;
        let row = registrations::table
            .find(*id.as_uuid())
            .select(RegistrationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(RegistrationRepositoryError::from_diesel)?;
        row.map(RegistrationRow::into_domain)
            .transpose()
            .map_err(RegistrationRepositoryError::query)
    }

    async fn find_active(
        &self,
        student: &StudentId,
        offering: &OfferingId,
    ) -> Result<Option<CourseRegistration>, RegistrationRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RegistrationRepositoryError::from_pool)?;
        let row = registrations::table
            .filter(registrations::student_id.eq(*student.as_uuid()))
            .filter(registrations::offering_id.eq(*offering.as_uuid()))
            .filter(registrations::status.ne_all(REJECTED))
            .select(RegistrationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(RegistrationRepositoryError::from_diesel)?;
        row.map(RegistrationRow::into_domain)
            .transpose()
            .map_err(RegistrationRepositoryError::query)
    }

    async fn count_active_in_term(
        &self,
        student: &StudentId,
        term: &Term,
    ) -> Result<u32, RegistrationRepositoryError> {
        let (session_start, semester) = term_columns(term);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RegistrationRepositoryError::from_pool)?;
        let count: i64 = registrations::table
            .filter(registrations::student_id.eq(*student.as_uuid()))
            .filter(registrations::session_start.eq(session_start))
            .filter(registrations::semester.eq(semester))
            .filter(registrations::status.ne_all(REJECTED))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(RegistrationRepositoryError::from_diesel)?;
        u32::try_from(count).map_err(|_| RegistrationRepositoryError::query("count overflow"))
    }

    async fn insert(
        &self,
        registration: &CourseRegistration,
    ) -> Result<(), RegistrationRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RegistrationRepositoryError::from_pool)?;
        diesel::insert_into(registrations::table)
            .values(&RegistrationRow::from_domain(registration))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(RegistrationRepositoryError::from_diesel)
    }

    async fn list_for_student(
        &self,
        student: &StudentId,
        term: Option<Term>,
    ) -> Result<Vec<CourseRegistration>, RegistrationRepositoryError> {
        let mut query = registrations::table
            .filter(registrations::student_id.eq(*student.as_uuid()))
            .select(RegistrationRow::as_select())
            .order_by((registrations::submitted_at.asc(), registrations::id.asc()))
            .into_boxed();
        if let Some(term) = term {
            let (session_start, semester) = term_columns(&term);
            query = query
                .filter(registrations::session_start.eq(session_start))
                .filter(registrations::semester.eq(semester));
        }
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RegistrationRepositoryError::from_pool)?;
        let rows = query
            .load(&mut conn)
            .await
            .map_err(RegistrationRepositoryError::from_diesel)?;
        convert_all(rows)
    }

    async fn list_for_offering(
        &self,
        offering: &OfferingId,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<CourseRegistration>, RegistrationRepositoryError> {
        let mut query = registrations::table
            .filter(registrations::offering_id.eq(*offering.as_uuid()))
            .select(RegistrationRow::as_select())
            .order_by((registrations::submitted_at.asc(), registrations::id.asc()))
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(registrations::status.eq(status.as_str()));
        }
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RegistrationRepositoryError::from_pool)?;
        let rows = query
            .load(&mut conn)
            .await
            .map_err(RegistrationRepositoryError::from_diesel)?;
        convert_all(rows)
    }

    async fn apply_decision(
        &self,
        id: &RegistrationId,
        expected: RegistrationStatus,
        change: &StatusChange,
    ) -> Result<CourseRegistration, RegistrationRepositoryError> {
        let id = *id.as_uuid();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RegistrationRepositoryError::from_pool)?;
        conn.transaction::<_, Tx, _>(|conn| {
            async move {
                let updated = lock_registration(conn, id, expected)
                    .await?
                    .with_change(change);
                write_status(conn, &updated).await?;
                Ok(updated)
            }
            .scope_boxed()
        })
        .await
        .map_err(Tx::into_repository_error)
    }

    async fn finalize(
        &self,
        id: &RegistrationId,
        finalization: &Finalization,
    ) -> Result<CourseRegistration, RegistrationRepositoryError> {
        let id = *id.as_uuid();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(RegistrationRepositoryError::from_pool)?;
        conn.transaction::<_, Tx, _>(|conn| {
            async move {
                let current =
                    lock_registration(conn, id, RegistrationStatus::LecturerApproved).await?;
                let offering = *current.offering.as_uuid();
                let (capacity, enrolled): (i32, i32) = offerings::table
                    .find(offering)
                    .select((offerings::capacity, offerings::enrolled_count))
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| {
                        Tx::Refused(RegistrationRepositoryError::missing(format!(
                            "offering {offering}"
                        )))
                    })?;
                if enrolled >= capacity {
                    return Err(Tx::Refused(RegistrationRepositoryError::capacity_exceeded(
                        current.offering,
                    )));
                }
                if let Some(allowance) = finalization.waiver {
                    check_waiver(conn, &current, allowance).await?;
                }

                let mut updated = current.with_change(&finalization.change);
                updated.payment_waived = finalization.waiver.is_some();
                write_status(conn, &updated).await?;
                diesel::update(offerings::table.find(offering))
                    .set(offerings::enrolled_count.eq(offerings::enrolled_count + 1))
                    .execute(conn)
                    .await?;
                Ok(updated)
            }
            .scope_boxed()
        })
        .await
        .map_err(Tx::into_repository_error)
    }
}
