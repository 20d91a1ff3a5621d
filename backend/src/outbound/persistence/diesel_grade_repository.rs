//! PostgreSQL-backed grade record adapter.
//!
//! Stage changes lock the record and compare its stage before writing, so
//! two approvers racing on the same record cannot both succeed.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{GradeRepository, GradeRepositoryError};
use crate::domain::{GradeRecord, GradeRecordId, GradeStage, OfferingId, StageChange, StudentId};

use super::diesel_error_mapping::{RepositoryError, TxError};
use super::models::{GradeRecordRow, GradeScoreUpdate, GradeStageUpdate, history_value};
use super::pool::DbPool;
use super::schema::grade_records;

type Tx = TxError<GradeRepositoryError>;

/// Diesel-backed implementation of [`GradeRepository`].
#[derive(Clone)]
pub struct DieselGradeRepository {
    pool: DbPool,
}

impl DieselGradeRepository {
    /// Create a repository over the given pool.
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn convert_all(rows: Vec<GradeRecordRow>) -> Result<Vec<GradeRecord>, GradeRepositoryError> {
    rows.into_iter()
        .map(GradeRecordRow::into_domain)
        .collect::<Result<Vec<_>, _>>()
        .map_err(GradeRepositoryError::query)
}

async fn lock_record(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    expected: GradeStage,
) -> Result<GradeRecord, Tx> {
    let row = grade_records::table
        .find(id)
        .select(GradeRecordRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| Tx::Refused(GradeRepositoryError::missing(id.to_string())))?;
    let current = row.into_domain().map_err(Tx::corrupt)?;
    if current.stage != expected {
        return Err(Tx::Refused(GradeRepositoryError::stale_stage(expected)));
    }
    Ok(current)
}

#[async_trait]
impl GradeRepository for DieselGradeRepository {
    async fn find(&self, id: &GradeRecordId) -> Result<Option<GradeRecord>, GradeRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(GradeRepositoryError::from_pool)?;
        let row = grade_records::table
            .find(*id.as_uuid())
            .select(GradeRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(GradeRepositoryError::from_diesel)?;
        row.map(GradeRecordRow::into_domain)
            .transpose()
            .map_err(GradeRepositoryError::query)
    }

    async fn find_current(
        &self,
        student: &StudentId,
        offering: &OfferingId,
    ) -> Result<Option<GradeRecord>, GradeRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(GradeRepositoryError::from_pool)?;
        let row = grade_records::table
            .filter(grade_records::student_id.eq(*student.as_uuid()))
            .filter(grade_records::offering_id.eq(*offering.as_uuid()))
            .filter(grade_records::stage.ne(GradeStage::Rejected.as_str()))
            .order_by(grade_records::entered_at.desc())
            .select(GradeRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(GradeRepositoryError::from_diesel)?;
        row.map(GradeRecordRow::into_domain)
            .transpose()
            .map_err(GradeRepositoryError::query)
    }

    async fn insert(&self, record: &GradeRecord) -> Result<(), GradeRepositoryError> {
        let row = GradeRecordRow::from_domain(record).map_err(GradeRepositoryError::query)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(GradeRepositoryError::from_pool)?;
        diesel::insert_into(grade_records::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(GradeRepositoryError::from_diesel)
    }

    async fn update_draft(
        &self,
        record: &GradeRecord,
    ) -> Result<GradeRecord, GradeRepositoryError> {
        let id = *record.id.as_uuid();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(GradeRepositoryError::from_pool)?;
        conn.transaction::<_, Tx, _>(|conn| {
            async move {
                let current = lock_record(conn, id, GradeStage::Draft).await?;
                let (ca_hundredths, exam_hundredths) = record.score.to_hundredths();
                diesel::update(grade_records::table.find(id))
                    .set(&GradeScoreUpdate {
                        ca_hundredths,
                        exam_hundredths,
                        letter: record.letter.as_str(),
                        entered_by: *record.entered_by.as_uuid(),
                        entered_at: record.entered_at,
                    })
                    .execute(conn)
                    .await?;
                Ok(GradeRecord {
                    score: record.score,
                    letter: record.letter,
                    points: record.points,
                    entered_by: record.entered_by,
                    entered_at: record.entered_at,
                    ..current
                })
            }
            .scope_boxed()
        })
        .await
        .map_err(Tx::into_repository_error)
    }

    async fn advance(
        &self,
        id: &GradeRecordId,
        expected: GradeStage,
        change: &StageChange,
    ) -> Result<GradeRecord, GradeRepositoryError> {
        let id = *id.as_uuid();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(GradeRepositoryError::from_pool)?;
        conn.transaction::<_, Tx, _>(|conn| {
            async move {
                let updated = lock_record(conn, id, expected).await?.with_stage(change);
                let history = history_value(&updated.history).map_err(Tx::corrupt)?;
                diesel::update(grade_records::table.find(id))
                    .set(&GradeStageUpdate {
                        stage: updated.stage.as_str().to_owned(),
                        rejection_reason: updated.rejection_reason.clone(),
                        history,
                    })
                    .execute(conn)
                    .await?;
                Ok(updated)
            }
            .scope_boxed()
        })
        .await
        .map_err(Tx::into_repository_error)
    }

    async fn list_for_offering(
        &self,
        offering: &OfferingId,
    ) -> Result<Vec<GradeRecord>, GradeRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(GradeRepositoryError::from_pool)?;
        let rows = grade_records::table
            .filter(grade_records::offering_id.eq(*offering.as_uuid()))
            .order_by((grade_records::student_id.asc(), grade_records::entered_at.asc()))
            .select(GradeRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(GradeRepositoryError::from_diesel)?;
        convert_all(rows)
    }

    async fn list_published_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<GradeRecord>, GradeRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(GradeRepositoryError::from_pool)?;
        let rows = grade_records::table
            .filter(grade_records::student_id.eq(*student.as_uuid()))
            .filter(grade_records::stage.eq(GradeStage::Published.as_str()))
            .order_by((
                grade_records::session_start.asc(),
                grade_records::semester.asc(),
                grade_records::course_code.asc(),
            ))
            .select(GradeRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(GradeRepositoryError::from_diesel)?;
        convert_all(rows)
    }
}
