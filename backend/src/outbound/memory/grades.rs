//! Grade port over the in-memory store.

use async_trait::async_trait;

use crate::domain::ports::{GradeRepository, GradeRepositoryError};
use crate::domain::{GradeRecord, GradeRecordId, GradeStage, OfferingId, StageChange, StudentId};

use super::InMemoryCollegeStore;

#[async_trait]
impl GradeRepository for InMemoryCollegeStore {
    async fn find(&self, id: &GradeRecordId) -> Result<Option<GradeRecord>, GradeRepositoryError> {
        Ok(self.lock().await.grades.get(id).cloned())
    }

    async fn find_current(
        &self,
        student: &StudentId,
        offering: &OfferingId,
    ) -> Result<Option<GradeRecord>, GradeRepositoryError> {
        let state = self.lock().await;
        Ok(state
            .grades
            .values()
            .filter(|g| g.student == *student && g.offering == *offering)
            .filter(|g| g.stage != GradeStage::Rejected)
            .max_by_key(|g| g.entered_at)
            .cloned())
    }

    async fn insert(&self, record: &GradeRecord) -> Result<(), GradeRepositoryError> {
        let mut state = self.lock().await;
        let live = state.grades.values().any(|g| {
            g.student == record.student
                && g.offering == record.offering
                && g.stage != GradeStage::Rejected
        });
        if live || state.grades.contains_key(&record.id) {
            return Err(GradeRepositoryError::duplicate(format!(
                "student {} in offering {}",
                record.student, record.offering
            )));
        }
        state.grades.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_draft(
        &self,
        record: &GradeRecord,
    ) -> Result<GradeRecord, GradeRepositoryError> {
        let mut state = self.lock().await;
        let current = state
            .grades
            .get_mut(&record.id)
            .ok_or_else(|| GradeRepositoryError::missing(record.id.to_string()))?;
        if current.stage != GradeStage::Draft {
            return Err(GradeRepositoryError::stale_stage(GradeStage::Draft));
        }
        current.score = record.score;
        current.letter = record.letter;
        current.points = record.points;
        current.entered_by = record.entered_by;
        current.entered_at = record.entered_at;
        Ok(current.clone())
    }

    async fn advance(
        &self,
        id: &GradeRecordId,
        expected: GradeStage,
        change: &StageChange,
    ) -> Result<GradeRecord, GradeRepositoryError> {
        let mut state = self.lock().await;
        let current = state
            .grades
            .get(id)
            .cloned()
            .ok_or_else(|| GradeRepositoryError::missing(id.to_string()))?;
        if current.stage != expected {
            return Err(GradeRepositoryError::stale_stage(expected));
        }
        let updated = current.with_stage(change);
        state.grades.insert(*id, updated.clone());
        Ok(updated)
    }

    async fn list_for_offering(
        &self,
        offering: &OfferingId,
    ) -> Result<Vec<GradeRecord>, GradeRepositoryError> {
        let state = self.lock().await;
        let mut records: Vec<GradeRecord> = state
            .grades
            .values()
            .filter(|g| g.offering == *offering)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.student
                .cmp(&b.student)
                .then_with(|| a.entered_at.cmp(&b.entered_at))
        });
        Ok(records)
    }

    async fn list_published_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<GradeRecord>, GradeRepositoryError> {
        let state = self.lock().await;
        let mut records: Vec<GradeRecord> = state
            .grades
            .values()
            .filter(|g| g.student == *student && g.stage == GradeStage::Published)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.term.cmp(&b.term).then_with(|| a.course.cmp(&b.course)));
        Ok(records)
    }
}
