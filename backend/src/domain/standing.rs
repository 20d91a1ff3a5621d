//! GPA, CGPA and degree classification over published grades.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::academic::Term;
use super::grading::{GradeRecord, GradeStage};

/// Degree class on the 4.0 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// CGPA of at least 3.50.
    FirstClass,
    /// CGPA of at least 3.00.
    SecondClassUpper,
    /// CGPA of at least 2.00.
    SecondClassLower,
    /// CGPA of at least 1.00.
    ThirdClass,
    /// Any positive CGPA below 1.00.
    Pass,
    /// CGPA of zero.
    Fail,
}

impl Classification {
    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstClass => "first_class",
            Self::SecondClassUpper => "second_class_upper",
            Self::SecondClassLower => "second_class_lower",
            Self::ThirdClass => "third_class",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    /// Classify a CGPA.
    pub fn from_cgpa(cgpa: Decimal) -> Self {
        if cgpa >= Decimal::new(350, 2) {
            Self::FirstClass
        } else if cgpa >= Decimal::new(300, 2) {
            Self::SecondClassUpper
        } else if cgpa >= Decimal::new(200, 2) {
            Self::SecondClassLower
        } else if cgpa >= Decimal::ONE {
            Self::ThirdClass
        } else if cgpa > Decimal::ZERO {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

/// GPA for one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermGpa {
    /// Term covered.
    pub term: Term,
    /// Credit-weighted average, two decimal places.
    pub gpa: Decimal,
    /// Credits counted.
    pub credits: u32,
}

/// A student's standing recomputed from published grades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicStanding {
    /// Cumulative GPA.
    pub cgpa: Decimal,
    /// Total credits counted.
    pub total_credits: u32,
    /// Degree class derived from the CGPA.
    pub classification: Classification,
    /// Per-term breakdown in chronological order.
    pub terms: Vec<TermGpa>,
}

impl AcademicStanding {
    /// Compute standing from a student's grade records.
    ///
    /// Records that are not `published` are ignored.
    pub fn compute<'a>(records: impl IntoIterator<Item = &'a GradeRecord>) -> Self {
        let published: Vec<&GradeRecord> = records
            .into_iter()
            .filter(|record| record.stage == GradeStage::Published)
            .collect();

        let mut by_term: BTreeMap<Term, Vec<&GradeRecord>> = BTreeMap::new();
        for record in published.iter().copied() {
            by_term.entry(record.term).or_default().push(record);
        }

        let terms = by_term
            .into_iter()
            .map(|(term, records)| {
                let (gpa, credits) = weighted_average(records);
                TermGpa { term, gpa, credits }
            })
            .collect();

        let (cgpa, total_credits) = weighted_average(published);
        Self {
            cgpa,
            total_credits,
            classification: Classification::from_cgpa(cgpa),
            terms,
        }
    }
}

fn weighted_average(records: Vec<&GradeRecord>) -> (Decimal, u32) {
    let (quality, credits) = records
        .iter()
        .fold((Decimal::ZERO, 0_u32), |(quality, credits), record| {
            (
                quality + record.quality_points(),
                credits + u32::from(record.credit_units.value()),
            )
        });
    if credits == 0 {
        return (Decimal::ZERO, 0);
    }
    let gpa = (quality / Decimal::from(credits))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (gpa, credits)
}
