//! Store length planning from the calendar.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use cyclone_common::month_slots;

use crate::error::{GridProcessorError, Result};

/// Where one month lands along a store's time axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub month: u32,
    pub start: u64,
    pub len: u64,
}

impl MonthRange {
    pub fn range(&self) -> Range<u64> {
        self.start..self.start + self.len
    }
}

/// Expected layout of a year store, known before any data is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePlan {
    pub year: i32,
    pub months: Vec<MonthRange>,
}

impl StorePlan {
    /// Plan a store holding `months` of `year` in the given order.
    ///
    /// Each month contributes its 6-hourly slot count times `fold_factor`
    /// (2 once hemispheres are stacked along time).
    pub fn for_year(year: i32, months: &[u32], fold_factor: u64) -> Result<Self> {
        let mut start = 0;
        let mut ranges = Vec::with_capacity(months.len());
        for &month in months {
            let len = month_slots(year, month)?.len() as u64 * fold_factor;
            ranges.push(MonthRange { month, start, len });
            start += len;
        }
        Ok(Self {
            year,
            months: ranges,
        })
    }

    /// Total length of the time axis.
    pub fn total_len(&self) -> u64 {
        self.months.iter().map(|m| m.len).sum()
    }

    pub fn month(&self, month: u32) -> Option<&MonthRange> {
        self.months.iter().find(|m| m.month == month)
    }

    /// Check a produced month length against the plan.
    pub fn check(&self, month: u32, produced: u64) -> Result<Range<u64>> {
        let planned = self.month(month).ok_or(GridProcessorError::PlanMismatch {
            month,
            expected: 0,
            got: produced,
        })?;
        if planned.len != produced {
            return Err(GridProcessorError::PlanMismatch {
                month,
                expected: planned.len,
                got: produced,
            });
        }
        Ok(planned.range())
    }
}
