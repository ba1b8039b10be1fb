use crate::calendar::{
    is_supported_date, is_supported_instant, local_instant, week_start, WorkingHours,
    SUPPORTED_YEARS,
};
use crate::error::BookingError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// How an admin asked for time to be blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    SingleSlot {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    WholeDay {
        date: NaiveDate,
    },
    /// Sunday..Saturday of the week containing `anchor`.
    WholeWeek {
        anchor: NaiveDate,
    },
}

impl BlockKind {
    /// Resolves the request into a half-open `[start, end)` range.
    pub fn interval(
        &self,
        working_hours: WorkingHours,
        timezone: &Tz,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), BookingError> {
        if let BlockKind::WholeDay { date } | BlockKind::WholeWeek { anchor: date } = *self {
            if !is_supported_date(date) {
                return Err(out_of_range());
            }
        }

        let (start_time, end_time) = match *self {
            BlockKind::SingleSlot {
                start_time,
                end_time,
            } => (start_time, end_time),
            BlockKind::WholeDay { date } => (
                local_instant(timezone, date, working_hours.opening()),
                local_instant(timezone, date, working_hours.closing()),
            ),
            BlockKind::WholeWeek { anchor } => {
                let sunday = week_start(anchor);
                let saturday = sunday + Duration::days(6);
                (
                    local_instant(timezone, sunday, working_hours.opening()),
                    local_instant(timezone, saturday, working_hours.closing()),
                )
            }
        };

        if !is_supported_instant(start_time) || !is_supported_instant(end_time) {
            return Err(out_of_range());
        }
        if start_time >= end_time {
            return Err(BookingError::validation(
                "End time must be after start time",
            ));
        }
        Ok((start_time, end_time))
    }
}

pub fn out_of_range() -> BookingError {
    BookingError::validation(format!(
        "Dates must fall between the years {} and {}",
        SUPPORTED_YEARS.start(),
        SUPPORTED_YEARS.end()
    ))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    #[default]
    Single,
    Day,
    Week,
}

/// Wire form of `POST /blocked-time`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockedTimeRequest {
    #[serde(default)]
    pub block_type: BlockType,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub reason: Option<String>,
}

impl TryFrom<&CreateBlockedTimeRequest> for BlockKind {
    type Error = BookingError;

    fn try_from(request: &CreateBlockedTimeRequest) -> Result<Self, Self::Error> {
        match request.block_type {
            BlockType::Single => match (request.start_time, request.end_time) {
                (Some(start_time), Some(end_time)) => Ok(BlockKind::SingleSlot {
                    start_time,
                    end_time,
                }),
                _ => Err(BookingError::validation("Start and end times are required")),
            },
            BlockType::Day => request
                .date
                .map(|date| BlockKind::WholeDay { date })
                .ok_or_else(|| BookingError::validation("A date is required")),
            BlockType::Week => request
                .date
                .map(|anchor| BlockKind::WholeWeek { anchor })
                .ok_or_else(|| BookingError::validation("A date is required")),
        }
    }
}
