use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use prism_domain::booking::{CalendarDay, DayAvailability, MonthCalendar, SlotAvailability};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlotsQuery {
    /// `YYYY-MM-DD`
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotResponse {
    #[schema(value_type = String, example = "10:00:00")]
    pub time: NaiveTime,
    pub capacity: u32,
    pub booked: u32,
    pub remaining: u32,
    pub available: bool,
}

impl From<SlotAvailability> for SlotResponse {
    fn from(slot: SlotAvailability) -> Self {
        Self {
            time: slot.time,
            capacity: slot.capacity,
            booked: slot.booked,
            remaining: slot.remaining,
            available: slot.available,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DaySlotsResponse {
    pub success: bool,
    pub date: NaiveDate,
    pub closed: bool,
    pub past: bool,
    pub beyond_horizon: bool,
    pub slots: Vec<SlotResponse>,
}

impl From<DayAvailability> for DaySlotsResponse {
    fn from(day: DayAvailability) -> Self {
        Self {
            success: true,
            date: day.date,
            closed: day.closed,
            past: day.past,
            beyond_horizon: day.beyond_horizon,
            slots: day.slots.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalendarDayResponse {
    pub date: NaiveDate,
    pub closed: bool,
    pub past: bool,
    pub available_slots: u32,
}

impl From<CalendarDay> for CalendarDayResponse {
    fn from(day: CalendarDay) -> Self {
        Self {
            date: day.date,
            closed: day.closed,
            past: day.past,
            available_slots: day.available_slots,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalendarResponse {
    pub success: bool,
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDayResponse>,
}

impl From<MonthCalendar> for CalendarResponse {
    fn from(calendar: MonthCalendar) -> Self {
        Self {
            success: true,
            year: calendar.year,
            month: calendar.month,
            days: calendar.days.into_iter().map(Into::into).collect(),
        }
    }
}
