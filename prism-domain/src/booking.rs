//! Booking calendar arithmetic.
//!
//! Everything here is a pure function of the clinic's [`BookingRules`], the
//! slots already taken and the current local time, so the public booking page
//! and the staff calendar agree on what is free.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;
use thiserror::Error;

use prism_data::models::BookedSlot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("The clinic is closed on {0}")]
    Closed(NaiveDate),

    #[error("The requested slot is in the past")]
    Past,

    #[error("Bookings are only accepted up to {0}")]
    BeyondHorizon(NaiveDate),

    #[error("{0} is not the start of a booking slot")]
    NotASlot(NaiveTime),

    #[error("The requested slot is fully booked")]
    Full,

    #[error("Invalid month {0}-{1}")]
    InvalidMonth(i32, u32),

    #[error("Invalid booking rules: {0}")]
    InvalidRules(String),
}

impl BookingError {
    /// Errors caused by a slot being taken rather than by a bad request
    pub fn is_conflict(&self) -> bool {
        matches!(self, BookingError::Full)
    }
}

/// Longest booking horizon the calendar accepts, two years
pub const MAX_DAYS_AHEAD: u32 = 730;

/// Clinic hours and slot layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRules {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub slot_minutes: u32,
    /// Bookings allowed per slot
    pub capacity: u32,
    pub closed_weekdays: Vec<Weekday>,
    /// How far ahead the calendar accepts bookings
    pub days_ahead: u32,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 60,
            capacity: 1,
            closed_weekdays: vec![Weekday::Sun],
            days_ahead: 90,
        }
    }
}

impl BookingRules {
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.slot_minutes == 0 {
            return Err(BookingError::InvalidRules("slot length must be positive".to_string()));
        }
        if self.capacity == 0 {
            return Err(BookingError::InvalidRules("slot capacity must be positive".to_string()));
        }
        if self.days_ahead > MAX_DAYS_AHEAD {
            return Err(BookingError::InvalidRules(format!(
                "booking horizon cannot exceed {} days",
                MAX_DAYS_AHEAD
            )));
        }
        if self.close <= self.open {
            return Err(BookingError::InvalidRules(
                "closing time must be after opening time".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a list such as `sun` or `sat,sun`
    pub fn parse_weekdays(value: &str) -> Result<Vec<Weekday>, BookingError> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Weekday>()
                    .map_err(|_| BookingError::InvalidRules(format!("unknown weekday: {}", s)))
            })
            .collect()
    }

    pub fn is_closed(&self, date: NaiveDate) -> bool {
        self.closed_weekdays.contains(&date.weekday())
    }

    /// Last date that accepts bookings, saturating at the end of the calendar
    pub fn horizon(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_signed(Duration::days(i64::from(self.days_ahead)))
            .unwrap_or(NaiveDate::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub time: NaiveTime,
    pub capacity: u32,
    pub booked: u32,
    pub remaining: u32,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub closed: bool,
    pub past: bool,
    pub beyond_horizon: bool,
    pub slots: Vec<SlotAvailability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub closed: bool,
    pub past: bool,
    pub available_slots: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

/// Slot start times; a slot must end by closing time
pub fn slot_times(rules: &BookingRules) -> Vec<NaiveTime> {
    if rules.slot_minutes == 0 {
        return Vec::new();
    }

    let step = Duration::minutes(i64::from(rules.slot_minutes));
    let mut times = Vec::new();
    let mut start = rules.open;

    loop {
        let (end, wrapped) = start.overflowing_add_signed(step);
        if wrapped != 0 || end > rules.close {
            break;
        }
        times.push(start);
        start = end;
    }
    times
}

fn booked_count(booked: &[BookedSlot], date: NaiveDate, time: NaiveTime) -> u32 {
    booked.iter().filter(|slot| slot.date == date && slot.time == time).count() as u32
}

/// Remaining capacity of every slot on one day
pub fn day_availability(
    rules: &BookingRules,
    date: NaiveDate,
    booked: &[BookedSlot],
    now: NaiveDateTime,
) -> DayAvailability {
    let today = now.date();
    let closed = rules.is_closed(date);
    let past = date < today;
    let beyond_horizon = date > rules.horizon(today);
    let bookable_day = !closed && !past && !beyond_horizon;

    let slots = slot_times(rules)
        .into_iter()
        .map(|time| {
            let taken = booked_count(booked, date, time);
            let remaining = rules.capacity.saturating_sub(taken);
            let started = date == today && time <= now.time();
            SlotAvailability {
                time,
                capacity: rules.capacity,
                booked: taken,
                remaining,
                available: bookable_day && !started && remaining > 0,
            }
        })
        .collect();

    DayAvailability {
        date,
        closed,
        past,
        beyond_horizon,
        slots,
    }
}

/// Per-day count of bookable slots for one month
pub fn month_calendar(
    rules: &BookingRules,
    year: i32,
    month: u32,
    booked: &[BookedSlot],
    now: NaiveDateTime,
) -> Result<MonthCalendar, BookingError> {
    let (first, last) = month_bounds(year, month)?;

    let days = first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| {
            let day = day_availability(rules, date, booked, now);
            CalendarDay {
                date,
                closed: day.closed,
                past: day.past,
                available_slots: day.slots.iter().filter(|s| s.available).count() as u32,
            }
        })
        .collect();

    Ok(MonthCalendar { year, month, days })
}

/// First and last day of a month
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), BookingError> {
    let first =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(BookingError::InvalidMonth(year, month))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(BookingError::InvalidMonth(year, month))?;

    Ok((first, next - Duration::days(1)))
}

/// Whether a new booking may take the given slot
pub fn check_slot(
    rules: &BookingRules,
    date: NaiveDate,
    time: NaiveTime,
    booked: &[BookedSlot],
    now: NaiveDateTime,
) -> Result<(), BookingError> {
    let today = now.date();

    if rules.is_closed(date) {
        return Err(BookingError::Closed(date));
    }
    if date < today || (date == today && time <= now.time()) {
        return Err(BookingError::Past);
    }
    let horizon = rules.horizon(today);
    if date > horizon {
        return Err(BookingError::BeyondHorizon(horizon));
    }
    if !slot_times(rules).contains(&time) {
        return Err(BookingError::NotASlot(time));
    }
    if booked_count(booked, date, time) >= rules.capacity {
        return Err(BookingError::Full);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Monday 2024-03-04, 10:30
    fn now() -> NaiveDateTime {
        date(2024, 3, 4).and_time(time(10, 30))
    }

    #[test]
    fn test_slot_times_fit_inside_opening_hours() {
        let rules = BookingRules {
            open: time(9, 0),
            close: time(12, 0),
            slot_minutes: 45,
            ..Default::default()
        };

        // 11:15 + 45 = 12:00 fits, 12:00 would end after close
        assert_eq!(slot_times(&rules), vec![time(9, 0), time(9, 45), time(10, 30), time(11, 15)]);
        assert_eq!(slot_times(&BookingRules::default()).len(), 9);
    }

    #[test]
    fn test_horizon_is_bounded() {
        let rules = BookingRules { days_ahead: 4_000_000_000, ..BookingRules::default() };
        assert!(matches!(rules.validate(), Err(BookingError::InvalidRules(_))));

        assert_eq!(rules.horizon(now().date()), NaiveDate::MAX);
        assert!(check_slot(&rules, date(2024, 3, 5), time(10, 0), &[], now()).is_ok());
    }

    #[test]
    fn test_zero_slot_length_yields_no_slots() {
        let rules = BookingRules { slot_minutes: 0, ..Default::default() };
        assert!(slot_times(&rules).is_empty());
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_day_availability_counts_bookings() {
        let rules = BookingRules { capacity: 2, ..Default::default() };
        let day = date(2024, 3, 5);
        let booked = vec![
            BookedSlot { date: day, time: time(9, 0) },
            BookedSlot { date: day, time: time(9, 0) },
            BookedSlot { date: day, time: time(10, 0) },
        ];

        let availability = day_availability(&rules, day, &booked, now());
        let nine = &availability.slots[0];
        let ten = &availability.slots[1];

        assert_eq!(nine.remaining, 0);
        assert!(!nine.available);
        assert_eq!(ten.booked, 1);
        assert_eq!(ten.remaining, 1);
        assert!(ten.available);
    }

    #[test]
    fn test_started_slots_today_are_unavailable() {
        let availability = day_availability(&BookingRules::default(), now().date(), &[], now());

        let by_time = |t: NaiveTime| availability.slots.iter().find(|s| s.time == t).unwrap().available;
        assert!(!by_time(time(9, 0)));
        assert!(!by_time(time(10, 0)));
        assert!(by_time(time(11, 0)));
    }

    #[test]
    fn test_closed_and_past_days() {
        let rules = BookingRules::default();

        let sunday = day_availability(&rules, date(2024, 3, 10), &[], now());
        assert!(sunday.closed);
        assert!(sunday.slots.iter().all(|s| !s.available));

        let yesterday = day_availability(&rules, date(2024, 3, 3), &[], now());
        assert!(yesterday.past);
        assert!(yesterday.slots.iter().all(|s| !s.available));
    }

    #[test]
    fn test_month_calendar() {
        let rules = BookingRules::default();
        let calendar = month_calendar(&rules, 2024, 3, &[], now()).unwrap();

        assert_eq!(calendar.days.len(), 31);
        assert!(calendar.days[0].past);
        assert_eq!(calendar.days[0].available_slots, 0);
        // Today at 10:30 leaves 11:00 through 17:00
        assert_eq!(calendar.days[3].available_slots, 7);
        assert_eq!(calendar.days[4].available_slots, 9);
        assert!(calendar.days[9].closed);

        let february = month_calendar(&rules, 2024, 2, &[], now()).unwrap();
        assert_eq!(february.days.len(), 29);

        assert_eq!(
            month_calendar(&rules, 2024, 13, &[], now()),
            Err(BookingError::InvalidMonth(2024, 13))
        );
    }

    #[test]
    fn test_december_bounds() {
        let (first, last) = month_bounds(2024, 12).unwrap();
        assert_eq!(first, date(2024, 12, 1));
        assert_eq!(last, date(2024, 12, 31));
    }

    #[test]
    fn test_check_slot() {
        let rules = BookingRules::default();
        let tomorrow = date(2024, 3, 5);

        assert_eq!(check_slot(&rules, tomorrow, time(9, 0), &[], now()), Ok(()));
        assert_eq!(
            check_slot(&rules, date(2024, 3, 10), time(9, 0), &[], now()),
            Err(BookingError::Closed(date(2024, 3, 10)))
        );
        assert_eq!(check_slot(&rules, now().date(), time(10, 0), &[], now()), Err(BookingError::Past));
        assert_eq!(
            check_slot(&rules, tomorrow, time(9, 30), &[], now()),
            Err(BookingError::NotASlot(time(9, 30)))
        );
        assert!(matches!(
            check_slot(&rules, date(2024, 12, 31), time(9, 0), &[], now()),
            Err(BookingError::BeyondHorizon(_))
        ));

        let booked = vec![BookedSlot { date: tomorrow, time: time(9, 0) }];
        let full = check_slot(&rules, tomorrow, time(9, 0), &booked, now());
        assert_eq!(full, Err(BookingError::Full));
        assert!(full.unwrap_err().is_conflict());
    }

    #[test]
    fn test_parse_weekdays() {
        assert_eq!(BookingRules::parse_weekdays("sat, sun").unwrap(), vec![Weekday::Sat, Weekday::Sun]);
        assert_eq!(BookingRules::parse_weekdays("").unwrap(), Vec::<Weekday>::new());
        assert!(BookingRules::parse_weekdays("someday").is_err());
    }
}
