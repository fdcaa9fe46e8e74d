//! Month grid used for picking a date on the album screen.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    /// Always the first day of the shown month.
    anchor: NaiveDate,
}

/// Rendered month: leading `None` cells pad the first row so day 1 sits
/// under its weekday.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub title: String,
    pub month: String,
    /// `YYYY-MM` targets for the previous/next arrows.
    pub previous_month: String,
    pub next_month: String,
    pub weekdays: [&'static str; 7],
    pub cells: Vec<Option<NaiveDate>>,
}

impl Calendar {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            anchor: day.with_day(1).unwrap_or(day),
        }
    }

    /// Parse `YYYY-MM`.
    pub fn from_month(month: &str) -> Option<Self> {
        NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
            .ok()
            .map(Self::new)
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn previous(&mut self) {
        if let Some(prev) = self.anchor.checked_sub_months(Months::new(1)) {
            self.anchor = prev;
        }
    }

    pub fn next(&mut self) {
        if let Some(next) = self.anchor.checked_add_months(Months::new(1)) {
            self.anchor = next;
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day.year() == self.anchor.year() && day.month() == self.anchor.month()
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.anchor
            .iter_days()
            .take_while(|day| day.month() == self.anchor.month())
    }

    pub fn grid(&self) -> MonthGrid {
        let mut previous = *self;
        previous.previous();
        let mut next = *self;
        next.next();
        let offset = self.anchor.weekday().num_days_from_sunday() as usize;
        let mut cells = vec![None; offset];
        cells.extend(self.days().map(Some));
        MonthGrid {
            title: self.anchor.format("%B %Y").to_string(),
            month: self.anchor.format("%Y-%m").to_string(),
            previous_month: previous.anchor.format("%Y-%m").to_string(),
            next_month: next.anchor.format("%Y-%m").to_string(),
            weekdays: WEEKDAY_LABELS,
            cells,
        }
    }

    /// Hand a day of the shown month to `on_select`. Days outside the month
    /// are ignored and `false` is returned.
    pub fn select(&self, day: NaiveDate, on_select: impl FnOnce(NaiveDate)) -> bool {
        if !self.contains(day) {
            return false;
        }
        on_select(day);
        true
    }
}
