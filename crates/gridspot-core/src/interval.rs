// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Interval key arithmetic
//!
//! Pure wall-clock math over a configured interval duration and timezone.
//! Keys are zero-padded "HH:MM" interval starts in local market time. DST
//! days are handled explicitly: the spring-forward day drops the skipped
//! hour's keys, the fall-back day repeats the ambiguous hour's labels.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use gridspot_types::{GridspotError, Result};

/// Clock arithmetic for one area's timezone and interval duration
#[derive(Debug, Clone)]
pub struct IntervalClock {
    minutes: u32,
    tz: Tz,
}

impl IntervalClock {
    pub fn new(minutes: u32, tz: Tz) -> Result<Self> {
        if minutes == 0 || 60 % minutes != 0 {
            return Err(GridspotError::Configuration(format!(
                "interval duration must evenly divide 60, got {minutes}"
            )));
        }
        Ok(Self { minutes, tz })
    }

    /// Local calendar date for the given instant
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Local hour (0-23) for the given instant, for window checks
    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        now.with_timezone(&self.tz).hour()
    }

    /// Minutes since local midnight
    pub fn minutes_into_day(&self, now: DateTime<Utc>) -> i64 {
        let local = now.with_timezone(&self.tz);
        i64::from(local.hour() * 60 + local.minute())
    }

    /// Key for the interval containing `now`
    pub fn current_key(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.tz);
        let minute = local.minute() - local.minute() % self.minutes;
        format!("{:02}:{:02}", local.hour(), minute)
    }

    /// Key for the interval after the one containing `now`; wraps to "00:00"
    /// at midnight, the caller tracks the date rollover
    pub fn next_key(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.tz);
        let floored = local.hour() * 60 + local.minute() - local.minute() % self.minutes;
        let next = (floored + self.minutes) % 1440;
        format!("{:02}:{:02}", next / 60, next % 60)
    }

    /// All interval keys for a local calendar day, in wall-clock order.
    ///
    /// Enumerated from the real local instants of the day, so a
    /// spring-forward day omits the skipped hour and a fall-back day yields
    /// the ambiguous hour's labels twice (once per absolute instant).
    /// Callers collapsing duplicates keep the first occurrence.
    pub fn keys_for_day(&self, date: NaiveDate) -> Vec<String> {
        let mut keys = Vec::with_capacity((1440 / self.minutes) as usize + 4);
        for slot in 0..(1440 / self.minutes) {
            let minutes = slot * self.minutes;
            let Some(time) = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0) else {
                continue;
            };
            let label = format!("{:02}:{:02}", minutes / 60, minutes % 60);
            match self.tz.from_local_datetime(&date.and_time(time)) {
                chrono::LocalResult::None => {}
                chrono::LocalResult::Single(_) => keys.push(label),
                chrono::LocalResult::Ambiguous(_, _) => {
                    keys.push(label.clone());
                    keys.push(label);
                }
            }
        }
        keys
    }

    /// Number of distinct interval keys expected for the day
    pub fn expected_key_count(&self, date: NaiveDate) -> usize {
        let mut keys = self.keys_for_day(date);
        keys.dedup();
        keys.len()
    }
}
