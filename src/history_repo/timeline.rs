// Timeline downsampling: 20-minute buckets, latest sample per bucket,
// newest 30 buckets. Pure logic; DB access stays in history_repo::mod.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::models::{TimelinePoint, UptimeSample};

/// Bucket width; buckets start at minute 0, 20 and 40 of each hour.
pub const BUCKET_MINUTES: u32 = 20;
/// Most recent buckets kept for display.
pub const MAX_TIMELINE_POINTS: usize = 30;

/// Calendar date + hour + minute band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeBucket {
    pub date: NaiveDate,
    pub hour: u32,
    pub band: u32,
}

impl TimeBucket {
    pub fn of(ts: NaiveDateTime) -> Self {
        Self {
            date: ts.date(),
            hour: ts.hour(),
            band: (ts.minute() / BUCKET_MINUTES) * BUCKET_MINUTES,
        }
    }
}

/// One point per populated bucket (its latest sample), newest first, at most
/// [`MAX_TIMELINE_POINTS`]. Input order does not matter.
pub fn aggregate_samples(samples: &[UptimeSample]) -> Vec<TimelinePoint> {
    let mut by_bucket: HashMap<TimeBucket, &UptimeSample> = HashMap::new();
    for s in samples {
        by_bucket
            .entry(TimeBucket::of(s.timestamp))
            .and_modify(|kept| {
                if s.timestamp > kept.timestamp {
                    *kept = s;
                }
            })
            .or_insert(s);
    }

    let mut points: Vec<TimelinePoint> = by_bucket.into_values().map(TimelinePoint::from).collect();
    points.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    points.truncate(MAX_TIMELINE_POINTS);
    points
}
