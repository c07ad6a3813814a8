//! Shared helpers for cache integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use walkdir::WalkDir;
use warmstash_cache::{FileCache, FixedClock};

/// Reference instant all tests measure from
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn cache(root: &Path) -> FileCache {
    cache_at(root, t0())
}

pub fn cache_at(root: &Path, now: DateTime<Utc>) -> FileCache {
    FileCache::builder()
        .root(root)
        .clock(FixedClock::new(now))
        .build()
        .unwrap()
}

pub fn one_day_later() -> DateTime<Utc> {
    t0() + Duration::days(1)
}

/// Number of regular files anywhere under `root`
pub fn count_items(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count()
}

pub fn assert_root_empty(root: &Path) {
    assert!(root.is_dir(), "cache root should still exist");
    let leftovers: Vec<_> = std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert!(leftovers.is_empty(), "unexpected entries: {leftovers:?}");
}

/// A recorded tracing event
#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub message: String,
    pub file: Option<String>,
    pub error: Option<String>,
}

/// Layer recording WARN and above
#[derive(Clone, Default)]
pub struct CaptureLayer {
    pub events: Arc<Mutex<Vec<Captured>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::WARN {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().push(Captured {
            level,
            message: visitor.message,
            file: visitor.file,
            error: visitor.error,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    file: Option<String>,
    error: Option<String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        match field.name() {
            "message" => self.message = rendered,
            "file" => self.file = Some(rendered),
            "error" => self.error = Some(rendered),
            _ => {}
        }
    }
}
