//! Coalescing of rapid writes to the same key.
//!
//! [`DebouncedWriter`] is a cooperative timer queue: nothing runs on its own.
//! The owner calls [`DebouncedWriter::fire_due`] whenever it gets control
//! (after a mutation, on a tick) and the writer hands back every payload whose
//! quiet period has elapsed. Rescheduling a key replaces its payload and
//! restarts its timer, so within a window only the last payload is written.

use crate::clock::Clock;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

struct Pending<P> {
    payload: P,
    due: DateTime<Utc>,
}

pub struct DebouncedWriter<P> {
    delay: chrono::Duration,
    clock: Rc<dyn Clock>,
    pending: BTreeMap<String, Pending<P>>,
}

/// Outcome of one write performed by the writer.
pub type WriteOutcome = (String, Result<()>);

impl<P> DebouncedWriter<P> {
    pub fn new(delay: Duration, clock: Rc<dyn Clock>) -> Self {
        Self {
            delay: chrono::Duration::milliseconds(delay.as_millis() as i64),
            clock,
            pending: BTreeMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay.num_milliseconds().max(0) as u64)
    }

    /// Queue `payload` for `key`, replacing any payload already waiting.
    ///
    /// Returns true when an earlier payload was dropped.
    pub fn schedule(&mut self, key: impl Into<String>, payload: P) -> bool {
        let key = key.into();
        let due = self.clock.now() + self.delay;
        let replaced = self
            .pending
            .insert(key.clone(), Pending { payload, due })
            .is_some();
        debug!(key = %key, replaced, "write scheduled");
        replaced
    }

    /// Run `perform` for every key whose deadline has passed.
    pub fn fire_due<F>(&mut self, mut perform: F) -> Vec<WriteOutcome>
    where
        F: FnMut(&str, P) -> Result<()>,
    {
        let now = self.clock.now();
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut outcomes = Vec::with_capacity(due.len());
        for key in due {
            if let Some(entry) = self.pending.remove(&key) {
                let outcome = perform(&key, entry.payload);
                outcomes.push((key, outcome));
            }
        }
        outcomes
    }

    /// Write `key` now if it is pending. `None` when nothing was waiting.
    pub fn flush<F>(&mut self, key: &str, perform: F) -> Option<Result<()>>
    where
        F: FnOnce(&str, P) -> Result<()>,
    {
        let entry = self.pending.remove(key)?;
        Some(perform(key, entry.payload))
    }

    /// Write every pending key now, ignoring deadlines.
    pub fn flush_all<F>(&mut self, mut perform: F) -> Vec<WriteOutcome>
    where
        F: FnMut(&str, P) -> Result<()>,
    {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(key, entry)| {
                let outcome = perform(&key, entry.payload);
                (key, outcome)
            })
            .collect()
    }

    /// Drop the pending payload for `key` without writing it.
    pub fn cancel(&mut self, key: &str) -> Option<P> {
        self.pending.remove(key).map(|p| p.payload)
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.values().map(|p| p.due).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::SiteError;
    use chrono::TimeZone;

    fn setup() -> (Rc<ManualClock>, DebouncedWriter<u32>) {
        let clock = Rc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let writer = DebouncedWriter::new(Duration::from_millis(1000), clock.clone());
        (clock, writer)
    }

    #[test]
    fn burst_produces_one_write_with_last_payload() {
        let (clock, mut writer) = setup();
        for n in 1..=5 {
            writer.schedule("k", n);
            clock.advance_ms(200);
        }
        let mut writes = Vec::new();
        // 200ms after the last schedule: still waiting
        assert!(writer.fire_due(|k, p| {
            writes.push((k.to_string(), p));
            Ok(())
        })
        .is_empty());

        clock.advance_ms(800);
        writer.fire_due(|k, p| {
            writes.push((k.to_string(), p));
            Ok(())
        });
        assert_eq!(writes, vec![("k".to_string(), 5)]);
        assert!(!writer.is_pending("k"));
    }

    #[test]
    fn rescheduling_restarts_the_timer() {
        let (clock, mut writer) = setup();
        writer.schedule("k", 1);
        let first = writer.next_deadline().unwrap();
        clock.advance_ms(900);
        assert!(writer.schedule("k", 2));
        assert_eq!(
            writer.next_deadline().unwrap(),
            first + chrono::Duration::milliseconds(900)
        );
    }

    #[test]
    fn keys_are_independent() {
        let (clock, mut writer) = setup();
        writer.schedule("a", 1);
        clock.advance_ms(500);
        writer.schedule("b", 2);
        clock.advance_ms(500);

        let mut fired = Vec::new();
        writer.fire_due(|k, _| {
            fired.push(k.to_string());
            Ok(())
        });
        assert_eq!(fired, vec!["a"]);
        assert!(writer.is_pending("b"));
    }

    #[test]
    fn flush_writes_immediately() {
        let (_clock, mut writer) = setup();
        writer.schedule("k", 7);
        let mut written = None;
        let outcome = writer.flush("k", |_, p| {
            written = Some(p);
            Ok(())
        });
        assert!(matches!(outcome, Some(Ok(()))));
        assert_eq!(written, Some(7));
        assert!(writer.flush("k", |_, _| Ok(())).is_none());
    }

    #[test]
    fn flush_all_ignores_deadlines() {
        let (_clock, mut writer) = setup();
        writer.schedule("a", 1);
        writer.schedule("b", 2);
        let outcomes = writer.flush_all(|_, _| Ok(()));
        assert_eq!(outcomes.len(), 2);
        assert!(!writer.has_pending());
        assert_eq!(writer.next_deadline(), None);
    }

    #[test]
    fn cancel_drops_payload() {
        let (clock, mut writer) = setup();
        writer.schedule("k", 3);
        assert_eq!(writer.cancel("k"), Some(3));
        clock.advance_ms(5000);
        assert!(writer.fire_due(|_, _| Ok(())).is_empty());
    }

    #[test]
    fn failed_write_is_reported_and_cleared() {
        let (clock, mut writer) = setup();
        writer.schedule("k", 1);
        clock.advance_ms(1000);
        let outcomes = writer.fire_due(|_, _| Err(SiteError::Storage("full".into())));
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].1.is_err());
        assert!(!writer.is_pending("k"));
    }
}
