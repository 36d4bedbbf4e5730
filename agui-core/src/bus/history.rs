use std::collections::VecDeque;

use agui_sdk::objects::{EventKind, EventRecord};

/// Bounded FIFO of processed records. The oldest record is evicted first.
#[derive(Debug)]
pub(crate) struct EventHistory {
    records: VecDeque<EventRecord>,
    capacity: usize,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, record: EventRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Copy of the records of `kind` (all when `None`), keeping only the
    /// newest `limit`.
    pub fn query(&self, kind: Option<EventKind>, limit: Option<usize>) -> Vec<EventRecord> {
        let matching: Vec<&EventRecord> = self
            .records
            .iter()
            .filter(|record| kind.is_none_or(|kind| record.kind() == kind))
            .collect();
        let skip = limit.map_or(0, |limit| matching.len().saturating_sub(limit));
        matching.into_iter().skip(skip).cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agui_sdk::objects::events::{ButtonClicked, FormReset};

    fn click(n: usize) -> EventRecord {
        EventRecord::new(
            ButtonClicked {
                button_id: format!("b{n}"),
                action: None,
            },
            "test",
        )
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut history = EventHistory::new(3);
        let records: Vec<_> = (0..5).map(click).collect();
        for record in &records {
            history.push(record.clone());
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.query(None, None), records[2..].to_vec());
    }

    #[test]
    fn test_filter_and_tail_limit() {
        let mut history = EventHistory::new(10);
        let clicks: Vec<_> = (0..4).map(click).collect();
        for record in &clicks {
            history.push(record.clone());
            history.push(EventRecord::new(
                FormReset {
                    form_id: "f".into(),
                },
                "test",
            ));
        }

        let tail = history.query(Some(EventKind::ButtonClicked), Some(2));
        assert_eq!(tail, clicks[2..].to_vec());
        assert_eq!(history.query(Some(EventKind::FormReset), None).len(), 4);
        assert_eq!(history.query(None, Some(100)).len(), 8);
        assert!(history.query(None, Some(0)).is_empty());
        // Queries never mutate.
        assert_eq!(history.len(), 8);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = EventHistory::new(0);
        history.push(click(0));
        assert_eq!(history.len(), 0);
    }
}
