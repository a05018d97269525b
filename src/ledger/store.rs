use crate::ledger::models::TimestampedResult;

/// Placeholder replies a backend sends when nothing notable happened.
const NOTHING_NOTABLE: [&str; 2] = ["--", "-"];

/// Arrival-ordered record of every timestamped result across sessions.
#[derive(Debug, Clone, Default)]
pub struct ResultLedger {
    entries: Vec<TimestampedResult>,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: TimestampedResult) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TimestampedResult] {
        &self.entries
    }

    /// Live-view ordering: every entry, most recent arrival first.
    pub fn newest_first(&self) -> impl Iterator<Item = &TimestampedResult> {
        self.entries.iter().rev()
    }

    pub fn meaningful(&self) -> Vec<&TimestampedResult> {
        self.entries.iter().filter(|entry| is_meaningful(entry)).collect()
    }

    /// Meaningful entries by video start, arrival order kept on ties.
    pub fn chronological(&self) -> Vec<&TimestampedResult> {
        let mut entries = self.meaningful();
        entries.sort_by(|left, right| left.video_start_sec.total_cmp(&right.video_start_sec));
        entries
    }
}

pub fn is_meaningful(entry: &TimestampedResult) -> bool {
    if !entry.result.ok {
        return false;
    }
    let text = entry.result.text.as_deref().unwrap_or_default().trim();
    !text.is_empty() && !NOTHING_NOTABLE.contains(&text)
}

#[cfg(test)]
mod tests {
    use super::ResultLedger;
    use crate::ledger::models::{InferenceResult, MediaUnit, TimestampedResult};
    use crate::timing::VideoInterval;
    use uuid::Uuid;

    fn entry(ok: bool, text: &str, start_sec: f64) -> TimestampedResult {
        let result = if ok {
            InferenceResult::success(MediaUnit::Clip, text)
        } else {
            InferenceResult::failure(MediaUnit::Clip, text)
        };
        TimestampedResult::new(
            Uuid::nil(),
            result,
            VideoInterval {
                start_sec,
                end_sec: start_sec + 1.0,
            },
            "2026-10-19T00:00:00Z".to_owned(),
        )
    }

    fn texts(entries: &[&TimestampedResult]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| entry.result.display_text().to_owned())
            .collect()
    }

    #[test]
    fn meaningful_drops_failures_and_placeholder_replies() {
        let mut ledger = ResultLedger::new();
        ledger.append(entry(true, "--", 0.0));
        ledger.append(entry(true, "hello", 1.0));
        ledger.append(entry(false, "x", 2.0));

        let meaningful = ledger.meaningful();
        assert_eq!(meaningful.len(), 1);
        assert!(meaningful[0].result.ok);
        assert_eq!(meaningful[0].result.text.as_deref(), Some("hello"));
    }

    #[test]
    fn meaningful_trims_before_matching_placeholders() {
        let mut ledger = ResultLedger::new();
        for text in ["", "   ", " - ", "\n--\t", "-- nothing", "a"] {
            ledger.append(entry(true, text, 0.0));
        }
        assert_eq!(texts(&ledger.meaningful()), ["-- nothing", "a"]);
    }

    #[test]
    fn success_without_text_is_not_meaningful() {
        let mut ledger = ResultLedger::new();
        let mut silent = entry(true, "ignored", 0.0);
        silent.result.text = None;
        ledger.append(silent);
        assert!(ledger.meaningful().is_empty());
    }

    #[test]
    fn chronological_sorts_by_start_and_keeps_arrival_order_on_ties() {
        let mut ledger = ResultLedger::new();
        ledger.append(entry(true, "late", 9.0));
        ledger.append(entry(true, "tie-first", 3.0));
        ledger.append(entry(true, "--", 1.0));
        ledger.append(entry(true, "early", 0.5));
        ledger.append(entry(true, "tie-second", 3.0));

        assert_eq!(
            texts(&ledger.chronological()),
            ["early", "tie-first", "tie-second", "late"]
        );
    }

    #[test]
    fn chronological_is_idempotent() {
        let mut ledger = ResultLedger::new();
        for (text, start) in [("c", 4.0), ("a", 1.0), ("b", 1.0), ("d", 8.0)] {
            ledger.append(entry(true, text, start));
        }

        let mut resorted = ResultLedger::new();
        for sorted in ledger.chronological() {
            resorted.append(sorted.clone());
        }
        assert_eq!(
            texts(&resorted.chronological()),
            texts(&ledger.chronological())
        );
    }

    #[test]
    fn live_view_is_newest_first_and_keeps_placeholders() {
        let mut ledger = ResultLedger::new();
        ledger.append(entry(true, "first", 0.0));
        ledger.append(entry(true, "--", 1.0));
        ledger.append(entry(false, "boom", 2.0));

        let live: Vec<&str> = ledger
            .newest_first()
            .map(|entry| entry.result.display_text())
            .collect();
        assert_eq!(live, ["boom", "--", "first"]);
    }

    #[test]
    fn clear_empties_the_ledger() {
        let mut ledger = ResultLedger::new();
        ledger.append(entry(true, "hello", 0.0));
        assert_eq!(ledger.len(), 1);
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.chronological().is_empty());
    }
}
