//! Console reporter — logs published snapshots.

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::status::{
    ActivityOutcome, ActivityRecord, ServiceKey, ServiceState, StatusSnapshot,
};

/// One-line summary of service states and counters.
pub fn summary_line(snap: &StatusSnapshot) -> String {
    let services: Vec<String> = ServiceKey::ALL
        .iter()
        .map(|key| {
            let entry = snap.entry(*key);
            let state = entry.map(|e| e.state).unwrap_or_default();
            match entry.and_then(|e| e.detail.as_deref()) {
                Some(detail) => format!("{}={} ({})", key.display_name(), state, detail),
                None => format!("{}={}", key.display_name(), state),
            }
        })
        .collect();

    let c = &snap.counters;
    format!(
        "{} | articles={} today={} indexes={} ftp_files={}",
        services.join(", "),
        c.total_articles,
        c.processed_today,
        c.vector_indexes,
        c.ftp_files
    )
}

/// Tracks what has already been logged so each settled cycle only reports
/// what changed.
#[derive(Default)]
pub struct Reporter {
    last_summary: String,
    /// Activity as of the previous settled cycle.
    last_activity: Vec<ActivityRecord>,
}

/// What a settled cycle has to report.
#[derive(Debug, Default, PartialEq)]
pub struct CycleReport {
    /// Present when the summary differs from the last one logged.
    pub summary: Option<String>,
    /// Records absent from the previous cycle, oldest first.
    pub fresh: Vec<ActivityRecord>,
}

impl Reporter {
    /// Returns `None` while a cycle is still in progress.
    pub fn observe(&mut self, snap: &StatusSnapshot) -> Option<CycleReport> {
        if !snap.settled {
            return None;
        }

        let line = summary_line(snap);
        let summary = (line != self.last_summary).then(|| line.clone());
        self.last_summary = line;

        // Compared by content, not id: fallback ids repeat across cycles.
        let fresh = snap
            .activity
            .iter()
            .rev()
            .filter(|record| !self.last_activity.contains(record))
            .cloned()
            .collect();
        self.last_activity = snap.activity.clone();

        Some(CycleReport { summary, fresh })
    }
}

/// Follow the snapshot channel until the sender goes away, logging state
/// changes and activity records not seen in the previous cycle.
pub async fn run_reporter(mut rx: watch::Receiver<StatusSnapshot>) {
    let mut reporter = Reporter::default();

    while rx.changed().await.is_ok() {
        let snap = rx.borrow_and_update().clone();
        let Some(report) = reporter.observe(&snap) else {
            continue;
        };

        if let Some(summary) = report.summary {
            let degraded = ServiceKey::ALL
                .iter()
                .filter(|k| snap.state(**k) == ServiceState::Error)
                .count();
            if degraded > 0 {
                warn!(cycle = snap.cycle, degraded, "{}", summary);
            } else {
                info!(cycle = snap.cycle, "{}", summary);
            }
        }

        for record in &report.fresh {
            let at = record
                .timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".into());
            let (id, service) = (&record.id, &record.service);
            match record.outcome {
                ActivityOutcome::Error => error!(%id, %service, %at, "{}", record.message),
                ActivityOutcome::Warning => warn!(%id, %service, %at, "{}", record.message),
                ActivityOutcome::Success | ActivityOutcome::Info => {
                    info!(%id, %service, %at, "{}", record.message)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{Counters, SnapshotPatch};
    use crate::status::derive::activity_records;
    use crate::source::LogEntryPayload;
    use chrono::Utc;

    #[test]
    fn test_summary_line_lists_every_service() {
        let mut snap = StatusSnapshot::new();
        let now = Utc::now();
        snap.apply(
            SnapshotPatch::Service {
                key: ServiceKey::AiIndex,
                state: ServiceState::Inactive,
                detail: Some("index STATE_BUILDING".into()),
            },
            now,
        );
        snap.apply(
            SnapshotPatch::Service {
                key: ServiceKey::ComputeApi,
                state: ServiceState::Error,
                detail: None,
            },
            now,
        );
        snap.apply(
            SnapshotPatch::Counters {
                stats: Some(Counters {
                    total_articles: 10,
                    processed_today: 2,
                    vector_indexes: 0,
                    ftp_files: 4,
                }),
                vector_indexes: None,
                ftp_files: None,
            },
            now,
        );

        let line = summary_line(&snap);
        assert!(line.starts_with("AI Index=inactive (index STATE_BUILDING), Compute API=error"));
        assert!(line.contains("Database=inactive"));
        assert!(line.contains("File Transfer=inactive"));
        assert!(line.ends_with("articles=10 today=2 indexes=0 ftp_files=4"));
    }

    #[tokio::test]
    async fn test_reporter_exits_when_sender_dropped() {
        let (tx, rx) = watch::channel(StatusSnapshot::new());
        let task = tokio::spawn(run_reporter(rx));
        tx.send_modify(|s| s.apply(SnapshotPatch::CycleFinished, Utc::now()));
        drop(tx);
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    fn batch(messages: &[(&str, &str)]) -> Vec<ActivityRecord> {
        let logs: Vec<LogEntryPayload> = messages
            .iter()
            .map(|(message, at)| LogEntryPayload {
                id: None,
                message: Some((*message).into()),
                timestamp: Some((*at).into()),
                status: Some("success".into()),
                process_type: None,
            })
            .collect();
        activity_records(&logs, 5)
    }

    fn settled_with(activity: Vec<ActivityRecord>) -> StatusSnapshot {
        let mut snap = StatusSnapshot::new();
        let now = Utc::now();
        snap.apply(SnapshotPatch::CycleStarted, now);
        snap.apply(SnapshotPatch::Activity(activity), now);
        snap.apply(SnapshotPatch::CycleFinished, now);
        snap
    }

    #[test]
    fn test_reporter_ignores_unsettled_cycles() {
        let mut reporter = Reporter::default();
        let mut snap = settled_with(Vec::new());
        snap.apply(SnapshotPatch::CycleStarted, Utc::now());
        assert!(snap.refreshed_at.is_some());
        assert_eq!(reporter.observe(&snap), None);
    }

    #[test]
    fn test_reporter_reports_new_batches_with_reused_fallback_ids() {
        let mut reporter = Reporter::default();

        let first = batch(&[
            ("ingest a", "2024-01-15T10:00:00Z"),
            ("ingest b", "2024-01-15T09:00:00Z"),
        ]);
        let report = reporter.observe(&settled_with(first.clone())).unwrap();
        assert!(report.summary.is_some());
        assert_eq!(report.fresh.len(), 2);
        assert_eq!(report.fresh[0].message, "ingest b");

        // Same cycle content again: nothing new to log.
        let report = reporter.observe(&settled_with(first.clone())).unwrap();
        assert_eq!(report, CycleReport::default());

        // New entries reuse the positional ids activity-0 and activity-1.
        let second = batch(&[
            ("ingest c", "2024-01-15T12:00:00Z"),
            ("ingest d", "2024-01-15T11:00:00Z"),
        ]);
        assert_eq!(second[0].id, first[0].id);
        let report = reporter.observe(&settled_with(second)).unwrap();
        assert!(report.summary.is_none());
        let messages: Vec<&str> = report.fresh.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["ingest d", "ingest c"]);
    }
}
