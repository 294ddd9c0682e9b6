//! Status derivation — raw endpoint results to categorical states.
//!
//! Everything here is pure. The poller feeds in whatever the source
//! returned (payload or error) and gets back a `ServiceState`, counters or
//! activity records.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::{ActivityOutcome, ActivityRecord, Counters, ServiceState};
use crate::source::{
    FtpConnectionPayload, IndexStatusPayload, LogEntryPayload, SourceError, StatsPayload,
};

const READY_FAMILY: [&str; 2] = ["STATE_READY", "READY"];
const BUILDING_FAMILY: [&str; 2] = ["STATE_BUILDING", "BUILDING"];
const DEFAULT_SERVICE: &str = "System";

pub fn is_ready(state: &str) -> bool {
    READY_FAMILY.contains(&state)
}

pub fn is_building(state: &str) -> bool {
    BUILDING_FAMILY.contains(&state)
}

// ── Service States ──────────────────────────────────────────────────

/// ai-index state from a vector index status payload.
///
/// An index whose endpoint is still deploying counts as inactive, not
/// error. A ready index with no endpoint block at all is active.
pub fn index_state(payload: &IndexStatusPayload) -> ServiceState {
    match payload {
        IndexStatusPayload::Failed { .. } => ServiceState::Error,
        IndexStatusPayload::NotCreated | IndexStatusPayload::NotInitialized => {
            ServiceState::Inactive
        }
        IndexStatusPayload::Index { index_state, endpoint } => {
            if is_ready(index_state) {
                match endpoint {
                    None => ServiceState::Active,
                    Some(Some(s)) if is_ready(s) => ServiceState::Active,
                    Some(Some(s)) if is_building(s) => ServiceState::Inactive,
                    Some(_) => ServiceState::Error,
                }
            } else if is_building(index_state) {
                ServiceState::Inactive
            } else {
                ServiceState::Error
            }
        }
        IndexStatusPayload::Unrecognized => ServiceState::Error,
    }
}

/// Detail text shown next to the ai-index chip.
pub fn index_detail(payload: &IndexStatusPayload) -> Option<String> {
    match payload {
        IndexStatusPayload::Failed { message } => message.clone(),
        IndexStatusPayload::NotCreated => Some("not created".into()),
        IndexStatusPayload::NotInitialized => Some("not initialized".into()),
        IndexStatusPayload::Index { index_state, endpoint: Some(Some(ep)) } => {
            Some(format!("index {}, endpoint {}", index_state, ep))
        }
        IndexStatusPayload::Index { index_state, .. } => Some(format!("index {}", index_state)),
        IndexStatusPayload::Unrecognized => None,
    }
}

/// Whether the payload describes an existing, ready index.
pub fn index_exists(payload: &IndexStatusPayload) -> bool {
    matches!(payload, IndexStatusPayload::Index { index_state, .. } if is_ready(index_state))
}

/// Binary up/down checks (compute-api, database). There is no "stopped"
/// signal, so these never report inactive.
pub fn liveness_state(result: &Result<(), SourceError>) -> ServiceState {
    match result {
        Ok(()) => ServiceState::Active,
        Err(_) => ServiceState::Error,
    }
}

/// file-transfer state. Only a failed request is an error; a clean
/// "not connected" answer is inactive.
pub fn file_transfer_state(result: &Result<FtpConnectionPayload, SourceError>) -> ServiceState {
    match result {
        Ok(info) if info.connected => ServiceState::Active,
        Ok(_) => ServiceState::Inactive,
        Err(_) => ServiceState::Error,
    }
}

// ── Counters ────────────────────────────────────────────────────────

pub fn counters(stats: &StatsPayload) -> Counters {
    Counters {
        total_articles: stats.total_articles.unwrap_or(0),
        processed_today: stats.processed_today.unwrap_or(0),
        vector_indexes: stats.vector_indexes.unwrap_or(0),
        ftp_files: stats.ftp_files.unwrap_or(0),
    }
}

// ── Activity ────────────────────────────────────────────────────────

/// Collapse a backend log status to an outcome. Only "success" and
/// "error" are kept; everything else (processing, pending, ...) is info.
pub fn activity_outcome(status: Option<&str>) -> ActivityOutcome {
    match status {
        Some("success") => ActivityOutcome::Success,
        Some("error") => ActivityOutcome::Error,
        _ => ActivityOutcome::Info,
    }
}

/// Turn log entries into activity records, keeping backend order and at
/// most `limit` entries.
pub fn activity_records(entries: &[LogEntryPayload], limit: usize) -> Vec<ActivityRecord> {
    entries
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, log)| ActivityRecord {
            id: log.id.clone().unwrap_or_else(|| format!("activity-{}", i)),
            message: log.message_or_default().to_string(),
            timestamp: log.timestamp.as_deref().and_then(parse_timestamp),
            outcome: activity_outcome(log.status.as_deref()),
            service: log
                .process_type
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
        })
        .collect()
}

/// RFC 3339, or a naive ISO timestamp taken as UTC (what the backend's
/// `created_at.isoformat()` produces).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn index(state: &str, endpoint: Option<Option<&str>>) -> IndexStatusPayload {
        IndexStatusPayload::Index {
            index_state: state.to_string(),
            endpoint: endpoint.map(|e| e.map(str::to_string)),
        }
    }

    #[test]
    fn test_ready_index_without_endpoint_is_active() {
        for state in READY_FAMILY {
            assert_eq!(index_state(&index(state, None)), ServiceState::Active);
        }
    }

    #[test]
    fn test_ready_index_endpoint_rules() {
        for state in READY_FAMILY {
            for ep in READY_FAMILY {
                assert_eq!(index_state(&index(state, Some(Some(ep)))), ServiceState::Active);
            }
            for ep in BUILDING_FAMILY {
                assert_eq!(index_state(&index(state, Some(Some(ep)))), ServiceState::Inactive);
            }
            assert_eq!(index_state(&index(state, Some(Some("STATE_FAILED")))), ServiceState::Error);
            assert_eq!(index_state(&index(state, Some(None))), ServiceState::Error);
        }
    }

    #[test]
    fn test_building_index_is_inactive_regardless_of_endpoint() {
        let endpoints = [
            None,
            Some(None),
            Some(Some("STATE_READY")),
            Some(Some("BUILDING")),
            Some(Some("STATE_FAILED")),
        ];
        for state in BUILDING_FAMILY {
            for ep in endpoints {
                assert_eq!(index_state(&index(state, ep)), ServiceState::Inactive);
            }
        }
    }

    #[test]
    fn test_other_index_shapes() {
        assert_eq!(index_state(&index("STATE_FAILED", None)), ServiceState::Error);
        assert_eq!(index_state(&index("ready", None)), ServiceState::Error);
        assert_eq!(
            index_state(&IndexStatusPayload::Failed { message: None }),
            ServiceState::Error
        );
        assert_eq!(index_state(&IndexStatusPayload::NotCreated), ServiceState::Inactive);
        assert_eq!(index_state(&IndexStatusPayload::NotInitialized), ServiceState::Inactive);
        assert_eq!(index_state(&IndexStatusPayload::Unrecognized), ServiceState::Error);
    }

    #[test]
    fn test_index_exists_only_when_ready() {
        assert!(index_exists(&index("STATE_READY", Some(Some("BUILDING")))));
        assert!(!index_exists(&index("STATE_BUILDING", None)));
        assert!(!index_exists(&IndexStatusPayload::NotCreated));
    }

    #[test]
    fn test_index_detail() {
        assert_eq!(
            index_detail(&index("STATE_READY", Some(Some("STATE_BUILDING")))).as_deref(),
            Some("index STATE_READY, endpoint STATE_BUILDING")
        );
        assert_eq!(index_detail(&index("READY", None)).as_deref(), Some("index READY"));
        assert_eq!(index_detail(&IndexStatusPayload::Unrecognized), None);
    }

    #[test]
    fn test_liveness_state_is_two_valued() {
        assert_eq!(liveness_state(&Ok(())), ServiceState::Active);
        assert_eq!(
            liveness_state(&Err(SourceError::Network("refused".into()))),
            ServiceState::Error
        );
        assert_eq!(
            liveness_state(&Err(SourceError::Timeout(std::time::Duration::from_secs(5)))),
            ServiceState::Error
        );
    }

    #[test]
    fn test_file_transfer_state() {
        let connected = FtpConnectionPayload { connected: true, ..Default::default() };
        assert_eq!(file_transfer_state(&Ok(connected)), ServiceState::Active);
        assert_eq!(
            file_transfer_state(&Ok(FtpConnectionPayload::default())),
            ServiceState::Inactive
        );
        assert_eq!(
            file_transfer_state(&Err(SourceError::Network("reset".into()))),
            ServiceState::Error
        );
    }

    #[test]
    fn test_counters_default_missing_to_zero() {
        let c = counters(&StatsPayload {
            total_articles: Some(1500),
            processed_today: None,
            vector_indexes: Some(1),
            ftp_files: None,
        });
        assert_eq!(c.total_articles, 1500);
        assert_eq!(c.processed_today, 0);
        assert_eq!(c.vector_indexes, 1);
        assert_eq!(c.ftp_files, 0);
    }

    #[test]
    fn test_activity_outcome_collapse() {
        assert_eq!(activity_outcome(Some("success")), ActivityOutcome::Success);
        assert_eq!(activity_outcome(Some("error")), ActivityOutcome::Error);
        assert_eq!(activity_outcome(Some("processing")), ActivityOutcome::Info);
        assert_eq!(activity_outcome(Some("warning")), ActivityOutcome::Info);
        assert_eq!(activity_outcome(None), ActivityOutcome::Info);
    }

    #[test]
    fn test_activity_records_success_log() {
        let logs = vec![LogEntryPayload {
            id: Some("1".into()),
            message: Some("ingest done".into()),
            timestamp: Some("2024-01-15T00:00:00Z".into()),
            status: Some("success".into()),
            process_type: None,
        }];
        let records = activity_records(&logs, 5);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].message, "ingest done");
        assert_eq!(records[0].outcome, ActivityOutcome::Success);
        assert_eq!(records[0].service, "System");
        assert_eq!(
            records[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_activity_records_fallbacks_and_cap() {
        let logs: Vec<LogEntryPayload> = (0..12)
            .map(|_| LogEntryPayload::default())
            .collect();
        let records = activity_records(&logs, 10);
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].id, "activity-0");
        assert_eq!(records[9].id, "activity-9");
        assert_eq!(records[3].message, "Operation performed");
        assert!(records[3].timestamp.is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T18:30:00+09:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T09:30:00"), Some(expected));
        assert!(parse_timestamp("2024-01-15T09:30:00.123456").is_some());
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
