//! Log queries - filter cho listing và thống kê anomalies

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::logic::decision::Severity;
use crate::logic::observation::Domain;

/// Window for `recent_anomalies_24h`
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// Optional row filters; unset fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub domain: Option<Domain>,
    pub severity: Option<Severity>,
    pub is_anomaly: Option<bool>,
}

impl LogFilter {
    pub fn is_empty(&self) -> bool {
        self.domain.is_none() && self.severity.is_none() && self.is_anomaly.is_none()
    }

    /// `WHERE` clause (empty when unfiltered) and its bound values
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(domain) = self.domain {
            values.push(Value::Text(domain.as_str().to_string()));
            clauses.push(format!("domain = ?{}", values.len()));
        }
        if let Some(severity) = self.severity {
            values.push(Value::Text(severity.as_str().to_string()));
            clauses.push(format!("severity = ?{}", values.len()));
        }
        if let Some(is_anomaly) = self.is_anomaly {
            values.push(Value::Integer(is_anomaly as i64));
            clauses.push(format!("is_anomaly = ?{}", values.len()));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

/// Aggregate view over the anomaly log.
///
/// Distributions only count anomalous rows; rows logged before the
/// `severity` / `threat_class` columns existed are left out of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStatistics {
    pub total_logs: usize,
    pub total_anomalies: usize,
    pub severity_distribution: BTreeMap<String, usize>,
    pub threat_distribution: BTreeMap<String, usize>,
    pub recent_anomalies_24h: usize,
}

pub(crate) fn recent_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(RECENT_WINDOW_HOURS)
}
