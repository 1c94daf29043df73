use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use super::client::ClientInfo;
use super::outcome::{AuthInfo, AuthorizationInfo};

/// One line of the audit trail. Built once per request after the response
/// status is final, then never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// RFC3339 with milliseconds, local offset.
    pub timestamp: String,
    pub request_id: String,
    pub fingerprint: String,
    pub ip: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub response_time_ms: u64,

    pub client: ClientInfo,
    pub auth: AuthInfo,
    pub authorization: AuthorizationInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    pub fn format_timestamp(time: &DateTime<Local>) -> String {
        time.to_rfc3339_opts(SecondsFormat::Millis, false)
    }

    pub fn parse_timestamp(&self) -> Option<DateTime<Local>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Local))
    }

    pub fn is_security(&self) -> bool {
        self.security.is_some()
    }

    /// Single line summary for the operator log.
    pub fn human_line(&self) -> String {
        let mut line = format!(
            "{} {} {} {} {} {}ms {}",
            self.request_id,
            self.ip,
            self.method,
            self.url,
            self.status_code,
            self.response_time_ms,
            self.authorization.code,
        );
        if let (Some(user_id), Some(role)) = (&self.auth.user_id, &self.auth.role) {
            line.push_str(&format!(" user={user_id}({role})"));
        }
        if let Some(ref security) = self.security {
            line.push_str(&format!(" security=\"{security}\""));
        }
        line
    }

    pub fn to_json(&self) -> String {
        // A struct of strings and integers always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}
