//! Login-attempt recording and resolution.
//!
//! Every suspicious or notable sign-in is appended to a capped in-memory
//! log and announced to the account owner by email. The alert carries two
//! links bound to a single-use token: one to confirm the attempt was
//! legitimate, one to report it. Whichever link is followed first decides
//! the attempt; the token is dead afterwards.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delivery::EmailMessage;
use crate::otp::normalize_identity;

/// Attempts retained before the oldest are evicted.
pub const DEFAULT_ATTEMPT_CAP: usize = 100;

/// Lifecycle of a recorded attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptStatus {
    /// Recorded and announced; awaiting the account owner's response.
    Pending,
    /// The owner confirmed the attempt was theirs.
    Confirmed,
    /// The owner reported the attempt as not theirs.
    Reported,
}

/// The account owner's answer to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolveDecision {
    Confirm,
    Report,
}

/// Why a resolution was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown resolution token")]
    InvalidToken,
    #[error("attempt already resolved")]
    AlreadyResolved,
}

/// Browser and OS as reported by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

/// Risk assessment supplied by the caller, stored and surfaced verbatim.
/// Reason strings seen in the wild include `sim_swap`, `vpn`,
/// `device_change`, `typing_anomaly` and `location_mismatch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReport {
    #[serde(default)]
    pub score: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// Caller-supplied context for a login attempt.
#[derive(Debug, Clone, Default)]
pub struct AttemptPayload {
    pub email: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub fingerprint: Option<String>,
    pub device: Option<DeviceInfo>,
    pub risk: Option<RiskReport>,
    pub location: Option<String>,
}

/// A recorded login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAttempt {
    pub id: Uuid,
    /// Single-use resolution token. Travels only inside the alert email and
    /// is never serialized into API responses.
    #[serde(skip_serializing)]
    pub token: Uuid,
    pub email: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

/// Capped, append-only log of login attempts.
pub struct AttemptLog {
    inner: Mutex<VecDeque<LoginAttempt>>,
    cap: usize,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_ATTEMPT_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            cap: cap.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LoginAttempt>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a new pending attempt, evicting the oldest entries past the
    /// cap. Append and eviction happen under one lock so the cap holds at
    /// every observable moment.
    pub fn record(&self, payload: AttemptPayload) -> LoginAttempt {
        let attempt = LoginAttempt {
            id: Uuid::new_v4(),
            token: Uuid::new_v4(),
            email: normalize_identity(&payload.email),
            timestamp: Utc::now(),
            ip: payload.ip,
            user_agent: payload.user_agent,
            fingerprint: payload.fingerprint,
            device: payload.device,
            risk: payload.risk,
            location: payload.location,
            status: AttemptStatus::Pending,
            responded_at: None,
        };

        let mut attempts = self.lock();
        while attempts.len() >= self.cap {
            attempts.pop_front();
        }
        attempts.push_back(attempt.clone());
        drop(attempts);

        tracing::info!(attempt_id = %attempt.id, email = %attempt.email, "Login attempt recorded");
        attempt
    }

    /// Redeem a resolution token. The first redemption decides the attempt;
    /// anything after that is refused. A token that never existed (or is not
    /// even a UUID) is indistinguishable from one long evicted.
    pub fn resolve(
        &self,
        token: &str,
        decision: ResolveDecision,
    ) -> Result<LoginAttempt, ResolveError> {
        let token: Uuid = token.trim().parse().map_err(|_| ResolveError::InvalidToken)?;

        let mut attempts = self.lock();
        let attempt = attempts
            .iter_mut()
            .find(|a| a.token == token)
            .ok_or(ResolveError::InvalidToken)?;

        if attempt.status != AttemptStatus::Pending {
            return Err(ResolveError::AlreadyResolved);
        }

        attempt.status = match decision {
            ResolveDecision::Confirm => AttemptStatus::Confirmed,
            ResolveDecision::Report => AttemptStatus::Reported,
        };
        attempt.responded_at = Some(Utc::now());
        let resolved = attempt.clone();
        drop(attempts);

        tracing::info!(attempt_id = %resolved.id, status = ?resolved.status, "Login attempt resolved");
        Ok(resolved)
    }

    pub fn get(&self, id: Uuid) -> Option<LoginAttempt> {
        self.lock().iter().find(|a| a.id == id).cloned()
    }

    /// Most recent attempts first, optionally filtered by account email.
    pub fn recent(&self, email: Option<&str>, limit: usize) -> Vec<LoginAttempt> {
        let email = email.map(normalize_identity);
        self.lock()
            .iter()
            .rev()
            .filter(|a| email.as_deref().map_or(true, |e| a.email == e))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for AttemptLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AttemptLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptLog")
            .field("attempts", &self.len())
            .field("cap", &self.cap)
            .finish()
    }
}

/// The alert email for a freshly recorded attempt, carrying the confirm and
/// report links.
pub fn compose_alert(attempt: &LoginAttempt, base_url: &str) -> EmailMessage {
    let base = base_url.trim_end_matches('/');
    let confirm_url = format!(
        "{base}/security/login-attempt/confirm?token={}",
        attempt.token
    );
    let report_url = format!(
        "{base}/security/login-attempt/report?token={}",
        attempt.token
    );

    let mut lines = vec![
        "We noticed a new login attempt on your account.".to_string(),
        String::new(),
        format!("Time: {}", attempt.timestamp.to_rfc3339()),
    ];
    if let Some(ip) = &attempt.ip {
        lines.push(format!("IP address: {ip}"));
    }
    if let Some(device) = &attempt.device {
        lines.push(format!(
            "Device: {} on {}",
            device.browser.as_deref().unwrap_or("unknown browser"),
            device.os.as_deref().unwrap_or("unknown OS")
        ));
    }
    if let Some(location) = &attempt.location {
        lines.push(format!("Location: {location}"));
    }
    if let Some(risk) = &attempt.risk {
        if risk.reasons.is_empty() {
            lines.push(format!("Risk score: {}", risk.score));
        } else {
            lines.push(format!(
                "Risk score: {} ({})",
                risk.score,
                risk.reasons.join(", ")
            ));
        }
    }
    lines.push(String::new());
    lines.push(format!("This was me: {confirm_url}"));
    lines.push(format!("This wasn't me: {report_url}"));

    EmailMessage {
        to: attempt.email.clone(),
        subject: "New login attempt on your account".to_string(),
        body: lines.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(email: &str) -> AttemptPayload {
        AttemptPayload {
            email: email.to_string(),
            ..AttemptPayload::default()
        }
    }

    #[test]
    fn recorded_attempts_start_pending() {
        let log = AttemptLog::new();
        let attempt = log.record(payload("Alice@Example.com"));

        assert_eq!(attempt.status, AttemptStatus::Pending);
        assert_eq!(attempt.email, "alice@example.com");
        assert!(attempt.responded_at.is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn confirm_resolves_once() {
        let log = AttemptLog::new();
        let attempt = log.record(payload("alice@example.com"));
        let token = attempt.token.to_string();

        let resolved = log.resolve(&token, ResolveDecision::Confirm).unwrap();
        assert_eq!(resolved.status, AttemptStatus::Confirmed);
        assert!(resolved.responded_at.is_some());

        assert_eq!(
            log.resolve(&token, ResolveDecision::Confirm),
            Err(ResolveError::AlreadyResolved)
        );
        assert_eq!(
            log.resolve(&token, ResolveDecision::Report),
            Err(ResolveError::AlreadyResolved)
        );
    }

    #[test]
    fn report_marks_the_attempt_reported() {
        let log = AttemptLog::new();
        let attempt = log.record(payload("alice@example.com"));

        let resolved = log
            .resolve(&attempt.token.to_string(), ResolveDecision::Report)
            .unwrap();
        assert_eq!(resolved.status, AttemptStatus::Reported);
        assert_eq!(log.get(attempt.id).unwrap().status, AttemptStatus::Reported);
    }

    #[test]
    fn malformed_and_unknown_tokens_are_invalid() {
        let log = AttemptLog::new();
        log.record(payload("alice@example.com"));

        assert_eq!(
            log.resolve("bad-token", ResolveDecision::Confirm),
            Err(ResolveError::InvalidToken)
        );
        assert_eq!(
            log.resolve(&Uuid::new_v4().to_string(), ResolveDecision::Confirm),
            Err(ResolveError::InvalidToken)
        );
    }

    #[test]
    fn cap_evicts_the_oldest() {
        let log = AttemptLog::with_cap(3);
        let first = log.record(payload("first@example.com"));
        log.record(payload("second@example.com"));
        log.record(payload("third@example.com"));
        log.record(payload("fourth@example.com"));

        assert_eq!(log.len(), 3);
        assert!(log.get(first.id).is_none());

        let recent = log.recent(None, 10);
        assert_eq!(recent[0].email, "fourth@example.com");
        assert_eq!(recent[2].email, "second@example.com");
    }

    #[test]
    fn evicted_tokens_no_longer_resolve() {
        let log = AttemptLog::with_cap(1);
        let first = log.record(payload("first@example.com"));
        log.record(payload("second@example.com"));

        assert_eq!(
            log.resolve(&first.token.to_string(), ResolveDecision::Confirm),
            Err(ResolveError::InvalidToken)
        );
    }

    #[test]
    fn recent_filters_by_email_and_limit() {
        let log = AttemptLog::new();
        log.record(payload("alice@example.com"));
        log.record(payload("bob@example.com"));
        log.record(payload("alice@example.com"));

        let alices = log.recent(Some("ALICE@example.com"), 10);
        assert_eq!(alices.len(), 2);
        assert!(alices.iter().all(|a| a.email == "alice@example.com"));

        assert_eq!(log.recent(None, 2).len(), 2);
    }

    #[test]
    fn alert_email_carries_both_links() {
        let log = AttemptLog::new();
        let attempt = log.record(AttemptPayload {
            email: "alice@example.com".to_string(),
            ip: Some("203.0.113.9".to_string()),
            device: Some(DeviceInfo {
                browser: Some("Firefox".to_string()),
                os: Some("Linux".to_string()),
            }),
            risk: Some(RiskReport {
                score: 74,
                reasons: vec!["vpn".to_string(), "device_change".to_string()],
            }),
            ..AttemptPayload::default()
        });

        let message = compose_alert(&attempt, "https://auth.example.com/");
        let token = attempt.token.to_string();

        assert_eq!(message.to, "alice@example.com");
        assert!(message.body.contains(&format!(
            "https://auth.example.com/security/login-attempt/confirm?token={token}"
        )));
        assert!(message.body.contains(&format!(
            "https://auth.example.com/security/login-attempt/report?token={token}"
        )));
        assert!(message.body.contains("203.0.113.9"));
        assert!(message.body.contains("Firefox on Linux"));
        assert!(message.body.contains("74 (vpn, device_change)"));
    }

    #[test]
    fn serialized_attempts_never_expose_the_token() {
        let log = AttemptLog::new();
        let attempt = log.record(payload("alice@example.com"));

        let json = serde_json::to_value(&attempt).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["email"], "alice@example.com");
    }
}
