//! Session lifecycle: create, append, finalize.
//!
//! A session is OPEN until `finalize_session` attaches its governance
//! summary; after that it accepts no further findings.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{
    environment_label, rarity_label, EnvironmentTag, ExportChannel, Finding, GovernanceSummary,
    Session, SessionMetrics, POLICY_VERSION, REVIEWER_ROLE, SESSION_SCHEMA_VERSION,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} is finalized and no longer accepts findings")]
    Finalized(String),
}

/// Clock plus id-suffix source behind one seam so tests can pin both.
pub trait IdentityProvider {
    fn now(&self) -> DateTime<Utc>;
    fn id_suffix(&self) -> String;
}

/// Wall clock and a short random suffix from a v4 uuid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentity;

impl IdentityProvider for SystemIdentity {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn id_suffix(&self) -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Explicit session id; generated when absent.
    pub session_id: Option<String>,
    pub environment: EnvironmentTag,
    pub operator_handle: Option<String>,
}

pub fn create_session(options: SessionOptions, ids: &dyn IdentityProvider) -> Session {
    let now = ids.now();
    let session_id = options.session_id.unwrap_or_else(|| {
        format!(
            "{}-{}-{}",
            environment_label(&options.environment),
            now.timestamp_millis(),
            ids.id_suffix()
        )
    });
    debug!(session_id = %session_id, "created inspection session");
    Session {
        schema_version: SESSION_SCHEMA_VERSION.to_string(),
        session_id,
        environment: options.environment,
        operator_handle: options.operator_handle,
        started_at: format_timestamp(now),
        finished_at: None,
        findings: Vec::new(),
        finding_count: 0,
        metrics: SessionMetrics::default(),
        governance_summary: None,
    }
}

/// Appends one finding and recomputes the full metrics snapshot. Appending to
/// a finalized session is rejected rather than silently invalidating its
/// stored governance summary.
pub fn append_finding(session: &mut Session, finding: Finding) -> Result<(), SessionError> {
    if session.governance_summary.is_some() {
        return Err(SessionError::Finalized(session.session_id.clone()));
    }
    debug!(
        session_id = %session.session_id,
        blocked = finding.neurosignal_blocked,
        redactions = finding.secret_redactions,
        "appending finding"
    );
    session.findings.push(finding);
    session.finding_count = session.findings.len() as u64;
    session.metrics = compute_metrics(&session.findings);
    Ok(())
}

/// Full recompute over the findings list; never patched incrementally.
pub fn compute_metrics(findings: &[Finding]) -> SessionMetrics {
    let total = findings.len() as u64;
    if total == 0 {
        return SessionMetrics::default();
    }
    let scope_sum: u64 = findings.iter().map(|finding| finding.scope_depth as u64).sum();
    let prototype_sum: u64 = findings
        .iter()
        .map(|finding| finding.prototype_depth as u64)
        .sum();

    let mut rarity_ratios = std::collections::BTreeMap::new();
    for finding in findings {
        if let Some(rarity) = &finding.rarity {
            *rarity_ratios
                .entry(rarity_label(rarity).to_string())
                .or_insert(0.0_f64) += 1.0;
        }
    }
    for ratio in rarity_ratios.values_mut() {
        *ratio /= total as f64;
    }

    SessionMetrics {
        finding_count_total: total,
        avg_scope_depth: scope_sum as f64 / total as f64,
        avg_prototype_depth: prototype_sum as f64 / total as f64,
        rarity_ratios,
    }
}

/// Single scan over the findings list. Shared by finalize and by report
/// rendering of not-yet-finalized sessions.
pub fn compute_governance_summary(findings: &[Finding]) -> GovernanceSummary {
    let redactions_total: u64 = findings
        .iter()
        .map(|finding| finding.secret_redactions as u64)
        .sum();
    let neurosignal_events = findings
        .iter()
        .filter(|finding| finding.neurosignal_blocked)
        .count() as u64;
    let blocked_exports = findings
        .iter()
        .filter(|finding| finding.channel == ExportChannel::LocalOnly)
        .count() as u64;
    GovernanceSummary {
        redactions_total,
        neurosignal_events,
        blocked_exports,
        exportable_findings: findings.len() as u64 - blocked_exports,
        policy_version: POLICY_VERSION.to_string(),
        reviewer_role: REVIEWER_ROLE.to_string(),
    }
}

/// Seals the session: sets the finished timestamp and attaches the governance
/// summary. A repeated call refreshes the timestamp only; the stored summary
/// is never recomputed.
pub fn finalize_session<'a>(
    session: &'a mut Session,
    ids: &dyn IdentityProvider,
) -> &'a GovernanceSummary {
    session.finished_at = Some(format_timestamp(ids.now()));
    let newly_sealed = session.governance_summary.is_none();
    let summary = session
        .governance_summary
        .get_or_insert_with(|| compute_governance_summary(&session.findings));
    if newly_sealed {
        info!(
            session_id = %session.session_id,
            findings = session.finding_count,
            blocked_exports = summary.blocked_exports,
            "finalized inspection session"
        );
    }
    summary
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedIdentity;
    use super::{
        append_finding, compute_metrics, create_session, finalize_session, SessionError,
        SessionOptions,
    };
    use crate::model::{
        EnvironmentTag, ExportChannel, Finding, RarityKind, SubjectKind, Visibility,
    };

    fn sample_finding(session_id: &str, scope_depth: u32) -> Finding {
        Finding {
            session_id: session_id.to_string(),
            captured_at: "2026-03-14T09:26:53Z".to_string(),
            environment: EnvironmentTag::Browser,
            kind: SubjectKind::Other,
            hint: None,
            navigation_path: vec!["window".to_string()],
            prototype_depth: 2,
            scope_depth,
            rarity: None,
            rarity_summary: None,
            visibility: Visibility::Enumerable,
            notes: "plain".to_string(),
            source_location: "app.js:1".to_string(),
            tags: Vec::new(),
            governance_flags: Vec::new(),
            secret_redactions: 0,
            neurosignal_blocked: false,
            channel: ExportChannel::GithubIssue,
        }
    }

    #[test]
    fn generated_id_combines_environment_time_and_suffix() {
        let session = create_session(
            SessionOptions {
                environment: EnvironmentTag::Headless,
                ..SessionOptions::default()
            },
            &FixedIdentity::default(),
        );
        assert!(session.session_id.starts_with("headless-"));
        assert!(session.session_id.ends_with("-cafe0123"));
        assert_eq!(session.started_at, "2026-03-14T09:26:53Z");
        assert_eq!(session.finding_count, 0);
        assert!(session.governance_summary.is_none());
    }

    #[test]
    fn explicit_id_is_kept_verbatim() {
        let session = create_session(
            SessionOptions {
                session_id: Some("debug-42".to_string()),
                ..SessionOptions::default()
            },
            &FixedIdentity::default(),
        );
        assert_eq!(session.session_id, "debug-42");
    }

    #[test]
    fn metrics_track_every_append_exactly() {
        let ids = FixedIdentity::default();
        let mut session = create_session(SessionOptions::default(), &ids);
        let session_id = session.session_id.clone();
        for (index, scope_depth) in [1_u32, 3, 5].into_iter().enumerate() {
            append_finding(&mut session, sample_finding(&session_id, scope_depth))
                .expect("session is open");
            assert_eq!(session.finding_count, index as u64 + 1);
            assert_eq!(session.finding_count, session.findings.len() as u64);
            assert_eq!(
                session.metrics.finding_count_total,
                session.findings.len() as u64
            );
        }
        assert!((session.metrics.avg_scope_depth - 3.0).abs() < 1e-9);
        assert!((session.metrics.avg_prototype_depth - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rarity_ratios_cover_only_observed_kinds_and_sum_correctly() {
        let mut findings = vec![
            sample_finding("s", 1),
            sample_finding("s", 2),
            sample_finding("s", 3),
            sample_finding("s", 4),
        ];
        findings[0].rarity = Some(RarityKind::Symbolic);
        findings[1].rarity = Some(RarityKind::Symbolic);
        findings[2].rarity = Some(RarityKind::InternalSlot);

        let metrics = compute_metrics(&findings);
        assert_eq!(metrics.rarity_ratios.len(), 2);
        assert!((metrics.rarity_ratios["symbolic"] - 0.5).abs() < 1e-9);
        assert!((metrics.rarity_ratios["internal_slot"] - 0.25).abs() < 1e-9);
        let sum: f64 = metrics.rarity_ratios.values().sum();
        assert!((sum - 0.75).abs() < 1e-9);
        assert!(sum <= 1.0);
        assert!(!metrics.rarity_ratios.contains_key("closure_capture"));
    }

    #[test]
    fn finalize_attaches_summary_and_blocks_further_appends() {
        let ids = FixedIdentity::default();
        let mut session = create_session(SessionOptions::default(), &ids);
        let session_id = session.session_id.clone();
        append_finding(&mut session, sample_finding(&session_id, 1))
            .expect("open session accepts findings");

        let summary = finalize_session(&mut session, &ids).clone();
        assert_eq!(summary.exportable_findings, 1);
        assert_eq!(summary.policy_version, crate::model::POLICY_VERSION);
        assert_eq!(summary.reviewer_role, crate::model::REVIEWER_ROLE);
        assert!(session.finished_at.is_some());

        let rejected = append_finding(&mut session, sample_finding("late", 1));
        assert!(matches!(rejected, Err(SessionError::Finalized(_))));
        assert_eq!(session.finding_count, 1);
    }

    #[test]
    fn repeated_finalize_never_recomputes_summary() {
        let ids = FixedIdentity::default();
        let mut session = create_session(SessionOptions::default(), &ids);
        let first = finalize_session(&mut session, &ids).clone();
        // Sneak a finding in behind the aggregator's back; the stored summary
        // must still stand.
        session.findings.push(sample_finding("s", 9));
        let second = finalize_session(&mut session, &ids).clone();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_session_has_zeroed_metrics() {
        let metrics = compute_metrics(&[]);
        assert_eq!(metrics.finding_count_total, 0);
        assert_eq!(metrics.avg_scope_depth, 0.0);
        assert!(metrics.rarity_ratios.is_empty());
    }
}
