pub mod classify;
pub mod finding;
pub mod governance;
pub mod model;
pub mod report;
pub mod session;

pub use classify::{
    classify_rarity, infer_kind, prototype_depth, summarize, CapturedProperty, CapturedValue,
    PropertyDescriptor, ValueProbe,
};
pub use finding::{build_finding, FindingOptions};
pub use governance::{apply_filter, FilterOutcome, GovernanceError, GovernancePattern, PatternSet};
pub use model::{
    channel_label, environment_label, rarity_label, EnvironmentTag, ExportChannel, Finding,
    GovernanceSummary, RarityKind, Session, SessionMetrics, SubjectKind, Visibility, NAV_PATH_MAX,
    POLICY_VERSION, PROTOTYPE_DEPTH_CAP, REDACTION_MARKER, REVIEWER_ROLE, SESSION_SCHEMA_VERSION,
};
pub use report::{
    effective_summary, finding_channel_label, render_report, render_safe_payload, SafePayload,
};
pub use session::{
    append_finding, compute_governance_summary, compute_metrics, create_session, finalize_session,
    IdentityProvider, SessionError, SessionOptions, SystemIdentity,
};
