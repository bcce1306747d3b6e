use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SESSION_SCHEMA_VERSION: &str = "1.0.0";

/// Fixed tag attached to every governance summary so downstream consumers can
/// tell which policy generation produced it.
pub const POLICY_VERSION: &str = "probelog-policy/2";

/// Marks the governance summary as the harvester's own automated judgment,
/// not the outcome of a human review.
pub const REVIEWER_ROLE: &str = "automated-harvester";

/// Navigation paths are truncated to this many segments.
pub const NAV_PATH_MAX: usize = 16;

/// Hard cap on prototype-chain traversal, so cyclic or pathological ancestor
/// graphs still terminate.
pub const PROTOTYPE_DEPTH_CAP: u32 = 32;

pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Where the capture happened. Supplied by the host, never detected here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentTag {
    Browser,
    Worker,
    Headless,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Buffer,
    Function,
    TypedArray,
    #[default]
    Other,
}

/// Structurally unusual property shapes. Absence means "ordinary".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RarityKind {
    ClosureCapture,
    NonEnumerable,
    Symbolic,
    InternalSlot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Enumerable,
    NonEnumerable,
}

/// Destination policy label controlling which renderer may include a finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportChannel {
    GithubIssue,
    AiChat,
    LocalOnly,
    CasQueue,
}

/// One immutable record of a single inspected value plus its governance
/// outcome. Built fully formed by the finding builder and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub session_id: String,
    pub captured_at: String,
    pub environment: EnvironmentTag,
    pub kind: SubjectKind,
    #[serde(default)]
    pub hint: Option<String>,
    pub navigation_path: Vec<String>,
    pub prototype_depth: u32,
    pub scope_depth: u32,
    #[serde(default)]
    pub rarity: Option<RarityKind>,
    #[serde(default)]
    pub rarity_summary: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    /// Free-text annotation, post-redaction.
    pub notes: String,
    #[serde(default)]
    pub source_location: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Matched governance pattern ids, sorted and duplicate-free.
    #[serde(default)]
    pub governance_flags: Vec<String>,
    #[serde(default)]
    pub secret_redactions: u32,
    #[serde(default)]
    pub neurosignal_blocked: bool,
    pub channel: ExportChannel,
}

/// Ordered, append-only collection of findings plus aggregate metrics and a
/// terminal governance summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub session_id: String,
    pub environment: EnvironmentTag,
    #[serde(default)]
    pub operator_handle: Option<String>,
    pub started_at: String,
    #[serde(default)]
    pub finished_at: Option<String>,
    pub findings: Vec<Finding>,
    pub finding_count: u64,
    #[serde(default)]
    pub metrics: SessionMetrics,
    #[serde(default)]
    pub governance_summary: Option<GovernanceSummary>,
}

fn default_schema_version() -> String {
    SESSION_SCHEMA_VERSION.to_string()
}

/// Derived snapshot over the current findings list. Recomputed from scratch
/// after every append so it can never drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionMetrics {
    #[serde(default)]
    pub finding_count_total: u64,
    #[serde(default)]
    pub avg_scope_depth: f64,
    #[serde(default)]
    pub avg_prototype_depth: f64,
    /// Fraction of findings carrying each observed rarity kind. Kinds with
    /// zero occurrences are absent, never present at 0.0.
    #[serde(default)]
    pub rarity_ratios: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GovernanceSummary {
    pub redactions_total: u64,
    pub neurosignal_events: u64,
    /// Findings whose resolved channel is local-only.
    pub blocked_exports: u64,
    pub exportable_findings: u64,
    pub policy_version: String,
    pub reviewer_role: String,
}

pub fn environment_label(environment: &EnvironmentTag) -> &'static str {
    match environment {
        EnvironmentTag::Browser => "browser",
        EnvironmentTag::Worker => "worker",
        EnvironmentTag::Headless => "headless",
        EnvironmentTag::Unknown => "unknown",
    }
}

pub fn rarity_label(rarity: &RarityKind) -> &'static str {
    match rarity {
        RarityKind::ClosureCapture => "closure_capture",
        RarityKind::NonEnumerable => "non_enumerable",
        RarityKind::Symbolic => "symbolic",
        RarityKind::InternalSlot => "internal_slot",
    }
}

pub fn channel_label(channel: &ExportChannel) -> &'static str {
    match channel {
        ExportChannel::GithubIssue => "github-issue",
        ExportChannel::AiChat => "ai-chat",
        ExportChannel::LocalOnly => "local-only",
        ExportChannel::CasQueue => "cas-queue",
    }
}
