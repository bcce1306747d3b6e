pub mod service;

pub use service::{
    export_safe_payload, finalize_session, get_session, record_finding, render_session_report,
    start_session, RecordFindingRequest, SessionSnapshot, SessionStatus, StartSessionRequest,
};
