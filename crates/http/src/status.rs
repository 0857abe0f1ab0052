//! Mapping of service status strings onto operation statuses.

use lro_poller::OperationStatus;

/// Map a `status` value from an operation resource body.
///
/// Matching ignores case. Names the engine does not know become
/// non-terminal custom statuses, so polling continues.
pub fn service_status(raw: &str) -> OperationStatus {
    let raw = raw.trim();
    match raw.to_ascii_lowercase().as_str() {
        "notstarted" | "not_started" => OperationStatus::NOT_STARTED,
        "inprogress" | "in_progress" | "running" => OperationStatus::IN_PROGRESS,
        "succeeded" | "successfully_completed" => OperationStatus::SUCCESSFULLY_COMPLETED,
        "failed" => OperationStatus::FAILED,
        "canceled" | "cancelled" | "user_cancelled" => OperationStatus::USER_CANCELLED,
        _ => OperationStatus::parse(raw),
    }
}
