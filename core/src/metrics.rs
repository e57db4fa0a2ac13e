//! Business metrics for event registration and attendance.
//!
//! Recorded through the `metrics` facade; the server installs a Prometheus
//! recorder. Without a recorder every call is a no-op, which keeps tests
//! silent.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `eventpass_events_created_total` - Events published
//! - `eventpass_events_updated_total` - Successful event updates
//! - `eventpass_events_deleted_total` - Events deleted
//! - `eventpass_registrations_total{status}` - Registration attempts by outcome
//! - `eventpass_check_ins_total{status}` - Check-in attempts by outcome
//! - `eventpass_authorization_denied_total{reason}` - Failed role checks

use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!("eventpass_events_created_total", "Total number of events published");
    describe_counter!(
        "eventpass_events_updated_total",
        "Total number of successful event updates"
    );
    describe_counter!("eventpass_events_deleted_total", "Total number of events deleted");
    describe_counter!(
        "eventpass_registrations_total",
        "Registration attempts by status (registered, already_registered, sold_out, rejected)"
    );
    describe_counter!(
        "eventpass_check_ins_total",
        "Check-in attempts by status (marked, already_checked_in, not_registered, invalid_payload, rejected)"
    );
    describe_counter!(
        "eventpass_authorization_denied_total",
        "Role checks that failed, by reason"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record an event published.
pub fn record_event_created() {
    metrics::counter!("eventpass_events_created_total").increment(1);
}

/// Record an event updated.
pub fn record_event_updated() {
    metrics::counter!("eventpass_events_updated_total").increment(1);
}

/// Record an event deleted.
pub fn record_event_deleted() {
    metrics::counter!("eventpass_events_deleted_total").increment(1);
}

/// Record a registration attempt.
///
/// # Arguments
///
/// * `status` - Outcome label (e.g., "registered", "already_registered")
pub fn record_registration(status: &'static str) {
    metrics::counter!("eventpass_registrations_total", "status" => status).increment(1);
    tracing::debug!(status, "Recorded registration metric");
}

/// Record a check-in attempt.
///
/// # Arguments
///
/// * `status` - Outcome label (e.g., "marked", "already_checked_in")
pub fn record_check_in(status: &'static str) {
    metrics::counter!("eventpass_check_ins_total", "status" => status).increment(1);
    tracing::debug!(status, "Recorded check-in metric");
}

/// Record a failed role check.
pub fn record_authorization_denied(reason: &'static str) {
    metrics::counter!("eventpass_authorization_denied_total", "reason" => reason).increment(1);
}
