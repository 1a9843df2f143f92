//! Prometheus metrics for the gatekeeper.
//!
//! [`GateMetrics`] owns a dedicated [`Registry`] and is fed from the
//! gatekeeper's event bus. The node renders it in the Prometheus text
//! exposition format when it stops.

use std::sync::Arc;

use antibot_verification::{ExpireOutcome, GateEvent, Gatekeeper};
use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct GateMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Platform updates received by the poller.
    pub updates_received: IntCounter,
    /// Users put under verification.
    pub users_admitted: IntCounter,
    /// Joining users not challenged (bots, admins, already pending, ...).
    pub users_skipped: IntCounter,
    /// Join events declined as a whole (replay, unmanaged chat, bot not admin).
    pub joins_declined: IntCounter,
    pub users_verified: IntCounter,
    /// Verify presses by someone without a matching challenge.
    pub presses_rejected: IntCounter,
    /// Verification windows that closed on a pending user.
    pub challenges_expired: IntCounter,
    /// Unverified users removed from their chat.
    pub users_removed: IntCounter,
    pub removal_failures: IntCounter,
    pub persistence_failures: IntCounter,
    pub platform_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Users currently waiting to verify.
    pub pending_users: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .expect("failed to register counter")
}

impl GateMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let updates_received = counter(
            &registry,
            "antibot_updates_received_total",
            "Platform updates received by the poller",
        );
        let users_admitted = counter(
            &registry,
            "antibot_users_admitted_total",
            "Users put under verification",
        );
        let users_skipped = counter(
            &registry,
            "antibot_users_skipped_total",
            "Joining users exempt from verification",
        );
        let joins_declined = counter(
            &registry,
            "antibot_joins_declined_total",
            "Join events declined as a whole",
        );
        let users_verified = counter(
            &registry,
            "antibot_users_verified_total",
            "Users who pressed their verify button in time",
        );
        let presses_rejected = counter(
            &registry,
            "antibot_presses_rejected_total",
            "Verify presses without a matching challenge",
        );
        let challenges_expired = counter(
            &registry,
            "antibot_challenges_expired_total",
            "Verification windows that closed on a pending user",
        );
        let users_removed = counter(
            &registry,
            "antibot_users_removed_total",
            "Unverified users removed from their chat",
        );
        let removal_failures = counter(
            &registry,
            "antibot_removal_failures_total",
            "Removals refused by the platform",
        );
        let persistence_failures = counter(
            &registry,
            "antibot_persistence_failures_total",
            "Failed registry flushes",
        );
        let platform_failures = counter(
            &registry,
            "antibot_platform_failures_total",
            "Failed outbound platform calls",
        );

        let pending_users = register_int_gauge_with_registry!(
            Opts::new("antibot_pending_users", "Users currently waiting to verify"),
            registry
        )
        .expect("failed to register pending_users gauge");

        Self {
            registry,
            updates_received,
            users_admitted,
            users_skipped,
            joins_declined,
            users_verified,
            presses_rejected,
            challenges_expired,
            users_removed,
            removal_failures,
            persistence_failures,
            platform_failures,
            pending_users,
        }
    }

    /// Count a gatekeeper event.
    pub fn record(&self, event: &GateEvent) {
        match event {
            GateEvent::ChatRegistered { .. } => {}
            GateEvent::JoinDeclined { .. } => self.joins_declined.inc(),
            GateEvent::UserAdmitted { .. } => {
                self.users_admitted.inc();
                self.pending_users.inc();
            }
            GateEvent::UserSkipped { .. } => self.users_skipped.inc(),
            GateEvent::UserVerified { .. } => {
                self.users_verified.inc();
                self.pending_users.dec();
            }
            GateEvent::VerifyRejected { .. } => self.presses_rejected.inc(),
            GateEvent::ChallengeExpired { outcome, .. } => {
                self.challenges_expired.inc();
                self.pending_users.dec();
                match outcome {
                    ExpireOutcome::Removed => self.users_removed.inc(),
                    ExpireOutcome::RemovalFailed => self.removal_failures.inc(),
                    ExpireOutcome::Spared(_) | ExpireOutcome::Stale => {}
                }
            }
            GateEvent::PersistenceFailed => self.persistence_failures.inc(),
            GateEvent::PlatformCallFailed { .. } => self.platform_failures.inc(),
        }
    }

    /// Subscribe to `gate`'s events and seed the pending gauge from its
    /// registry.
    pub fn attach(self: &Arc<Self>, gate: &mut Gatekeeper) {
        self.pending_users.set(gate.registry().pending_count() as i64);
        let metrics = Arc::clone(self);
        gate.subscribe(Box::new(move |event| metrics.record(event)));
    }

    /// Encode every metric in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}
