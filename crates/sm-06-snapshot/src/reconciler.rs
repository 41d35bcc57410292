//! The reconciliation state machine.

use tracing::{debug, info};

use shared_types::{ScopeId, StateDigest};

/// Reconciler timing, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileConfig {
    /// How long to wait for a `SNAPSHOT_RES` before giving up the round.
    pub response_timeout_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 5_000,
        }
    }
}

/// `Idle -> AwaitingResponse -> Idle`. There is never more than one
/// outstanding exchange; further divergences wait for later digest rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Idle,
    AwaitingResponse { scope: ScopeId, since_ms: u64 },
}

/// Drives divergence detection and repair for one node.
#[derive(Debug)]
pub struct Reconciler {
    cfg: ReconcileConfig,
    state: ReconcileState,
    cursor: usize,
}

impl Reconciler {
    pub fn new(cfg: ReconcileConfig) -> Self {
        Self {
            cfg,
            state: ReconcileState::Idle,
            cursor: 0,
        }
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    /// Advance the round-robin cursor over the scope universe and return
    /// the scope to advertise this round.
    pub fn next_scope(&mut self, scopes: &[ScopeId]) -> Option<ScopeId> {
        if scopes.is_empty() {
            return None;
        }
        let scope = scopes[self.cursor % scopes.len()];
        self.cursor = (self.cursor + 1) % scopes.len();
        Some(scope)
    }

    /// Compare a peer's advertised digest against ours. Returns the scope
    /// to request when they differ and no exchange is in flight.
    pub fn on_remote_digest(
        &mut self,
        remote: &StateDigest,
        local_hash: Option<&str>,
        now_ms: u64,
    ) -> Option<ScopeId> {
        if local_hash == Some(remote.hash.as_str()) {
            return None;
        }
        if self.state != ReconcileState::Idle {
            return None;
        }
        debug!(scope = %remote.scope, "digest divergence detected");
        self.state = ReconcileState::AwaitingResponse {
            scope: remote.scope,
            since_ms: now_ms,
        };
        Some(remote.scope)
    }

    /// A `SNAPSHOT_RES` arrived. Returns `true` when it answers the
    /// outstanding request (the caller then applies it replace-on-receipt);
    /// unsolicited or late responses are ignored.
    pub fn on_response(&mut self, scope: ScopeId) -> bool {
        match self.state {
            ReconcileState::AwaitingResponse { scope: awaited, .. } if awaited == scope => {
                info!(scope = %scope, "divergent scope repaired");
                self.state = ReconcileState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Tick evaluation: expire a stuck exchange. Returns `true` when a
    /// timeout fired (the round simply ends; nothing blocks).
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if let ReconcileState::AwaitingResponse { scope, since_ms } = self.state {
            if now_ms.saturating_sub(since_ms) >= self.cfg.response_timeout_ms {
                debug!(scope = %scope, "snapshot response timed out");
                self.state = ReconcileState::Idle;
                return true;
            }
        }
        false
    }
}
