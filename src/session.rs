//! Viewer lifecycle state machine
//!
//! The startup/load sequence is a chain of asynchronous steps (probe,
//! surface setup, background asset load). Instead of encoding the ordering
//! implicitly in callback nesting, the session tracks an explicit phase and
//! only accepts the documented transitions, so guarantees like "no render
//! before Ready" are assertable.

/// Lifecycle phase of a viewer session
///
/// Legal transitions:
///
/// ```text
/// Uninitialized -> Probing -> Initializing -> Ready -> LoadingAsset -> AssetReady
///                     |             |                        |
///                     v             v                        v
///                  Failed        Failed                   Ready   (load failed, scene stays up)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Probing,
    Initializing,
    Ready,
    LoadingAsset,
    AssetReady,
    Failed,
}

impl SessionPhase {
    /// Whether a frame may be drawn in this phase
    pub fn can_render(self) -> bool {
        matches!(
            self,
            SessionPhase::Ready | SessionPhase::LoadingAsset | SessionPhase::AssetReady
        )
    }

    /// Whether `next` is a documented transition out of this phase
    pub fn can_transition_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (Uninitialized, Probing)
                | (Probing, Initializing)
                | (Probing, Failed)
                | (Initializing, Ready)
                | (Initializing, Failed)
                | (Ready, LoadingAsset)
                | (LoadingAsset, AssetReady)
                // A failed load is non-fatal: the lit scene keeps rendering.
                | (LoadingAsset, Ready)
        )
    }
}

/// Phase holder with checked transitions
pub struct SessionState {
    phase: SessionPhase,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn can_render(&self) -> bool {
        self.phase.can_render()
    }

    /// Attempts a transition, returning whether it was applied
    ///
    /// Illegal transitions are rejected and logged rather than panicking;
    /// the session stays in its current phase.
    pub fn advance(&mut self, next: SessionPhase) -> bool {
        if self.phase.can_transition_to(next) {
            log::debug!("session phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
            true
        } else {
            log::warn!(
                "rejected session transition {:?} -> {:?}",
                self.phase,
                next
            );
            false
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionPhase::*;

    #[test]
    fn happy_path_reaches_asset_ready() {
        let mut state = SessionState::new();
        for next in [Probing, Initializing, Ready, LoadingAsset, AssetReady] {
            assert!(state.advance(next), "transition to {:?} rejected", next);
        }
        assert_eq!(state.phase(), AssetReady);
    }

    #[test]
    fn no_render_before_ready() {
        let mut state = SessionState::new();
        assert!(!state.can_render());
        state.advance(Probing);
        assert!(!state.can_render());
        state.advance(Initializing);
        assert!(!state.can_render());
        state.advance(Ready);
        assert!(state.can_render());
    }

    #[test]
    fn probe_failure_is_terminal() {
        let mut state = SessionState::new();
        state.advance(Probing);
        assert!(state.advance(Failed));
        assert!(!state.can_render());
        // Nothing leads out of Failed.
        for next in [Probing, Initializing, Ready, LoadingAsset, AssetReady] {
            assert!(!state.advance(next));
            assert_eq!(state.phase(), Failed);
        }
    }

    #[test]
    fn failed_load_returns_to_ready_and_keeps_rendering() {
        let mut state = SessionState::new();
        for next in [Probing, Initializing, Ready, LoadingAsset] {
            state.advance(next);
        }
        assert!(state.can_render());
        assert!(state.advance(Ready));
        assert!(state.can_render());
    }

    #[test]
    fn illegal_jumps_are_rejected() {
        let mut state = SessionState::new();
        assert!(!state.advance(Ready));
        assert!(!state.advance(AssetReady));
        assert_eq!(state.phase(), Uninitialized);
    }
}
