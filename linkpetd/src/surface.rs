//! The view side of the driver.
//!
//! A surface receives what the engine wants shown. Navigation may fail, or
//! may take the user away from the pet view entirely, in which case the
//! driver tears itself down.

use linkpet::engine::Route;
use linkpet::snapshot::DiaryEntry;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The pet view is still mounted.
    Stay,
    /// The pet view was replaced. The driver stops.
    LeaveView,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("navigation to {route:?} failed: {reason}")]
pub struct SurfaceError {
    pub route: Route,
    pub reason: String,
}

pub trait Surface: Send {
    fn navigate(&mut self, route: Route) -> Result<NavigationOutcome, SurfaceError>;

    fn publish_unread(&mut self, entries: &[DiaryEntry]);

    fn terminal_failure(&mut self, pet_id: u64);
}

/// Headless surface for the daemon. IPC clients read state instead.
///
/// With `auto_claim` the daemon claims eggs itself and stays on the pet.
/// Without it, a claim is left to a UI and the daemon stops watching.
#[derive(Debug)]
pub struct LogSurface {
    auto_claim: bool,
}

impl LogSurface {
    pub fn new(auto_claim: bool) -> Self {
        Self { auto_claim }
    }
}

impl Surface for LogSurface {
    fn navigate(&mut self, route: Route) -> Result<NavigationOutcome, SurfaceError> {
        info!(?route, "navigate");
        if route == Route::Claim && !self.auto_claim {
            info!("claiming is left to the app; leaving pet view");
            return Ok(NavigationOutcome::LeaveView);
        }
        Ok(NavigationOutcome::Stay)
    }

    fn publish_unread(&mut self, entries: &[DiaryEntry]) {
        info!(count = entries.len(), "new diary entries");
    }

    fn terminal_failure(&mut self, pet_id: u64) {
        warn!(pet_id, "egg died");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_leaves_view_unless_auto_claiming() {
        let mut manual = LogSurface::new(false);
        assert_eq!(manual.navigate(Route::Claim), Ok(NavigationOutcome::LeaveView));
        assert_eq!(manual.navigate(Route::Naming), Ok(NavigationOutcome::Stay));

        let mut auto = LogSurface::new(true);
        assert_eq!(auto.navigate(Route::Claim), Ok(NavigationOutcome::Stay));
    }
}
