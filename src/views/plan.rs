//! Load-plan execution state.
//!
//! ```text
//! Idle --begin(non-empty)--> Executing{token} --finish(token, Ok)--> Idle (apply)
//!                                            --finish(token, Err)--> Idle (message)
//!                                            --cancel()----------> Idle
//! ```
//!
//! `begin` while executing (or with no packages) is dropped, not queued. Each
//! accepted `begin` hands out a fresh token; `finish` with any other token is a late
//! or cancelled response and is ignored.

use log::{debug, info, warn};

use crate::client::{LoadPlanError, LoadPlanResponse};
use crate::package::Package;
use crate::uld::UldDescriptor;

/// Message shown when the planner could not be reached or rejected the request.
pub const BACKEND_ERROR_MESSAGE: &str = "Error communicating with backend!";

/// Everything needed to issue one planning request.
#[derive(Debug, Clone)]
pub struct PlanTicket {
    pub token: u64,
    pub uld: UldDescriptor,
    pub packages: Vec<Package>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlanState {
    Idle,
    Executing { token: u64 },
}

#[derive(Debug)]
pub struct PlanExecution {
    state: PlanState,
    next_token: u64,
    last_message: Option<String>,
}

impl Default for PlanExecution {
    fn default() -> Self {
        Self {
            state: PlanState::Idle,
            next_token: 1,
            last_message: None,
        }
    }
}

impl PlanExecution {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> PlanState {
        self.state
    }

    #[inline]
    pub fn is_executing(&self) -> bool {
        matches!(self.state, PlanState::Executing { .. })
    }

    #[inline]
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Start an execution, or return `None` if the guard rejects it.
    pub fn begin(&mut self, uld: &UldDescriptor, packages: &[Package]) -> Option<PlanTicket> {
        if packages.is_empty() {
            debug!("load plan: nothing to plan");
            return None;
        }
        if let PlanState::Executing { token } = self.state {
            debug!("load plan: request {token} still in flight; ignoring trigger");
            return None;
        }

        let token = self.next_token;
        self.next_token += 1;
        self.state = PlanState::Executing { token };
        self.last_message = None;

        info!(
            "load plan: executing request {token} with {} packages",
            packages.len()
        );

        Some(PlanTicket {
            token,
            uld: uld.clone(),
            packages: packages.to_vec(),
        })
    }

    /// Settle the in-flight request.
    ///
    /// Returns the plan to apply, or `None` if the outcome was an error or belongs to
    /// a request that is no longer in flight.
    pub fn finish(
        &mut self,
        token: u64,
        outcome: Result<LoadPlanResponse, LoadPlanError>,
    ) -> Option<LoadPlanResponse> {
        match self.state {
            PlanState::Executing { token: current } if current == token => {}
            _ => {
                debug!("load plan: dropping stale response for request {token}");
                return None;
            }
        }

        self.state = PlanState::Idle;
        match outcome {
            Ok(plan) => {
                info!(
                    "load plan: request {token} returned {} positions",
                    plan.positions.len()
                );
                Some(plan)
            }
            Err(err) => {
                warn!("load plan: request {token} failed: {err}");
                self.last_message = Some(BACKEND_ERROR_MESSAGE.to_string());
                None
            }
        }
    }

    /// Abandon the in-flight request, returning its token.
    pub fn cancel(&mut self) -> Option<u64> {
        match std::mem::replace(&mut self.state, PlanState::Idle) {
            PlanState::Executing { token } => {
                debug!("load plan: cancelled request {token}");
                Some(token)
            }
            PlanState::Idle => None,
        }
    }
}
