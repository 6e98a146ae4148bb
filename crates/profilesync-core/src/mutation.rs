//! Optimistic profile updates.
//!
//! An edit is applied to the cached profile view before the server answers,
//! then either replaced by the server's authoritative profile or rolled back
//! to the snapshot taken when the edit started. Each attempt is tracked by a
//! `MutationTicket`. Only one ticket can be in flight at a time; a second
//! attempt is rejected rather than interleaved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::SessionStore;
use crate::cache::ProfileCache;
use crate::error::{Error, Result};
use crate::models::{Profile, ProfilePatch};
use crate::notify::Notifier;
use crate::utils::validate::validate_profile_patch;

const NOTHING_TO_UPDATE_MESSAGE: &str = "Please make at least one change to update your profile.";
const UPDATED_MESSAGE: &str = "Profile updated successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    InFlight,
    Committed,
    RolledBack,
}

/// Bookkeeping for one speculative edit
#[derive(Debug)]
pub struct MutationTicket {
    /// Cached view before the edit was applied; dropped once settled
    previous: Option<Profile>,
    pending: ProfilePatch,
    state: TicketState,
}

impl MutationTicket {
    fn open(previous: Profile, pending: ProfilePatch) -> Self {
        Self {
            previous: Some(previous),
            pending,
            state: TicketState::InFlight,
        }
    }

    pub fn state(&self) -> TicketState {
        self.state
    }

    pub fn pending(&self) -> &ProfilePatch {
        &self.pending
    }

    pub fn previous(&self) -> Option<&Profile> {
        self.previous.as_ref()
    }

    fn commit(&mut self) {
        debug_assert_eq!(self.state, TicketState::InFlight);
        self.state = TicketState::Committed;
        self.previous = None;
    }

    /// Hands back the snapshot to restore
    fn roll_back(&mut self) -> Option<Profile> {
        debug_assert_eq!(self.state, TicketState::InFlight);
        self.state = TicketState::RolledBack;
        self.previous.take()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Every submitted field was blank or already current; nothing was sent
    NothingToUpdate,
    /// The server accepted the edit; this is its version of the profile
    Committed(Profile),
}

/// Holds the single in-flight slot. The ticket is opened only after the slot
/// is held, so its snapshot can never predate another settled ticket. If the
/// owning future is dropped before the ticket settles, the speculative edit
/// is rolled back here.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    cache: &'a ProfileCache,
    ticket: Option<MutationTicket>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, cache: &'a ProfileCache) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            flag,
            cache,
            ticket: None,
        })
    }

    fn open(&mut self, previous: Profile, pending: ProfilePatch) -> &mut MutationTicket {
        self.ticket.insert(MutationTicket::open(previous, pending))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self
            .ticket
            .as_mut()
            .filter(|t| t.state() == TicketState::InFlight)
        {
            debug!("Profile update abandoned before settling, rolling back");
            if let Some(previous) = ticket.roll_back() {
                self.cache.replace_data(previous);
            }
            self.cache.invalidate();
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// Coordinates optimistic edits of the signed-in user's profile
pub struct ProfileUpdater {
    sessions: Arc<SessionStore>,
    api: ApiClient,
    cache: Arc<ProfileCache>,
    notifier: Arc<dyn Notifier>,
    in_flight: AtomicBool,
}

impl ProfileUpdater {
    pub fn new(
        sessions: Arc<SessionStore>,
        api: ApiClient,
        cache: Arc<ProfileCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            sessions,
            api,
            cache,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Apply `patch` optimistically and reconcile with the server.
    ///
    /// Blank and unchanged fields are ignored; if nothing is left the call
    /// returns `NothingToUpdate` without contacting the server. On failure
    /// the cached profile is restored and the error returned. Either way
    /// the cached read is invalidated so the next read re-fetches.
    pub async fn submit(&self, patch: ProfilePatch) -> Result<UpdateOutcome> {
        validate_profile_patch(&patch)?;

        let Some(session) = self.sessions.session() else {
            error!("Profile update attempted without an authenticated session");
            return Err(Error::IllegalStateAccess("profile update"));
        };

        let Some(mut slot) = InFlight::acquire(&self.in_flight, &self.cache) else {
            warn!("Rejecting profile update while another is in flight");
            return Err(Error::MutationInFlight);
        };

        let current = self.cache.peek().unwrap_or_else(|| session.profile.clone());
        let pending = patch.changes_from(&current);
        if pending.is_empty() {
            self.notifier.warning(NOTHING_TO_UPDATE_MESSAGE);
            return Ok(UpdateOutcome::NothingToUpdate);
        }

        let ticket = slot.open(current.clone(), pending);
        debug!(fields = ticket.pending().len(), "Applying profile update optimistically");
        self.cache
            .replace_data(current.merged(&ticket.pending().to_profile()));

        let result = self
            .api
            .update_profile(&session.token, ticket.pending())
            .await;

        let outcome = match result {
            Ok(profile) => {
                self.cache.set(profile.clone());
                if !self.sessions.is_authenticated() {
                    debug!("Session ended while the update was in flight");
                } else if let Err(e) = self.sessions.update_profile(&profile) {
                    warn!(error = %e, "Confirmed profile could not be applied to the session");
                }
                ticket.commit();
                self.notifier.success(UPDATED_MESSAGE);
                Ok(UpdateOutcome::Committed(profile))
            }
            Err(e) => {
                if let Some(previous) = ticket.roll_back() {
                    self.cache.replace_data(previous);
                }
                // Eviction already told the user what happened
                if e != ApiError::Unauthorized {
                    self.notifier.error(&e.to_string());
                }
                Err(e.into())
            }
        };

        self.cache.invalidate();
        outcome
    }
}
