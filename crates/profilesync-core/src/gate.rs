//! Access gate for protected views.
//!
//! A pure function of session state: show a loading placeholder while the
//! store is hydrating (so startup never flashes a redirect), send signed-out
//! users to the login page with a history replace, and render content only
//! for an authenticated session.

use crate::auth::{Session, SessionState, SessionStore};
use crate::events::{NavigationEvent, Route};

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision<T = ()> {
    Loading,
    Redirect(NavigationEvent),
    Render(T),
}

impl<T> GateDecision<T> {
    pub fn is_render(&self) -> bool {
        matches!(self, GateDecision::Render(_))
    }
}

pub struct AccessGate;

impl AccessGate {
    /// Build the protected content only when a session is present
    pub fn render<T, F>(state: &SessionState, content: F) -> GateDecision<T>
    where
        F: FnOnce(&Session) -> T,
    {
        match state {
            SessionState::Hydrating => GateDecision::Loading,
            SessionState::Unauthenticated => {
                GateDecision::Redirect(NavigationEvent::replace(Route::Login))
            }
            SessionState::Authenticated(session) => GateDecision::Render(content(session)),
        }
    }

    pub fn check(state: &SessionState) -> GateDecision {
        Self::render(state, |_| ())
    }

    /// Wait for hydration to finish, then decide. Never resolves if the
    /// store is never hydrated.
    pub async fn resolve(sessions: &SessionStore) -> GateDecision {
        let mut rx = sessions.subscribe();
        let settled = rx
            .wait_for(|state| !state.is_hydrating())
            .await
            .map(|state| Self::check(&state));
        // Sender gone: fall back to whatever state was last published
        settled.unwrap_or_else(|_| Self::check(&sessions.state()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::auth::MemoryStore;
    use crate::models::Profile;
    use crate::notify::TracingNotifier;

    fn session() -> Session {
        Session::new("t1", Profile::from_pairs([("username", "alice")]))
    }

    #[test]
    fn test_gate_for_each_state() {
        assert_eq!(AccessGate::check(&SessionState::Hydrating), GateDecision::Loading);
        assert_eq!(
            AccessGate::check(&SessionState::Unauthenticated),
            GateDecision::Redirect(NavigationEvent {
                to: Route::Login,
                replace: true
            })
        );
        assert_eq!(
            AccessGate::check(&SessionState::Authenticated(session())),
            GateDecision::Render(())
        );
    }

    #[test]
    fn test_render_only_builds_content_when_authenticated() {
        let mut built = 0;
        let decision = AccessGate::render(&SessionState::Hydrating, |_| {
            built += 1;
        });
        assert_eq!(decision, GateDecision::Loading);
        assert_eq!(built, 0);

        let decision = AccessGate::render(&SessionState::Authenticated(session()), |s| {
            s.profile.display_name().to_string()
        });
        assert_eq!(decision, GateDecision::Render("alice".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_waits_for_hydration() {
        let sessions = Arc::new(SessionStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(TracingNotifier),
        ));

        let waiting = {
            let sessions = sessions.clone();
            tokio::spawn(async move { AccessGate::resolve(&sessions).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        sessions.hydrate().await;
        let decision = waiting.await.unwrap();
        assert_eq!(
            decision,
            GateDecision::Redirect(NavigationEvent::replace(Route::Login))
        );
    }
}
