//! Session liveness tracking and crash detection
//!
//! The [`SessionMonitor`] owns the set of sessions the panel believes are (or
//! were recently) running. Poll results flow in through [`SessionMonitor::apply_poll`],
//! which classifies each observation:
//!
//! - a session that stops after [`SessionMonitor::mark_stop_requested`] ended
//!   cleanly;
//! - a session that stops without a stop request crashed, reported exactly
//!   once per session;
//! - results carrying a stale generation are discarded, so a slow status query
//!   dispatched before a stop request cannot fabricate a crash.
//!
//! Generations increment when a poll is dispatched, not when it lands. The
//! monitor never removes entries on its own; the handler clears them once the
//! lifecycle transition has been acted on.

use std::collections::HashMap;

use tracing::debug;

use mwarden_core::{CrashEvent, MirrorSession, SessionStatus};

/// One tracked session plus the bookkeeping apply_poll needs.
#[derive(Debug, Clone)]
struct WatchedSession {
    session: MirrorSession,
    stop_requested: bool,
    crash_reported: bool,
    generation: u64,
}

/// Classification of one poll observation.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Unknown session or stale generation; no effect.
    Ignored,
    /// Still running, or a transition already reported.
    NoChange,
    /// The session died without a stop request. Raised at most once.
    Crashed(CrashEvent),
    /// The session stopped after an explicit stop request.
    StoppedClean,
}

/// Registry of live mirroring sessions keyed by session id.
#[derive(Debug, Default)]
pub struct SessionMonitor {
    sessions: HashMap<String, WatchedSession>,
}

impl SessionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_tracked(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Begin tracking a session. Replaces any stale entry under the same id.
    pub fn track(&mut self, session: MirrorSession) {
        self.sessions.insert(
            session.session_id.clone(),
            WatchedSession {
                session,
                stop_requested: false,
                crash_reported: false,
                generation: 0,
            },
        );
    }

    /// Record that the user asked this session to stop, so a later death is
    /// not a crash. Returns `false` for untracked ids.
    pub fn mark_stop_requested(&mut self, session_id: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(watched) => {
                watched.stop_requested = true;
                true
            }
            None => false,
        }
    }

    /// Advance the poll generation for a session about to be queried.
    ///
    /// Results must echo this value back; anything older is discarded.
    pub fn next_generation(&mut self, session_id: &str) -> Option<u64> {
        let watched = self.sessions.get_mut(session_id)?;
        watched.generation += 1;
        Some(watched.generation)
    }

    /// Fold one poll observation into the registry.
    ///
    /// `observed` is `None` when the status query itself failed; an
    /// unanswerable backend counts as a stopped session.
    pub fn apply_poll(
        &mut self,
        session_id: &str,
        generation: u64,
        observed: Option<SessionStatus>,
    ) -> PollOutcome {
        let Some(watched) = self.sessions.get_mut(session_id) else {
            return PollOutcome::Ignored;
        };
        if generation != watched.generation {
            debug!(
                "Discarding stale poll for {session_id} (generation {generation}, current {})",
                watched.generation
            );
            return PollOutcome::Ignored;
        }

        let status = observed.unwrap_or(SessionStatus::Stopped);
        if status.is_running() {
            watched.session.status = SessionStatus::Running;
            return PollOutcome::NoChange;
        }

        watched.session.status = status;
        if watched.stop_requested {
            return PollOutcome::StoppedClean;
        }
        if watched.crash_reported {
            return PollOutcome::NoChange;
        }
        watched.crash_reported = true;
        PollOutcome::Crashed(CrashEvent {
            session_id: watched.session.session_id.clone(),
            device_id: watched.session.device_id.clone(),
        })
    }

    /// Drop a session from the registry, returning it if it was tracked.
    pub fn clear(&mut self, session_id: &str) -> Option<MirrorSession> {
        self.sessions.remove(session_id).map(|watched| watched.session)
    }

    pub fn get(&self, session_id: &str) -> Option<&MirrorSession> {
        self.sessions.get(session_id).map(|watched| &watched.session)
    }

    /// The running session for a device, if any.
    pub fn running_session_for_device(&self, device_id: &str) -> Option<&MirrorSession> {
        self.sessions
            .values()
            .map(|watched| &watched.session)
            .find(|session| session.device_id == device_id && session.is_running())
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    /// Cloned view of all tracked sessions, ordered by session id for stable
    /// output.
    pub fn snapshot(&self) -> Vec<MirrorSession> {
        let mut sessions: Vec<MirrorSession> = self
            .sessions
            .values()
            .map(|watched| watched.session.clone())
            .collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        sessions
    }
}
