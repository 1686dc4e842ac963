use crate::error::CallError;
use crate::time::now_ms;
use async_trait::async_trait;
use serde_json::Value;
use sotto_api::types::UserId;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Remote ICE candidates that arrive before the remote description are
/// parked here; a well-behaved peer sends a handful at most.
const MAX_PENDING_CANDIDATES: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Calling,
    Ringing,
    Incoming,
    Connecting,
    Connected,
    Failed,
}

/// Media and peer-connection backend (external collaborator). The
/// manager drives it but never looks inside SDP or candidate payloads.
#[async_trait]
pub trait MediaSession: Send + Sync {
    async fn acquire(&self, video: bool) -> Result<(), CallError>;
    async fn create_offer(&self) -> Result<Value, CallError>;
    async fn create_answer(&self) -> Result<Value, CallError>;
    async fn set_remote_description(&self, description: &Value) -> Result<(), CallError>;
    async fn add_ice_candidate(&self, candidate: &Value) -> Result<(), CallError>;
    async fn close(&self);
}

/// Outbound signaling frames, relayed through the server connection.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send_offer(&self, to: &UserId, offer: Value, is_video: bool)
        -> Result<(), CallError>;
    async fn send_answer(&self, to: &UserId, answer: Value) -> Result<(), CallError>;
    async fn send_candidate(&self, to: &UserId, candidate: Value) -> Result<(), CallError>;
    async fn send_end(&self, to: &UserId) -> Result<(), CallError>;
}

struct Session {
    peer: UserId,
    state: CallState,
    is_video: bool,
    remote_description_set: bool,
    pending_candidates: VecDeque<Value>,
    connected_at_ms: Option<u64>,
}

impl Session {
    fn new(peer: UserId, state: CallState, is_video: bool) -> Self {
        Self {
            peer,
            state,
            is_video,
            remote_description_set: false,
            pending_candidates: VecDeque::new(),
            connected_at_ms: None,
        }
    }
}

/// One-on-one call state machine, one session at a time:
/// `Idle -> (Calling -> Ringing | Incoming) -> Connecting -> Connected
/// -> Idle`, with `Failed` reachable from any non-idle state.
#[derive(Clone)]
pub struct CallManager {
    media: Arc<dyn MediaSession>,
    signals: Arc<dyn SignalSink>,
    session: Arc<Mutex<Option<Session>>>,
}

impl CallManager {
    pub fn new(media: Arc<dyn MediaSession>, signals: Arc<dyn SignalSink>) -> Self {
        Self {
            media,
            signals,
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn state(&self) -> CallState {
        let guard = self.session.lock().await;
        guard.as_ref().map(|s| s.state).unwrap_or(CallState::Idle)
    }

    pub async fn peer(&self) -> Option<UserId> {
        let guard = self.session.lock().await;
        guard.as_ref().map(|s| s.peer.clone())
    }

    pub async fn connected_at_ms(&self) -> Option<u64> {
        let guard = self.session.lock().await;
        guard.as_ref().and_then(|s| s.connected_at_ms)
    }

    pub async fn is_video(&self) -> bool {
        let guard = self.session.lock().await;
        guard.as_ref().map(|s| s.is_video).unwrap_or(false)
    }

    /// Starts an outgoing call: acquire local media, create and send the
    /// offer, then ring until the peer answers.
    pub async fn start_call(&self, peer: &UserId, video: bool) -> Result<(), CallError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Err(CallError::Busy);
        }
        *guard = Some(Session::new(peer.clone(), CallState::Calling, video));
        let setup = async {
            self.media.acquire(video).await?;
            let offer = self.media.create_offer().await?;
            self.signals.send_offer(peer, offer, video).await
        }
        .await;
        let outcome = match setup {
            Ok(()) => CallState::Ringing,
            Err(_) => {
                log::warn!("call setup to {} failed", peer);
                CallState::Failed
            }
        };
        if let Some(session) = guard.as_mut() {
            session.state = outcome;
        }
        setup
    }

    /// Accepts an inbound offer. An offer while a session already exists
    /// is a signaling-state violation: the session is marked failed and
    /// the frame dropped, nothing else is torn down.
    pub async fn handle_offer(
        &self,
        from: &UserId,
        offer: &Value,
        is_video: bool,
    ) -> Result<(), CallError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            log::warn!("offer from {} while in call with {}", from, session.peer);
            session.state = CallState::Failed;
            return Err(CallError::SignalingState);
        }
        let mut session = Session::new(from.clone(), CallState::Incoming, is_video);
        let setup = async {
            self.media.acquire(is_video).await?;
            self.media.set_remote_description(offer).await?;
            let answer = self.media.create_answer().await?;
            self.signals.send_answer(from, answer).await
        }
        .await;
        match setup {
            Ok(()) => {
                session.remote_description_set = true;
                session.state = CallState::Connecting;
            }
            Err(_) => {
                log::warn!("accepting call from {} failed", from);
                // No call was ever surfaced on this side, so nothing
                // would prompt a hangup later; release media now.
                self.media.close().await;
                session.state = CallState::Failed;
            }
        }
        *guard = Some(session);
        setup
    }

    /// Caller side: the peer picked up. Applies the answer and drains
    /// every buffered candidate, oldest first, exactly once.
    pub async fn handle_answer(&self, from: &UserId, answer: &Value) -> Result<(), CallError> {
        let mut guard = self.session.lock().await;
        let session = match guard.as_mut() {
            Some(session) if &session.peer == from && session.state == CallState::Ringing => {
                session
            }
            Some(session) => {
                log::warn!("unexpected answer from {}", from);
                session.state = CallState::Failed;
                return Err(CallError::SignalingState);
            }
            None => {
                log::warn!("answer from {} without a session", from);
                return Err(CallError::SignalingState);
            }
        };
        if let Err(err) = self.media.set_remote_description(answer).await {
            session.state = CallState::Failed;
            return Err(err);
        }
        session.remote_description_set = true;
        session.state = CallState::Connecting;
        while let Some(candidate) = session.pending_candidates.pop_front() {
            if let Err(err) = self.media.add_ice_candidate(&candidate).await {
                log::warn!("buffered candidate rejected: {}", err);
            }
        }
        Ok(())
    }

    /// Remote candidate: applied directly once the remote description is
    /// in place, parked in the session buffer until then.
    pub async fn handle_candidate(&self, from: &UserId, candidate: &Value) -> Result<(), CallError> {
        let mut guard = self.session.lock().await;
        let session = match guard.as_mut() {
            Some(session) if &session.peer == from => session,
            _ => {
                log::debug!("candidate from {} without a session, dropped", from);
                return Ok(());
            }
        };
        if session.remote_description_set {
            self.media.add_ice_candidate(candidate).await?;
        } else {
            if session.pending_candidates.len() >= MAX_PENDING_CANDIDATES {
                log::warn!("candidate buffer full for call with {}", from);
                session.pending_candidates.pop_front();
            }
            session.pending_candidates.push_back(candidate.clone());
        }
        Ok(())
    }

    /// Locally gathered candidate from the media layer, forwarded to
    /// the peer. Dropped when no call is up.
    pub async fn local_candidate(&self, candidate: Value) -> Result<(), CallError> {
        let guard = self.session.lock().await;
        let Some(session) = guard.as_ref() else {
            log::debug!("local candidate without a session, dropped");
            return Ok(());
        };
        self.signals.send_candidate(&session.peer, candidate).await
    }

    /// ICE reports the pair as connected.
    pub async fn connection_established(&self) {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            session.state = CallState::Connected;
            session.connected_at_ms = Some(now_ms());
            log::info!("call with {} connected", session.peer);
        }
    }

    /// ICE reports disconnected/failed. Surfaced as state only; the
    /// session stays up so the UI decides whether to end it.
    pub async fn connection_lost(&self) {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            log::warn!("call with {} lost connectivity", session.peer);
            session.state = CallState::Failed;
        }
    }

    /// Local hangup: release media synchronously, tell the peer, back to
    /// idle.
    pub async fn end_call(&self) -> Result<(), CallError> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.take() else {
            return Ok(());
        };
        self.media.close().await;
        self.signals.send_end(&session.peer).await?;
        Ok(())
    }

    /// The peer hung up.
    pub async fn handle_remote_end(&self, from: &UserId) {
        let mut guard = self.session.lock().await;
        match guard.as_ref() {
            Some(session) if &session.peer == from => {
                self.media.close().await;
                *guard = None;
            }
            _ => log::debug!("stale call_ended from {}", from),
        }
    }
}
