pub mod history_tests;

use crate::calls::{MediaSession, SignalSink};
use crate::error::CallError;
use async_trait::async_trait;
use serde_json::{json, Value};
use sotto_api::types::UserId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn user(value: &str) -> UserId {
    UserId::new(value)
}

/// Scriptable media backend: records every call, optionally fails
/// acquisition.
#[derive(Default)]
pub struct MockMedia {
    pub fail_acquire: AtomicBool,
    pub fail_answer: AtomicBool,
    pub log: Mutex<Vec<String>>,
    pub applied_candidates: Mutex<Vec<Value>>,
}

impl MockMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: &str) {
        self.log.lock().unwrap().push(entry.to_string());
    }
}

#[async_trait]
impl MediaSession for MockMedia {
    async fn acquire(&self, video: bool) -> Result<(), CallError> {
        self.record(&format!("acquire video={video}"));
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(CallError::Media);
        }
        Ok(())
    }

    async fn create_offer(&self) -> Result<Value, CallError> {
        self.record("create_offer");
        Ok(json!({"type": "offer", "sdp": "mock"}))
    }

    async fn create_answer(&self) -> Result<Value, CallError> {
        self.record("create_answer");
        if self.fail_answer.load(Ordering::SeqCst) {
            return Err(CallError::Media);
        }
        Ok(json!({"type": "answer", "sdp": "mock"}))
    }

    async fn set_remote_description(&self, description: &Value) -> Result<(), CallError> {
        self.record(&format!("set_remote_description {description}"));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: &Value) -> Result<(), CallError> {
        self.record("add_ice_candidate");
        self.applied_candidates.lock().unwrap().push(candidate.clone());
        Ok(())
    }

    async fn close(&self) {
        self.record("close");
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SentFrame {
    Offer { to: UserId, is_video: bool },
    Answer { to: UserId },
    Candidate { to: UserId, candidate: Value },
    End { to: UserId },
}

#[derive(Default)]
pub struct MockSink {
    pub frames: Mutex<Vec<SentFrame>>,
}

impl MockSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<SentFrame> {
        self.frames.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalSink for MockSink {
    async fn send_offer(
        &self,
        to: &UserId,
        _offer: Value,
        is_video: bool,
    ) -> Result<(), CallError> {
        self.frames.lock().unwrap().push(SentFrame::Offer {
            to: to.clone(),
            is_video,
        });
        Ok(())
    }

    async fn send_answer(&self, to: &UserId, _answer: Value) -> Result<(), CallError> {
        self.frames
            .lock()
            .unwrap()
            .push(SentFrame::Answer { to: to.clone() });
        Ok(())
    }

    async fn send_candidate(&self, to: &UserId, candidate: Value) -> Result<(), CallError> {
        self.frames.lock().unwrap().push(SentFrame::Candidate {
            to: to.clone(),
            candidate,
        });
        Ok(())
    }

    async fn send_end(&self, to: &UserId) -> Result<(), CallError> {
        self.frames
            .lock()
            .unwrap()
            .push(SentFrame::End { to: to.clone() });
        Ok(())
    }
}
