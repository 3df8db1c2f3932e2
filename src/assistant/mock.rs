//! In-memory platform used by tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::assistant::platform::{
    MemberStatus, MessageRef, Outgoing, Platform, PlatformError, SendOutcome,
};

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message: Outgoing,
}

#[derive(Default)]
pub struct MockPlatform {
    sent: Mutex<Vec<SentMessage>>,
    unreachable: Mutex<HashSet<i64>>,
    statuses: Mutex<HashMap<i64, MemberStatus>>,
    copy_script: Mutex<HashMap<i64, VecDeque<SendOutcome>>>,
    copy_attempts: Mutex<Vec<i64>>,
    commands: Mutex<Vec<String>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership answer for `user_id`. Users without one get an API error.
    pub fn set_member_status(&self, user_id: i64, status: MemberStatus) {
        self.statuses.lock().unwrap().insert(user_id, status);
    }

    /// Every later `send` to `chat_id` fails with a request error.
    pub fn fail_sends_to(&self, chat_id: i64) {
        self.unreachable.lock().unwrap().insert(chat_id);
    }

    /// Outcomes returned, in order, for copies to `chat_id`. Once the script
    /// runs out every copy is delivered.
    pub fn script_copy(&self, chat_id: i64, outcomes: Vec<SendOutcome>) {
        self.copy_script.lock().unwrap().insert(chat_id, outcomes.into());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<Outgoing> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.message)
            .collect()
    }

    pub fn copy_attempts(&self) -> Vec<i64> {
        self.copy_attempts.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn send(&self, chat_id: i64, message: &Outgoing) -> Result<i64, PlatformError> {
        if self.unreachable.lock().unwrap().contains(&chat_id) {
            return Err(PlatformError::Request("Bad Gateway".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage { chat_id, message: message.clone() });
        Ok(sent.len() as i64)
    }

    async fn member_status(
        &self,
        _chat_id: i64,
        user_id: i64,
    ) -> Result<MemberStatus, PlatformError> {
        self.statuses
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .ok_or_else(|| PlatformError::Request("Bad Request: user not found".into()))
    }

    async fn copy_message(&self, to_chat_id: i64, _source: MessageRef) -> SendOutcome {
        let mut attempts = self.copy_attempts.lock().unwrap();
        attempts.push(to_chat_id);
        self.copy_script
            .lock()
            .unwrap()
            .get_mut(&to_chat_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(SendOutcome::Delivered(attempts.len() as i64))
    }

    async fn bot_username(&self) -> Result<String, PlatformError> {
        Ok("gift_test_bot".to_string())
    }

    async fn set_commands(&self, commands: &[(&str, &str)]) -> Result<(), PlatformError> {
        *self.commands.lock().unwrap() = commands.iter().map(|(c, _)| c.to_string()).collect();
        Ok(())
    }

    async fn drop_pending_updates(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}
