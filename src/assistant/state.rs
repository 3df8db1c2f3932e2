//! Per-user conversation state for the admin flows.

use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingBroadcastTemplate,
    AwaitingChannelPostText,
}

/// In-memory only; pending flows are lost on restart. Idle users have no entry.
#[derive(Default)]
pub struct Conversations {
    states: Mutex<HashMap<i64, ConversationState>>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: i64) -> ConversationState {
        self.states.lock().await.get(&user_id).copied().unwrap_or_default()
    }

    pub async fn set(&self, user_id: i64, state: ConversationState) {
        let mut states = self.states.lock().await;
        if state == ConversationState::Idle {
            states.remove(&user_id);
        } else {
            states.insert(user_id, state);
        }
    }

    /// Reset to idle, returning what the state was.
    pub async fn take(&self, user_id: i64) -> ConversationState {
        self.states.lock().await.remove(&user_id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_is_idle() {
        let conversations = Conversations::new();
        assert_eq!(conversations.get(1).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_set_and_take() {
        let conversations = Conversations::new();
        conversations.set(1, ConversationState::AwaitingChannelPostText).await;
        assert_eq!(conversations.get(1).await, ConversationState::AwaitingChannelPostText);
        assert_eq!(conversations.get(2).await, ConversationState::Idle);

        assert_eq!(conversations.take(1).await, ConversationState::AwaitingChannelPostText);
        assert_eq!(conversations.take(1).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_new_state_replaces_old() {
        let conversations = Conversations::new();
        conversations.set(1, ConversationState::AwaitingBroadcastTemplate).await;
        conversations.set(1, ConversationState::AwaitingChannelPostText).await;
        assert_eq!(conversations.get(1).await, ConversationState::AwaitingChannelPostText);

        conversations.set(1, ConversationState::Idle).await;
        assert_eq!(conversations.get(1).await, ConversationState::Idle);
    }
}
