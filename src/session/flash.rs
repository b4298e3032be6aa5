//! Flash messages: values that live until the next request boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FlashMessage {
    value: String,
    remove: bool,
}

/// Flash messages stored in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessages {
    messages: BTreeMap<String, FlashMessage>,
}

impl FlashMessages {
    /// Store `message` under `key`; it survives the current request boundary.
    pub fn set(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.messages.insert(
            key.into(),
            FlashMessage {
                value: message.into(),
                remove: false,
            },
        );
    }

    /// Read a message and mark it for removal at the end of this request.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let message = self.messages.get_mut(key)?;
        message.remove = true;
        Some(message.value.clone())
    }

    /// Mark every message for removal.
    pub fn mark_all(&mut self) {
        for message in self.messages.values_mut() {
            message.remove = true;
        }
    }

    /// Drop messages marked for removal.
    pub fn sweep(&mut self) {
        self.messages.retain(|_, m| !m.remove);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
