//! Session tokens and nickname validation.

use std::{
    collections::{HashMap, VecDeque},
    sync::RwLock,
};
use tripledice_execution::Error;
use tripledice_types::game::{MAX_NICKNAME_LENGTH, MIN_NICKNAME_LENGTH};
use uuid::Uuid;

/// Default number of live sessions before the oldest are evicted.
pub const MAX_SESSIONS: usize = 100_000;

#[derive(Default)]
struct Registry {
    tokens: HashMap<String, String>,
    /// Issue order, oldest first
    order: VecDeque<String>,
}

/// Opaque bearer tokens mapped to the uid they were issued for.
///
/// Bounded: once `capacity` sessions exist, issuing a new one evicts the oldest.
pub struct Sessions {
    registry: RwLock<Registry>,
    capacity: usize,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            capacity: capacity.max(1),
        }
    }

    /// Issue a token for `uid`, minting an anonymous uid when none is given.
    pub fn issue(&self, uid: Option<String>) -> (String, String) {
        let uid = uid
            .filter(|uid| !uid.trim().is_empty())
            .unwrap_or_else(|| {
                let id = Uuid::new_v4().simple().to_string();
                format!("user_{}", &id[..8])
            });
        let token = hex::encode(rand::random::<[u8; 16]>());

        match self.registry.write() {
            Ok(mut registry) => {
                while registry.order.len() >= self.capacity {
                    let Some(oldest) = registry.order.pop_front() else {
                        break;
                    };
                    registry.tokens.remove(&oldest);
                }
                registry.tokens.insert(token.clone(), uid.clone());
                registry.order.push_back(token.clone());
            }
            Err(e) => tracing::error!("Failed to acquire write lock in issue: {}", e),
        }
        (token, uid)
    }

    pub fn resolve(&self, token: &str) -> Option<String> {
        match self.registry.read() {
            Ok(registry) => registry.tokens.get(token).cloned(),
            Err(e) => {
                tracing::error!("Failed to acquire read lock in resolve: {}", e);
                None
            }
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        match self.registry.read() {
            Ok(registry) => registry.tokens.len(),
            Err(e) => {
                tracing::error!("Failed to acquire read lock in len: {}", e);
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hangul syllables block
fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Trim and check a requested nickname: 2-12 characters of ASCII letters, digits, `_`, or
/// Hangul syllables. The allowed set has no markup characters, so no escaping is needed.
pub fn validate_nickname(raw: &str) -> Result<String, Error> {
    let nickname = raw.trim();
    let length = nickname.chars().count();
    let allowed = nickname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || is_hangul_syllable(c));

    if !(MIN_NICKNAME_LENGTH..=MAX_NICKNAME_LENGTH).contains(&length) || !allowed {
        return Err(Error::InvalidInput(format!(
            "nickname must be {MIN_NICKNAME_LENGTH}-{MAX_NICKNAME_LENGTH} letters, digits, or underscores"
        )));
    }
    Ok(nickname.to_string())
}
