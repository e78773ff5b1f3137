//! Token-based session registry.
//!
//! Stands in for the external auth collaborator: the web layer only ever asks
//! "who does this token belong to" and receives `Some(Recipient)` or `None`.
//! Accounts and sessions live in memory and are lost on restart, like every
//! other piece of connection state in this system.

use dashmap::DashMap;
use events::{Recipient, Role, UserId};
use log::*;
use password_auth::{generate_hash, verify_password};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Account {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    password_hash: String,
}

struct SessionEntry {
    recipient: Recipient,
    expires_at: Instant,
}

pub struct SessionRegistry {
    /// Keyed by email, the login credential.
    accounts: DashMap<String, Account>,
    /// Keyed by bearer token.
    sessions: DashMap<String, SessionEntry>,
    expiry: Duration,
}

impl SessionRegistry {
    pub fn new(expiry: Duration) -> Self {
        Self {
            accounts: DashMap::new(),
            sessions: DashMap::new(),
            expiry,
        }
    }

    pub fn add_account(
        &self,
        id: impl Into<UserId>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        password: &str,
    ) {
        let email = email.into();
        let account = Account {
            id: id.into(),
            email: email.clone(),
            display_name: display_name.into(),
            role,
            password_hash: generate_hash(password),
        };
        self.accounts.insert(email, account);
    }

    /// Verify credentials and mint a session token.
    pub fn login(&self, email: &str, password: &str) -> Option<(String, Recipient)> {
        let account = self.accounts.get(email)?;
        if verify_password(password, &account.password_hash).is_err() {
            info!("rejected login for {email}");
            return None;
        }

        let token = Uuid::new_v4().to_string();
        let recipient = Recipient::new(account.id.clone(), account.role);
        self.sessions.insert(
            token.clone(),
            SessionEntry {
                recipient: recipient.clone(),
                expires_at: Instant::now() + self.expiry,
            },
        );
        debug!("issued session for user {}", recipient.id);
        Some((token, recipient))
    }

    /// Resolve a token to its recipient, expiring stale sessions on the way.
    pub fn resolve(&self, token: &str) -> Option<Recipient> {
        let expired = match self.sessions.get(token) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.recipient.clone())
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(token);
        }
        None
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        registry.add_account("u-1", "ada@example.com", "Ada", Role::Admin, "hunter2");
        registry
    }

    #[test]
    fn login_issues_a_resolvable_token() {
        let registry = registry();
        let (token, recipient) = registry.login("ada@example.com", "hunter2").unwrap();
        assert_eq!(recipient.id, "u-1");
        assert_eq!(registry.resolve(&token), Some(recipient));
    }

    #[test]
    fn wrong_password_or_unknown_email_is_rejected() {
        let registry = registry();
        assert!(registry.login("ada@example.com", "hunter3").is_none());
        assert!(registry.login("nobody@example.com", "hunter2").is_none());
    }

    #[test]
    fn revoked_tokens_stop_resolving() {
        let registry = registry();
        let (token, _) = registry.login("ada@example.com", "hunter2").unwrap();
        assert!(registry.revoke(&token));
        assert!(!registry.revoke(&token));
        assert_eq!(registry.resolve(&token), None);
    }

    #[test]
    fn expired_sessions_are_dropped_on_resolve() {
        let registry = SessionRegistry::new(Duration::ZERO);
        registry.add_account("u-1", "ada@example.com", "Ada", Role::User, "hunter2");
        let (token, _) = registry.login("ada@example.com", "hunter2").unwrap();
        assert_eq!(registry.resolve(&token), None);
    }
}
