//! Account directory boundary.
//!
//! Account records are owned by an upstream identity system; this service
//! only needs to write back facts it has proven, currently the phone number
//! confirmed by an SMS round trip. The trait keeps that seam narrow.

use dashmap::DashMap;
use fides_core::normalize_identity;

pub trait AccountDirectory: Send + Sync {
    /// Bind a verified phone number to the account behind `email`,
    /// replacing any previous binding.
    fn bind_phone(&self, email: &str, phone: &str);

    fn phone_of(&self, email: &str) -> Option<String>;
}

/// Directory held in process memory, used in development and tests.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    phones: DashMap<String, String>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountDirectory for InMemoryAccounts {
    fn bind_phone(&self, email: &str, phone: &str) {
        let email = normalize_identity(email);
        tracing::info!(email = %email, "Verified phone bound to account");
        self.phones.insert(email, phone.to_string());
    }

    fn phone_of(&self, email: &str) -> Option<String> {
        self.phones
            .get(&normalize_identity(email))
            .map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_and_reads_back() {
        let accounts = InMemoryAccounts::new();
        assert!(accounts.phone_of("alice@example.com").is_none());

        accounts.bind_phone("alice@example.com", "+14155550123");
        assert_eq!(
            accounts.phone_of("alice@example.com").as_deref(),
            Some("+14155550123")
        );
    }

    #[test]
    fn rebinding_replaces_the_number() {
        let accounts = InMemoryAccounts::new();
        accounts.bind_phone("alice@example.com", "+14155550123");
        accounts.bind_phone("alice@example.com", "+442071234567");

        assert_eq!(
            accounts.phone_of("alice@example.com").as_deref(),
            Some("+442071234567")
        );
    }

    #[test]
    fn lookups_normalize_the_email() {
        let accounts = InMemoryAccounts::new();
        accounts.bind_phone("Alice@Example.COM", "+14155550123");

        assert_eq!(
            accounts.phone_of("  alice@example.com ").as_deref(),
            Some("+14155550123")
        );
    }
}
