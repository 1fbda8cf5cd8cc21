//! Authentication gate.
//!
//! Decides, per instruction, whether dispatch may proceed and which numeric
//! identity gets injected. Credential verification and password hashing are
//! delegated to the identity store; this gate forwards the pair at most once
//! per request and never keeps secrets.

use std::sync::Arc;
use tracing::warn;

use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::DispatchContext;
use crate::store::{UserId, VehicleStore};

pub struct AuthGate {
    store: Arc<dyn VehicleStore>,
}

impl AuthGate {
    pub fn new(store: Arc<dyn VehicleStore>) -> Self {
        Self { store }
    }

    /// Resolve the caller's identity for an auth-required command.
    ///
    /// The first successful verification is cached in the context, so a
    /// script expanding into many auth-required instructions hits the store
    /// once. Missing credentials fail with `AuthRequired`, rejected ones
    /// with `BadCredentials`; neither reaches a handler.
    pub fn authorize(&self, ctx: &mut DispatchContext) -> Result<UserId> {
        if let Some(identity) = ctx.identity() {
            return Ok(identity);
        }

        let Some((login, password)) = ctx.credentials() else {
            warn!("auth-required command without credentials");
            return Err(ProtocolError::AuthRequired);
        };

        match self.store.verify_login(login, password)? {
            Some(identity) => {
                ctx.set_identity(identity);
                Ok(identity)
            }
            None => {
                warn!(login, "incorrect login or password");
                Err(ProtocolError::BadCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn absent_credentials_fail_before_the_store_is_consulted() {
        let gate = AuthGate::new(Arc::new(MemoryStore::new()));
        let mut ctx = DispatchContext::new();
        assert!(matches!(
            gate.authorize(&mut ctx),
            Err(ProtocolError::AuthRequired)
        ));
    }

    #[test]
    fn rejected_credentials_are_distinct_from_absent_ones() {
        let store = Arc::new(MemoryStore::new());
        store.create_user("clay", "secret").unwrap();
        let gate = AuthGate::new(store);

        let mut ctx = DispatchContext::new().with_credentials("clay", "wrong");
        assert!(matches!(
            gate.authorize(&mut ctx),
            Err(ProtocolError::BadCredentials)
        ));
    }

    #[test]
    fn verified_identity_is_cached_for_the_request() {
        let store = Arc::new(MemoryStore::new());
        let id = store.create_user("clay", "secret").unwrap();
        let gate = AuthGate::new(store);

        let mut ctx = DispatchContext::new().with_credentials("clay", "secret");
        assert_eq!(gate.authorize(&mut ctx).unwrap(), id);
        assert_eq!(ctx.identity(), Some(id));
        // Second call short-circuits on the cached identity.
        assert_eq!(gate.authorize(&mut ctx).unwrap(), id);
    }
}
