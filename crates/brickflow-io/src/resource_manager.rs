//! Byte-budget gating for accessor calls.
//!
//! Mirrors the purpose of a cluster-wide resource manager client: bound
//! how many bytes of in-flight volume data a process may request at
//! once, so a burst of large fetches doesn't exhaust memory or flood a
//! remote service. There is no cluster here, so the budget is local to
//! one process and held behind a `parking_lot::Mutex`.

use brickflow_core::{Error, Result};
use parking_lot::Mutex;

/// Tracks in-flight byte usage against a fixed total budget.
pub struct ResourceManagerClient {
    total_budget_bytes: u64,
    in_use_bytes: Mutex<u64>,
}

impl ResourceManagerClient {
    #[must_use]
    pub fn new(total_budget_bytes: u64) -> Self {
        Self {
            total_budget_bytes,
            in_use_bytes: Mutex::new(0),
        }
    }

    /// A client with no effective budget; every request is admitted.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    #[must_use]
    pub fn total_budget_bytes(&self) -> u64 {
        self.total_budget_bytes
    }

    #[must_use]
    pub fn in_use_bytes(&self) -> u64 {
        *self.in_use_bytes.lock()
    }

    /// Run `body` while `bytes` are reserved against the budget.
    ///
    /// If `bytes` alone exceeds the total budget this is a permanent
    /// [`Error::ContractViolation`] (the request can never be admitted,
    /// no matter how much capacity frees up). If the budget is merely
    /// busy right now, this returns [`Error::Transient`] so the caller's
    /// retry policy backs off and tries again rather than blocking the
    /// calling thread.
    ///
    /// # Errors
    /// See above; also propagates any error `body` returns.
    pub fn access<T>(&self, bytes: u64, body: impl FnOnce() -> Result<T>) -> Result<T> {
        if bytes > self.total_budget_bytes {
            return Err(Error::ContractViolation(format!(
                "requested {bytes} bytes exceeds total resource budget of {}",
                self.total_budget_bytes
            )));
        }
        {
            let mut in_use = self.in_use_bytes.lock();
            if *in_use + bytes > self.total_budget_bytes {
                return Err(Error::Transient(format!(
                    "resource budget busy: {in_use} + {bytes} > {}",
                    self.total_budget_bytes
                )));
            }
            *in_use += bytes;
        }
        let result = body();
        *self.in_use_bytes.lock() -= bytes;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_request_within_budget_and_releases_after() {
        let client = ResourceManagerClient::new(1024);
        let result = client.access(512, || Ok::<_, Error>(7));
        assert_eq!(result.unwrap(), 7);
        assert_eq!(client.in_use_bytes(), 0);
    }

    #[test]
    fn oversized_request_is_a_contract_violation() {
        let client = ResourceManagerClient::new(100);
        let result = client.access::<()>(200, || Ok(()));
        assert!(matches!(result, Err(Error::ContractViolation(_))));
    }

    #[test]
    fn busy_budget_is_transient() {
        let client = ResourceManagerClient::new(100);
        let result = client.access::<()>(50, || {
            let inner = client.access::<()>(60, || Ok(()));
            assert!(matches!(inner, Err(Error::Transient(_))));
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(client.in_use_bytes(), 0);
    }

    #[test]
    fn releases_budget_even_when_body_errors() {
        let client = ResourceManagerClient::new(100);
        let result = client.access::<()>(50, || Err(Error::ContractViolation("boom".into())));
        assert!(result.is_err());
        assert_eq!(client.in_use_bytes(), 0);
    }

    #[test]
    fn unlimited_client_admits_everything() {
        let client = ResourceManagerClient::unlimited();
        assert!(client.access::<()>(u64::MAX / 2, || Ok(())).is_ok());
    }
}
