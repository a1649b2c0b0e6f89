//! Nullable wallet connector: connect and disconnect on command.

use soldash_types::Address;
use soldash_wallet_core::WalletConnector;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct ConnectorState {
    address: Option<Address>,
    can_sign: bool,
}

/// A wallet connector driven by the test (or the demo shell).
#[derive(Debug, Default)]
pub struct NullConnector {
    state: Mutex<ConnectorState>,
}

impl NullConnector {
    fn state(&self) -> MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A disconnected connector.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector already connected to `address` with signing enabled.
    pub fn connected(address: Address) -> Self {
        let connector = Self::new();
        connector.connect(address);
        connector
    }

    /// Connect `address` with signing enabled.
    pub fn connect(&self, address: Address) {
        let mut state = self.state();
        state.address = Some(address);
        state.can_sign = true;
    }

    pub fn disconnect(&self) {
        let mut state = self.state();
        state.address = None;
        state.can_sign = false;
    }

    pub fn set_can_sign(&self, can_sign: bool) {
        self.state().can_sign = can_sign;
    }
}

impl WalletConnector for NullConnector {
    fn is_connected(&self) -> bool {
        self.state().address.is_some()
    }

    fn address(&self) -> Option<Address> {
        self.state().address.clone()
    }

    fn can_sign(&self) -> bool {
        let state = self.state();
        state.address.is_some() && state.can_sign
    }
}
