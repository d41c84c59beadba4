//! # Core Logic - Client Rotator
//!
//! Round-robin rotation over one ledger client per RPC endpoint. Clients are
//! built eagerly so configuration mistakes surface at construction time
//! rather than at the first rotation.

use crate::config::{validate_rpc_url, Network};
use crate::error::ConfigError;
use crate::security::Credential;
use crate::traits::LedgerClient;

#[derive(Debug)]
pub struct ClientRotator<C> {
    network: Network,
    clients: Vec<C>,
    current_index: usize,
}

impl<C: LedgerClient> ClientRotator<C> {
    /// Build one client per URL through `connect`.
    ///
    /// Fails with [`ConfigError::MissingField`] when `rpc_urls` is empty and
    /// with [`ConfigError::InvalidRpcUrl`] for any URL that does not parse.
    pub fn new<F>(
        credential: &Credential,
        network: Network,
        rpc_urls: &[String],
        mut connect: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&Credential, Network, &str) -> Result<C, ConfigError>,
    {
        if rpc_urls.is_empty() {
            return Err(ConfigError::MissingField {
                field: "rpc_urls".to_string(),
            });
        }

        let clients = rpc_urls
            .iter()
            .map(|url| {
                validate_rpc_url(url)?;
                connect(credential, network, url)
            })
            .collect::<Result<Vec<C>, ConfigError>>()?;

        Ok(Self {
            network,
            clients,
            current_index: 0,
        })
    }

    /// Wrap clients that were already connected.
    pub fn from_clients(network: Network, clients: Vec<C>) -> Result<Self, ConfigError> {
        if clients.is_empty() {
            return Err(ConfigError::MissingField {
                field: "rpc_urls".to_string(),
            });
        }
        Ok(Self {
            network,
            clients,
            current_index: 0,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn current(&self) -> &C {
        &self.clients[self.current_index]
    }

    /// Advance to the next endpoint (wrapping) and return its client.
    pub fn rotate(&mut self) -> &C {
        self.current_index = (self.current_index + 1) % self.clients.len();
        &self.clients[self.current_index]
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn endpoints_count(&self) -> usize {
        self.clients.len()
    }

    pub fn urls(&self) -> Vec<&str> {
        self.clients.iter().map(|c| c.rpc_url()).collect()
    }
}
