//! Host directory storage.
//!
//! The host store is the single source of truth for host identity. The [HTTP API][crate::api]
//! writes hosts into it in batches and both the API and the [DNS server][crate::dns] read from
//! it.
//!
//! Two implementations are provided, [`memory::InMemoryHostStore`] and [`file::FileHostStore`].
//! The former is not durable across restarts. The latter will write its state to disk for each
//! batch and load this state again on startup.
//!
//! Consumers share a store through a [`DynHostStore`]. Lookups take the read lock and may run
//! concurrently; [`HostStore::store_hosts`] takes the write lock, so a reader sees a batch
//! either entirely or not at all.

use crate::error::Error;
use crate::host::Host;
use crate::nodeset::NodeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileHostStore;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryHostStore;

/// `DynHostStore` is a type alias for a [`HostStore`] that can be used by multiple read/write
/// consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the [`HostStore`].
#[allow(clippy::module_name_repetitions)]
pub type DynHostStore = Arc<RwLock<dyn HostStore + Send + Sync>>;

/// An async trait describing the host directory: batched upserts, snapshots, nodeset filtered
/// queries, and the forward and reverse name mappings derived from host interfaces.
///
/// Lookups that find nothing return an empty `Vec`, never an error.
#[async_trait::async_trait]
pub trait HostStore {
    /// Validate and upsert a batch of hosts, replacing stored hosts of the same name. Either
    /// every host in the batch is stored or none is.
    async fn store_hosts(&mut self, hosts: Vec<Host>) -> Result<(), Error>;

    /// All hosts, ordered by name.
    async fn hosts(&self) -> Result<Vec<Host>, Error>;

    /// Hosts whose name is in `nodes`, in the iteration order of `nodes`. Names without a
    /// stored host are skipped.
    async fn find_hosts(&self, nodes: &NodeSet) -> Result<Vec<Host>, Error>;

    /// Addresses of every interface whose FQDN matches `fqdn`, ignoring case and a trailing dot.
    async fn resolve_ipv4(&self, fqdn: &str) -> Result<Vec<Ipv4Addr>, Error>;

    /// FQDNs of every interface bound to the dotted-decimal address `ip`.
    async fn reverse_resolve(&self, ip: &str) -> Result<Vec<String>, Error>;
}
