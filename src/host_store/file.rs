//! A JSON file-backed implementation of the [`HostStore`][super::HostStore] trait.
//!
//! Wraps a [`InMemoryHostStore`][super::memory::InMemoryHostStore] instance, persisting
//! each batch to a JSON file on disk that can be reloaded across restarts.
use crate::error::Error;
use crate::host::{validate_batch, Host};
use crate::host_store::memory::InMemoryHostStore;
use crate::host_store::HostStore;
use crate::nodeset::NodeSet;
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// A file-backed host directory. Each batch is written to disk before it becomes visible in
/// memory, so a failed write leaves both the file and the in-memory state as they were.
///
/// Wraps a [`InMemoryHostStore`][super::memory::InMemoryHostStore], operating the same way except
/// for maintaining state beyond in-memory.
#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileHostStore {
    host_store: InMemoryHostStore,
    path: String,
}

impl FileHostStore {
    /// Load a [`FileHostStore`] from the JSON host state located at the given path, or return
    /// an Error. A missing file is created holding an empty directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the JSON state file is invalid.
    ///
    /// Returns [`Error::IO`] if the path can't be opened or read.
    pub async fn try_from_file(p: &str) -> Result<Self, Error> {
        let contents = match File::open(p).await {
            Ok(mut f) => {
                let mut buf = vec![];
                f.read_to_end(&mut buf).await?;
                buf
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    Self::write_state(p, &InMemoryHostStore::default()).await?;
                    return Ok(Self {
                        path: p.to_string(),
                        host_store: InMemoryHostStore::default(),
                    });
                }
                _ => return Err(Error::IO(err)),
            },
        };

        let host_store: InMemoryHostStore = serde_json::from_slice(&contents)?;
        Ok(Self {
            path: p.to_string(),
            host_store,
        })
    }

    /// Write `state` next to `path` and rename it into place.
    ///
    /// Returns [`Error::InvalidJSON`] if a host can't be serialized and [`Error::Storage`] if
    /// the file can't be written.
    async fn write_state(path: &str, state: &InMemoryHostStore) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(state)?;
        let staging = format!("{path}.tmp");
        let mut output_file = File::create(&staging).await.map_err(Error::Storage)?;
        output_file
            .write_all(data.as_bytes())
            .await
            .map_err(Error::Storage)?;
        output_file.sync_all().await.map_err(Error::Storage)?;
        fs::rename(&staging, path).await.map_err(Error::Storage)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl HostStore for FileHostStore {
    async fn store_hosts(&mut self, hosts: Vec<Host>) -> Result<(), Error> {
        validate_batch(&hosts)?;
        let mut next = self.host_store.clone();
        next.upsert(hosts);
        Self::write_state(&self.path, &next).await?;
        self.host_store = next;
        tracing::debug!(path = %self.path, "saved host store");
        Ok(())
    }

    async fn hosts(&self) -> Result<Vec<Host>, Error> {
        self.host_store.hosts().await
    }

    async fn find_hosts(&self, nodes: &NodeSet) -> Result<Vec<Host>, Error> {
        self.host_store.find_hosts(nodes).await
    }

    async fn resolve_ipv4(&self, fqdn: &str) -> Result<Vec<Ipv4Addr>, Error> {
        self.host_store.resolve_ipv4(fqdn).await
    }

    async fn reverse_resolve(&self, ip: &str) -> Result<Vec<String>, Error> {
        self.host_store.reverse_resolve(ip).await
    }
}
