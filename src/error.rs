//! Error types.

use crate::nodeset::GrammarError;
use axum::extract::rejection::JsonRejection;
use std::net::IpAddr;
use trust_dns_proto::error::ProtoError;

/// Error enumerates the possible Host Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a [`NodeSet`][crate::nodeset::NodeSet] expression is malformed, e.g. in
    /// the path of the [`/hosts/{nodeset}` API endpoint][crate::api#hostsnodeset-get].
    #[error("invalid nodeset: {0}")]
    Grammar(#[from] GrammarError),

    /// Returned by [`HostStore::store_hosts`][crate::host_store::HostStore::store_hosts] when a
    /// host in the batch fails [validation][crate::host::validate_batch]. Nothing from the
    /// batch is stored.
    #[error("invalid host \"{host}\": {reason}")]
    InvalidHost { host: String, reason: String },

    /// Returned by [`HostStore::reverse_resolve`][crate::host_store::HostStore::reverse_resolve]
    /// when given something other than a dotted-decimal IPv4 address.
    #[error("invalid IPv4 address \"{0}\"")]
    InvalidAddress(String),

    /// Returned when the [`FileHostStore`][crate::host_store::file::FileHostStore] can't persist
    /// a batch. The batch is not applied.
    #[error("host store failure")]
    Storage(#[source] std::io::Error),

    /// Returned when clients `POST` invalid JSON.
    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),

    /// Returned when the [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`] is
    /// not a loopback address, or an address within a private network space. The
    /// [Host Crab HTTP API][crate::api] has no authentication of its own and is only meant to be
    /// reachable from the provisioning network.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(IpAddr),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g.
    /// [loading a `Config`][crate::config::Config::try_from_file], a static hosts file, or
    /// [loading a `FileHostStore`][crate::host_store::file::FileHostStore::try_from_file]) fails
    /// due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the Host Crab DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}
