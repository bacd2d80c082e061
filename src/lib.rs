//! Host Crab
//!
//! A directory service for bare-metal cluster provisioning. Keeps the canonical identity of
//! every machine (name, network interfaces, IP bindings) and answers DNS queries about them
//! authoritatively.
//!
//! * [`nodeset`] parses, folds and combines cluster node range expressions like `cpn-k[01-16]`.
//! * [`host_store`] holds the hosts and resolves names and addresses from them.
//! * [`dns`] serves `A` and `PTR` answers from the host store.
//! * [`api`] lets provisioning tools add and query hosts over HTTP.
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod dns;
pub mod error;
pub mod host;
pub mod host_store;
pub mod nodeset;

use crate::host_store::{file, memory};
pub use api::new as new_http;
pub use config::{Config, Shared};
pub use dns::new as new_dns;
pub use file::FileHostStore;
pub use host::{Host, Interface};
pub use memory::InMemoryHostStore;
pub use nodeset::NodeSet;
