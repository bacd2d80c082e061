//! Provisioned host records.
//!
//! Fields other than the ones modelled here (boot image, firmware, provisioning flags, ...)
//! belong to external callers. They are kept as opaque JSON and written back unchanged.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// A provisioned machine, identified by its unique cluster node name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Host {
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// A single network attachment of a [`Host`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Interface {
    pub mac: String,
    pub ip: Ipv4Addr,
    pub fqdn: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Host {
    /// A host with no metadata.
    pub fn new(name: impl Into<String>, interfaces: Vec<Interface>) -> Self {
        Host {
            name: name.into(),
            interfaces,
            metadata: Map::default(),
        }
    }
}

impl Interface {
    /// An interface with no metadata.
    pub fn new(mac: impl Into<String>, ip: Ipv4Addr, fqdn: impl Into<String>) -> Self {
        Interface {
            mac: mac.into(),
            ip,
            fqdn: fqdn.into(),
            metadata: Map::default(),
        }
    }

    /// Whether this interface answers for `fqdn`, ignoring case and a trailing root dot.
    #[must_use]
    pub fn serves(&self, fqdn: &str) -> bool {
        trim_root(&self.fqdn).eq_ignore_ascii_case(trim_root(fqdn))
    }
}

fn trim_root(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Check a batch of hosts before anything is written.
///
/// # Errors
///
/// Returns [`Error::InvalidHost`] for the first host that has an empty name, a name with
/// leading or trailing whitespace, no interfaces, a malformed MAC address, or a name or MAC
/// already used earlier in the batch. Hosts with an empty name are identified by their
/// position, e.g. `#2`.
pub fn validate_batch(hosts: &[Host]) -> Result<(), Error> {
    let mut names: HashSet<&str> = HashSet::with_capacity(hosts.len());
    let mut macs: HashSet<String> = HashSet::new();

    for (index, host) in hosts.iter().enumerate() {
        let name = host.name.trim();
        let invalid = |reason: String| {
            let host = if name.is_empty() {
                format!("#{index}")
            } else {
                name.to_string()
            };
            Error::InvalidHost { host, reason }
        };

        if name.is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if name != host.name {
            return Err(invalid(
                "name must not have surrounding whitespace".to_string(),
            ));
        }
        if host.interfaces.is_empty() {
            return Err(invalid("at least one interface is required".to_string()));
        }
        if !names.insert(name) {
            return Err(invalid("duplicate name in batch".to_string()));
        }

        for interface in &host.interfaces {
            let mac = normalize_mac(&interface.mac)
                .ok_or_else(|| invalid(format!("invalid MAC address \"{}\"", interface.mac)))?;
            if !macs.insert(mac) {
                return Err(invalid(format!(
                    "duplicate MAC address \"{}\" in batch",
                    interface.mac
                )));
            }
        }
    }
    Ok(())
}

/// Lower-case, colon separated form of a six octet MAC address written with `:` or `-`.
fn normalize_mac(mac: &str) -> Option<String> {
    let separator = if mac.contains('-') { '-' } else { ':' };
    let octets: Vec<&str> = mac.split(separator).collect();
    let well_formed = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()));
    well_formed.then(|| octets.join(":").to_ascii_lowercase())
}
