use crate::error::Error;
use crate::host::{validate_batch, Host, Interface};
use crate::host_store::HostStore;
use crate::nodeset::NodeSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryHostStore {
    hosts: BTreeMap<String, Host>,
}

impl InMemoryHostStore {
    /// Insert already validated hosts, replacing any stored host of the same name.
    pub(super) fn upsert(&mut self, hosts: Vec<Host>) {
        for host in hosts {
            self.hosts.insert(host.name.clone(), host);
        }
    }

    fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.hosts.values().flat_map(|host| host.interfaces.iter())
    }
}

#[async_trait::async_trait]
impl HostStore for InMemoryHostStore {
    async fn store_hosts(&mut self, hosts: Vec<Host>) -> Result<(), Error> {
        validate_batch(&hosts)?;
        self.upsert(hosts);
        Ok(())
    }

    async fn hosts(&self) -> Result<Vec<Host>, Error> {
        Ok(self.hosts.values().cloned().collect())
    }

    async fn find_hosts(&self, nodes: &NodeSet) -> Result<Vec<Host>, Error> {
        Ok(nodes
            .iter()
            .filter_map(|name| self.hosts.get(name))
            .cloned()
            .collect())
    }

    async fn resolve_ipv4(&self, fqdn: &str) -> Result<Vec<Ipv4Addr>, Error> {
        Ok(self
            .interfaces()
            .filter(|interface| interface.serves(fqdn))
            .map(|interface| interface.ip)
            .collect())
    }

    async fn reverse_resolve(&self, ip: &str) -> Result<Vec<String>, Error> {
        let ip: Ipv4Addr = ip
            .parse()
            .map_err(|_| Error::InvalidAddress(ip.to_string()))?;
        Ok(self
            .interfaces()
            .filter(|interface| interface.ip == ip)
            .map(|interface| interface.fqdn.clone())
            .collect())
    }
}
