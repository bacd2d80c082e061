use crate::error::Error;
use crate::host::Host;
use crate::host_store::{DynHostStore, FileHostStore, HostStore, InMemoryHostStore};
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub type Shared = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub host_store_state_path: Option<String>,
    pub static_hosts_path: Option<String>,
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    pub dns_udp_bind_addr: SocketAddr,
    pub dns_tcp_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub dns_tcp_timeout: Duration,
    #[serde(default = "default_dns_ttl")]
    pub dns_ttl: u32,
}

fn default_dns_ttl() -> u32 {
    3600
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Config {
    /// Load and check a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] or [`Error::InvalidJSON`] if the file can't be read or parsed, and
    /// [`Error::InsecureAPIBind`] if the API would listen on a public address.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.bind_addr_is_secure()?;
        Ok(conf)
    }

    /// Build the host store described by this config: file-backed when
    /// [`Config::host_store_state_path`] is set, in-memory otherwise. When
    /// [`Config::static_hosts_path`] is set its hosts are stored as one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file or static hosts file can't be loaded, or if the
    /// static hosts fail validation.
    pub async fn host_store(&self) -> Result<DynHostStore, Error> {
        let host_store: DynHostStore = match &self.host_store_state_path {
            Some(path) => Arc::new(RwLock::new(FileHostStore::try_from_file(path).await?)),
            None => Arc::new(RwLock::new(InMemoryHostStore::default())),
        };

        if let Some(path) = &self.static_hosts_path {
            let hosts = Self::static_hosts(path)?;
            tracing::info!("loading {} static hosts from {path}", hosts.len());
            host_store.write().await.store_hosts(hosts).await?;
        }
        Ok(host_store)
    }

    fn static_hosts(p: impl AsRef<Path>) -> Result<Vec<Host>, Error> {
        let reader = BufReader::new(File::open(p)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}
