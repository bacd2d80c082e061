use crate::config::Shared;
use crate::dns::handlers::Handler;
use crate::error::Error;
use crate::host_store::DynHostStore;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::instrument::WithSubscriber;
use tracing::{debug, warn, Dispatch};

/// Largest UDP datagram read from clients, enough for EDNS payloads.
const MAX_UDP_MESSAGE: usize = 4096;

/// The bound DNS listeners. Every message read from either transport is answered through
/// [`Handler::reply_to_bytes`], including messages with zero or several questions.
pub struct Server {
    udp: Arc<UdpSocket>,
    tcp: TcpListener,
    tcp_timeout: Duration,
    handler: Handler,
    diagnostics: Dispatch,
}

/// Bind the configured UDP and TCP listeners.
///
/// # Errors
///
/// Returns an error if either listener can't be bound.
pub async fn new(
    config: Shared,
    host_store: DynHostStore,
    diagnostics: Dispatch,
) -> anyhow::Result<Server> {
    let udp = UdpSocket::bind(config.dns_udp_bind_addr).await?;
    let tcp = TcpListener::bind(config.dns_tcp_bind_addr).await?;
    Ok(Server {
        udp: Arc::new(udp),
        tcp,
        tcp_timeout: config.dns_tcp_timeout,
        handler: Handler::new(&config, host_store, diagnostics.clone()),
        diagnostics,
    })
}

impl Server {
    /// # Errors
    ///
    /// Returns an error if the socket address can't be read.
    pub fn udp_local_addr(&self) -> io::Result<SocketAddr> {
        self.udp.local_addr()
    }

    /// # Errors
    ///
    /// Returns an error if the listener address can't be read.
    pub fn tcp_local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Serve both transports until one of the listeners fails.
    ///
    /// # Errors
    ///
    /// Returns the IO error that stopped the UDP socket or the TCP listener.
    pub async fn run(self) -> Result<(), Error> {
        let udp = serve_udp(self.udp, self.handler.clone(), self.diagnostics.clone());
        let tcp = serve_tcp(self.tcp, self.handler, self.tcp_timeout, self.diagnostics);
        tokio::try_join!(udp, tcp)?;
        Ok(())
    }
}

async fn serve_udp(
    socket: Arc<UdpSocket>,
    handler: Handler,
    diagnostics: Dispatch,
) -> io::Result<()> {
    let mut buf = vec![0; MAX_UDP_MESSAGE];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        let request = buf[..len].to_vec();
        let socket = socket.clone();
        let handler = handler.clone();
        tokio::spawn(
            async move {
                match handler.reply_to_bytes(&request).await {
                    Ok(Some(response)) => {
                        if let Err(err) = socket.send_to(&response, peer).await {
                            warn!(%peer, %err, "failed to send DNS response");
                        }
                    }
                    Ok(None) => {}
                    Err(err) => debug!(%peer, %err, "dropped unreadable DNS message"),
                }
            }
            .with_subscriber(diagnostics.clone()),
        );
    }
}

async fn serve_tcp(
    listener: TcpListener,
    handler: Handler,
    timeout: Duration,
    diagnostics: Dispatch,
) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let handler = handler.clone();
        tokio::spawn(
            async move {
                if let Err(err) = serve_connection(stream, &handler, timeout).await {
                    debug!(%peer, %err, "closed DNS TCP connection");
                }
            }
            .with_subscriber(diagnostics.clone()),
        );
    }
}

/// Answer length-prefixed messages on one connection until the client closes it or stays idle
/// for `timeout`.
async fn serve_connection(
    mut stream: TcpStream,
    handler: &Handler,
    timeout: Duration,
) -> Result<(), Error> {
    loop {
        let len = match tokio::time::timeout(timeout, stream.read_u16()).await {
            Err(_) => return Ok(()),
            Ok(Err(err)) if err.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Ok(result) => result?,
        };
        let mut request = vec![0; usize::from(len)];
        tokio::time::timeout(timeout, stream.read_exact(&mut request))
            .await
            .map_err(|_| io::Error::from(ErrorKind::TimedOut))??;

        let Some(response) = handler.reply_to_bytes(&request).await? else {
            continue;
        };
        let len = u16::try_from(response.len())
            .map_err(|_| io::Error::new(ErrorKind::InvalidData, "DNS response too large"))?;
        stream.write_u16(len).await?;
        stream.write_all(&response).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::{Host, Interface};
    use crate::host_store::{HostStore, InMemoryHostStore};
    use serde_json::json;
    use std::net::Ipv4Addr;
    use tokio::sync::RwLock;
    use trust_dns_client::op::{Message, Query, ResponseCode};
    use trust_dns_client::rr::{Name, RData, RecordType};

    const WAIT: Duration = Duration::from_secs(5);

    async fn server() -> Server {
        let config: Config = serde_json::from_value(json!({
            "api_bind_addr": "127.0.0.1:3000",
            "api_timeout": 10,
            "dns_udp_bind_addr": "127.0.0.1:0",
            "dns_tcp_bind_addr": "127.0.0.1:0",
            "dns_tcp_timeout": 5,
            "dns_ttl": 60
        }))
        .unwrap();
        let mut store = InMemoryHostStore::default();
        store
            .store_hosts(vec![Host::new(
                "node1",
                vec![Interface::new(
                    "00:11:22:33:44:55",
                    Ipv4Addr::new(10, 0, 0, 5),
                    "node1.cluster",
                )],
            )])
            .await
            .unwrap();
        new(
            Arc::new(config),
            Arc::new(RwLock::new(store)),
            Dispatch::none(),
        )
        .await
        .unwrap()
    }

    fn query(id: u16, questions: &[(&str, RecordType)]) -> Vec<u8> {
        let mut message = Message::new();
        message.set_id(id).set_recursion_desired(true);
        for (name, record_type) in questions {
            message.add_query(Query::query(Name::from_ascii(name).unwrap(), *record_type));
        }
        message.to_vec().unwrap()
    }

    async fn exchange_udp(server: SocketAddr, request: &[u8]) -> Message {
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(request, server).await.unwrap();
        let mut buf = vec![0; MAX_UDP_MESSAGE];
        let (len, _) = tokio::time::timeout(WAIT, client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        Message::from_vec(&buf[..len]).unwrap()
    }

    fn a_records(reply: &Message) -> Vec<Ipv4Addr> {
        reply
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                Some(RData::A(ip)) => Some(*ip),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_udp_without_questions() {
        let server = server().await;
        let addr = server.udp_local_addr().unwrap();
        tokio::spawn(server.run());

        let reply = exchange_udp(addr, &query(1, &[])).await;
        assert_eq!(reply.id(), 1);
        assert_eq!(reply.response_code(), ResponseCode::NXDomain);
        assert!(reply.authoritative());
        assert!(reply.answers().is_empty());
    }

    #[tokio::test]
    async fn test_udp_answers_first_question_only() {
        let server = server().await;
        let addr = server.udp_local_addr().unwrap();
        tokio::spawn(server.run());

        let reply = exchange_udp(
            addr,
            &query(
                2,
                &[
                    ("node1.cluster.", RecordType::A),
                    ("node9.cluster.", RecordType::A),
                ],
            ),
        )
        .await;
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert!(reply.authoritative());
        assert_eq!(a_records(&reply), [Ipv4Addr::new(10, 0, 0, 5)]);
        assert_eq!(reply.answers()[0].ttl(), 60);

        let reply = exchange_udp(
            addr,
            &query(
                3,
                &[
                    ("node9.cluster.", RecordType::A),
                    ("node1.cluster.", RecordType::A),
                ],
            ),
        )
        .await;
        assert_eq!(reply.response_code(), ResponseCode::NXDomain);
        assert!(reply.answers().is_empty());
    }

    #[tokio::test]
    async fn test_tcp_length_prefixed_exchange() {
        let server = server().await;
        let addr = server.tcp_local_addr().unwrap();
        tokio::spawn(server.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        for (id, questions) in [
            (4, vec![]),
            (5, vec![("node1.cluster.", RecordType::A)]),
        ] {
            let request = query(id, &questions);
            stream
                .write_u16(u16::try_from(request.len()).unwrap())
                .await
                .unwrap();
            stream.write_all(&request).await.unwrap();

            let len = tokio::time::timeout(WAIT, stream.read_u16())
                .await
                .unwrap()
                .unwrap();
            let mut response = vec![0; usize::from(len)];
            stream.read_exact(&mut response).await.unwrap();
            let reply = Message::from_vec(&response).unwrap();

            assert_eq!(reply.id(), id);
            assert!(reply.authoritative());
            if questions.is_empty() {
                assert_eq!(reply.response_code(), ResponseCode::NXDomain);
            } else {
                assert_eq!(a_records(&reply), [Ipv4Addr::new(10, 0, 0, 5)]);
            }
        }
    }
}
