use crate::config::Shared;
use crate::dns::records;
use crate::error::Error;
use crate::host_store::{DynHostStore, HostStore};
use std::net::Ipv4Addr;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, Dispatch};
use trust_dns_client::op::{Message, MessageType, OpCode, Query, ResponseCode};
use trust_dns_client::rr::{Name, Record, RecordType};

/// The query types the handler distinguishes. Everything outside this set is answered as
/// [`QueryKind::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    A,
    Aaaa,
    Ptr,
    Unsupported,
}

impl From<RecordType> for QueryKind {
    fn from(record_type: RecordType) -> Self {
        match record_type {
            RecordType::A => QueryKind::A,
            RecordType::AAAA => QueryKind::Aaaa,
            RecordType::PTR => QueryKind::Ptr,
            _ => QueryKind::Unsupported,
        }
    }
}

/// A single question: lower-cased, absolute name and its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub kind: QueryKind,
}

impl Question {
    #[must_use]
    pub fn new(name: &Name, record_type: RecordType) -> Self {
        let mut name = name.to_lowercase();
        name.set_fqdn(true);
        Question {
            name,
            kind: record_type.into(),
        }
    }

    /// The question asked by a message without questions: the root name, with no type.
    #[must_use]
    pub fn none() -> Self {
        Question {
            name: Name::root(),
            kind: QueryKind::Unsupported,
        }
    }

    /// Only the first question of a message is answered.
    #[must_use]
    pub fn first_of(queries: &[Query]) -> Self {
        queries
            .first()
            .map_or_else(Question::none, |q| Question::new(q.name(), q.query_type()))
    }
}

/// The answer section and response code for a [`Question`].
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub records: Vec<Record>,
    pub response_code: ResponseCode,
}

#[derive(Clone)]
pub struct Handler {
    ttl: u32,
    host_store: DynHostStore,
    diagnostics: Dispatch,
}

impl Handler {
    /// Build a handler answering from `host_store`. Everything the handler logs goes to
    /// `diagnostics`.
    #[must_use]
    pub fn new(config: &Shared, host_store: DynHostStore, diagnostics: Dispatch) -> Self {
        Handler {
            ttl: config.dns_ttl,
            host_store,
            diagnostics,
        }
    }

    /// Answer `question` from the host store. Store errors are logged and answered like a
    /// name that doesn't exist: with no records and `NXDOMAIN`.
    pub async fn answer(&self, question: &Question) -> Answer {
        async {
            let records = self.records(question).await;
            let response_code = if records.is_empty() {
                ResponseCode::NXDomain
            } else {
                ResponseCode::NoError
            };
            debug!(
                qname = %question.name,
                qtype = ?question.kind,
                answers = records.len(),
                "answered query"
            );
            Answer {
                records,
                response_code,
            }
        }
        .with_subscriber(self.diagnostics.clone())
        .await
    }

    /// Build the complete reply to `request`, including requests without any question.
    pub async fn reply(&self, request: &Message) -> Message {
        let answer = self.answer(&Question::first_of(request.queries())).await;
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_checking_disabled(request.checking_disabled())
            .set_authoritative(true)
            .set_response_code(answer.response_code)
            .add_queries(request.queries().iter().cloned())
            .add_answers(answer.records);
        response
    }

    /// Answer a wire-format message. Messages that can't be decoded but carry an id get
    /// `FORMERR`. Returns `None` for messages that are responses rather than queries.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is too short to carry an id, or if the reply can't be
    /// encoded.
    pub async fn reply_to_bytes(&self, request: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let response = match Message::from_vec(request) {
            Ok(request) if request.message_type() == MessageType::Query => {
                self.reply(&request).await
            }
            Ok(request) => {
                debug!(id = request.id(), "ignoring DNS response message");
                return Ok(None);
            }
            Err(err) => {
                debug!(%err, "malformed DNS message");
                format_error(request).ok_or(err)?
            }
        };
        Ok(Some(response.to_vec()?))
    }

    async fn records(&self, question: &Question) -> Vec<Record> {
        let qname = &question.name;
        match question.kind {
            QueryKind::A => records::a(qname, self.ttl, &self.resolve_ipv4(qname).await),
            QueryKind::Ptr => records::ptr(qname, self.ttl, &self.reverse_resolve(qname).await),
            // AAAA is deliberately left out, see the module docs.
            QueryKind::Aaaa | QueryKind::Unsupported => Vec::new(),
        }
    }

    async fn resolve_ipv4(&self, qname: &Name) -> Vec<Ipv4Addr> {
        let fqdn = qname.to_string();
        match self.host_store.read().await.resolve_ipv4(&fqdn).await {
            Ok(ips) => ips,
            Err(err) => {
                error!(qname = %fqdn, %err, "failed to resolve FQDN");
                Vec::new()
            }
        }
    }

    async fn reverse_resolve(&self, qname: &Name) -> Vec<String> {
        let qname = qname.to_string();
        let Some(ip) = records::ipv4_from_reverse(&qname) else {
            debug!(qname = %qname, "PTR query outside in-addr.arpa");
            return Vec::new();
        };

        match self
            .host_store
            .read()
            .await
            .reverse_resolve(&ip.to_string())
            .await
        {
            Ok(names) => names,
            Err(err) => {
                error!(qname = %qname, %err, "failed to reverse resolve IP");
                Vec::new()
            }
        }
    }
}

fn format_error(request: &[u8]) -> Option<Message> {
    let id = u16::from_be_bytes([*request.first()?, *request.get(1)?]);
    let mut response = Message::error_msg(id, OpCode::Query, ResponseCode::FormErr);
    response.set_authoritative(true);
    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::{Host, Interface};
    use crate::host_store::InMemoryHostStore;
    use crate::nodeset::NodeSet;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use trust_dns_client::rr::RData;

    const TTL: u32 = 120;

    fn config() -> Shared {
        let config: Config = serde_json::from_value(json!({
            "api_bind_addr": "127.0.0.1:3000",
            "api_timeout": 10,
            "dns_udp_bind_addr": "127.0.0.1:5353",
            "dns_tcp_bind_addr": "127.0.0.1:5353",
            "dns_tcp_timeout": 5,
            "dns_ttl": TTL
        }))
        .unwrap();
        Arc::new(config)
    }

    async fn handler() -> Handler {
        let mut store = InMemoryHostStore::default();
        store
            .store_hosts(vec![Host::new(
                "node1",
                vec![
                    Interface::new(
                        "00:11:22:33:44:55",
                        Ipv4Addr::new(10, 0, 0, 5),
                        "node1.cluster",
                    ),
                    Interface::new(
                        "00:11:22:33:44:56",
                        Ipv4Addr::new(10, 1, 0, 5),
                        "node1-ib.cluster",
                    ),
                ],
            )])
            .await
            .unwrap();
        Handler::new(&config(), Arc::new(RwLock::new(store)), Dispatch::none())
    }

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    fn question(qname: &str, record_type: RecordType) -> Question {
        Question::new(&name(qname), record_type)
    }

    struct UnavailableStore;

    #[async_trait::async_trait]
    impl HostStore for UnavailableStore {
        async fn store_hosts(&mut self, _hosts: Vec<Host>) -> Result<(), Error> {
            Err(unavailable())
        }
        async fn hosts(&self) -> Result<Vec<Host>, Error> {
            Err(unavailable())
        }
        async fn find_hosts(&self, _nodes: &NodeSet) -> Result<Vec<Host>, Error> {
            Err(unavailable())
        }
        async fn resolve_ipv4(&self, _fqdn: &str) -> Result<Vec<Ipv4Addr>, Error> {
            Err(unavailable())
        }
        async fn reverse_resolve(&self, _ip: &str) -> Result<Vec<String>, Error> {
            Err(unavailable())
        }
    }

    fn unavailable() -> Error {
        Error::Storage(std::io::Error::new(std::io::ErrorKind::Other, "offline"))
    }

    #[test]
    fn test_question_normalization() {
        let q = question("NODE1.Cluster.", RecordType::A);
        assert_eq!(q.name.to_string(), "node1.cluster.");
        assert_eq!(q.kind, QueryKind::A);

        let relative = question("node1.cluster", RecordType::PTR);
        assert!(relative.name.is_fqdn());
        assert_eq!(relative.kind, QueryKind::Ptr);
    }

    #[test]
    fn test_query_kinds() {
        assert_eq!(QueryKind::from(RecordType::AAAA), QueryKind::Aaaa);
        assert_eq!(QueryKind::from(RecordType::MX), QueryKind::Unsupported);
        assert_eq!(QueryKind::from(RecordType::TXT), QueryKind::Unsupported);
    }

    #[test]
    fn test_first_question_only() {
        let queries = vec![
            Query::query(name("node1.cluster."), RecordType::A),
            Query::query(name("5.0.0.10.in-addr.arpa."), RecordType::PTR),
        ];
        assert_eq!(
            Question::first_of(&queries),
            question("node1.cluster.", RecordType::A)
        );
        assert_eq!(Question::first_of(&[]), Question::none());
    }

    #[tokio::test]
    async fn test_a_success() {
        let handler = handler().await;
        let answer = handler
            .answer(&question("node1.cluster.", RecordType::A))
            .await;

        assert_eq!(answer.response_code, ResponseCode::NoError);
        assert_eq!(
            answer.records,
            records::a(&name("node1.cluster."), TTL, &[Ipv4Addr::new(10, 0, 0, 5)])
        );
        assert_eq!(answer.records[0].ttl(), TTL);
    }

    #[tokio::test]
    async fn test_a_is_case_insensitive() {
        let handler = handler().await;
        let answer = handler
            .answer(&question("Node1-IB.CLUSTER.", RecordType::A))
            .await;
        assert_eq!(answer.response_code, ResponseCode::NoError);
        assert_eq!(answer.records[0].name(), &name("node1-ib.cluster."));
    }

    #[tokio::test]
    async fn test_a_miss_is_nxdomain() {
        let handler = handler().await;
        let answer = handler
            .answer(&question("node9.cluster.", RecordType::A))
            .await;
        assert_eq!(answer.response_code, ResponseCode::NXDomain);
        assert!(answer.records.is_empty());
    }

    #[tokio::test]
    async fn test_ptr_success() {
        let handler = handler().await;
        let qname = name("5.0.0.10.in-addr.arpa.");
        let answer = handler.answer(&Question::new(&qname, RecordType::PTR)).await;

        assert_eq!(answer.response_code, ResponseCode::NoError);
        assert_eq!(
            answer.records,
            vec![Record::from_rdata(
                qname,
                TTL,
                RData::PTR(name("node1.cluster."))
            )]
        );
    }

    #[tokio::test]
    async fn test_ptr_outside_reverse_zone() {
        let handler = handler().await;
        let answer = handler
            .answer(&question("node1.cluster.", RecordType::PTR))
            .await;
        assert_eq!(answer.response_code, ResponseCode::NXDomain);
    }

    #[tokio::test]
    async fn test_unserved_types_are_nxdomain() {
        let handler = handler().await;
        for record_type in [RecordType::AAAA, RecordType::MX, RecordType::TXT] {
            let answer = handler
                .answer(&question("node1.cluster.", record_type))
                .await;
            assert_eq!(answer.response_code, ResponseCode::NXDomain, "{record_type}");
            assert!(answer.records.is_empty());
        }
    }

    #[tokio::test]
    async fn test_store_errors_become_nxdomain() {
        let handler = Handler::new(
            &config(),
            Arc::new(RwLock::new(UnavailableStore)),
            Dispatch::none(),
        );
        for q in [
            question("node1.cluster.", RecordType::A),
            question("5.0.0.10.in-addr.arpa.", RecordType::PTR),
        ] {
            let answer = handler.answer(&q).await;
            assert_eq!(answer.response_code, ResponseCode::NXDomain);
            assert!(answer.records.is_empty());
        }
    }

    #[tokio::test]
    async fn test_reply_without_questions() {
        let handler = handler().await;
        let mut request = Message::new();
        request.set_id(4242).set_recursion_desired(true);

        let reply = handler.reply(&request).await;
        assert_eq!(reply.id(), 4242);
        assert_eq!(reply.message_type(), MessageType::Response);
        assert!(reply.authoritative());
        assert!(reply.recursion_desired());
        assert_eq!(reply.response_code(), ResponseCode::NXDomain);
        assert!(reply.answers().is_empty());
    }

    #[tokio::test]
    async fn test_reply_with_answer() {
        let handler = handler().await;
        let mut request = Message::new();
        request
            .set_id(7)
            .add_query(Query::query(name("node1.cluster."), RecordType::A));

        let reply = handler.reply(&request).await;
        assert_eq!(reply.id(), 7);
        assert!(reply.authoritative());
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(reply.queries(), request.queries());
        assert_eq!(reply.answers().len(), 1);
        assert_eq!(reply.answers()[0].ttl(), TTL);
    }

    #[tokio::test]
    async fn test_reply_to_bytes() {
        let handler = handler().await;
        let mut request = Message::new();
        request
            .set_id(11)
            .add_query(Query::query(name("node1.cluster."), RecordType::A));

        let encoded = handler
            .reply_to_bytes(&request.to_vec().unwrap())
            .await
            .unwrap()
            .unwrap();
        let reply = Message::from_vec(&encoded).unwrap();
        assert_eq!(reply.id(), 11);
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(reply.answers().len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_message_is_format_error() {
        let handler = handler().await;
        let encoded = handler
            .reply_to_bytes(&[0x12, 0x34, 0x01])
            .await
            .unwrap()
            .unwrap();
        let reply = Message::from_vec(&encoded).unwrap();
        assert_eq!(reply.id(), 0x1234);
        assert_eq!(reply.response_code(), ResponseCode::FormErr);
        assert!(reply.authoritative());

        assert!(handler.reply_to_bytes(&[0x12]).await.is_err());
    }

    #[tokio::test]
    async fn test_responses_are_not_answered() {
        let handler = handler().await;
        let mut message = Message::new();
        message.set_id(3).set_message_type(MessageType::Response);
        let reply = handler
            .reply_to_bytes(&message.to_vec().unwrap())
            .await
            .unwrap();
        assert_eq!(reply, None);
    }
}
