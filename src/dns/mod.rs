//! Authoritative DNS server for provisioned hosts.
//!
//! Every answer is built from the [host store][crate::host_store] at query time, so hosts
//! `POST`ed to the [`/hosts` API endpoint][crate::api#hosts-post] resolve immediately.
//!
//! Only the first question of a message is answered. Names are matched case-insensitively.
//! All records carry the [`Config::dns_ttl`][`crate::config::Config::dns_ttl`] TTL and every
//! reply has the authoritative flag set.
//!
//! # A
//!
//! Host Crab will serve a response to `A` class queries for the FQDN of every host interface,
//! with one record per matching interface address.
//!
//! E.g. with a host:
//! ```json
//! { "name": "cpn-k01", "interfaces": [ { "mac": "00:11:22:33:44:55", "ip": "10.0.0.5", "fqdn": "cpn-k01.cluster" } ] }
//! ```
//!
//! A `A` class query for `cpn-k01.cluster` would return:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 cpn-k01.cluster +short A
//! 10.0.0.5
//! ```
//!
//! # PTR
//!
//! `PTR` class queries for `in-addr.arpa` names return the FQDN of every interface bound to the
//! address:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 -x 10.0.0.5 +short
//! cpn-k01.cluster.
//! ```
//!
//! # AAAA
//!
//! [`records::aaaa`] can build `AAAA` answers, but `AAAA` queries are not dispatched to it and
//! are answered like any other unsupported type. Whether IPv6 should be served, and behind
//! which switch, is an open product decision.
//!
//! # Failures
//!
//! Queries for unknown names, unsupported types, messages without a question, and lookups that
//! fail inside the host store are all answered with `NXDOMAIN` and no records. Store errors are
//! logged; a reply is always sent.

pub mod handlers;
pub mod records;
pub mod server;

pub use server::new;
