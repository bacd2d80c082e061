//! Resource record builders and reverse-lookup name parsing.

use std::net::{Ipv4Addr, Ipv6Addr};
use trust_dns_client::rr::{DNSClass, Name, RData, Record};

fn record(qname: &Name, ttl: u32, rdata: RData) -> Record {
    let mut record = Record::from_rdata(qname.clone(), ttl, rdata);
    record.set_dns_class(DNSClass::IN);
    record
}

/// One `A` record per address.
#[must_use]
pub fn a(qname: &Name, ttl: u32, ips: &[Ipv4Addr]) -> Vec<Record> {
    ips.iter()
        .map(|ip| record(qname, ttl, RData::A(*ip)))
        .collect()
}

/// One `AAAA` record per address.
///
/// Hosts only carry IPv4 bindings today and the [handler][super::handlers::Handler] never
/// answers `AAAA` queries, see the [module docs][super#aaaa].
#[must_use]
pub fn aaaa(qname: &Name, ttl: u32, ips: &[Ipv6Addr]) -> Vec<Record> {
    ips.iter()
        .map(|ip| record(qname, ttl, RData::AAAA(*ip)))
        .collect()
}

/// One `PTR` record per host name. Names are made absolute; names that aren't valid domain
/// names are skipped.
#[must_use]
pub fn ptr(qname: &Name, ttl: u32, names: &[String]) -> Vec<Record> {
    names
        .iter()
        .filter_map(|name| {
            let absolute = format!("{}.", name.trim_end_matches('.'));
            Name::from_ascii(absolute).ok()
        })
        .map(|target| record(qname, ttl, RData::PTR(target)))
        .collect()
}

/// The address encoded in an `in-addr.arpa` name, e.g. `10.0.0.5` for `5.0.0.10.in-addr.arpa.`.
#[must_use]
pub fn ipv4_from_reverse(qname: &str) -> Option<Ipv4Addr> {
    let qname = qname.trim_end_matches('.').to_ascii_lowercase();
    let labels = qname.strip_suffix(".in-addr.arpa")?;

    let mut octets = [0u8; 4];
    let mut count = 0;
    for label in labels.rsplit('.') {
        if count == octets.len() || label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        octets[count] = label.parse().ok()?;
        count += 1;
    }
    (count == octets.len()).then(|| Ipv4Addr::from(octets))
}
