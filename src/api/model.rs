use serde::Serialize;

/// Body of a successful `POST /hosts`.
#[derive(Serialize, Debug, Clone, Copy, Default, Ord, PartialOrd, Eq, PartialEq)]
pub(super) struct StoreHostsResult {
    pub hosts: usize,
}
