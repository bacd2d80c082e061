//! HTTP API for managing provisioned hosts.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/hosts` (POST)
//!
//!   Expects a JSON array of hosts:
//!
//!   ```json
//!   [
//!     {
//!       "name": "cpn-k01",
//!       "provision": true,
//!       "interfaces": [
//!         { "mac": "00:11:22:33:44:55", "ip": "10.0.0.5", "fqdn": "cpn-k01.cluster" }
//!       ]
//!     }
//!   ]
//!   ```
//!
//!  Every host needs a `name` and at least one interface, and no name or MAC address may
//!  appear twice in the batch. Fields beyond `name`, `interfaces`, `mac`, `ip` and `fqdn` are
//!  stored as-is. Hosts replace any stored host of the same name.
//!
//!  The batch is stored as a whole or not at all. Returns HTTP 201 (Created) and a JSON body of
//!  the form:
//!
//!  ```json
//!  { "hosts": 1 }
//!  ```
//!
//!  Returns HTTP 400 (Bad Request) for malformed JSON or an invalid host, and HTTP 500
//!  (Internal Server Error) if the batch couldn't be saved.
//!
//! ## `/hosts` (GET)
//!
//!  Returns HTTP 200 (OK) and a JSON array of every host, ordered by name.
//!
//! ## `/hosts/{nodeset}` (GET)
//!
//!  Returns HTTP 200 (OK) and a JSON array of the hosts named by the
//!  [nodeset][crate::nodeset] expression in the path, in nodeset order. Names without a host
//!  are skipped.
//!
//!  ```bash
//!  ❯ curl 'http://localhost:3000/hosts/cpn-k%5B01-04%5D'
//!  ```
//!
//!  Returns HTTP 400 (Bad Request) if the expression is malformed.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
