//! Production transport implementations.

mod http;

pub use http::{HttpTransport, HttpTransportConfig};
