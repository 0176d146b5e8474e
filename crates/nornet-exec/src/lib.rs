//! nornet-exec: Device transport abstraction
//!
//! Provides the connection trait drivers talk through, an SSH command
//! transport, and the HTTPS session used by API-based drivers.

pub mod api;
pub mod error;
pub mod result;
pub mod ssh;
pub mod traits;

pub use api::{ApiAuth, ApiSession};
pub use reqwest::Url;
pub use error::TransportError;
pub use result::{ConnectionInfo, DEFAULT_CONNECT_TIMEOUT};
pub use ssh::{SshConnection, SshConnectionBuilder};
pub use traits::{DeviceConnection, Getter};
