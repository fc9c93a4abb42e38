// dms-api: Async gateway layer for the management network protocol

pub mod communication;
pub mod error;
pub mod messages;
pub mod mock;
pub mod transport;

pub use communication::{Communication, CommunicationExt, FromResponse};
pub use error::{Error, NOT_FOUND_CODE};
pub use messages::{Request, Response};
pub use mock::MockCommunication;
pub use transport::{HttpCommunication, TlsMode, TransportConfig};
