//! capi-client — HTTP/JSON clients for the control plane and the
//! network allocator.
//!
//! Both clients are single-shot: one call, one request, bounded by the
//! configured timeout. Non-2xx responses surface as transport failures
//! carrying the status code and body.

pub mod allocator;
pub mod control_plane;
pub mod error;
pub mod transport;

pub use allocator::{HttpAllocator, allocator_from_config};
pub use control_plane::HttpControlPlane;
pub use error::{ClientError, ClientResult};
pub use transport::JsonTransport;
