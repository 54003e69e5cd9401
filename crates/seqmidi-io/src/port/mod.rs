//! Port identity and descriptors.
//!
//! Everything here is plain data: addresses, capability/type bitsets and the
//! read-only descriptor handed out by discovery and by opened streams.

mod descriptor;
mod flags;

pub use descriptor::PortDescriptor;
pub use flags::{PortAddress, PortCapabilities, PortType, ProtocolVersion};
