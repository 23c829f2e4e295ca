//! ABI marshaling core: typed values, the wire-format codec, and the
//! function/event descriptors that per-contract façades are assembled from.
//!
//! Everything here is local computation over byte buffers; talking to a chain
//! is the `bridge-contracts` crate's concern.

mod address;
pub use address::{checksummed, parse_checksummed};

pub mod codec;

mod error;
pub use error::{AbiError, Result};

mod event;
pub use event::{EventDescriptor, EventParam};

mod function;
pub use function::{DecodedOutput, FunctionDescriptor, OutputShape, Param};

mod value;
pub use value::{Kind, NamedValues, Value};
