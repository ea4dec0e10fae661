//! Data contract between pipeline stages.
//!
//! [`Message`] carries [`Document`]s whose chunks this stage encodes; codes travel back as
//! [`ArrayBlob`]s. Mode and document type are raw integers on the wire so that values from a
//! newer upstream stage decode cleanly and are rejected by the service, not by the codec.

pub mod blob;
pub mod codec;
pub mod error;
pub mod message;


pub use blob::{ArrayBlob, ElementType};
pub use codec::{decode_message, encode_message};
pub use error::WireError;
pub use message::{DocType, Document, Message, Mode, Query};
