//! Encoder pipeline stage: model lifecycle, mode dispatch and forwarding.

pub mod config;
pub mod encoder;
pub mod error;
pub mod events;
pub mod flatten;


pub use config::{DEFAULT_DUMP_PATH, DEFAULT_SERVICE_NAME, ServiceConfig};
pub use encoder::{EncoderService, Outcome};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use events::{ModelChanged, ModelChangedReceiver};
pub use flatten::{FlatBatch, flatten, split_rows};
