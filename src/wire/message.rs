use std::fmt;
use std::str::FromStr;

use rkyv::{Archive, Deserialize, Serialize};

use super::blob::ArrayBlob;
use super::error::WireError;

/// Processing path selected by a message (and by the service at startup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Fit the model on the message's chunks.
    Train,
    /// Encode every chunk and forward per-document codes.
    #[default]
    Index,
    /// Encode query chunks and forward the code block.
    Query,
}

impl Mode {
    /// Raw value used on the wire.
    pub const fn as_raw(self) -> i32 {
        match self {
            Mode::Train => 0,
            Mode::Index => 1,
            Mode::Query => 2,
        }
    }

    /// Lowercase name (matches the config spelling).
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Index => "index",
            Mode::Query => "query",
        }
    }
}

impl TryFrom<i32> for Mode {
    type Error = WireError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Train),
            1 => Ok(Mode::Index),
            2 => Ok(Mode::Query),
            _ => Err(WireError::UnknownMode { value }),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "train" => Ok(Mode::Train),
            "index" => Ok(Mode::Index),
            "query" => Ok(Mode::Query),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which chunk list of a [`Document`] carries content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    /// `text_chunks` (sentences, snippets).
    Text,
    /// `blob_chunks` (image regions, raw vectors).
    Image,
}

impl DocType {
    /// Raw value used on the wire (`0` is reserved for "unknown").
    pub const fn as_raw(self) -> i32 {
        match self {
            DocType::Text => 1,
            DocType::Image => 2,
        }
    }
}

impl TryFrom<i32> for DocType {
    type Error = WireError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DocType::Text),
            2 => Ok(DocType::Image),
            _ => Err(WireError::UnknownDocType { value }),
        }
    }
}

/// One document: an ordered list of chunks plus the codes this stage attaches.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Upstream document identifier.
    pub doc_id: u64,
    /// Declared chunk count.
    pub doc_size: u32,
    /// Chunks of a text document.
    pub text_chunks: Vec<String>,
    /// Chunks of a binary/image document.
    pub blob_chunks: Vec<Vec<u8>>,
    /// `[doc_size, num_bytes]` codes, set by INDEX/QUERY.
    pub encodes: Option<ArrayBlob>,
    /// Set together with `encodes`.
    pub is_encoded: bool,
}

impl Document {
    /// Builds a text document, deriving `doc_size` from the chunks.
    pub fn text<I, S>(doc_id: u64, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let text_chunks: Vec<String> = chunks.into_iter().map(Into::into).collect();
        Self {
            doc_id,
            doc_size: text_chunks.len() as u32,
            text_chunks,
            ..Default::default()
        }
    }

    /// Builds an image/binary document, deriving `doc_size` from the chunks.
    pub fn blobs(doc_id: u64, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            doc_id,
            doc_size: chunks.len() as u32,
            blob_chunks: chunks,
            ..Default::default()
        }
    }

    /// Attaches codes and flips `is_encoded`.
    pub fn set_encodes(&mut self, blob: ArrayBlob) {
        self.encodes = Some(blob);
        self.is_encoded = true;
    }
}

/// Per-query parameters for QUERY messages.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Number of results the downstream router should return.
    pub top_k: u32,
}

/// Unit of transport between pipeline stages.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Message {
    /// Upstream message identifier (for log correlation).
    pub msg_id: u64,
    /// Raw [`Mode`] value.
    pub mode: i32,
    /// Raw [`DocType`] value.
    pub doc_type: i32,
    /// Documents in pipeline order.
    pub docs: Vec<Document>,
    /// Queries (QUERY mode only).
    pub querys: Vec<Query>,
    /// Set after successful INDEX/QUERY processing.
    pub is_encoded: bool,
}

impl Message {
    /// Creates a message with typed mode and doc type.
    pub fn new(msg_id: u64, mode: Mode, doc_type: DocType, docs: Vec<Document>) -> Self {
        Self {
            msg_id,
            mode: mode.as_raw(),
            doc_type: doc_type.as_raw(),
            docs,
            ..Default::default()
        }
    }

    /// Adds queries (builder style).
    pub fn with_querys(mut self, querys: Vec<Query>) -> Self {
        self.querys = querys;
        self
    }

    /// Typed mode, or [`WireError::UnknownMode`].
    pub fn mode(&self) -> Result<Mode, WireError> {
        Mode::try_from(self.mode)
    }

    /// Typed doc type, or [`WireError::UnknownDocType`].
    pub fn doc_type(&self) -> Result<DocType, WireError> {
        DocType::try_from(self.doc_type)
    }

    /// Sum of declared `doc_size` values.
    pub fn declared_chunks(&self) -> usize {
        self.docs.iter().map(|d| d.doc_size as usize).sum()
    }
}
