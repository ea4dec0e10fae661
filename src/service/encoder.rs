use std::path::Path;

use tracing::{debug, error, info, instrument, warn};

use crate::model::{ModelError, PipelineEncoder};
use crate::service::config::ServiceConfig;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::events::{ModelChangedReceiver, ModelEvents};
use crate::service::flatten::{flatten, split_rows};
use crate::transport::{MessageSink, MessageSource, send_with_timeout};
use crate::wire::{ArrayBlob, DocType, Message, Mode};

/// What happened to a successfully handled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Model retrained; nothing forwarded.
    Trained { chunks: usize, generation: u64 },
    /// Codes attached and the message sent downstream.
    Forwarded { mode: Mode, docs: usize, chunks: usize },
}

/// Encoder pipeline stage. Owns the model; handles one message at a time.
#[derive(Debug)]
pub struct EncoderService {
    config: ServiceConfig,
    encoder: PipelineEncoder,
    events: ModelEvents,
}

impl EncoderService {
    /// Loads the trained model, or bootstraps an untrained one when running in TRAIN mode.
    pub fn start(config: ServiceConfig) -> ServiceResult<Self> {
        let encoder = match PipelineEncoder::load(&config.dump_path) {
            Ok(encoder) => encoder,
            Err(ModelError::NotFound { path }) if config.mode == Mode::Train => {
                info!(path = %path.display(), "No model dump, bootstrapping from spec");
                Self::bootstrap(&config)?
            }
            Err(e) => {
                return Err(ServiceError::ComponentNotLoaded {
                    component: config.name.clone(),
                    reason: e.to_string(),
                });
            }
        };

        info!(
            service = %config.name,
            mode = %config.mode,
            trained = encoder.is_trained(),
            num_bytes = encoder.num_bytes(),
            num_clusters = encoder.num_clusters(),
            "Service ready"
        );
        Ok(Self::with_encoder(config, encoder))
    }

    fn bootstrap(config: &ServiceConfig) -> ServiceResult<PipelineEncoder> {
        let spec_path: &Path = config
            .model_spec
            .as_deref()
            .ok_or_else(|| ServiceError::Configuration {
                reason: "no model spec configured for bootstrapping".to_string(),
            })?;

        PipelineEncoder::from_spec_file(spec_path).map_err(|e| ServiceError::ComponentNotLoaded {
            component: config.name.clone(),
            reason: e.to_string(),
        })
    }

    /// Wraps an already built encoder.
    pub fn with_encoder(config: ServiceConfig, encoder: PipelineEncoder) -> Self {
        Self {
            config,
            encoder,
            events: ModelEvents::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn encoder(&self) -> &PipelineEncoder {
        &self.encoder
    }

    /// Number of model changes published so far.
    pub fn generation(&self) -> u64 {
        self.events.generation()
    }

    /// Receiver for model-changed events.
    pub fn subscribe(&self) -> ModelChangedReceiver {
        self.events.subscribe()
    }

    /// Processes one message. On error nothing is forwarded.
    #[instrument(skip_all, fields(msg_id = msg.msg_id, mode = msg.mode, docs = msg.docs.len()))]
    pub async fn handle<S>(&mut self, mut msg: Message, sink: &S) -> ServiceResult<Outcome>
    where
        S: MessageSink + ?Sized,
    {
        let mode = msg.mode().map_err(|_| ServiceError::UnsupportedMode {
            service: self.config.name.clone(),
            value: msg.mode,
        })?;
        let doc_type = self.doc_type(&msg)?;

        match mode {
            Mode::Train => {
                let chunks = {
                    let batch = flatten(&msg, doc_type)?;
                    self.encoder.train(&batch.chunks)?;
                    batch.len()
                };
                let generation = self.events.publish(self.encoder.snapshot());
                info!(chunks, generation, "Model trained");
                Ok(Outcome::Trained { chunks, generation })
            }
            Mode::Index => {
                let (codes, sizes) = {
                    let batch = flatten(&msg, doc_type)?;
                    (self.encoder.encode(&batch.chunks)?, batch.sizes)
                };
                let parts = split_rows(&codes, &sizes)?;
                for (doc, part) in msg.docs.iter_mut().zip(parts.iter()) {
                    doc.set_encodes(ArrayBlob::from_codes(part));
                }
                msg.is_encoded = true;

                let docs = msg.docs.len();
                self.forward(msg, sink).await?;
                Ok(Outcome::Forwarded {
                    mode,
                    docs,
                    chunks: codes.rows(),
                })
            }
            Mode::Query => {
                let codes = {
                    let batch = flatten(&msg, doc_type)?;
                    self.encoder.encode(&batch.chunks)?
                };
                if codes.rows() != msg.querys.len() {
                    return Err(ServiceError::Validation {
                        reason: format!(
                            "encoder produced {} rows for {} queries",
                            codes.rows(),
                            msg.querys.len()
                        ),
                    });
                }
                if msg.querys.len() > 1 {
                    warn!(
                        queries = msg.querys.len(),
                        "Multiple queries in one message, attaching all codes to the first document"
                    );
                }
                let Some(first) = msg.docs.first_mut() else {
                    return Err(ServiceError::Validation {
                        reason: "query message carries no document".to_string(),
                    });
                };
                first.set_encodes(ArrayBlob::from_codes(&codes));
                msg.is_encoded = true;

                let docs = msg.docs.len();
                self.forward(msg, sink).await?;
                Ok(Outcome::Forwarded {
                    mode,
                    docs,
                    chunks: codes.rows(),
                })
            }
        }
    }

    fn doc_type(&self, msg: &Message) -> ServiceResult<DocType> {
        msg.doc_type().map_err(|_| ServiceError::UnsupportedDocType {
            service: self.config.name.clone(),
            value: msg.doc_type,
        })
    }

    async fn forward<S>(&self, msg: Message, sink: &S) -> ServiceResult<()>
    where
        S: MessageSink + ?Sized,
    {
        let msg_id = msg.msg_id;
        send_with_timeout(sink, msg, self.config.send_timeout).await?;
        debug!(msg_id, "Forwarded message");
        Ok(())
    }

    /// Serves until the source is exhausted. Per-message failures are logged and skipped.
    pub async fn run<R, S>(&mut self, source: &mut R, sink: &S) -> ServiceResult<()>
    where
        R: MessageSource + ?Sized,
        S: MessageSink + ?Sized,
    {
        info!(service = %self.config.name, "Serving");
        while let Some(msg) = source.recv().await? {
            let msg_id = msg.msg_id;
            let raw_mode = msg.mode;
            let docs = msg.docs.len();
            let chunks = msg.declared_chunks();

            if let Err(e) = self.handle(msg, sink).await {
                error!(
                    msg_id,
                    mode = raw_mode,
                    docs,
                    chunks,
                    kind = ?e.kind(),
                    error = %e,
                    "Message failed"
                );
            }
        }
        info!(service = %self.config.name, "Source closed");
        Ok(())
    }

    /// Releases the model's backend resources.
    pub fn shutdown(self) {
        info!(service = %self.config.name, "Shutting down");
        self.encoder.close();
    }
}
