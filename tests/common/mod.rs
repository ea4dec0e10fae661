#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use quantstage::service::ServiceConfig;
use quantstage::wire::{DocType, Document, Message, Mode};

pub const MODEL_SPEC: &str = r#"{
    "vectorizer": {"kind": "hashing", "dim": 16},
    "num_bytes": 4,
    "num_clusters": 16,
    "backend": "cpu",
    "batch_size": 4
}"#;

pub fn write_model_spec(dir: &Path) -> PathBuf {
    let path = dir.join("model.json");
    std::fs::write(&path, MODEL_SPEC).expect("write model spec");
    path
}

pub fn service_config(dir: &Path, mode: Mode) -> ServiceConfig {
    ServiceConfig {
        mode,
        dump_path: dir.join("encoder.rkyv"),
        model_spec: Some(write_model_spec(dir)),
        send_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

pub fn training_message() -> Message {
    let docs = (0..6)
        .map(|d| {
            Document::text(
                d,
                (0..8).map(move |c| format!("document {} sentence {} topic{}", d, c, (d + c) % 5)),
            )
        })
        .collect();
    Message::new(1, Mode::Train, DocType::Text, docs)
}

pub fn index_message(msg_id: u64) -> Message {
    Message::new(
        msg_id,
        Mode::Index,
        DocType::Text,
        vec![
            Document::text(100, ["rust ownership rules", "borrow checker", "lifetimes"]),
            Document::text(101, ["async runtimes", "tokio tasks"]),
        ],
    )
}
