#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use routerag::{
    ChatCompletionRequest, CompletionClient, CompletionStream, HashingEmbedder, InMemoryBackend,
    IndexConfig, SemanticError, VectorStore,
};

pub const DIM: usize = 256;

pub fn memory_store() -> Arc<VectorStore> {
    let cfg = IndexConfig {
        backend: "in_memory".into(),
        dimension: DIM,
        ..Default::default()
    };
    Arc::new(
        VectorStore::with_backend(
            &cfg,
            Arc::new(InMemoryBackend::new()),
            Arc::new(HashingEmbedder::new(DIM)),
        )
        .expect("in-memory store"),
    )
}

pub const ALPS_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="routerag-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Alpine Pass</name>
    <trkseg>
      <trkpt lat="46.5" lon="8.3"><ele>1200</ele></trkpt>
      <trkpt lat="46.51" lon="8.31"><ele>1350</ele></trkpt>
      <trkpt lat="46.52" lon="8.32"><ele>1500</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

pub const COAST_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="routerag-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Coastal Loop</name>
    <trkseg>
      <trkpt lat="43.7" lon="7.2"><ele>5</ele></trkpt>
      <trkpt lat="43.71" lon="7.21"><ele>12</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

/// Single-page PDF drawing `text` in Helvetica, with a correct xref table.
pub fn build_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 18 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, obj).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

/// Completion client that records every request and replays fixed fragments.
#[derive(Default)]
pub struct ScriptedCompletion {
    pub fragments: Vec<String>,
    pub fail_with: Option<SemanticError>,
    pub requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing(err: SemanticError) -> Self {
        Self {
            fail_with: Some(err),
            ..Default::default()
        }
    }

    pub fn recorded(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream, SemanticError> {
        self.requests.lock().expect("requests lock").push(request);
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let items: Vec<Result<String, SemanticError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(items)))
    }
}
