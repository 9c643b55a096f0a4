//! Notes domain and storage.
//!
//! # Responsibilities
//! - Define the note payloads exchanged over HTTP
//! - Store notes behind a trait so the in-memory map can be swapped for
//!   a SQL repository
//!
//! # Design Decisions
//! - Every store operation takes the caller's trace context and opens a
//!   child span under it
//! - Lock-free reads via DashMap

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use opentelemetry::{Context, KeyValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::SpanTracer;

/// A stored note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(rename = "note")]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Body of a create request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(rename = "note")]
    pub content: String,
}

impl NoteRequest {
    /// Check required fields, returning the first problem found.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("title is required");
        }
        if self.content.trim().is_empty() {
            return Err("note is required");
        }
        Ok(())
    }

    /// Turn the request into a new note with a fresh id.
    pub fn into_note(self) -> Note {
        Note {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            created_at: Utc::now(),
        }
    }
}

/// Persistence for notes.
pub trait NoteStore: Send + Sync {
    fn insert(&self, cx: &Context, note: Note);
    fn all(&self, cx: &Context) -> BTreeMap<String, Note>;
    fn get(&self, cx: &Context, id: &str) -> Option<Note>;
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Clone)]
pub struct InMemoryNoteStore {
    notes: Arc<DashMap<String, Note>>,
    tracer: SpanTracer,
}

impl InMemoryNoteStore {
    pub fn new(tracer: SpanTracer) -> Self {
        Self {
            notes: Arc::new(DashMap::new()),
            tracer,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteStore for InMemoryNoteStore {
    fn insert(&self, cx: &Context, note: Note) {
        let (_cx, span) = self.tracer.start("store.insert", cx);
        span.set_attribute(KeyValue::new("note.id", note.id.clone()));
        self.notes.insert(note.id.clone(), note);
    }

    fn all(&self, cx: &Context) -> BTreeMap<String, Note> {
        let (_cx, span) = self.tracer.start("store.all", cx);
        let notes: BTreeMap<String, Note> = self
            .notes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        span.set_attribute(KeyValue::new("notes.count", notes.len() as i64));
        notes
    }

    fn get(&self, cx: &Context, id: &str) -> Option<Note> {
        let (_cx, span) = self.tracer.start("store.get", cx);
        span.set_attribute(KeyValue::new("note.id", id.to_string()));
        let note = self.notes.get(id).map(|entry| entry.value().clone());
        span.set_attribute(KeyValue::new("note.found", note.is_some()));
        note
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};

    fn store() -> (InMemoryNoteStore, SdkTracerProvider, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let store = InMemoryNoteStore::new(SpanTracer::from_provider(&provider));
        (store, provider, exporter)
    }

    fn request(title: &str, content: &str) -> NoteRequest {
        NoteRequest {
            user_id: "u1".to_string(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn insert_then_get() {
        let (store, _provider, _exporter) = store();
        let cx = Context::new();
        let note = request("groceries", "milk").into_note();
        let id = note.id.clone();

        store.insert(&cx, note.clone());

        assert_eq!(store.get(&cx, &id), Some(note));
        assert_eq!(store.get(&cx, "missing"), None);
        assert_eq!(store.all(&cx).len(), 1);
    }

    #[test]
    fn store_operations_open_child_spans() {
        let (store, provider, exporter) = store();
        let tracer = SpanTracer::from_provider(&provider);
        let (cx, parent) = tracer.start("request", &Context::new());
        let parent_id = parent.span_id();

        store.insert(&cx, request("a", "b").into_note());
        drop(parent);

        let spans = exporter.get_finished_spans().unwrap();
        let insert = spans.iter().find(|s| s.name == "store.insert").unwrap();
        assert_eq!(insert.parent_span_id, parent_id);
    }

    #[test]
    fn validation_rejects_blank_fields() {
        assert_eq!(request(" ", "x").validate(), Err("title is required"));
        assert_eq!(request("t", "").validate(), Err("note is required"));
        assert!(request("t", "x").validate().is_ok());
    }

    #[test]
    fn content_serializes_as_note() {
        let json = serde_json::to_value(request("t", "body").into_note()).unwrap();
        assert_eq!(json["note"], "body");
        assert!(json.get("content").is_none());
    }
}
