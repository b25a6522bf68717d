//! Type-keyed handler lookup.

use crate::ImportHandler;
use std::collections::BTreeMap;

/// Maps document type names to their handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Box<dyn ImportHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its own declared type, replacing any
    /// previous handler for that type.
    pub fn register(&mut self, handler: Box<dyn ImportHandler>) {
        self.handlers
            .insert(handler.doc_type().to_string(), handler);
    }

    /// Looks up the handler for a document type.
    #[must_use]
    pub fn get(&self, doc_type: &str) -> Option<&dyn ImportHandler> {
        self.handlers.get(doc_type).map(Box::as_ref)
    }

    /// Registered type names, in order.
    pub fn doc_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
