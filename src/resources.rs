//! Resource registry
//!
//! Resources are static content items exposed alongside tools. Binary
//! resources are only visible to clients that accept binary content and
//! travel as base64; text resources go through the client's response
//! formatting like tool output.

use crate::adapt::format_response;
use crate::capability::Capabilities;
use crate::error::{ClientFitError, Result};
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Resource payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceContent {
    /// Sent through the response formatter
    Text(String),
    /// Sent base64 encoded, only to clients that accept binary content
    Binary(Vec<u8>),
}

impl ResourceContent {
    /// True for binary payloads
    pub fn is_binary(&self) -> bool {
        matches!(self, ResourceContent::Binary(_))
    }
}

/// A registered resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Unique key in the registry
    pub uri: String,
    /// Display name
    pub name: String,
    /// Empty unless set with [`Resource::with_description`]
    pub description: String,
    pub mime_type: String,
    pub content: ResourceContent,
}

impl Resource {
    /// Text resource
    pub fn text(uri: &str, name: &str, mime_type: &str, text: impl Into<String>) -> Self {
        Self {
            uri: uri.to_string(),
            name: name.to_string(),
            description: String::new(),
            mime_type: mime_type.to_string(),
            content: ResourceContent::Text(text.into()),
        }
    }

    /// Binary resource
    pub fn binary(uri: &str, name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            uri: uri.to_string(),
            name: name.to_string(),
            description: String::new(),
            mime_type: mime_type.to_string(),
            content: ResourceContent::Binary(bytes),
        }
    }

    /// Attach a description shown in listings
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Listing entry for a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Resource content as delivered to a client
///
/// Exactly one of `text` and `blob` is set; `blob` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    /// Text was cut to the client's size limit
    pub truncated: bool,
}

/// Resources keyed by uri
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Resource>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, replacing any resource with the same uri
    pub fn register(&mut self, resource: Resource) {
        debug!(uri = %resource.uri, binary = resource.content.is_binary(), "Registered resource");
        self.resources.insert(resource.uri.clone(), resource);
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources the client can read, ordered by uri
    pub fn list(&self, caps: &Capabilities) -> Vec<ResourceDescriptor> {
        self.resources
            .values()
            .filter(|r| caps.supports_binary_content || !r.content.is_binary())
            .map(Resource::descriptor)
            .collect()
    }

    /// Read a resource for a client
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown uri and
    /// `ResourceIncompatible` for binary content the client cannot accept
    pub fn read(&self, uri: &str, caps: &Capabilities) -> Result<ResourceContents> {
        let resource = self
            .resources
            .get(uri)
            .ok_or_else(|| ClientFitError::ResourceNotFound(uri.to_string()))?;

        match &resource.content {
            ResourceContent::Binary(_) if !caps.supports_binary_content => {
                Err(ClientFitError::ResourceIncompatible {
                    uri: uri.to_string(),
                    reason: "client does not accept binary content".to_string(),
                }
                .into())
            }
            ResourceContent::Binary(bytes) => Ok(ResourceContents {
                uri: resource.uri.clone(),
                mime_type: resource.mime_type.clone(),
                text: None,
                blob: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                truncated: false,
            }),
            ResourceContent::Text(text) => {
                let formatted = format_response(&Value::String(text.clone()), caps);
                Ok(ResourceContents {
                    uri: resource.uri.clone(),
                    mime_type: resource.mime_type.clone(),
                    text: Some(formatted.text),
                    blob: None,
                    truncated: formatted.truncated,
                })
            }
        }
    }
}
