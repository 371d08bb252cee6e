//! Link grammar: `#tool:token`.
//!
//! The fragment is the whole database. A link without a token (or with an
//! empty one) opens the tool on its default document.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::codec;
use crate::error::{CodecError, LinkError};
use crate::tool::ToolId;

/// Separator between the tool name and the token.
pub const SEPARATOR: char = ':';

/// A parsed shareable link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    tool: ToolId,
    token: Option<String>,
}

impl Link {
    /// A link carrying `token`. An empty token is treated as none.
    #[must_use]
    pub fn new(tool: ToolId, token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            tool,
            token: (!token.is_empty()).then_some(token),
        }
    }

    /// A link that opens `tool` on its default document.
    #[must_use]
    pub fn fresh(tool: ToolId) -> Self {
        Self { tool, token: None }
    }

    /// Encode `doc` and wrap it in a link for `tool`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the document cannot be encoded.
    pub fn for_document<T: Serialize + ?Sized>(tool: ToolId, doc: &T) -> Result<Self, CodecError> {
        Ok(Self::new(tool, codec::encode(doc)?))
    }

    /// Parse a fragment (`#grocery:...`), a bare `grocery:...`, or a full URL
    /// whose fragment has that form.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NoTool`] for an empty fragment (the dashboard).
    /// - [`LinkError::UnknownTool`] if the tool name is not recognized.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let input = input.trim();
        let fragment = input.split_once('#').map_or(input, |(_, fragment)| fragment);
        let (tool, token) = fragment
            .split_once(SEPARATOR)
            .unwrap_or((fragment, ""));
        Ok(Self::new(tool.parse()?, token))
    }

    #[must_use]
    pub fn tool(&self) -> ToolId {
        self.tool
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The document this link carries, or the tool's default when the token
    /// is missing, corrupt, or of the wrong shape.
    ///
    /// Returns `None` for lockbox links; use [`crate::lockbox::Package`].
    #[must_use]
    pub fn document(&self) -> Option<Value> {
        let fallback = self.tool.default_document()?;
        Some(codec::decode_shaped(self.token(), fallback))
    }

    /// The fragment form, `#tool:token` or `#tool`.
    #[must_use]
    pub fn fragment(&self) -> String {
        match &self.token {
            Some(token) => format!("#{}{SEPARATOR}{token}", self.tool),
            None => format!("#{}", self.tool),
        }
    }

    /// Attach this link to a page URL, replacing any existing fragment.
    #[must_use]
    pub fn to_url(&self, base: &str) -> String {
        let base = base.split_once('#').map_or(base, |(page, _)| page);
        format!("{base}{}", self.fragment())
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fragment())
    }
}

impl FromStr for Link {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
