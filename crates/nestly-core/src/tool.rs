//! Tool registry.
//!
//! Each tool owns one document schema. The core does not enforce those
//! schemas; it only knows each tool's fresh document so a bad link can
//! degrade to "start fresh".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::LinkError;

/// Title recorded for documents without one.
pub const UNTITLED: &str = "Untitled";

/// A Nestly tool. The lowercase name is the first half of every link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolId {
    Grocery,
    Chores,
    Recipes,
    Packing,
    Itinerary,
    Wishlist,
    Emergency,
    Lockbox,
}

impl ToolId {
    /// Every tool, in dashboard order.
    pub const ALL: [Self; 8] = [
        Self::Grocery,
        Self::Chores,
        Self::Recipes,
        Self::Packing,
        Self::Itinerary,
        Self::Wishlist,
        Self::Emergency,
        Self::Lockbox,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grocery => "grocery",
            Self::Chores => "chores",
            Self::Recipes => "recipes",
            Self::Packing => "packing",
            Self::Itinerary => "itinerary",
            Self::Wishlist => "wishlist",
            Self::Emergency => "emergency",
            Self::Lockbox => "lockbox",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Grocery => "Grocery List",
            Self::Chores => "Chore List",
            Self::Recipes => "Recipe",
            Self::Packing => "Packing List",
            Self::Itinerary => "Travel Plan",
            Self::Wishlist => "Wishlist",
            Self::Emergency => "Emergency Info",
            Self::Lockbox => "Lockbox",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Grocery => "🛒",
            Self::Chores => "🧹",
            Self::Recipes => "📖",
            Self::Packing => "📦",
            Self::Itinerary => "✈️",
            Self::Wishlist => "🎁",
            Self::Emergency => "🏥",
            Self::Lockbox => "🔒",
        }
    }

    /// Lockbox tokens carry a sealed package, not a document.
    #[must_use]
    pub fn is_sealed(self) -> bool {
        self == Self::Lockbox
    }

    /// The document a tool starts from when a link has no usable token.
    ///
    /// Returns `None` for the lockbox.
    #[must_use]
    pub fn default_document(self) -> Option<Value> {
        let doc = match self {
            Self::Grocery => json!({"t": "Grocery List", "i": []}),
            Self::Chores => json!({"t": "Weekly Chores", "i": []}),
            Self::Packing => json!({"t": "Packing List", "i": []}),
            Self::Wishlist => json!({"t": "My Wishlist", "i": []}),
            Self::Recipes => json!({"t": "New Recipe", "m": {"p": "", "s": ""}, "i": "", "d": ""}),
            Self::Itinerary => json!({"t": "Trip Name", "d": "", "f": "", "h": "", "p": ""}),
            Self::Emergency => {
                json!({"t": "House Info", "w": {"s": "", "p": ""}, "c": [], "n": ""})
            }
            Self::Lockbox => return None,
        };
        Some(doc)
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(LinkError::NoTool);
        }
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| LinkError::UnknownTool { tool: s.to_owned() })
    }
}

/// The title shown in the ledger: the document's `t` field, or
/// [`UNTITLED`] when it is missing, blank, or not a string.
#[must_use]
pub fn document_title(doc: &Value) -> &str {
    doc.get("t")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
}
