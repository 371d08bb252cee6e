//! Error types for `nestly-core`.
//!
//! Decode failures are expected (links get truncated, mangled by chat apps,
//! or come from somewhere else entirely) and callers recover from them.
//! Cipher errors never carry key material, passwords, or plaintext.

use nestly_storage::StorageError;

/// A token could not be turned back into text or a document.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The token was empty.
    #[error("token is empty")]
    Empty,

    /// The token contains characters outside the expected alphabet, or is
    /// truncated.
    #[error("token is not valid {alphabet}: {reason}")]
    Alphabet {
        alphabet: &'static str,
        reason: String,
    },

    /// The decoded bytes are not valid UTF-8.
    #[error("decoded bytes are not valid UTF-8: {reason}")]
    Utf8 { reason: String },

    /// Decompression failed or produced more output than allowed.
    #[error("decompression failed: {reason}")]
    Decompress { reason: String },

    /// The decoded text is not JSON of the expected shape.
    #[error("decoded text is not a valid document: {reason}")]
    Document { reason: String },
}

/// A document could not be encoded.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The document cannot be represented as JSON (e.g. a map with
    /// non-string keys). This is a bug in the calling tool.
    #[error("document is not JSON-serializable: {reason}")]
    Serialization { reason: String },

    /// The compressor failed to write its output.
    #[error("compression failed: {reason}")]
    Compression { reason: String },
}

/// A link fragment could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The fragment names no tool (the dashboard).
    #[error("link has no tool")]
    NoTool,

    /// The fragment names a tool that does not exist.
    #[error("unknown tool '{tool}'")]
    UnknownTool { tool: String },
}

/// Errors from the recent-activity ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The entries could not be serialized for storage.
    #[error("ledger serialization failed: {reason}")]
    Serialization { reason: String },

    /// The storage backend failed.
    #[error("ledger storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the lockbox cipher.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// Wrong password, corrupted package, or tampered package. These cases
    /// are deliberately indistinguishable.
    #[error("incorrect password")]
    AuthenticationFailure,

    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// The package could not be serialized into a token.
    #[error("package serialization failed: {reason}")]
    Serialization { reason: String },

    /// The blocking worker running the key derivation did not complete.
    #[error("cipher task failed: {reason}")]
    Task { reason: String },
}
