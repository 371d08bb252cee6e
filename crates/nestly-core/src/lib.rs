//! Core library for Nestly.
//!
//! Every Nestly document lives in its link. This crate turns documents into
//! URL-fragment tokens and back ([`codec`], built on [`text`]), parses and
//! renders the `#tool:token` grammar ([`link`], [`tool`]), keeps the bounded
//! list of recently touched links ([`ledger`]), and seals lockbox notes
//! under a password ([`lockbox`]).
//!
//! Nothing here talks to the network. The ledger is the only stateful part
//! and it persists through an injected `nestly-storage` backend.

pub mod codec;
pub mod error;
pub mod ledger;
pub mod link;
pub mod lockbox;
pub mod text;
pub mod tool;
