//! # Docshelf
//!
//! Collection lifecycle and cross-entity consistency engine for
//! document-collection chat backends.
//!
//! Users group uploaded files into named, checksum-tracked collections and
//! hold conversations that reference any number of them. The backing
//! document store is schemaless — no foreign keys, no cascading deletes,
//! no cross-entity transactions — so this crate supplies the two hard
//! pieces: dynamic filtered/paginated queries built from a shared predicate
//! tree, and procedural referential integrity between collections and
//! conversations via a best-effort background cascade.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌─────────────┐   ┌──────────────────┐
//! │  Collections  │──▶│  Predicate  │──▶│  DocumentStore   │
//! │ Conversations │   │    tree     │   │ memory | sqlite  │
//! └───────┬───────┘   └──────┬──────┘   └──────────────────┘
//!         │                  ▼
//!         │           ┌─────────────┐   ┌──────────────────┐
//!         └──────────▶│  Reference  │   │    BlobStore     │
//!    delete/revoke    │   cascade   │   │  (prefix list)   │
//!    (spawned task)   └─────────────┘   └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`filter`] | Predicate trees and boundary coercion |
//! | [`store`] | Document store abstraction and backends |
//! | [`blob`] | Blob store abstraction |
//! | [`files`] | File validation and in-memory filtered listing |
//! | [`collections`] | Collection manager |
//! | [`conversations`] | Conversation service |
//! | [`propagate`] | Weak-reference cascade |

pub mod blob;
pub mod collections;
pub mod config;
pub mod conversations;
pub mod error;
pub mod files;
pub mod filter;
pub mod models;
pub mod propagate;
pub mod store;
