//! Host contracts shared by the capture coordinator and the editor.
//!
//! This crate owns the two things both sides agree on: the message envelope
//! exchanged between the popup, the long-lived coordinator and the per-page
//! selection agent, and the persistent key-value store that carries the latest
//! captured bitmap and the saved preset list across page navigations.
//!
//! | Module | Role |
//! |--------|------|
//! | [`message`] | Envelope type, op names, JSON codec |
//! | [`store`] | Key-value store contract, in-memory and directory-backed stores |

pub mod message;
pub mod store;

pub use message::{Message, Status};
pub use store::{DirStore, KeyValueStore, MemoryStore, StoreError};
