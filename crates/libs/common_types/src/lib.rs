#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod doc;
mod kv;
mod wire;

pub use doc::*;
pub use kv::*;
pub use wire::*;
