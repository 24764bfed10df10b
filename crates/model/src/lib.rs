//! Provider-neutral vocabulary for talking to hosted text-generation
//! services.
//!
//! The assistant never talks to a concrete service directly. It builds a
//! [`ModelRequest`], hands it to a [`ModelProvider`] and drains the
//! returned [`ModelResponse`]. Providers translate these types into their
//! own wire formats, which keeps the session logic independent from any
//! particular vendor and lets tests swap in a scripted provider.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
