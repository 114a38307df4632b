//! # streamfwd-core
//!
//! Foundation types shared by the stream forwarder crates.
//!
//! - **Node tree**: [`Node`] is the tagged `Scalar | List | Map` tree a message
//!   is converted into before field projection
//! - **Projection**: [`Projection`] parses the `fields` query parameter and
//!   prunes a [`Node`] tree with an include or exclude filter
//! - **Logging**: [`logging::init_subscriber`] installs the `tracing` subscriber

#![deny(unsafe_code)]

pub mod logging;
pub mod node;
pub mod projection;

pub use node::{Node, Scalar};
pub use projection::Projection;
