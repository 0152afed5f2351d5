//! Per-cluster I/O stages of the quiz pipeline.
//!
//! Each submodule owns one step and, where it touches the outside world, the
//! trait that lets tests swap in a fake.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ render ──▶ encode ──▶ generate ──▶ parse
//! (blob)    (pdfium)   (base64)   (VLM)        (JSON)
//! ```
//!
//! 1. [`fetch`]    download document bytes by key ([`fetch::BlobStore`])
//! 2. [`render`]   rasterise single pages into the quiz work directory; runs
//!    in `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]   read a rendered image back and base64-wrap it for the
//!    multimodal request body
//! 4. [`generate`] one VLM call per cluster, no retry
//! 5. [`parse`]    strip fences and decode the JSON question array

pub mod encode;
pub mod fetch;
pub mod generate;
pub mod parse;
pub mod render;
