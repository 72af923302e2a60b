//! Request handlers shipped with the server binary.
//!
//! # Routes
//! - `/httpbin/<path>` relays an upstream body as a chunked response with
//!   digest trailers
//! - `/video` serves a static MP4 from the assets directory
//! - everything else gets a small HTML page

pub mod demo;

pub use demo::DemoHandler;
