//! # pixrec: image transfer CLI
//!
//! Loads an image, encodes it into pixrec records and sends it over TCP or
//! UDP, or binds a port, rebuilds an incoming image and saves it.
//!
//! ## Modes
//!
//! - **tcp**: records back-to-back over one accepted connection.
//! - **udp**: one record per datagram; lost pixels stay black.

pub mod config;
pub mod imaging;
pub mod sequence;
pub mod service;
