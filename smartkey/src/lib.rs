//! Foreign-binding entry point.
//!
//! Everything lives in [`smartkey_core`]; this crate only links it into the
//! `staticlib`/`cdylib` artifacts the host applications load.

pub use smartkey_core::*;

smartkey_core::uniffi_reexport_scaffolding!();
