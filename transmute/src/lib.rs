//! Decodes WebAssembly binary modules and rewrites them as structured C.

#[macro_use]
extern crate log;

use std::io::{Cursor, Read};

pub mod error;
pub mod parse_tree;
pub mod parser;
pub mod rewriter;

#[cfg(test)]
mod testing;

pub use crate::error::TranslateError;
pub use crate::parse_tree::Module;

/// Support code every generated file includes as `wasm_rt.h`.
pub const RUNTIME_HEADER: &str = include_str!("../runtime/wasm_rt.h");

/// Where generated names live: every symbol is prefixed with
/// `<namespace>_<container>`, or just the container when the namespace is
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateOptions {
    pub namespace: String,
    pub container: String,
    /// Linear memory allocated by `<prefix>_init` when the module neither
    /// imports nor declares one.
    pub memory_pages: u32,
}

impl Default for TranslateOptions {
    fn default() -> TranslateOptions {
        TranslateOptions {
            namespace: "Wasm".to_string(),
            container: "Module".to_string(),
            memory_pages: 16,
        }
    }
}

pub fn decode<R: Read>(reader: R) -> Result<Module, TranslateError> {
    parser::parse_module(reader)
}

/// Decodes `bytes` and rewrites the whole module as one C file.
pub fn translate(bytes: &[u8], options: &TranslateOptions) -> Result<String, TranslateError> {
    info!("Translating {} bytes", bytes.len());
    let module = decode(Cursor::new(bytes))?;
    rewriter::translate_module(&module, options)
}
