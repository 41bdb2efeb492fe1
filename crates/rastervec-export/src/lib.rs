//! rastervec-export: Pure document serializers (sans-IO)
//!
//! Receives shapes from the pipeline's emitter and renders them into an
//! output format. Currently supports SVG.

pub mod svg;

pub use svg::{SvgDocument, SvgMetadata};
