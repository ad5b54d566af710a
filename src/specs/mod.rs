//! # Model Specifications
//!
//! Concrete layer specifications that model converters populate.
//!
//! ## Common Layers
//! - [`LinearSpec`]: Dense projection (`weight`, `bias`, optional `weight_scale`)
//! - [`LayerNormSpec`]: Layer normalization (`gamma`, `beta`)
//! - [`EmbeddingsSpec`]: Embedding table
//!
//! ## Transformer
//! - [`TransformerSpec`]: Encoder-decoder model (`base()`, `big()` presets)
//! - [`MultiHeadAttentionSpec`], [`FeedForwardSpec`]: Building blocks
//!
//! ## Example
//!
//! ```ignore
//! use rustyspec::specs::TransformerSpec;
//! use rustyspec::serialization::{export_spec, ExportConfig};
//!
//! let mut spec = TransformerSpec::base();
//! spec.encoder.embeddings.weight.set(embeddings);
//! // ... fill every other variable from the source checkpoint ...
//! export_spec(&mut spec, "ende_transformer", &ExportConfig::new())?;
//! ```

pub mod common;
pub mod transformer;

pub use common::{EmbeddingsSpec, LayerNormSpec, LinearSpec};
pub use transformer::{
    FeedForwardSpec, MultiHeadAttentionSpec, TransformerDecoderLayerSpec, TransformerDecoderSpec,
    TransformerEncoderLayerSpec, TransformerEncoderSpec, TransformerSpec,
};
