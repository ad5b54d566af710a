//! # RustySpec: Model Specifications and the Binary Model Format
//!
//! **RustySpec** describes the parameter layout of a neural network as a tree of
//! named layer specifications, checks that the tree is complete, optionally
//! quantizes its weights and writes it to the versioned binary format read by
//! the native inference runtime.
//!
//! ## Usage Example
//!
//! ```no_run
//! use ndarray::{ArrayD, IxDyn};
//! use rustyspec::quantize::Quantization;
//! use rustyspec::serialization::{export_spec, ExportConfig};
//! use rustyspec::spec::{visit_spec_mut, Variable};
//! use rustyspec::specs::TransformerSpec;
//!
//! // 1. Declare the model layout
//! let mut spec = TransformerSpec::new(2, 4);
//!
//! // 2. Fill the variables (normally done by a checkpoint converter)
//! visit_spec_mut(&mut spec, |leaf| {
//!     if leaf.value().is_unset() {
//!         leaf.replace(Variable::from(ArrayD::<f32>::zeros(IxDyn(&[8, 8]))));
//!     }
//!     Ok(())
//! })?;
//!
//! // 3. Validate, quantize and serialize
//! let config = ExportConfig::new().with_quantization(Quantization::Int8);
//! export_spec(&mut spec, "transformer_model", &config)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Declare public modules that constitute the core library API.
pub mod quantize;
pub mod serialization;
pub mod spec;
pub mod specs;
pub mod tensor;
