//! Спецификация модели Трансформер (кодировщик-декодировщик).
//!
//! Имена областей совпадают с теми, по которым нативный рантайм ищет
//! переменные, например `encoder/layer_0/self_attention/linear_0/weight`.

use super::common::{EmbeddingsSpec, LayerNormSpec, LinearSpec};
use crate::layer_spec;
use crate::spec::{ModelSpec, Variable};
use ndarray::arr0;

/// Блок внимания с нормализацией на входе.
///
/// Для self-attention проекции `linear` — это `[qkv, out]`, для внимания
/// к памяти кодировщика — `[query, memory (kv), out]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiHeadAttentionSpec {
    pub layer_norm: LayerNormSpec,
    pub linear: Vec<LinearSpec>,
}

impl MultiHeadAttentionSpec {
    pub fn new(self_attention: bool) -> Self {
        let num_projections = if self_attention { 2 } else { 3 };
        Self {
            layer_norm: LayerNormSpec::default(),
            linear: (0..num_projections).map(|_| LinearSpec::new()).collect(),
        }
    }
}

layer_spec!(MultiHeadAttentionSpec { layer_norm: layer, linear: layers });

/// Позиционный FeedForward: `Linear -> ReLU -> Linear` с нормализацией на входе.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedForwardSpec {
    pub layer_norm: LayerNormSpec,
    pub linear_0: LinearSpec,
    pub linear_1: LinearSpec,
}

layer_spec!(FeedForwardSpec {
    layer_norm: layer,
    linear_0: layer,
    linear_1: layer,
});

/// Один слой кодировщика.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerEncoderLayerSpec {
    pub self_attention: MultiHeadAttentionSpec,
    pub ffn: FeedForwardSpec,
}

impl Default for TransformerEncoderLayerSpec {
    fn default() -> Self {
        Self {
            self_attention: MultiHeadAttentionSpec::new(true),
            ffn: FeedForwardSpec::default(),
        }
    }
}

layer_spec!(TransformerEncoderLayerSpec { self_attention: layer, ffn: layer });

/// Один слой декодировщика.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerDecoderLayerSpec {
    pub self_attention: MultiHeadAttentionSpec,
    pub attention: MultiHeadAttentionSpec,
    pub ffn: FeedForwardSpec,
}

impl Default for TransformerDecoderLayerSpec {
    fn default() -> Self {
        Self {
            self_attention: MultiHeadAttentionSpec::new(true),
            attention: MultiHeadAttentionSpec::new(false),
            ffn: FeedForwardSpec::default(),
        }
    }
}

layer_spec!(TransformerDecoderLayerSpec {
    self_attention: layer,
    attention: layer,
    ffn: layer,
});

#[derive(Debug, Clone, PartialEq)]
pub struct TransformerEncoderSpec {
    pub embeddings: EmbeddingsSpec,
    pub layer_norm: LayerNormSpec,
    pub layer: Vec<TransformerEncoderLayerSpec>,
}

impl TransformerEncoderSpec {
    pub fn new(num_layers: usize) -> Self {
        Self {
            embeddings: EmbeddingsSpec::new(),
            layer_norm: LayerNormSpec::default(),
            layer: (0..num_layers).map(|_| TransformerEncoderLayerSpec::default()).collect(),
        }
    }
}

layer_spec!(TransformerEncoderSpec {
    embeddings: layer,
    layer_norm: layer,
    layer: layers,
});

#[derive(Debug, Clone, PartialEq)]
pub struct TransformerDecoderSpec {
    pub embeddings: EmbeddingsSpec,
    pub layer_norm: LayerNormSpec,
    pub projection: LinearSpec,
    pub layer: Vec<TransformerDecoderLayerSpec>,
}

impl TransformerDecoderSpec {
    pub fn new(num_layers: usize) -> Self {
        Self {
            embeddings: EmbeddingsSpec::new(),
            layer_norm: LayerNormSpec::default(),
            projection: LinearSpec::new(),
            layer: (0..num_layers).map(|_| TransformerDecoderLayerSpec::default()).collect(),
        }
    }
}

layer_spec!(TransformerDecoderSpec {
    embeddings: layer,
    layer_norm: layer,
    projection: layer,
    layer: layers,
});

/// Полная модель Трансформер.
///
/// Количество голов хранится в самой модели как скаляр `int16`,
/// поэтому рантайму не нужна отдельная конфигурация.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerSpec {
    name: &'static str,
    pub num_heads: Variable,
    pub encoder: TransformerEncoderSpec,
    pub decoder: TransformerDecoderSpec,
}

impl TransformerSpec {
    /// Трансформер с произвольным числом слоев и голов.
    pub fn new(num_layers: usize, num_heads: i16) -> Self {
        Self::with_name("TransformerSpec", num_layers, num_heads)
    }

    /// Конфигурация Transformer Base: 6 слоев, 8 голов.
    pub fn base() -> Self {
        Self::with_name("TransformerBase", 6, 8)
    }

    /// Конфигурация Transformer Big: 6 слоев, 16 голов.
    pub fn big() -> Self {
        Self::with_name("TransformerBig", 6, 16)
    }

    fn with_name(name: &'static str, num_layers: usize, num_heads: i16) -> Self {
        Self {
            name,
            num_heads: Variable::from(arr0(num_heads).into_dyn()),
            encoder: TransformerEncoderSpec::new(num_layers),
            decoder: TransformerDecoderSpec::new(num_layers),
        }
    }
}

layer_spec!(TransformerSpec {
    num_heads: variable,
    encoder: layer,
    decoder: layer,
});

impl ModelSpec for TransformerSpec {
    fn variant_name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{validate, visit_spec, SpecError};

    fn leaf_names(spec: &TransformerSpec) -> Vec<String> {
        let mut names = Vec::new();
        visit_spec(spec, |name, _| names.push(name.to_string()));
        names
    }

    #[test]
    fn test_scoped_names_match_runtime_layout() {
        let spec = TransformerSpec::new(2, 4);
        let names = leaf_names(&spec);

        assert_eq!(names[0], "num_heads");
        assert_eq!(names[1], "encoder/embeddings/weight");
        for expected in [
            "encoder/layer_0/self_attention/linear_0/weight",
            "encoder/layer_1/self_attention/linear_1/bias",
            "encoder/layer_1/ffn/layer_norm/gamma",
            "decoder/layer_0/attention/linear_2/weight_scale",
            "decoder/layer_1/ffn/linear_1/weight",
            "decoder/projection/weight",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert!(!names.iter().any(|n| n.starts_with("encoder/layer_2")));
    }

    #[test]
    fn test_presets() {
        let base = TransformerSpec::base();
        assert_eq!(base.variant_name(), "TransformerBase");
        assert_eq!(base.revision(), 1);
        assert_eq!(base.encoder.layer.len(), 6);
        assert_eq!(
            base.num_heads.as_tensor().and_then(|t| t.as_i16()).and_then(|a| a.iter().next().copied()),
            Some(8)
        );

        let big = TransformerSpec::big();
        assert_eq!(big.variant_name(), "TransformerBig");
        assert_eq!(big.decoder.layer.len(), 6);
    }

    #[test]
    fn test_fresh_spec_reports_first_missing_variable() {
        let mut spec = TransformerSpec::new(1, 2);
        assert_eq!(
            validate(&mut spec),
            Err(SpecError::MissingValue("encoder/embeddings/weight".to_string()))
        );
    }
}
