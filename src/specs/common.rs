//! Общие спецификации слоев, используемые разными архитектурами.

use crate::layer_spec;
use crate::spec::Variable;

/// Полносвязный (линейный) слой `y = xWᵀ + b`.
///
/// `weight` имеет форму `[out_features, in_features]`: строки матрицы
/// соответствуют выходам, поэтому квантизация int8 дает масштаб на выход.
/// `weight_scale` появляется только после квантизации.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSpec {
    pub weight: Variable,
    pub weight_scale: Variable,
    pub bias: Variable,
}

impl LinearSpec {
    pub fn new() -> Self {
        Self {
            weight: Variable::Unset,
            weight_scale: Variable::NotProvided,
            bias: Variable::Unset,
        }
    }
}

impl Default for LinearSpec {
    fn default() -> Self {
        Self::new()
    }
}

layer_spec!(LinearSpec {
    weight: variable,
    weight_scale: variable,
    bias: variable,
});

/// Нормализация слоя: `gamma * (x - mean) / std + beta`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerNormSpec {
    pub gamma: Variable,
    pub beta: Variable,
}

layer_spec!(LayerNormSpec { gamma: variable, beta: variable });

/// Таблица embedding'ов формы `[vocab_size, depth]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingsSpec {
    pub weight: Variable,
    pub weight_scale: Variable,
}

impl EmbeddingsSpec {
    pub fn new() -> Self {
        Self {
            weight: Variable::Unset,
            weight_scale: Variable::NotProvided,
        }
    }
}

impl Default for EmbeddingsSpec {
    fn default() -> Self {
        Self::new()
    }
}

layer_spec!(EmbeddingsSpec { weight: variable, weight_scale: variable });

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{collect_variables, validate, LayerSpec};
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn test_linear_attributes_order() {
        let linear = LinearSpec::new();
        let names: Vec<&str> = linear.attributes().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["weight", "weight_scale", "bias"]);
    }

    #[test]
    fn test_unquantized_linear_has_no_scale() {
        let mut linear = LinearSpec::new();
        linear.weight.set(ArrayD::<f32>::ones(IxDyn(&[2, 3])));
        linear.bias.set(ArrayD::<f32>::zeros(IxDyn(&[2])));
        validate(&mut linear).unwrap();

        let variables = collect_variables(&linear, "");
        assert_eq!(variables.len(), 2);
        assert!(!variables.contains_key("weight_scale"));
    }

    #[test]
    fn test_layer_norm_requires_both_parameters() {
        let mut norm = LayerNormSpec::default();
        norm.gamma.set(ArrayD::<f32>::ones(IxDyn(&[4])));
        assert!(validate(&mut norm).is_err());
    }
}
