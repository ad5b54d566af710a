//! Квантизация весов спецификации в целочисленные представления.
//!
//! Квантизации подлежат листья, в полном имени которых встречается подстрока
//! `"weight"`. Это соглашение между авторами спецификаций и квантизатором:
//! любой атрибут, названный как тензор весов, на любой глубине, будет заменен
//! целочисленным тензором, а на том же узле появится атрибут `weight_scale`.
//!
//! Квантизация разрушающая: исходные веса теряются, повторный вызов
//! не защищен (имя `weight_scale` тоже проходит фильтр).

use crate::spec::visitor::visit_spec_mut;
use crate::spec::{LayerSpec, Result, SpecError, Variable};
use crate::tensor::Tensor;
use ndarray::{arr0, Array1, Array2, ArrayD, Ix2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Имя атрибута, в который записывается масштаб.
pub const WEIGHT_SCALE: &str = "weight_scale";

/// Подстрока имени, по которой лист считается весами.
const WEIGHT_GATE: &str = "weight";

/// Значение int16 занимает 10 бит: произведение двух значений укладывается
/// в 20 бит, и еще 12 бит остаются на накопление в 32-битном сумматоре.
const INT16_SCALE_NUMERATOR: f32 = (1 << 10) as f32;

const INT8_MAX: f32 = 127.0;

/// Режим квантизации.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    #[default]
    None,
    Int16,
    Int8,
}

impl FromStr for Quantization {
    type Err = SpecError;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "none" => Ok(Quantization::None),
            "int16" => Ok(Quantization::Int16),
            "int8" => Ok(Quantization::Int8),
            other => Err(SpecError::UnsupportedQuantization(other.to_string())),
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            Quantization::None => "none",
            Quantization::Int16 => "int16",
            Quantization::Int8 => "int8",
        };
        f.write_str(mode)
    }
}

/// Квантизует веса дерева на месте.
///
/// - `Int16`: один скалярный масштаб `2^10 / max(|W|)` на тензор,
///   значения обрезаются по диапазону int16;
/// - `Int8`: масштаб `127 / max(|W[i, :]|)` на каждую строку матрицы;
/// - `None`: ничего не меняет.
///
/// Веса `float16` сначала приводятся к `float32`, как это делает
/// [`validate`](crate::spec::validate), поэтому масштаб всегда `float32`.
/// Целочисленные веса дают `UnsupportedDtype`.
///
/// Квантизация не транзакционна: при ошибке уже обработанные тензоры
/// остаются квантизованными вместе со своим `weight_scale`.
pub fn quantize(spec: &mut dyn LayerSpec, mode: Quantization) -> Result<()> {
    if mode == Quantization::None {
        return Ok(());
    }

    visit_spec_mut(spec, |leaf| {
        if !leaf.name().contains(WEIGHT_GATE) {
            return Ok(());
        }
        let weight = match leaf.value() {
            Variable::Value(tensor) => tensor,
            _ => return Ok(()),
        };
        let promoted = weight.promote_half();
        let values = promoted.as_ref().unwrap_or(weight).as_f32().ok_or_else(|| SpecError::UnsupportedDtype {
            name: leaf.name().to_string(),
            dtype: weight.dtype(),
        })?;

        let (quantized, scale) = match mode {
            Quantization::Int16 => quantize_int16(values),
            Quantization::Int8 => quantize_int8(leaf.name(), values)?,
            Quantization::None => return Ok(()),
        };

        tracing::debug!("quantized {} to {}", leaf.name(), quantized.dtype());
        leaf.replace(Variable::Value(quantized));
        leaf.set_sibling(WEIGHT_SCALE, Variable::Value(scale));
        Ok(())
    })
}

fn max_abs<'a>(values: impl IntoIterator<Item = &'a f32>) -> f32 {
    values.into_iter().fold(0.0f32, |acc, x| acc.max(x.abs()))
}

// Нулевой тензор оставляем с единичным масштабом, иначе масштаб бесконечен.
fn scale_for(numerator: f32, max: f32) -> f32 {
    if max > 0.0 {
        numerator / max
    } else {
        1.0
    }
}

fn quantize_int16(values: &ArrayD<f32>) -> (Tensor, Tensor) {
    let scale = scale_for(INT16_SCALE_NUMERATOR, max_abs(values));
    let quantized = values.mapv(|x| (x * scale).clamp(i16::MIN as f32, i16::MAX as f32) as i16);
    (Tensor::I16(quantized), Tensor::F32(arr0(scale).into_dyn()))
}

fn quantize_int8(name: &str, values: &ArrayD<f32>) -> Result<(Tensor, Tensor)> {
    let matrix = values
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| SpecError::InvalidShape {
            name: name.to_string(),
            shape: values.shape().to_vec(),
        })?;

    let scales = Array1::from_iter(
        matrix
            .outer_iter()
            .map(|row| scale_for(INT8_MAX, max_abs(row.iter()))),
    );
    let quantized = Array2::from_shape_fn(matrix.dim(), |(i, j)| (matrix[[i, j]] * scales[i]) as i8);

    Ok((Tensor::I8(quantized.into_dyn()), Tensor::F32(scales.into_dyn())))
}
