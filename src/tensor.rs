//! Модуль, определяющий `Tensor` — конкретное значение листа спецификации.
//!
//! В отличие от графовых фреймворков, здесь тензор всегда содержит данные:
//! это многомерный массив `ndarray` одного из типов, которые понимает
//! нативный рантайм (плюс `float16`, который допускается только до валидации).

use half::f16;
use ndarray::{ArrayD, IxDyn, ShapeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Тип элементов тензора.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    F16,
    I32,
    I16,
    I8,
}

impl DType {
    /// Размер одного элемента в байтах.
    pub fn item_size(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::F16 | DType::I16 => 2,
            DType::I8 => 1,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F16)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "float32",
            DType::F16 => "float16",
            DType::I32 => "int32",
            DType::I16 => "int16",
            DType::I8 => "int8",
        };
        f.write_str(name)
    }
}

/// Многомерный числовой тензор с динамической размерностью.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    F32(ArrayD<f32>),
    F16(ArrayD<f16>),
    I32(ArrayD<i32>),
    I16(ArrayD<i16>),
    I8(ArrayD<i8>),
}

// Применяет одно и то же выражение к массиву любого типа.
macro_rules! each_array {
    ($tensor:expr, $arr:ident => $body:expr) => {
        match $tensor {
            Tensor::F32($arr) => $body,
            Tensor::F16($arr) => $body,
            Tensor::I32($arr) => $body,
            Tensor::I16($arr) => $body,
            Tensor::I8($arr) => $body,
        }
    };
}

impl Tensor {
    pub fn dtype(&self) -> DType {
        match self {
            Tensor::F32(_) => DType::F32,
            Tensor::F16(_) => DType::F16,
            Tensor::I32(_) => DType::I32,
            Tensor::I16(_) => DType::I16,
            Tensor::I8(_) => DType::I8,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_array!(self, arr => arr.shape())
    }

    /// Ранг тензора (количество осей).
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Общее количество элементов.
    pub fn len(&self) -> usize {
        each_array!(self, arr => arr.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn item_size(&self) -> usize {
        self.dtype().item_size()
    }

    /// Возвращает данные тензора в порядке row-major, little-endian.
    ///
    /// Итерация `ndarray` идет в логическом порядке индексов, поэтому
    /// результат не зависит от раскладки массива в памяти.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len() * self.item_size());
        match self {
            Tensor::F32(arr) => arr.iter().for_each(|x| bytes.extend_from_slice(&x.to_le_bytes())),
            Tensor::F16(arr) => arr.iter().for_each(|x| bytes.extend_from_slice(&x.to_le_bytes())),
            Tensor::I32(arr) => arr.iter().for_each(|x| bytes.extend_from_slice(&x.to_le_bytes())),
            Tensor::I16(arr) => arr.iter().for_each(|x| bytes.extend_from_slice(&x.to_le_bytes())),
            Tensor::I8(arr) => arr.iter().for_each(|x| bytes.extend_from_slice(&x.to_le_bytes())),
        }
        bytes
    }

    /// Восстанавливает тензор из сырых little-endian байтов.
    ///
    /// Возвращает ошибку формы, если длина `bytes` не соответствует `shape`.
    pub fn from_le_bytes(dtype: DType, shape: &[usize], bytes: &[u8]) -> Result<Self, ShapeError> {
        let shape = IxDyn(shape);
        let tensor = match dtype {
            DType::F32 => Tensor::F32(ArrayD::from_shape_vec(
                shape,
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            )?),
            DType::F16 => Tensor::F16(ArrayD::from_shape_vec(
                shape,
                bytes
                    .chunks_exact(2)
                    .map(|c| f16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            )?),
            DType::I32 => Tensor::I32(ArrayD::from_shape_vec(
                shape,
                bytes
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            )?),
            DType::I16 => Tensor::I16(ArrayD::from_shape_vec(
                shape,
                bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            )?),
            DType::I8 => Tensor::I8(ArrayD::from_shape_vec(
                shape,
                bytes.iter().map(|&b| b as i8).collect(),
            )?),
        };
        Ok(tensor)
    }

    /// Копия `float16`-тензора, приведенная к `float32`.
    ///
    /// Для остальных типов возвращает `None`: приводить нечего.
    pub fn promote_half(&self) -> Option<Tensor> {
        match self {
            Tensor::F16(arr) => Some(Tensor::F32(arr.mapv(f16::to_f32))),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            Tensor::F32(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&ArrayD<i16>> {
        match self {
            Tensor::I16(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<&ArrayD<i8>> {
        match self {
            Tensor::I8(arr) => Some(arr),
            _ => None,
        }
    }
}

macro_rules! impl_from_array {
    ($($elem:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<ArrayD<$elem>> for Tensor {
                fn from(arr: ArrayD<$elem>) -> Self {
                    Tensor::$variant(arr)
                }
            }
        )*
    };
}

impl_from_array!(f32 => F32, f16 => F16, i32 => I32, i16 => I16, i8 => I8);
