//! Спецификации слоев: декларативное описание раскладки переменных модели.
//!
//! Спецификация — это дерево узлов [`LayerSpec`]. Каждый узел перечисляет свои
//! атрибуты в стабильном порядке; атрибут бывает:
//! - листом [`Variable`] (тензор, маркер "не предоставлено" или незаданное значение),
//! - вложенным узлом,
//! - упорядоченной последовательностью узлов (элементы получают суффикс `_<индекс>`).
//!
//! Конвертер модели заполняет дерево, после чего вызывает
//! [`validate`] → [`crate::quantize::quantize`] → сериализацию.
//!
//! # Пример
//!
//! ```rust,ignore
//! use rustyspec::layer_spec;
//! use rustyspec::spec::Variable;
//!
//! #[derive(Default)]
//! struct DenseSpec {
//!     weight: Variable,
//!     bias: Variable,
//! }
//!
//! layer_spec!(DenseSpec { weight: variable, bias: variable });
//! ```

pub mod validate;
pub mod variables;
pub mod visitor;

pub use validate::validate;
pub use variables::collect_variables;
pub use visitor::{visit_spec, visit_spec_mut, Leaf};

use crate::tensor::{DType, Tensor};
use ndarray::ArrayD;
use thiserror::Error;

/// Ошибки при обработке дерева спецификации.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecError {
    #[error("Не задано значение атрибута {0}")]
    MissingValue(String),

    #[error("Неподдерживаемый режим квантизации: {0}")]
    UnsupportedQuantization(String),

    #[error("Атрибут {name} имеет неподдерживаемый тип {dtype}")]
    UnsupportedDtype { name: String, dtype: DType },

    #[error("Атрибут {name} имеет неподходящую форму {shape:?}")]
    InvalidShape { name: String, shape: Vec<usize> },

    #[error("Узел '{scope}' не объявляет атрибут {name}")]
    UndeclaredAttribute { scope: String, name: String },
}

pub type Result<T> = std::result::Result<T, SpecError>;

/// Значение листового атрибута спецификации.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variable {
    /// Обязательное значение, которое конвертер еще не заполнил.
    #[default]
    Unset,
    /// Атрибут законно отсутствует (например, необязательное смещение).
    /// Не попадает в таблицу переменных и не считается пропуском.
    NotProvided,
    /// Заданный тензор.
    Value(Tensor),
}

impl Variable {
    pub fn is_unset(&self) -> bool {
        matches!(self, Variable::Unset)
    }

    pub fn is_not_provided(&self) -> bool {
        matches!(self, Variable::NotProvided)
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Variable::Value(tensor) => Some(tensor),
            _ => None,
        }
    }

    /// Заменяет значение тензором и возвращает прежнее.
    pub fn set(&mut self, tensor: impl Into<Tensor>) -> Variable {
        std::mem::replace(self, Variable::Value(tensor.into()))
    }
}

impl From<Tensor> for Variable {
    fn from(tensor: Tensor) -> Self {
        Variable::Value(tensor)
    }
}

impl<A> From<ArrayD<A>> for Variable
where
    ArrayD<A>: Into<Tensor>,
{
    fn from(arr: ArrayD<A>) -> Self {
        Variable::Value(arr.into())
    }
}

/// Неизменяемая ссылка на атрибут узла.
pub enum AttrRef<'a> {
    Variable(&'a Variable),
    Layer(&'a dyn LayerSpec),
    Layers(Vec<&'a dyn LayerSpec>),
}

impl<'a> AttrRef<'a> {
    pub fn variable(value: &'a Variable) -> Self {
        AttrRef::Variable(value)
    }

    pub fn layer<T: LayerSpec>(layer: &'a T) -> Self {
        AttrRef::Layer(layer)
    }

    pub fn layers<T: LayerSpec>(layers: &'a [T]) -> Self {
        AttrRef::Layers(layers.iter().map(|l| l as &dyn LayerSpec).collect())
    }
}

/// Изменяемая ссылка на атрибут узла.
pub enum AttrMut<'a> {
    Variable(&'a mut Variable),
    Layer(&'a mut dyn LayerSpec),
    Layers(Vec<&'a mut dyn LayerSpec>),
}

impl<'a> AttrMut<'a> {
    pub fn variable(value: &'a mut Variable) -> Self {
        AttrMut::Variable(value)
    }

    pub fn layer<T: LayerSpec>(layer: &'a mut T) -> Self {
        AttrMut::Layer(layer)
    }

    pub fn layers<T: LayerSpec>(layers: &'a mut [T]) -> Self {
        AttrMut::Layers(layers.iter_mut().map(|l| l as &mut dyn LayerSpec).collect())
    }
}

/// Узел дерева спецификации.
///
/// Оба метода обязаны возвращать одни и те же атрибуты в одном и том же
/// порядке: от этого зависит детерминированность обхода. Обычно реализация
/// генерируется макросом [`layer_spec!`](crate::layer_spec).
pub trait LayerSpec {
    /// Объявленные атрибуты узла в порядке объявления.
    fn attributes(&self) -> Vec<(&str, AttrRef<'_>)>;

    fn attributes_mut(&mut self) -> Vec<(&str, AttrMut<'_>)>;

    /// Листовой атрибут по локальному имени.
    fn variable(&self, name: &str) -> Option<&Variable> {
        self.attributes()
            .into_iter()
            .find_map(|(attr, value)| match value {
                AttrRef::Variable(variable) if attr == name => Some(variable),
                _ => None,
            })
    }

    /// Записывает лист по локальному имени.
    ///
    /// Возвращает `false`, если узел не объявляет такой листовой атрибут.
    fn set_variable(&mut self, name: &str, value: Variable) -> bool {
        let slot = self
            .attributes_mut()
            .into_iter()
            .find_map(|(attr, attribute)| match attribute {
                AttrMut::Variable(variable) if attr == name => Some(variable),
                _ => None,
            });
        match slot {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Корень спецификации конкретной модели.
pub trait ModelSpec: LayerSpec {
    /// Идентификатор варианта, по которому загрузчик выбирает архитектуру.
    fn variant_name(&self) -> &str;

    /// Ревизия спецификации данного варианта.
    fn revision(&self) -> u32 {
        1
    }
}

/// Объединяет область видимости и имя через `/`.
pub fn join_scope(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", scope, name)
    }
}

/// Последний сегмент полного имени, т.е. локальное имя атрибута.
pub fn local_name(scope: &str) -> &str {
    scope.rsplit('/').next().unwrap_or(scope)
}

/// Реализует [`LayerSpec`] для структуры, перечисляя ее поля-атрибуты.
///
/// Вид каждого поля указывается явно: `variable` для [`Variable`],
/// `layer` для вложенной спецификации и `layers` для `Vec` спецификаций.
///
/// ```rust,ignore
/// layer_spec!(FeedForwardSpec {
///     layer_norm: layer,
///     linear_0: layer,
///     linear_1: layer,
/// });
/// ```
#[macro_export]
macro_rules! layer_spec {
    ($ty:ty { $($field:ident: $kind:ident),* $(,)? }) => {
        impl $crate::spec::LayerSpec for $ty {
            fn attributes(&self) -> ::std::vec::Vec<(&str, $crate::spec::AttrRef<'_>)> {
                vec![$((stringify!($field), $crate::spec::AttrRef::$kind(&self.$field))),*]
            }

            fn attributes_mut(&mut self) -> ::std::vec::Vec<(&str, $crate::spec::AttrMut<'_>)> {
                vec![$((stringify!($field), $crate::spec::AttrMut::$kind(&mut self.$field))),*]
            }
        }
    };
}
