// --- Файл: src/serialization/mod.rs ---

//! Модуль для сериализации спецификаций в бинарный формат модели.
//!
//! Формат (little-endian):
//! - версия формата: `u32` = 2
//! - имя варианта спецификации: строка с префиксом длины
//! - ревизия спецификации: `u32`
//! - количество переменных N: `u32`
//! - N записей: имя (строка), ранг (`u8`), ранг × размерность (`u32`),
//!   размер элемента (`u8`), количество элементов (`u32`), сырые байты
//!
//! Строка с префиксом длины: `u16` = `len + 1`, байты строки, один нулевой байт.
//!
//! # Примеры
//!
//! ```rust,ignore
//! use rustyspec::serialization::{export_spec, load_model, ExportConfig};
//! use rustyspec::quantize::Quantization;
//!
//! let config = ExportConfig::new().with_quantization(Quantization::Int8);
//! let path = export_spec(&mut spec, "ende_transformer", &config)?;
//!
//! let model = load_model(&path)?;
//! println!("{} r{}: {} переменных", model.spec_name, model.revision, model.variables.len());
//! ```

pub mod export;
pub mod reader;
pub mod writer;

pub use export::{export_spec, ExportConfig, ExportSummary};
pub use reader::{load_model, read_model, ModelFile, VariableInfo};
pub use writer::{save_spec, serialize, write_model};

use crate::spec::SpecError;
use thiserror::Error;

/// Текущая версия бинарного формата.
pub const BINARY_VERSION: u32 = 2;

/// Ошибки при записи и чтении файла модели
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Ошибка ввода/вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка спецификации: {0}")]
    Spec(#[from] SpecError),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Строка длиной {0} байт не помещается в формат")]
    StringTooLong(usize),

    #[error("Форма переменной '{name}' не помещается в формат")]
    DimensionOverflow { name: String },

    #[error("Неподдерживаемая версия формата: {0}")]
    UnsupportedVersion(u32),

    #[error("Неожиданный конец файла на смещении {offset}")]
    UnexpectedEof { offset: usize },

    #[error("Некорректная строка на смещении {offset}")]
    InvalidString { offset: usize },

    #[error("Переменная '{name}' имеет неподдерживаемый размер элемента {size}")]
    UnsupportedItemSize { name: String, size: u8 },

    #[error("Данные переменной '{name}' не соответствуют ее форме")]
    CorruptedVariable { name: String },

    #[error("Переменная '{0}' встречается в файле дважды")]
    DuplicateVariable(String),

    #[error("После последней переменной осталось {0} байт")]
    TrailingBytes(usize),

    #[error("Ревизия спецификации {found} новее поддерживаемой {supported}")]
    RevisionTooNew { found: u32, supported: u32 },
}

pub type Result<T> = std::result::Result<T, SerializationError>;
