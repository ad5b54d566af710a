// --- Файл: src/serialization/export.rs ---

//! Полный конвейер экспорта спецификации в директорию модели.
//!
//! Структура директории:
//! ```text
//! output_dir/
//! ├── model.bin      # Бинарный файл модели
//! └── export.json    # Сводка экспорта (опционально)
//! ```

use super::reader::VariableInfo;
use super::writer::save_spec;
use super::Result;
use crate::quantize::{quantize, Quantization};
use crate::spec::{collect_variables, validate, ModelSpec};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Имя файла со сводкой экспорта.
pub const SUMMARY_FILE: &str = "export.json";

/// Конфигурация экспорта
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Режим квантизации весов
    pub quantization: Quantization,
    /// Имя бинарного файла модели внутри директории
    pub model_file: String,
    /// Записывать ли export.json рядом с моделью
    pub write_metadata: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            quantization: Quantization::None,
            model_file: "model.bin".to_string(),
            write_metadata: true,
        }
    }
}

impl ExportConfig {
    /// Создает конфигурацию по умолчанию
    pub fn new() -> Self {
        Self::default()
    }

    /// Устанавливает режим квантизации
    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = quantization;
        self
    }

    /// Устанавливает имя файла модели
    pub fn with_model_file(mut self, name: &str) -> Self {
        self.model_file = name.to_string();
        self
    }

    /// Включает или выключает запись сводки
    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.write_metadata = enabled;
        self
    }

    /// Загружает конфигурацию из JSON-файла.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut json = String::new();
        file.read_to_string(&mut json)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Сводка о записанной модели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub spec_name: String,
    pub revision: u32,
    pub quantization: Quantization,
    pub variables: Vec<VariableInfo>,
}

/// Проверяет, квантизует и сохраняет спецификацию в `output_dir`.
///
/// Дерево изменяется на месте (приведение `float16`, квантизация).
/// Возвращает путь к записанному файлу модели.
pub fn export_spec<S, P>(spec: &mut S, output_dir: P, config: &ExportConfig) -> Result<PathBuf>
where
    S: ModelSpec,
    P: AsRef<Path>,
{
    let dir = output_dir.as_ref();
    fs::create_dir_all(dir)?;

    validate(spec)?;
    quantize(spec, config.quantization)?;

    let model_path = dir.join(&config.model_file);
    save_spec(&*spec, &model_path)?;

    if config.write_metadata {
        let summary = ExportSummary {
            spec_name: spec.variant_name().to_string(),
            revision: spec.revision(),
            quantization: config.quantization,
            variables: collect_variables(&*spec, "")
                .into_iter()
                .map(|(name, tensor)| VariableInfo::new(&name, tensor))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&summary)?;
        let mut summary_file = File::create(dir.join(SUMMARY_FILE))?;
        summary_file.write_all(json.as_bytes())?;
    }

    tracing::info!(
        "exported {} with quantization {} to {}",
        spec.variant_name(),
        config.quantization,
        model_path.display()
    );
    Ok(model_path)
}
