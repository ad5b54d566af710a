//! Чтение бинарного файла модели.
//!
//! Загрузчик повторяет поведение нативного рантайма: тип элемента
//! восстанавливается по его размеру (4 → `float32`, 2 → `int16`, 1 → `int8`),
//! а файлы версии 1 не содержат имени спецификации и ревизии.

use super::{Result, SerializationError, BINARY_VERSION};
use crate::tensor::{DType, Tensor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Содержимое файла модели.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFile {
    /// Версия бинарного формата
    pub binary_version: u32,
    /// Имя варианта спецификации (пустое для файлов версии 1)
    pub spec_name: String,
    /// Ревизия спецификации
    pub revision: u32,
    /// Переменные, упорядоченные по имени
    pub variables: BTreeMap<String, Tensor>,
}

/// Краткое описание переменной: имя, тип и форма.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl VariableInfo {
    pub fn new(name: &str, tensor: &Tensor) -> Self {
        Self {
            name: name.to_string(),
            dtype: tensor.dtype(),
            shape: tensor.shape().to_vec(),
        }
    }
}

impl ModelFile {
    pub fn variable(&self, name: &str) -> Option<&Tensor> {
        self.variables.get(name)
    }

    /// Описание всех переменных в порядке имен.
    pub fn variable_info(&self) -> Vec<VariableInfo> {
        self.variables
            .iter()
            .map(|(name, tensor)| VariableInfo::new(name, tensor))
            .collect()
    }

    /// Проверяет, что ревизия файла не новее поддерживаемой загрузчиком.
    pub fn check_revision(&self, supported: u32) -> Result<()> {
        if self.revision > supported {
            return Err(SerializationError::RevisionTooNew {
                found: self.revision,
                supported,
            });
        }
        Ok(())
    }
}

/// Читает модель из произвольного источника.
pub fn read_model<R: Read>(reader: &mut R) -> Result<ModelFile> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    parse_model(&buffer)
}

/// Загружает модель из файла.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelFile> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let model = read_model(&mut reader)?;
    tracing::info!(
        "loaded {} (revision {}) with {} variables from {}",
        model.spec_name,
        model.revision,
        model.variables.len(),
        path.as_ref().display()
    );
    Ok(model)
}

fn parse_model(data: &[u8]) -> Result<ModelFile> {
    let mut cursor = ByteCursor::new(data);

    let binary_version = cursor.u32()?;
    if binary_version == 0 || binary_version > BINARY_VERSION {
        return Err(SerializationError::UnsupportedVersion(binary_version));
    }

    let (spec_name, revision) = if binary_version >= 2 {
        (cursor.string()?, cursor.u32()?)
    } else {
        (String::new(), 1)
    };

    let count = cursor.u32()?;
    let mut variables = BTreeMap::new();
    for _ in 0..count {
        let (name, tensor) = read_variable(&mut cursor)?;
        if variables.contains_key(&name) {
            return Err(SerializationError::DuplicateVariable(name));
        }
        variables.insert(name, tensor);
    }

    if cursor.remaining() > 0 {
        return Err(SerializationError::TrailingBytes(cursor.remaining()));
    }

    Ok(ModelFile {
        binary_version,
        spec_name,
        revision,
        variables,
    })
}

fn read_variable(cursor: &mut ByteCursor<'_>) -> Result<(String, Tensor)> {
    let name = cursor.string()?;

    let rank = cursor.u8()?;
    let mut shape = Vec::with_capacity(rank as usize);
    for _ in 0..rank {
        shape.push(cursor.u32()? as usize);
    }

    let item_size = cursor.u8()?;
    let dtype = match item_size {
        4 => DType::F32,
        2 => DType::I16,
        1 => DType::I8,
        size => return Err(SerializationError::UnsupportedItemSize { name, size }),
    };

    let count = cursor.u32()? as usize;
    let expected = shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim));
    if expected != Some(count) {
        return Err(SerializationError::CorruptedVariable { name });
    }
    let byte_len = count
        .checked_mul(item_size as usize)
        .ok_or_else(|| SerializationError::CorruptedVariable { name: name.clone() })?;
    let bytes = cursor.take(byte_len)?;
    let tensor = Tensor::from_le_bytes(dtype, &shape, bytes)
        .map_err(|_| SerializationError::CorruptedVariable { name: name.clone() })?;

    Ok((name, tensor))
}

/// Курсор по байтам файла с проверкой границ.
struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(SerializationError::UnexpectedEof { offset: self.offset });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Строка с префиксом длины; длина включает завершающий ноль.
    fn string(&mut self) -> Result<String> {
        let offset = self.offset;
        let length = self.u16()? as usize;
        let raw = self.take(length)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8(raw[..end].to_vec())
            .map_err(|_| SerializationError::InvalidString { offset })
    }
}
