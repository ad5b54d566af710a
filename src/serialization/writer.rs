//! Запись спецификации в бинарный файл модели.

use super::{Result, SerializationError, BINARY_VERSION};
use crate::spec::{collect_variables, ModelSpec};
use crate::tensor::Tensor;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Сериализует спецификацию в `writer`.
///
/// Переменные записываются в порядке возрастания имени, поэтому одно и то же
/// дерево всегда дает побайтно одинаковый результат. Дерево должно быть
/// предварительно проверено через [`validate`](crate::spec::validate).
pub fn serialize<S, W>(spec: &S, writer: &mut W) -> Result<()>
where
    S: ModelSpec,
    W: Write,
{
    let variables = collect_variables(spec, "");
    write_model(writer, spec.variant_name(), spec.revision(), &variables)
}

/// Сохраняет спецификацию в файл по пути `path`.
///
/// При ошибке посреди записи частично записанный файл остается на диске.
pub fn save_spec<S, P>(spec: &S, path: P) -> Result<()>
where
    S: ModelSpec,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serialize(spec, &mut writer)?;
    writer.flush()?;
    tracing::info!("saved {} to {}", spec.variant_name(), path.as_ref().display());
    Ok(())
}

/// Записывает заголовок и таблицу переменных.
pub fn write_model<W: Write>(
    writer: &mut W,
    spec_name: &str,
    revision: u32,
    variables: &BTreeMap<String, &Tensor>,
) -> Result<()> {
    let count = u32::try_from(variables.len())
        .map_err(|_| SerializationError::DimensionOverflow { name: spec_name.to_string() })?;

    writer.write_all(&BINARY_VERSION.to_le_bytes())?;
    write_string(writer, spec_name)?;
    writer.write_all(&revision.to_le_bytes())?;
    writer.write_all(&count.to_le_bytes())?;

    for (name, tensor) in variables {
        write_variable(writer, name, tensor)?;
    }
    Ok(())
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    let length = u16::try_from(value.len() + 1)
        .map_err(|_| SerializationError::StringTooLong(value.len()))?;
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(value.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

fn write_variable<W: Write>(writer: &mut W, name: &str, tensor: &Tensor) -> Result<()> {
    let overflow = || SerializationError::DimensionOverflow { name: name.to_string() };

    write_string(writer, name)?;

    let rank = u8::try_from(tensor.ndim()).map_err(|_| overflow())?;
    writer.write_all(&[rank])?;
    for &dim in tensor.shape() {
        let dim = u32::try_from(dim).map_err(|_| overflow())?;
        writer.write_all(&dim.to_le_bytes())?;
    }

    // Размер элемента не больше 4 байт для всех поддерживаемых типов.
    writer.write_all(&[tensor.item_size() as u8])?;
    let count = u32::try_from(tensor.len()).map_err(|_| overflow())?;
    writer.write_all(&count.to_le_bytes())?;
    writer.write_all(&tensor.to_le_bytes())?;

    tracing::debug!("wrote {} {:?} {}", name, tensor.shape(), tensor.dtype());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn test_string_encoding() {
        let mut bytes: Vec<u8> = Vec::new();
        write_string(&mut bytes, "ab").unwrap();
        assert_eq!(bytes, vec![3, 0, b'a', b'b', 0]);

        let mut bytes: Vec<u8> = Vec::new();
        write_string(&mut bytes, "").unwrap();
        assert_eq!(bytes, vec![1, 0, 0]);
    }

    #[test]
    fn test_string_too_long() {
        let long = "x".repeat(u16::MAX as usize);
        let err = write_string(&mut Vec::<u8>::new(), &long).unwrap_err();
        assert!(matches!(err, SerializationError::StringTooLong(len) if len == long.len()));
    }

    #[test]
    fn test_variable_record_layout() {
        let tensor = Tensor::I8(ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![-1i8, 5]).unwrap());
        let mut bytes: Vec<u8> = Vec::new();
        write_variable(&mut bytes, "w", &tensor).unwrap();

        let parts: [&[u8]; 7] = [
            &[2, 0, b'w', 0],
            &[2],
            &1u32.to_le_bytes(),
            &2u32.to_le_bytes(),
            &[1],
            &2u32.to_le_bytes(),
            &[0xff, 5],
        ];
        assert_eq!(bytes, parts.concat());
    }

    #[test]
    fn test_empty_table_header() {
        let mut bytes: Vec<u8> = Vec::new();
        write_model(&mut bytes, "Empty", 3, &BTreeMap::new()).unwrap();

        let mut expected = 2u32.to_le_bytes().to_vec();
        expected.extend_from_slice(&[6, 0]);
        expected.extend_from_slice(b"Empty\0");
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(bytes, expected);
    }
}
