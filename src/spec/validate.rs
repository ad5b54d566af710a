//! Проверка заполненности дерева спецификации.

use super::visitor::visit_spec_mut;
use super::{LayerSpec, Result, SpecError, Variable};

/// Проверяет, что все обязательные листья заданы.
///
/// - `Variable::Unset`: ошибка `MissingValue` с полным именем листа;
/// - `Variable::NotProvided`: допустимо, лист не трогается;
/// - тензоры `float16` заменяются копией `float32` той же формы, так как
///   рантайм не поддерживает половинную точность.
///
/// Повторный вызов на уже проверенном дереве ничего не меняет.
pub fn validate(spec: &mut dyn LayerSpec) -> Result<()> {
    visit_spec_mut(spec, |leaf| {
        let promoted = match leaf.value() {
            Variable::Unset => return Err(SpecError::MissingValue(leaf.name().to_string())),
            Variable::NotProvided => None,
            Variable::Value(tensor) => tensor.promote_half(),
        };

        if let Some(promoted) = promoted {
            tracing::debug!("promoting {} from float16 to float32", leaf.name());
            leaf.replace(Variable::Value(promoted));
        }
        Ok(())
    })
}
