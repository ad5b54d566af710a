//! Сбор плоской таблицы переменных из дерева спецификации.

use super::visitor::visit_spec;
use super::{join_scope, LayerSpec, Variable};
use crate::tensor::Tensor;
use std::collections::BTreeMap;

/// Возвращает отображение `имя → тензор` для всех заданных листьев.
///
/// Листья `NotProvided` пропускаются. Имена получают префикс `prefix`
/// (пустой префикс оставляет их как есть). Таблица упорядочена по имени.
///
/// Вызывать следует после [`validate`](super::validate): незаданные листья
/// в таблицу не попадают.
///
/// # Паника
///
/// Паникует, если два листа дерева имеют одно и то же полное имя: такое
/// дерево построено некорректно.
pub fn collect_variables<'a>(spec: &'a dyn LayerSpec, prefix: &str) -> BTreeMap<String, &'a Tensor> {
    let mut variables = BTreeMap::new();

    visit_spec(spec, |name, value| match value {
        Variable::Value(tensor) => {
            let full_name = join_scope(prefix, name);
            let previous = variables.insert(full_name, tensor);
            assert!(previous.is_none(), "duplicate variable name '{}'", join_scope(prefix, name));
        }
        Variable::NotProvided => {}
        Variable::Unset => tracing::warn!("variable {} is unset and will be skipped", name),
    });

    variables
}
