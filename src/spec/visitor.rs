//! Рекурсивный обход дерева спецификации.
//!
//! Обход вызывает колбэк для каждого листа с его полным именем:
//! - для последовательности: рекурсия в каждый элемент с областью `<имя>_<индекс>`,
//! - для вложенного узла: рекурсия с областью `<имя>`,
//! - иначе: вызов колбэка.
//!
//! Порядок обхода совпадает с порядком объявления атрибутов и не меняется
//! между вызовами на дереве той же формы.

use super::{join_scope, AttrMut, AttrRef, LayerSpec, Result, SpecError, Variable};

/// Лист, переданный колбэку изменяемого обхода.
///
/// Дает доступ к значению атрибута на узле-владельце и позволяет
/// запросить запись соседнего атрибута того же узла.
pub struct Leaf<'a> {
    name: &'a str,
    attribute: &'a str,
    value: &'a mut Variable,
    siblings: &'a mut Vec<(String, Variable)>,
}

impl<'a> Leaf<'a> {
    /// Полное имя листа (путь через `/`).
    pub fn name(&self) -> &str {
        self.name
    }

    /// Локальное имя атрибута на узле-владельце.
    pub fn attribute(&self) -> &str {
        self.attribute
    }

    pub fn value(&self) -> &Variable {
        self.value
    }

    /// Заменяет значение листа и возвращает прежнее.
    pub fn replace(&mut self, value: Variable) -> Variable {
        std::mem::replace(self.value, value)
    }

    /// Запрашивает запись атрибута `name` на том же узле.
    ///
    /// Запись применяется после того, как обход закончит атрибуты узла,
    /// поэтому в текущем проходе записанное значение не посещается.
    pub fn set_sibling(&mut self, name: impl Into<String>, value: Variable) {
        self.siblings.push((name.into(), value));
    }
}

/// Обходит все листья дерева без изменений.
pub fn visit_spec<'a, F>(spec: &'a dyn LayerSpec, mut f: F)
where
    F: FnMut(&str, &'a Variable),
{
    visit_scope(spec, "", &mut f);
}

fn visit_scope<'a, F>(spec: &'a dyn LayerSpec, scope: &str, f: &mut F)
where
    F: FnMut(&str, &'a Variable),
{
    for (name, attr) in spec.attributes() {
        match attr {
            AttrRef::Layers(layers) => {
                for (index, layer) in layers.into_iter().enumerate() {
                    let layer_scope = join_scope(scope, &format!("{}_{}", name, index));
                    visit_scope(layer, &layer_scope, f);
                }
            }
            AttrRef::Layer(layer) => visit_scope(layer, &join_scope(scope, name), f),
            AttrRef::Variable(value) => f(&join_scope(scope, name), value),
        }
    }
}

/// Обходит все листья дерева с возможностью их изменения.
///
/// Останавливается на первой ошибке колбэка; изменения, уже внесенные
/// в посещенные листья, не откатываются, а запрошенные ими записи соседей
/// применяются до возврата ошибки.
pub fn visit_spec_mut<F>(spec: &mut dyn LayerSpec, mut f: F) -> Result<()>
where
    F: FnMut(&mut Leaf<'_>) -> Result<()>,
{
    visit_scope_mut(spec, "", &mut f)
}

fn visit_scope_mut<F>(spec: &mut dyn LayerSpec, scope: &str, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Leaf<'_>) -> Result<()>,
{
    let mut siblings = Vec::new();
    let mut outcome = Ok(());

    for (name, attr) in spec.attributes_mut() {
        let step = match attr {
            AttrMut::Layers(layers) => layers.into_iter().enumerate().try_for_each(|(index, layer)| {
                let layer_scope = join_scope(scope, &format!("{}_{}", name, index));
                visit_scope_mut(layer, &layer_scope, f)
            }),
            AttrMut::Layer(layer) => visit_scope_mut(layer, &join_scope(scope, name), f),
            AttrMut::Variable(value) => {
                let full_name = join_scope(scope, name);
                let mut leaf = Leaf {
                    name: &full_name,
                    attribute: name,
                    value,
                    siblings: &mut siblings,
                };
                f(&mut leaf)
            }
        };
        if step.is_err() {
            outcome = step;
            break;
        }
    }

    // Записи соседей применяются и после ошибки колбэка.
    for (name, value) in siblings {
        if !spec.set_variable(&name, value) {
            return outcome.and(Err(SpecError::UndeclaredAttribute {
                scope: scope.to_string(),
                name,
            }));
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer_spec;
    use ndarray::{ArrayD, IxDyn};

    #[derive(Default)]
    struct ItemSpec {
        value: Variable,
        value_copy: Variable,
    }

    layer_spec!(ItemSpec { value: variable, value_copy: variable });

    #[derive(Default)]
    struct RootSpec {
        scale: Variable,
        items: Vec<ItemSpec>,
        head: ItemSpec,
    }

    layer_spec!(RootSpec { scale: variable, items: layers, head: layer });

    fn root(num_items: usize) -> RootSpec {
        RootSpec {
            items: (0..num_items).map(|_| ItemSpec::default()).collect(),
            ..Default::default()
        }
    }

    fn names(spec: &dyn LayerSpec) -> Vec<String> {
        let mut names = Vec::new();
        visit_spec(spec, |name, _| names.push(name.to_string()));
        names
    }

    #[test]
    fn test_sequence_elements_get_index_suffix() {
        let spec = root(3);
        assert_eq!(
            names(&spec),
            vec![
                "scale",
                "items_0/value",
                "items_0/value_copy",
                "items_1/value",
                "items_1/value_copy",
                "items_2/value",
                "items_2/value_copy",
                "head/value",
                "head/value_copy",
            ]
        );
    }

    #[test]
    fn test_traversal_order_is_stable() {
        let spec = root(2);
        assert_eq!(names(&spec), names(&spec));

        let mut mutable_names = Vec::new();
        let mut spec = root(2);
        visit_spec_mut(&mut spec, |leaf| {
            mutable_names.push(leaf.name().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(mutable_names, names(&spec));
    }

    #[test]
    fn test_leaf_reports_local_attribute() {
        let mut spec = root(1);
        visit_spec_mut(&mut spec, |leaf| {
            assert!(leaf.name().ends_with(leaf.attribute()));
            if leaf.attribute() == "value" {
                leaf.replace(Variable::NotProvided);
            }
            Ok(())
        })
        .unwrap();

        assert!(spec.items[0].value.is_not_provided());
        assert!(spec.items[0].value_copy.is_unset());
        assert!(spec.head.value.is_not_provided());
        assert!(spec.scale.is_unset());
    }

    #[test]
    fn test_sibling_write_is_not_visited_in_same_pass() {
        let mut spec = root(0);
        let mut visited = Vec::new();
        visit_spec_mut(&mut spec, |leaf| {
            visited.push((leaf.name().to_string(), leaf.value().is_unset()));
            if leaf.name() == "head/value" {
                let tensor = ArrayD::<f32>::zeros(IxDyn(&[1]));
                leaf.set_sibling("value_copy", Variable::from(tensor));
            }
            Ok(())
        })
        .unwrap();

        // value_copy посещен до применения записи.
        assert!(visited.contains(&("head/value_copy".to_string(), true)));
        assert!(spec.head.value_copy.as_tensor().is_some());
    }

    #[test]
    fn test_sibling_write_to_undeclared_attribute_fails() {
        let mut spec = root(0);
        let result = visit_spec_mut(&mut spec, |leaf| {
            if leaf.name() == "head/value" {
                leaf.set_sibling("missing", Variable::NotProvided);
            }
            Ok(())
        });

        assert_eq!(
            result,
            Err(SpecError::UndeclaredAttribute {
                scope: "head".to_string(),
                name: "missing".to_string(),
            })
        );
    }
}
