//! Интеграционные тесты бинарного формата модели.

use rustyspec::layer_spec;
use rustyspec::serialization::{load_model, read_model, save_spec, serialize, SerializationError};
use rustyspec::spec::{validate, ModelSpec, Variable};
use rustyspec::tensor::{DType, Tensor};

use half::f16;
use ndarray::{ArrayD, IxDyn};

/// Минимальная модель с двумя переменными и настраиваемой ревизией.
struct ExampleSpec {
    revision: u32,
    w: Variable,
    b: Variable,
}

layer_spec!(ExampleSpec { w: variable, b: variable });

impl ModelSpec for ExampleSpec {
    fn variant_name(&self) -> &str {
        "Example"
    }

    fn revision(&self) -> u32 {
        self.revision
    }
}

fn weight() -> ArrayD<f32> {
    ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap()
}

#[test]
fn test_exact_file_layout() {
    let spec = ExampleSpec {
        revision: 1,
        w: Variable::from(weight()),
        b: Variable::NotProvided,
    };

    let mut bytes: Vec<u8> = Vec::new();
    serialize(&spec, &mut bytes).unwrap();

    let mut expected: Vec<u8> = Vec::new();
    expected.extend_from_slice(&2u32.to_le_bytes());
    expected.extend_from_slice(&8u16.to_le_bytes());
    expected.extend_from_slice(b"Example\0");
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.extend_from_slice(&2u16.to_le_bytes());
    expected.extend_from_slice(b"w\0");
    expected.push(2);
    expected.extend_from_slice(&2u32.to_le_bytes());
    expected.extend_from_slice(&3u32.to_le_bytes());
    expected.push(4);
    expected.extend_from_slice(&6u32.to_le_bytes());
    for value in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0] {
        expected.extend_from_slice(&value.to_le_bytes());
    }

    assert_eq!(bytes, expected);
}

#[test]
fn test_output_does_not_depend_on_declaration_order() {
    struct Reversed {
        b: Variable,
        a: Variable,
    }
    layer_spec!(Reversed { b: variable, a: variable });
    impl ModelSpec for Reversed {
        fn variant_name(&self) -> &str {
            "Example"
        }
    }

    struct Ordered {
        a: Variable,
        b: Variable,
    }
    layer_spec!(Ordered { a: variable, b: variable });
    impl ModelSpec for Ordered {
        fn variant_name(&self) -> &str {
            "Example"
        }
    }

    let a = ArrayD::<f32>::ones(IxDyn(&[3]));
    let b = ArrayD::<f32>::zeros(IxDyn(&[2, 2]));

    let reversed = Reversed {
        b: Variable::from(b.clone()),
        a: Variable::from(a.clone()),
    };
    let ordered = Ordered {
        a: Variable::from(a),
        b: Variable::from(b),
    };

    let mut first: Vec<u8> = Vec::new();
    let mut second: Vec<u8> = Vec::new();
    serialize(&reversed, &mut first).unwrap();
    serialize(&ordered, &mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_half_precision_is_stored_as_float32() {
    let half = ArrayD::from_shape_vec(IxDyn(&[2]), vec![f16::from_f32(0.5), f16::from_f32(-2.0)]).unwrap();
    let mut spec = ExampleSpec {
        revision: 1,
        w: Variable::from(weight()),
        b: Variable::from(half),
    };
    validate(&mut spec).unwrap();

    let mut bytes: Vec<u8> = Vec::new();
    serialize(&spec, &mut bytes).unwrap();
    let model = read_model(&mut bytes.as_slice()).unwrap();

    let b = model.variable("b").unwrap();
    assert_eq!(b.dtype(), DType::F32);
    assert_eq!(b.as_f32().unwrap().iter().copied().collect::<Vec<_>>(), vec![0.5, -2.0]);
}

#[test]
fn test_save_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    let scale = ArrayD::from_shape_vec(IxDyn(&[3]), vec![-3i16, 0, 7]).unwrap();
    let spec = ExampleSpec {
        revision: 3,
        w: Variable::from(weight()),
        b: Variable::from(scale.clone()),
    };
    save_spec(&spec, &path).unwrap();

    let model = load_model(&path).unwrap();
    assert_eq!(model.binary_version, 2);
    assert_eq!(model.spec_name, "Example");
    assert_eq!(model.revision, 3);
    assert_eq!(model.variables.keys().collect::<Vec<_>>(), vec!["b", "w"]);
    assert_eq!(model.variable("w"), Some(&Tensor::from(weight())));
    assert_eq!(model.variable("b"), Some(&Tensor::from(scale)));

    assert!(model.check_revision(3).is_ok());
    assert!(matches!(
        model.check_revision(2),
        Err(SerializationError::RevisionTooNew { found: 3, supported: 2 })
    ));
}

#[test]
fn test_truncated_file_is_rejected() {
    let spec = ExampleSpec {
        revision: 1,
        w: Variable::from(weight()),
        b: Variable::NotProvided,
    };
    let mut bytes: Vec<u8> = Vec::new();
    serialize(&spec, &mut bytes).unwrap();
    bytes.truncate(bytes.len() - 1);

    let err = read_model(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, SerializationError::UnexpectedEof { .. }));
}
