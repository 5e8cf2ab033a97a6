use std::sync::Arc;

use archmodel::model::error::ModelErrorKind;
use archmodel::model::resource::{
    Counter, CounterKind, CounterPosition, RegisterTensor, Resource, TensorConstraint,
};
use archmodel::model::types::DataType;
use archmodel::model::value::Value;
use pretty_assertions::assert_eq;

#[test]
fn register_tensor_is_addressed_by_its_outer_dimension() {
    let tensor = RegisterTensor::tensor(
        "X",
        [(DataType::bits(5), 32), (DataType::bits(6), 64)],
    )
    .expect("valid dimensions");
    assert!(tensor.has_address());
    assert!(tensor.is_register_file());
    assert_eq!(tensor.address_type(), Some(DataType::bits(5)));
    assert_eq!(tensor.result_type(), DataType::bits(64));
    assert_eq!(tensor.result_type_for(0).unwrap(), DataType::bits(2048));
    assert_eq!(tensor.result_type_for(1).unwrap(), DataType::bits(64));
    let err = tensor.result_type_for(2).expect_err("only one index allowed");
    assert_eq!(err.kind(), ModelErrorKind::Shape);
}

#[test]
fn single_register_has_no_address() {
    let resource = Resource::from(RegisterTensor::register("SP", DataType::bits(32)).unwrap());
    assert!(!resource.has_address());
    assert_eq!(resource.address_type(), None);
    assert_eq!(resource.result_type(), DataType::bits(32));
}

#[test]
fn zero_register_pins_index_zero() {
    let zero_index = Value::of(0, DataType::bits(5)).unwrap();
    let file = RegisterTensor::register_file("X", DataType::bits(5), DataType::bits(32))
        .and_then(|file| {
            file.with_constraints([TensorConstraint::new(
                [zero_index.clone()],
                Value::zero(DataType::bits(32)),
            )])
        })
        .expect("constraint fits the file");
    assert_eq!(file.zero_register(), Some(&[zero_index][..]));
    assert_eq!(file.generate_name(31).unwrap(), "X31");
}

#[test]
fn counter_over_register_file_element() {
    let file = Arc::new(
        RegisterTensor::register_file("R", DataType::bits(4), DataType::bits(32)).unwrap(),
    );
    let index = Value::of(15, DataType::bits(4)).unwrap();
    let pc = Counter::register_file_element(
        "ARM::PC",
        Arc::clone(&file),
        index,
        CounterPosition::Current,
        CounterKind::ProgramCounter,
    )
    .expect("R(15) is the program counter");
    assert_eq!(pc.result_type(), DataType::bits(32));
    assert!(Arc::ptr_eq(pc.resource(), &file));

    let wide = Value::of(15, DataType::bits(8)).unwrap();
    let err = Counter::register_file_element(
        "ARM::PC",
        file,
        wide,
        CounterPosition::Current,
        CounterKind::ProgramCounter,
    )
    .expect_err("Bits<8> index does not fit Bits<4>");
    assert_eq!(err.kind(), ModelErrorKind::TypeMismatch);
}
