use archmodel::model::types::DataType;
use archmodel::model::value::{StatusFlags, Value};
use pretty_assertions::assert_eq;

fn byte(n: i64) -> Value {
    Value::of(n, DataType::bits(8)).expect("fits a byte")
}

#[test]
fn eight_bit_addition_flags() {
    let cases = [
        (0x7F, 0x01, 0x80, StatusFlags::OVERFLOW | StatusFlags::NEGATIVE),
        (0xFF, 0x01, 0x00, StatusFlags::ZERO | StatusFlags::CARRY),
        (
            0x80,
            0x80,
            0x00,
            StatusFlags::ZERO | StatusFlags::CARRY | StatusFlags::OVERFLOW,
        ),
        (0x12, 0x34, 0x46, StatusFlags::empty()),
    ];
    for (a, b, result, flags) in cases {
        let sum = byte(a).add(&byte(b)).expect("same width");
        assert_eq!((sum.result.to_u64(), sum.flags), (Some(result), flags), "{a:#x} + {b:#x}");
    }
}

#[test]
fn eight_bit_subtraction_reports_borrow_as_carry() {
    let cases = [
        (0x05, 0x05, 0x00, StatusFlags::ZERO),
        (0x00, 0x01, 0xFF, StatusFlags::CARRY | StatusFlags::NEGATIVE),
        (0x80, 0x01, 0x7F, StatusFlags::OVERFLOW),
    ];
    for (a, b, result, flags) in cases {
        let difference = byte(a).subtract(&byte(b)).expect("same width");
        assert_eq!(
            (difference.result.to_u64(), difference.flags),
            (Some(result), flags),
            "{a:#x} - {b:#x}"
        );
    }
}

#[test]
fn result_tuple_renders_value_and_flags() {
    let sum = byte(0xFF).add(&byte(0x01)).expect("same width");
    let tuple = sum.to_tuple();
    assert_eq!(tuple.to_string(), "(0x00: Bits<8>, (true, true, false, false))");
    let flags = tuple
        .get(1)
        .and_then(|status| status.as_tuple())
        .and_then(|status| status.to_status_flags())
        .expect("second element is the status tuple");
    assert_eq!(flags, sum.flags);
}
