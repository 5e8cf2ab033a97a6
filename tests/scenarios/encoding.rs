use std::sync::Arc;

use archmodel::model::format::{EncodingBuilder, Endianness, Format, FormatBuilder};
use archmodel::model::isa::{InstructionBuilder, Isa, IsaBuilder};
use archmodel::model::types::DataType;
use archmodel::model::value::Value;
use hex_literal::hex;
use pretty_assertions::assert_eq;

const R_TYPE: [(&str, u32, u32); 6] = [
    ("opcode", 6, 0),
    ("rd", 11, 7),
    ("funct3", 14, 12),
    ("rs1", 19, 15),
    ("rs2", 24, 20),
    ("funct7", 31, 25),
];

fn r_type(fields: &[(&str, u32, u32)]) -> Arc<Format> {
    let mut format = FormatBuilder::new("Rtype", 32);
    for &(name, msb, lsb) in fields {
        format.bits_field(name, msb, lsb).expect("R-type field");
    }
    format.build()
}

fn reg(n: i64) -> Value {
    Value::of(n, DataType::bits(5)).expect("register index")
}

fn rv32i_alu() -> Isa {
    let mut builder = IsaBuilder::new("RV32I");
    builder.add_format(r_type(&R_TYPE)).expect("format registers");
    for (name, funct3, funct7) in [
        ("ADD", 0b000, 0b0000000),
        ("SUB", 0b000, 0b0100000),
        ("SLL", 0b001, 0b0000000),
        ("XOR", 0b100, 0b0000000),
        ("SRA", 0b101, 0b0100000),
    ] {
        builder
            .instruction(name, "Rtype")
            .and_then(|i| i.bind_integer("opcode", 0b0110011))
            .and_then(|i| i.bind_integer("funct3", funct3))
            .and_then(|i| i.bind_integer("funct7", funct7))
            .map(InstructionBuilder::finish)
            .expect("instruction encodes");
    }
    builder.build()
}

#[test]
fn add_pattern_fixes_opcode_funct3_and_funct7() {
    let isa = rv32i_alu();
    let add = isa.instruction("ADD").expect("ADD declared");
    assert_eq!(add.pattern().to_string(), "0000000??????????000?????0110011");
    assert_eq!(add.pattern().specificity(), 17);
}

#[test]
fn unlisted_funct3_bits_stay_wildcards() {
    let without_funct3: Vec<_> = R_TYPE.into_iter().filter(|f| f.0 != "funct3").collect();
    let mut encoding = EncodingBuilder::new("ADD::encoding", r_type(&without_funct3));
    encoding
        .add_integer("opcode", 0b0110011)
        .and_then(|e| e.add_integer("funct7", 0))
        .expect("constants fit");
    assert_eq!(
        encoding.build().pattern().to_string(),
        "0000000??????????????????0110011"
    );
}

#[test]
fn assembled_word_serialises_in_both_byte_orders() {
    let format = r_type(&R_TYPE);
    let mut encoding = EncodingBuilder::new("ADD_X3_X1_X2::encoding", format);
    encoding
        .add_integer("opcode", 0b0110011)
        .and_then(|e| e.add_integer("funct3", 0))
        .and_then(|e| e.add_integer("funct7", 0))
        .and_then(|e| e.add("rd", reg(3)))
        .and_then(|e| e.add("rs1", reg(1)))
        .and_then(|e| e.add("rs2", reg(2)))
        .expect("every field bound");
    let pattern = encoding.build().pattern();
    assert!(pattern.is_fully_specified());
    assert_eq!(pattern.to_bytes(Endianness::Little).unwrap(), hex!("b3 81 20 00"));
    assert_eq!(pattern.to_bytes(Endianness::Big).unwrap(), hex!("00 20 81 b3"));
}

#[test]
fn wildcard_patterns_do_not_serialise() {
    let isa = rv32i_alu();
    let add = isa.instruction("ADD").expect("ADD declared");
    assert!(add.pattern().to_bytes(Endianness::Little).is_err());
}

#[test]
fn fetched_bytes_decode_to_their_instruction() {
    let isa = rv32i_alu();
    // sra x5, x6, x7
    let word = Endianness::Little.decode_word(&hex!("b3 52 73 40"));
    let sra = isa.decode(&word).expect("SRA decodes");
    assert_eq!(sra.identifier().name(), "SRA");

    let operands: Vec<(String, u64)> = sra
        .encoding()
        .non_encoded_fields()
        .into_iter()
        .map(|field| {
            let value = field.extract(&word).expect("field fits");
            (field.name().to_string(), value.to_u64().unwrap_or_default())
        })
        .collect();
    assert_eq!(
        operands,
        [("rd".to_string(), 5), ("rs1".to_string(), 6), ("rs2".to_string(), 7)]
    );

    let reassembled = sra
        .encoding()
        .assemble(&[("rd", reg(5)), ("rs1", reg(6)), ("rs2", reg(7))])
        .expect("operands fit");
    assert_eq!(reassembled, word);
}

#[test]
fn alu_subset_verifies_without_diagnostics() {
    let warnings = rv32i_alu().verify().expect("no ambiguous encodings");
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}
