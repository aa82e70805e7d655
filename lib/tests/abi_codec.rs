use alloy_dyn_abi::DynSolValue;
use alloy_primitives::U256;
use axiom_std_lib::{decode_inputs, encode_inputs, CircuitError, CircuitInputs, InputSchema};

fn schema() -> InputSchema {
    InputSchema::from_json(r#"{"a":"CircuitValue","b":"CircuitValue256[]"}"#).unwrap()
}

#[test]
fn test_decode_scalar_and_array() {
    let blob = DynSolValue::Tuple(vec![
        DynSolValue::Uint(U256::from(5), 256),
        DynSolValue::Array(vec![
            DynSolValue::Uint(U256::from(1), 256),
            DynSolValue::Uint(U256::from(2), 256),
            DynSolValue::Uint(U256::MAX, 256),
        ]),
    ])
    .abi_encode_params();

    let inputs = decode_inputs(&schema(), &format!("0x{}", hex::encode(&blob))).unwrap();
    assert_eq!(inputs.get("a"), Some("5"));
    assert_eq!(inputs.get("b"), Some(format!("1,2,{}", U256::MAX).as_str()));

    // Bare hex decodes the same way
    assert_eq!(decode_inputs(&schema(), &hex::encode(&blob)).unwrap(), inputs);
}

#[test]
fn test_encode_then_decode_is_lossless() {
    let mut inputs = CircuitInputs::new();
    inputs.insert("a", "123456789");
    inputs.insert("b", "");

    let blob = encode_inputs(&schema(), &inputs).unwrap();
    let decoded = decode_inputs(&schema(), &blob.to_string()).unwrap();
    assert_eq!(decoded, inputs);

    let keys: Vec<&str> = decoded.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, ["a", "b"]);
}

#[test]
fn test_truncated_blob_is_decode_error() {
    let err = decode_inputs(&schema(), "0x00000001").unwrap_err();
    assert!(matches!(err, CircuitError::InputDecode(_)));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_unknown_tag_fails_before_decoding() {
    let schema = InputSchema::from_json(r#"{"a":"bytes32"}"#).unwrap();
    let err = decode_inputs(&schema, "0x").unwrap_err();
    assert_eq!(err.to_string(), "Unknown type bytes32");
}
