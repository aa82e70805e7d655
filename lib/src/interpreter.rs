//! Sandboxed interpreter for [`CircuitDefinition`] steps.
//!
//! Values are 256-bit words. Arithmetic follows the BN254 scalar field, so
//! operands of arithmetic steps must be canonical field elements.

use crate::abi::{parse_u256, parse_u256_list, CircuitInputs};
use crate::data::{DataSource, DataSubquery};
use crate::definition::{BinaryOp, CircuitDefinition, Operand, Step};
use crate::error::{CircuitError, Result};
use alloy_primitives::{uint, Address, B256, U256};
use std::collections::HashMap;
use tracing::debug;

/// BN254 scalar field modulus
pub const BN254_SCALAR_MODULUS: U256 = uint!(
    21888242871839275222246405745257275088548364400416034343698204186575808495617_U256
);

/// Everything a circuit run produced
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CircuitRun {
    pub compute_results: Vec<B256>,
    pub subqueries: Vec<DataSubquery>,
}

#[derive(Clone, Debug)]
enum Value {
    Scalar(U256),
    Array(Vec<U256>),
}

struct Interpreter<'a> {
    data_source: &'a dyn DataSource,
    env: HashMap<String, Value>,
    run: CircuitRun,
}

/// Run a circuit definition against string-form inputs
pub async fn run_circuit(
    definition: &CircuitDefinition,
    inputs: &CircuitInputs,
    data_source: &dyn DataSource,
) -> Result<CircuitRun> {
    let mut interpreter = Interpreter {
        data_source,
        env: HashMap::new(),
        run: CircuitRun::default(),
    };

    interpreter.load_inputs(definition, inputs)?;
    for (position, step) in definition.steps.iter().enumerate() {
        interpreter.execute(step).await.map_err(|e| match e {
            CircuitError::Execution(msg) => {
                CircuitError::Execution(format!("step {position}: {msg}"))
            }
            other => other,
        })?;
    }

    debug!(
        "Circuit `{}` produced {} results from {} subqueries",
        definition.name,
        interpreter.run.compute_results.len(),
        interpreter.run.subqueries.len()
    );
    Ok(interpreter.run)
}

impl Interpreter<'_> {
    fn load_inputs(&mut self, definition: &CircuitDefinition, inputs: &CircuitInputs) -> Result<()> {
        for (name, ty) in definition.input_types()? {
            let invalid = |reason: String| CircuitError::InvalidInput {
                name: name.to_string(),
                reason,
            };
            let raw = inputs
                .get(name)
                .ok_or_else(|| invalid("missing value".to_string()))?;

            let words = if ty.is_array() {
                parse_u256_list(raw).ok_or_else(|| invalid(format!("not a list of integers: `{raw}`")))?
            } else {
                vec![parse_u256(raw).ok_or_else(|| invalid(format!("not an integer: `{raw}`")))?]
            };

            if ty.is_field_element() {
                if let Some(word) = words.iter().find(|word| **word >= BN254_SCALAR_MODULUS) {
                    return Err(invalid(format!(
                        "{word} is not below the field modulus for type {}",
                        ty.tag()
                    )));
                }
            }

            let value = if ty.is_array() {
                Value::Array(words)
            } else {
                Value::Scalar(words[0])
            };
            self.env.insert(name.to_string(), value);
        }
        Ok(())
    }

    async fn execute(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Add(op) => self.binary(op, |a, b| Ok(a.add_mod(b, BN254_SCALAR_MODULUS))),
            Step::Sub(op) => self.binary(op, |a, b| {
                Ok(a.add_mod(BN254_SCALAR_MODULUS - b, BN254_SCALAR_MODULUS))
            }),
            Step::Mul(op) => self.binary(op, |a, b| Ok(a.mul_mod(b, BN254_SCALAR_MODULUS))),
            Step::Div(op) => self.binary(op, |a, b| {
                if b.is_zero() {
                    return Err(CircuitError::Execution("division by zero".to_string()));
                }
                let inverse = b.pow_mod(BN254_SCALAR_MODULUS - U256::from(2), BN254_SCALAR_MODULUS);
                Ok(a.mul_mod(inverse, BN254_SCALAR_MODULUS))
            }),
            Step::IsLessThan(op) => self.binary(op, |a, b| Ok(flag(a < b))),
            Step::IsEqual(op) => {
                let lhs = self.resolve(&op.lhs)?;
                let rhs = self.resolve(&op.rhs)?;
                self.bind(&op.out, flag(lhs == rhs));
                Ok(())
            }
            Step::Sum { out, values } => {
                let total = match self.env.get(values) {
                    Some(Value::Array(words)) => {
                        words.iter().try_fold(U256::ZERO, |acc, word| {
                            field_element(values, *word)
                                .map(|word| acc.add_mod(word, BN254_SCALAR_MODULUS))
                        })?
                    }
                    _ => {
                        return Err(CircuitError::Execution(format!(
                            "`{values}` is not an array"
                        )))
                    }
                };
                self.bind(out, total);
                Ok(())
            }
            Step::GetHeader { out, block, field } => {
                let subquery = DataSubquery::Header {
                    block_number: self.block_number(block)?,
                    field: *field,
                };
                self.subquery(out, subquery).await
            }
            Step::GetAccount {
                out,
                block,
                address,
                field,
            } => {
                let subquery = DataSubquery::Account {
                    block_number: self.block_number(block)?,
                    address: self.address(address)?,
                    field: *field,
                };
                self.subquery(out, subquery).await
            }
            Step::GetStorage {
                out,
                block,
                address,
                slot,
            } => {
                let subquery = DataSubquery::Storage {
                    block_number: self.block_number(block)?,
                    address: self.address(address)?,
                    slot: self.resolve(slot)?,
                };
                self.subquery(out, subquery).await
            }
            Step::AddToCallback { value } => {
                let word = self.resolve(value)?;
                self.run
                    .compute_results
                    .push(B256::from(word.to_be_bytes::<32>()));
                Ok(())
            }
            Step::Log { value } => {
                debug!("📝 {} = {}", value, self.resolve(value)?);
                Ok(())
            }
        }
    }

    fn binary(&mut self, op: &BinaryOp, f: impl Fn(U256, U256) -> Result<U256>) -> Result<()> {
        let lhs = field_element(&op.lhs, self.resolve(&op.lhs)?)?;
        let rhs = field_element(&op.rhs, self.resolve(&op.rhs)?)?;
        let out = f(lhs, rhs)?;
        self.bind(&op.out, out);
        Ok(())
    }

    async fn subquery(&mut self, out: &str, subquery: DataSubquery) -> Result<()> {
        let value = self.data_source.fetch(&subquery).await?;
        self.run.subqueries.push(subquery);
        self.bind(out, value);
        Ok(())
    }

    fn bind(&mut self, name: &str, value: U256) {
        self.env.insert(name.to_string(), Value::Scalar(value));
    }

    fn resolve(&self, raw: &str) -> Result<U256> {
        match Operand::parse(raw)? {
            Operand::Literal(word) => Ok(word),
            Operand::Name(name) => match self.env.get(&name) {
                Some(Value::Scalar(word)) => Ok(*word),
                Some(Value::Array(_)) => Err(CircuitError::Execution(format!(
                    "`{name}` is an array, index it"
                ))),
                None => Err(CircuitError::Execution(format!("`{name}` is undefined"))),
            },
            Operand::Index(name, index) => match self.env.get(&name) {
                Some(Value::Array(words)) => words.get(index).copied().ok_or_else(|| {
                    CircuitError::Execution(format!(
                        "index {index} out of range for `{name}` of length {}",
                        words.len()
                    ))
                }),
                _ => Err(CircuitError::Execution(format!("`{name}` is not an array"))),
            },
        }
    }

    fn block_number(&self, raw: &str) -> Result<u32> {
        let word = self.resolve(raw)?;
        u32::try_from(word).map_err(|_| {
            CircuitError::Execution(format!("block number {word} does not fit in uint32"))
        })
    }

    fn address(&self, raw: &str) -> Result<Address> {
        let word = self.resolve(raw)?;
        if word.bit_len() > 160 {
            return Err(CircuitError::Execution(format!(
                "{word:#x} is not a 160-bit address"
            )));
        }
        Ok(Address::from_word(B256::from(word.to_be_bytes::<32>())))
    }
}

const fn flag(value: bool) -> U256 {
    if value {
        U256::from_limbs([1, 0, 0, 0])
    } else {
        U256::ZERO
    }
}

fn field_element(name: &str, word: U256) -> Result<U256> {
    if word >= BN254_SCALAR_MODULUS {
        return Err(CircuitError::Execution(format!(
            "`{name}` is not a field element"
        )));
    }
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AccountField, HeaderField, StaticDataSource};
    use alloy_primitives::address;

    fn inputs(pairs: &[(&str, &str)]) -> CircuitInputs {
        let mut inputs = CircuitInputs::new();
        for (name, value) in pairs {
            inputs.insert(*name, *value);
        }
        inputs
    }

    fn word(value: u64) -> B256 {
        B256::from(U256::from(value).to_be_bytes::<32>())
    }

    #[tokio::test]
    async fn test_field_arithmetic() {
        let definition = CircuitDefinition::from_source(
            r#"{"name":"arith","inputSchema":{"a":"CircuitValue","b":"CircuitValue"},
            "steps":[
                {"op":"add","out":"s","lhs":"a","rhs":"b"},
                {"op":"sub","out":"d","lhs":"b","rhs":"a"},
                {"op":"mul","out":"m","lhs":"a","rhs":"b"},
                {"op":"div","out":"q","lhs":"m","rhs":"b"},
                {"op":"addToCallback","value":"s"},
                {"op":"addToCallback","value":"d"},
                {"op":"addToCallback","value":"m"},
                {"op":"addToCallback","value":"q"}
            ]}"#,
        )
        .unwrap();

        let run = run_circuit(&definition, &inputs(&[("a", "7"), ("b", "5")]), &StaticDataSource::new())
            .await
            .unwrap();

        // 5 - 7 wraps around the field
        let wrapped = BN254_SCALAR_MODULUS - U256::from(2);
        assert_eq!(
            run.compute_results,
            vec![word(12), B256::from(wrapped.to_be_bytes::<32>()), word(35), word(7)]
        );
        assert!(run.subqueries.is_empty());
    }

    #[tokio::test]
    async fn test_division_by_zero_fails() {
        let definition = CircuitDefinition::from_source(
            r#"{"name":"div","inputSchema":{"a":"CircuitValue"},
            "steps":[{"op":"div","out":"q","lhs":"a","rhs":"0"}]}"#,
        )
        .unwrap();
        let err = run_circuit(&definition, &inputs(&[("a", "1")]), &StaticDataSource::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Circuit execution failed: step 0: division by zero");
    }

    #[tokio::test]
    async fn test_subqueries_are_recorded_in_order() {
        let account = address!("8018fe32fCFd3d166E8b4c4E37105318A84BA11b");
        let source = StaticDataSource::new()
            .with_header(100, HeaderField::Timestamp, U256::from(1_650_000_000u64))
            .with_account(100, account, AccountField::Nonce, U256::from(4));

        let definition = CircuitDefinition::from_source(
            r#"{"name":"fetch","inputSchema":{"block":"CircuitValue","addr":"CircuitValue"},
            "steps":[
                {"op":"getHeader","out":"ts","block":"block","field":"timestamp"},
                {"op":"getAccount","out":"nonce","block":"block","address":"addr","field":"nonce"},
                {"op":"addToCallback","value":"ts"},
                {"op":"addToCallback","value":"nonce"}
            ]}"#,
        )
        .unwrap();

        let addr = U256::from_be_slice(account.as_slice()).to_string();
        let run = run_circuit(&definition, &inputs(&[("block", "100"), ("addr", addr.as_str())]), &source)
            .await
            .unwrap();

        assert_eq!(run.compute_results, vec![word(1_650_000_000), word(4)]);
        assert_eq!(
            run.subqueries,
            vec![
                DataSubquery::Header {
                    block_number: 100,
                    field: HeaderField::Timestamp
                },
                DataSubquery::Account {
                    block_number: 100,
                    address: account,
                    field: AccountField::Nonce
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_rejects_values_outside_field() {
        let definition = CircuitDefinition::from_source(
            r#"{"name":"f","inputSchema":{"a":"CircuitValue","w":"CircuitValue256"},
            "steps":[{"op":"addToCallback","value":"w"}]}"#,
        )
        .unwrap();
        let modulus = BN254_SCALAR_MODULUS.to_string();

        let err = run_circuit(&definition, &inputs(&[("a", modulus.as_str()), ("w", "1")]), &StaticDataSource::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CircuitError::InvalidInput { ref name, .. } if name == "a"));

        // 256-bit inputs may exceed the modulus as long as no arithmetic touches them
        let run = run_circuit(&definition, &inputs(&[("a", "1"), ("w", modulus.as_str())]), &StaticDataSource::new())
            .await
            .unwrap();
        assert_eq!(run.compute_results.len(), 1);
    }

    #[tokio::test]
    async fn test_index_out_of_range() {
        let definition = CircuitDefinition::from_source(
            r#"{"name":"idx","inputSchema":{"xs":"CircuitValue[]"},
            "steps":[{"op":"addToCallback","value":"xs[2]"}]}"#,
        )
        .unwrap();
        let err = run_circuit(&definition, &inputs(&[("xs", "1,2")]), &StaticDataSource::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("index 2 out of range"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_is_equal_and_log() {
        let definition = CircuitDefinition::from_source(
            r#"{"name":"eq","inputSchema":{"a":"CircuitValue","b":"CircuitValue"},
            "steps":[
                {"op":"isEqual","out":"same","lhs":"a","rhs":"6"},
                {"op":"isEqual","out":"differ","lhs":"a","rhs":"b"},
                {"op":"log","value":"same"},
                {"op":"addToCallback","value":"same"},
                {"op":"addToCallback","value":"differ"}
            ]}"#,
        )
        .unwrap();
        let run = run_circuit(&definition, &inputs(&[("a", "6"), ("b", "7")]), &StaticDataSource::new())
            .await
            .unwrap();
        assert_eq!(run.compute_results, vec![word(1), word(0)]);

        logs_assert(|lines: &[&str]| {
            if lines
                .iter()
                .any(|line| line.contains("DEBUG") && line.contains("same = 1"))
            {
                Ok(())
            } else {
                Err("log step did not emit a debug line".to_string())
            }
        });
    }

    #[tokio::test]
    async fn test_address_wider_than_160_bits_fails() {
        let definition = CircuitDefinition::from_source(
            r#"{"name":"addr","inputSchema":{"who":"CircuitValue256"},
            "steps":[{"op":"getAccount","out":"b","block":"1","address":"who","field":"balance"}]}"#,
        )
        .unwrap();
        let too_wide = (U256::from(1) << 160usize).to_string();
        let err = run_circuit(&definition, &inputs(&[("who", too_wide.as_str())]), &StaticDataSource::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CircuitError::Execution(_)));
        assert!(err.to_string().contains("is not a 160-bit address"));

        // The largest 160-bit value is still an address
        let widest = ((U256::from(1) << 160usize) - U256::from(1)).to_string();
        let source = StaticDataSource::new().with_account(
            1,
            Address::repeat_byte(0xff),
            AccountField::Balance,
            U256::from(9),
        );
        let run = run_circuit(&definition, &inputs(&[("who", widest.as_str())]), &source)
            .await
            .unwrap();
        assert_eq!(run.subqueries.len(), 1);
    }

    #[tokio::test]
    async fn test_block_number_must_fit_u32() {
        let definition = CircuitDefinition::from_source(
            r#"{"name":"blk","inputSchema":{},
            "steps":[{"op":"getHeader","out":"n","block":"4294967296","field":"number"}]}"#,
        )
        .unwrap();
        let err = run_circuit(&definition, &CircuitInputs::new(), &StaticDataSource::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not fit in uint32"));
    }
}
