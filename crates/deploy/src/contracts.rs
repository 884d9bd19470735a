//! Compiled contract artifacts and constructor encoding.

use std::path::{Path, PathBuf};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Bytecode in either the Hardhat (`"0x..."`) or Foundry (`{ "object": "0x..." }`) shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(Bytes),
    Object { object: Bytes },
}

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    abi: JsonAbi,
    bytecode: BytecodeField,
}

/// A compiled contract: its ABI and creation bytecode.
#[derive(Debug, Clone)]
pub struct CompiledContract {
    pub name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl CompiledContract {
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let name = name.into();
        let file: ArtifactFile = serde_json::from_str(json)
            .context(format!("Failed to parse compiled artifact of {name}"))?;
        let bytecode = match file.bytecode {
            BytecodeField::Hex(bytes) | BytecodeField::Object { object: bytes } => bytes,
        };
        if bytecode.is_empty() {
            anyhow::bail!("{name} has no creation bytecode (abstract contract or interface?)");
        }

        Ok(Self {
            name,
            abi: file.abi,
            bytecode,
        })
    }

    /// Creation code followed by the ABI-encoded constructor arguments.
    pub fn deploy_code(&self, args: &[Value]) -> Result<Bytes> {
        let mut code = self.bytecode.to_vec();

        match &self.abi.constructor {
            Some(constructor) => {
                if constructor.inputs.len() != args.len() {
                    anyhow::bail!(
                        "{} constructor takes {} arguments, got {}",
                        self.name,
                        constructor.inputs.len(),
                        args.len()
                    );
                }

                let values = constructor
                    .inputs
                    .iter()
                    .zip(args)
                    .map(|(param, arg)| {
                        let ty = param
                            .resolve()
                            .context(format!("Unsupported constructor type {}", param.ty))?;
                        coerce(&ty, arg).context(format!(
                            "Invalid {} constructor argument {}",
                            self.name, param.name
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;

                code.extend(constructor.abi_encode_input(&values)?);
            }
            None if !args.is_empty() => {
                anyhow::bail!("{} has no constructor but got {} arguments", self.name, args.len());
            }
            None => {}
        }

        Ok(code.into())
    }

    pub fn abi_json(&self) -> Result<Value> {
        serde_json::to_value(&self.abi).context("Failed to serialize ABI")
    }
}

/// Convert a JSON argument into a Solidity value of type `ty`.
fn coerce(ty: &DynSolType, value: &Value) -> Result<DynSolValue> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => Ok(DynSolValue::Array(
            items.iter().map(|item| coerce(inner, item)).collect::<Result<_>>()?,
        )),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) if items.len() == *len => {
            Ok(DynSolValue::FixedArray(
                items.iter().map(|item| coerce(inner, item)).collect::<Result<_>>()?,
            ))
        }
        (DynSolType::Tuple(types), Value::Array(items)) if items.len() == types.len() => {
            Ok(DynSolValue::Tuple(
                types
                    .iter()
                    .zip(items)
                    .map(|(ty, item)| coerce(ty, item))
                    .collect::<Result<_>>()?,
            ))
        }
        (_, Value::String(s)) => Ok(ty.coerce_str(s)?),
        (_, Value::Number(n)) => Ok(ty.coerce_str(&n.to_string())?),
        (_, Value::Bool(b)) => Ok(ty.coerce_str(&b.to_string())?),
        _ => anyhow::bail!("cannot convert {value} to {ty}"),
    }
}

/// Directory of compiled artifacts, one `<Name>.json` per contract.
#[derive(Debug, Clone)]
pub struct ContractArtifacts {
    dir: PathBuf,
}

impl ContractArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, name: &str) -> Result<CompiledContract> {
        let path = self.dir.join(format!("{name}.json"));
        let content = std::fs::read_to_string(&path).context(format!(
            "Failed to read compiled artifact {}",
            path.display()
        ))?;
        CompiledContract::from_json(name, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::Address;
    use serde_json::json;

    const ABI: &str = r#"[{
        "type": "constructor",
        "stateMutability": "nonpayable",
        "inputs": [
            { "name": "_dispatcher", "type": "address", "internalType": "address" },
            { "name": "_buffer", "type": "uint256", "internalType": "uint256" },
            { "name": "_assets", "type": "address[]", "internalType": "address[]" }
        ]
    }]"#;

    fn artifact_json(bytecode: Value) -> String {
        json!({ "abi": serde_json::from_str::<Value>(ABI).unwrap(), "bytecode": bytecode })
            .to_string()
    }

    #[test]
    fn test_parse_hardhat_and_foundry_shapes() {
        let hardhat = CompiledContract::from_json("A", &artifact_json(json!("0x6080"))).unwrap();
        let foundry =
            CompiledContract::from_json("A", &artifact_json(json!({ "object": "0x6080" }))).unwrap();

        assert_eq!(hardhat.bytecode, foundry.bytecode);
        assert_eq!(hardhat.bytecode.len(), 2);
    }

    #[test]
    fn test_empty_bytecode_is_rejected() {
        assert!(CompiledContract::from_json("IFace", &artifact_json(json!("0x"))).is_err());
    }

    #[test]
    fn test_deploy_code_appends_encoded_args() {
        let contract = CompiledContract::from_json("A", &artifact_json(json!("0x6080"))).unwrap();
        let dispatcher = Address::repeat_byte(0x11);

        let code = contract
            .deploy_code(&[
                json!(dispatcher),
                json!(300),
                json!([Address::repeat_byte(1), Address::repeat_byte(2)]),
            ])
            .unwrap();

        // bytecode + address word + uint word + offset word + length word + 2 address words
        assert_eq!(code.len(), 2 + 32 * 6);
        assert_eq!(&code[2 + 12..2 + 32], dispatcher.as_slice());
    }

    #[test]
    fn test_deploy_code_rejects_wrong_arity() {
        let contract = CompiledContract::from_json("A", &artifact_json(json!("0x6080"))).unwrap();

        assert!(contract.deploy_code(&[json!(300)]).is_err());
    }
}
