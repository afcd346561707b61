//! Compiled contract artifacts (solc standard-json output) read from disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{Bytes, hex};
use eyre::WrapErr;
use serde::Deserialize;
use tracing::debug;

pub const TOKEN_ARTIFACT: &str = "Eraswap_0.json";
pub const MANAGER_ARTIFACT: &str = "NRTManager_0.json";
pub const REWARD_ARTIFACT: &str = "TimeAlly_0.json";

#[derive(Deserialize)]
struct RawArtifact {
    abi: Vec<AbiEntry>,
    evm: RawEvm,
}

#[derive(Deserialize)]
struct RawEvm {
    bytecode: RawBytecode,
}

#[derive(Deserialize)]
struct RawBytecode {
    object: String,
}

#[derive(Deserialize)]
struct AbiEntry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
}

#[derive(Deserialize)]
struct AbiParam {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    components: Vec<AbiParam>,
}

impl AbiParam {
    /// Canonical type as used in function signatures, tuples expanded.
    fn canonical(&self) -> String {
        match self.kind.strip_prefix("tuple") {
            Some(suffix) => format!("({}){}", canonical_list(&self.components), suffix),
            None => self.kind.clone(),
        }
    }
}

fn canonical_list(params: &[AbiParam]) -> String {
    params
        .iter()
        .map(AbiParam::canonical)
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Clone, Debug)]
pub struct Artifact {
    name: String,
    functions: Vec<String>,
    bytecode: Bytes,
}

impl Artifact {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let json = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read artifact {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&name, &json).wrap_err_with(|| format!("invalid artifact {}", path.display()))
    }

    pub fn parse(name: &str, json: &str) -> eyre::Result<Self> {
        let raw: RawArtifact = serde_json::from_str(json)?;

        let object = raw.evm.bytecode.object.trim();
        if object.contains("__") {
            eyre::bail!("{name} has unlinked library references");
        }
        let bytecode: Bytes = hex::decode(object)
            .wrap_err_with(|| format!("{name} bytecode is not valid hex"))?
            .into();
        if bytecode.is_empty() {
            eyre::bail!("{name} has no creation bytecode (abstract contract or interface?)");
        }

        let functions = raw
            .abi
            .iter()
            .filter(|entry| entry.kind == "function")
            .map(|entry| format!("{}({})", entry.name, canonical_list(&entry.inputs)))
            .collect();

        Ok(Self {
            name: name.to_string(),
            functions,
            bytecode,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    pub fn has_function(&self, signature: &str) -> bool {
        self.functions.iter().any(|function| function == signature)
    }

    /// Fail if the ABI lacks any of `signatures`.
    pub fn ensure_functions(&self, signatures: &[&str]) -> eyre::Result<()> {
        let missing: Vec<&str> = signatures
            .iter()
            .copied()
            .filter(|signature| !self.has_function(signature))
            .collect();
        if !missing.is_empty() {
            eyre::bail!("{} does not expose {}", self.name, missing.join(", "));
        }
        Ok(())
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub fn deploy_code(&self, constructor_args: &[u8]) -> Bytes {
        [self.bytecode.as_ref(), constructor_args].concat().into()
    }
}

/// The three artifacts the measurement run deploys.
pub struct ArtifactSet {
    pub token: Artifact,
    pub manager: Artifact,
    pub reward: Artifact,
}

impl ArtifactSet {
    pub fn load(dir: &Path) -> eyre::Result<Self> {
        let load = |file: &str| -> eyre::Result<Artifact> {
            let path: PathBuf = dir.join(file);
            let artifact = Artifact::load(&path)?;
            debug!(
                target: "sandbox",
                artifact = artifact.name(),
                bytes = artifact.bytecode().len(),
                "loaded artifact"
            );
            Ok(artifact)
        };

        Ok(Self {
            token: load(TOKEN_ARTIFACT)?,
            manager: load(MANAGER_ARTIFACT)?,
            reward: load(REWARD_ARTIFACT)?,
        })
    }
}
