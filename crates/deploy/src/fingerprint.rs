use sha2::{Digest, Sha256};

/// Inputs that, when changed, require a contract to be deployed again.
///
/// Two deployments with the same fingerprint produce the same contract, so an
/// existing one can be reused instead of sending another creation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentFingerprint<'a> {
    /// Contract name - the record the fingerprint is stored with
    pub contract_name: &'a str,
    /// Creation code from the artifact
    pub bytecode: &'a [u8],
    /// ABI-encoded constructor arguments
    pub constructor_args: &'a [u8],
}

impl<'a> DeploymentFingerprint<'a> {
    pub fn new(contract_name: &'a str, bytecode: &'a [u8], constructor_args: &'a [u8]) -> Self {
        Self {
            contract_name,
            bytecode,
            constructor_args,
        }
    }

    /// Compute a SHA-256 hash of the deployment inputs.
    ///
    /// Every field is length-prefixed so that moving bytes between the
    /// bytecode and the arguments changes the hash.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.contract_name.as_bytes(),
            self.bytecode,
            self.constructor_args,
        ] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }

        // Return hex-encoded hash
        hex::encode(hasher.finalize())
    }
}
