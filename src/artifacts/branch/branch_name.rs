use crate::artifacts::branch::INVALID_BRANCH_NAME_REGEX;
use crate::error::{EngineError, Result};

const REF_PREFIX: &str = "refs/heads/";

/// Full symbolic name of a ref, e.g. `refs/heads/main`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SymRefName(String);

impl SymRefName {
    pub fn new(name: impl Into<String>) -> Self {
        SymRefName(name.into().trim().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    /// Validate a branch name against the producer's ref-name rules
    ///
    /// Invalid names are reported as `InvalidStart` so a bad `switch-branch`
    /// request never reaches the producer.
    pub fn try_parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(EngineError::InvalidStart(
                "branch name cannot be empty".to_string(),
            ));
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX).map_err(|e| {
            EngineError::ParseFailure(format!("invalid branch name regex: {e}"))
        })?;

        if re.is_match(&name) {
            Err(EngineError::InvalidStart(name))
        } else {
            Ok(Self(name))
        }
    }

    pub fn try_parse_sym_ref_name(sym_ref_name: &SymRefName) -> Result<Self> {
        match sym_ref_name.0.strip_prefix(REF_PREFIX) {
            Some(short_name) => Self::try_parse(short_name),
            None => Err(EngineError::InvalidStart(sym_ref_name.0.clone())),
        }
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
