use crate::applier::ApplyReport;
use core_types::NodeId;
use mirror::RegistryError;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyError {
    /// Serialized ids that were already bound to live nodes. Items carrying
    /// them were skipped; the rest of the batch was applied.
    IdentityViolation {
        report: ApplyReport,
        violations: Vec<NodeId>,
    },
    /// A session can only be loaded from a document record.
    NotADocument { found: NodeId },
    Registry(RegistryError),
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::IdentityViolation { violations, .. } => {
                write!(f, "{} serialized node id(s) already bound:", violations.len())?;
                for id in violations {
                    write!(f, " {id}")?;
                }
                Ok(())
            }
            ApplyError::NotADocument { found } => {
                write!(f, "snapshot root {found} is not a document record")
            }
            ApplyError::Registry(err) => write!(f, "registry error: {err}"),
        }
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplyError::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for ApplyError {
    fn from(err: RegistryError) -> Self {
        ApplyError::Registry(err)
    }
}
