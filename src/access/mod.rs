//! Access gate: validates a (user, dataset) pair against the permission
//! table before anything else runs. Fails closed: any lookup miss is a
//! denial, never an implicit allow.

use crate::config::AccessRules;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("user `{user}` has no dataset permissions")]
    NoPermissionsForUser { user: String },
    #[error("user `{user}` is not authorized for dataset `{dataset}`")]
    DatasetNotAuthorized { user: String, dataset: String },
    #[error("dataset `{dataset}` is not registered")]
    DatasetNotRegistered { dataset: String },
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    rules: AccessRules,
}

impl AccessGate {
    pub fn new(rules: AccessRules) -> Self {
        Self { rules }
    }

    /// Resolves the dataset path for `user`, or the denial reason. Runs to
    /// completion before any role or task is constructed; a denial leaves no
    /// side effects behind.
    pub fn verify(&self, user: &str, dataset: &str) -> Result<PathBuf, AccessError> {
        let allowed = self
            .rules
            .permissions
            .get(user)
            .filter(|datasets| !datasets.is_empty())
            .ok_or_else(|| AccessError::NoPermissionsForUser {
                user: user.to_string(),
            })?;

        if !allowed.iter().any(|name| name == dataset) {
            return Err(AccessError::DatasetNotAuthorized {
                user: user.to_string(),
                dataset: dataset.to_string(),
            });
        }

        self.rules
            .datasets
            .get(dataset)
            .cloned()
            .ok_or_else(|| AccessError::DatasetNotRegistered {
                dataset: dataset.to_string(),
            })
    }

    pub fn result_path(&self) -> &std::path::Path {
        &self.rules.result_path
    }

    pub fn registered_datasets(&self) -> impl Iterator<Item = (&str, &std::path::Path)> {
        self.rules
            .datasets
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }
}
