use std::sync::Arc;

use crate::error::SpecError;

use super::model::{HttpMethod, Operation, OperationDetails};

/// Source of operation metadata for the tester and the benchmark executor.
pub trait OperationProvider: Send + Sync {
    /// Every operation of the document, bound to `base_url`.
    fn operations(&self, base_url: &str) -> Vec<Operation>;

    /// Parameters, body and responses for one (path, method) pair.
    ///
    /// # Errors
    ///
    /// Returns an error when the document has no such operation.
    fn operation_details(
        &self,
        path: &str,
        method: HttpMethod,
    ) -> Result<Arc<OperationDetails>, SpecError>;
}
