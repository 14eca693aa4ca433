//! Process exit codes

use scdx_core::errors::{ExError, ExErrorKind};

pub const FAILURE: i32 = 1;
pub const CONFIGURATION: i32 = 2;
pub const STORE_CONNECTION: i32 = 3;
pub const STORE_TRANSACTION: i32 = 4;
pub const INTERRUPTED: i32 = 5;

/// Map an error kind to the process exit code
pub fn code_for_kind(kind: ExErrorKind) -> i32 {
    match kind {
        ExErrorKind::Configuration => CONFIGURATION,
        ExErrorKind::StoreConnection => STORE_CONNECTION,
        ExErrorKind::StoreTransaction => STORE_TRANSACTION,
        ExErrorKind::Timeout | ExErrorKind::Cancelled => INTERRUPTED,
        _ => FAILURE,
    }
}

/// Exit code for a command failure; errors without a kind are generic failures
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ExError>()
        .map_or(FAILURE, |e| code_for_kind(e.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        assert_eq!(code_for_kind(ExErrorKind::Configuration), 2);
        assert_eq!(code_for_kind(ExErrorKind::StoreConnection), 3);
        assert_eq!(code_for_kind(ExErrorKind::StoreTransaction), 4);
        assert_eq!(code_for_kind(ExErrorKind::Timeout), 5);
        assert_eq!(code_for_kind(ExErrorKind::Cancelled), 5);
        assert_eq!(code_for_kind(ExErrorKind::Serialization), 1);
        assert_ne!(code_for_kind(ExErrorKind::Io), 0);
    }

    #[test]
    fn test_context_keeps_kind() {
        use anyhow::Context;

        let result: Result<(), ExError> = Err(ExError::new(ExErrorKind::StoreConnection));
        let err = result.context("opening store").unwrap_err();
        assert_eq!(exit_code(&err), STORE_CONNECTION);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), FAILURE);
    }
}
