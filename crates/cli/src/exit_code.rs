//! Process exit codes of the sos binary
//!
//! Scripts branch on these values; renumbering any of them is a breaking change.

use sos_core::Error;

/// Exit status reported by `sos`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Anything without a more specific code
    GeneralError = 1,
    /// Bad arguments, selector or configuration
    UsageError = 2,
    /// Transport failure or backend error that is not about permissions
    NetworkError = 3,
    /// Credentials rejected or access denied
    AuthError = 4,
    /// Bucket, object or alias missing
    NotFound = 5,
    /// Ctrl+C between two page fetches
    Interrupted = 130,
}

impl ExitCode {
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.exit_code() {
            2 => Self::UsageError,
            3 => Self::NetworkError,
            4 => Self::AuthError,
            5 => Self::NotFound,
            130 => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let codes = [
            (ExitCode::Success, 0),
            (ExitCode::GeneralError, 1),
            (ExitCode::UsageError, 2),
            (ExitCode::NetworkError, 3),
            (ExitCode::AuthError, 4),
            (ExitCode::NotFound, 5),
            (ExitCode::Interrupted, 130),
        ];
        for (code, value) in codes {
            assert_eq!(code.as_i32(), value, "{code:?}");
        }
    }

    #[test]
    fn test_exit_code_from_error() {
        assert_eq!(
            ExitCode::from(&Error::InvalidPath("".into())),
            ExitCode::UsageError
        );
        assert_eq!(ExitCode::from(&Error::Interrupted), ExitCode::Interrupted);
        assert_eq!(
            ExitCode::from(&Error::AliasNotFound("gva".into())),
            ExitCode::NotFound
        );

        let wrapped = Error::AclFetchFailed {
            bucket: "b".into(),
            key: "k".into(),
            source: Box::new(Error::Auth("AccessDenied".into())),
        };
        assert_eq!(ExitCode::from(&wrapped), ExitCode::AuthError);

        assert_eq!(
            ExitCode::from(&Error::General("boom".into())),
            ExitCode::GeneralError
        );
    }
}
