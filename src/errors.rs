use std::io;

use thiserror::Error;

/// Stable integer codes shared with backend implementations.
///
/// Backends report failures through [`Error`]; these codes are the
/// language-neutral form of the same taxonomy, used by callers that
/// carry codes across an FFI or process boundary.
pub const SUCCESS: i32 = 0;
pub const ERR_GENERIC: i32 = -1;
pub const ERR_UNINIT: i32 = -2;
pub const ERR_NOT_SUPPORTED: i32 = -3;
pub const ERR_NO_MEMORY: i32 = -4;
pub const ERR_PERMISSION: i32 = -5;
pub const ERR_NO_DEVICE: i32 = -6;
pub const ERR_INTERRUPTED: i32 = -7;
pub const ERR_TOO_BIG: i32 = -8;

static ERROR_TABLE: &[(i32, &str)] = &[
    (SUCCESS, "Success"),
    (ERR_GENERIC, "Generic internal error"),
    (ERR_UNINIT, "Uninitialized socket"),
    (ERR_NOT_SUPPORTED, "Operation not supported"),
    (ERR_NO_MEMORY, "Out of memory"),
    (ERR_PERMISSION, "Permission denied"),
    (ERR_NO_DEVICE, "No such device"),
    (ERR_INTERRUPTED, "Interrupted system call"),
    (ERR_TOO_BIG, "Message too large"),
];

/// Looks up the message registered for `code`.
///
/// Exact match only; unknown codes yield `None`.
pub fn strerror(code: i32) -> Option<&'static str> {
    ERROR_TABLE
        .iter()
        .find(|(value, _)| *value == code)
        .map(|(_, msg)| *msg)
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Generic internal error")]
    Generic,
    #[error("Uninitialized socket")]
    Uninitialized,
    #[error("Operation not supported")]
    NotSupported,
    #[error("Can't allocate memory")]
    NoMemory,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("No such device")]
    NoSuchDevice,
    #[error("Interrupted system call")]
    Interrupted,
    #[error("Too big packet: {0}")]
    TooBigPacket(usize),
    #[error("Can't receive packet")]
    NoPacket,
}

impl Error {
    /// The stable integer code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::Generic => ERR_GENERIC,
            Error::Uninitialized => ERR_UNINIT,
            Error::NotSupported => ERR_NOT_SUPPORTED,
            Error::NoMemory => ERR_NO_MEMORY,
            Error::PermissionDenied => ERR_PERMISSION,
            Error::NoSuchDevice => ERR_NO_DEVICE,
            Error::Interrupted => ERR_INTERRUPTED,
            Error::TooBigPacket(_) => ERR_TOO_BIG,
            Error::NoPacket => ERR_GENERIC,
        }
    }
}

/// Single translation point from OS errno values into the error taxonomy.
/// Backends never map errno themselves.
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EPERM) | Some(libc::EACCES) => Error::PermissionDenied,
            Some(libc::ENODEV) | Some(libc::ENXIO) => Error::NoSuchDevice,
            Some(libc::EINTR) => Error::Interrupted,
            Some(libc::ENOMEM) | Some(libc::ENOBUFS) => Error::NoMemory,
            Some(libc::EMSGSIZE) => Error::TooBigPacket(0),
            Some(libc::EAGAIN) => Error::NoPacket,
            _ => Error::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strerror_known_codes() {
        assert_eq!(strerror(SUCCESS), Some("Success"));
        assert_eq!(strerror(ERR_GENERIC), Some("Generic internal error"));
        assert_eq!(strerror(ERR_UNINIT), Some("Uninitialized socket"));
        assert_eq!(strerror(ERR_NOT_SUPPORTED), Some("Operation not supported"));
        assert_eq!(strerror(ERR_NO_MEMORY), Some("Out of memory"));
        assert_eq!(strerror(ERR_PERMISSION), Some("Permission denied"));
        assert_eq!(strerror(ERR_NO_DEVICE), Some("No such device"));
        assert_eq!(strerror(ERR_INTERRUPTED), Some("Interrupted system call"));
        assert_eq!(strerror(ERR_TOO_BIG), Some("Message too large"));
    }

    #[test]
    fn strerror_unknown_codes() {
        assert_eq!(strerror(-9), None);
        assert_eq!(strerror(1), None);
        assert_eq!(strerror(i32::MIN), None);
        assert_eq!(strerror(i32::MAX), None);
    }

    #[test]
    fn every_variant_has_a_registered_code() {
        let all = [
            Error::Generic,
            Error::Uninitialized,
            Error::NotSupported,
            Error::NoMemory,
            Error::PermissionDenied,
            Error::NoSuchDevice,
            Error::Interrupted,
            Error::TooBigPacket(9000),
            Error::NoPacket,
        ];
        for err in all {
            assert!(strerror(err.code()).is_some(), "no message for {err:?}");
        }
    }

    #[test]
    fn errno_translation() {
        let perm = io::Error::from_raw_os_error(libc::EACCES);
        assert!(matches!(Error::from(perm), Error::PermissionDenied));
        let nodev = io::Error::from_raw_os_error(libc::ENODEV);
        assert!(matches!(Error::from(nodev), Error::NoSuchDevice));
        let intr = io::Error::from_raw_os_error(libc::EINTR);
        assert!(matches!(Error::from(intr), Error::Interrupted));
        let other = io::Error::from_raw_os_error(libc::EINVAL);
        assert!(matches!(Error::from(other), Error::Generic));
    }
}
