use std::fmt;

/// NT status codes the transfer engine distinguishes.
///
/// Servers report many more; anything not listed here is carried in
/// [`Status::Other`] with its raw code so diagnostics stay precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The object already exists (`STATUS_OBJECT_NAME_COLLISION`).
    ObjectNameCollision,
    AccessDenied,
    ObjectNameNotFound,
    /// A parent component of the path is missing.
    ObjectPathNotFound,
    SharingViolation,
    DiskFull,
    LogonFailure,
    /// The share name does not exist on the server.
    BadNetworkName,
    /// The tree or session was torn down server-side.
    NetworkNameDeleted,
    /// The handle is no longer open.
    FileClosed,
    InvalidParameter,
    Other(u32),
}

impl Status {
    /// Returns the raw 32-bit NTSTATUS value.
    pub fn code(self) -> u32 {
        match self {
            Status::ObjectNameCollision => 0xC000_0035,
            Status::AccessDenied => 0xC000_0022,
            Status::ObjectNameNotFound => 0xC000_0034,
            Status::ObjectPathNotFound => 0xC000_003A,
            Status::SharingViolation => 0xC000_0043,
            Status::DiskFull => 0xC000_007F,
            Status::LogonFailure => 0xC000_006D,
            Status::BadNetworkName => 0xC000_00CC,
            Status::NetworkNameDeleted => 0xC000_00C9,
            Status::FileClosed => 0xC000_0128,
            Status::InvalidParameter => 0xC000_000D,
            Status::Other(code) => code,
        }
    }

    /// Maps a raw NTSTATUS value back to a known variant.
    pub fn from_code(code: u32) -> Self {
        match code {
            0xC000_0035 => Status::ObjectNameCollision,
            0xC000_0022 => Status::AccessDenied,
            0xC000_0034 => Status::ObjectNameNotFound,
            0xC000_003A => Status::ObjectPathNotFound,
            0xC000_0043 => Status::SharingViolation,
            0xC000_007F => Status::DiskFull,
            0xC000_006D => Status::LogonFailure,
            0xC000_00CC => Status::BadNetworkName,
            0xC000_00C9 => Status::NetworkNameDeleted,
            0xC000_0128 => Status::FileClosed,
            0xC000_000D => Status::InvalidParameter,
            other => Status::Other(other),
        }
    }

    /// Symbolic name as used in server logs and packet captures.
    pub fn name(self) -> &'static str {
        match self {
            Status::ObjectNameCollision => "STATUS_OBJECT_NAME_COLLISION",
            Status::AccessDenied => "STATUS_ACCESS_DENIED",
            Status::ObjectNameNotFound => "STATUS_OBJECT_NAME_NOT_FOUND",
            Status::ObjectPathNotFound => "STATUS_OBJECT_PATH_NOT_FOUND",
            Status::SharingViolation => "STATUS_SHARING_VIOLATION",
            Status::DiskFull => "STATUS_DISK_FULL",
            Status::LogonFailure => "STATUS_LOGON_FAILURE",
            Status::BadNetworkName => "STATUS_BAD_NETWORK_NAME",
            Status::NetworkNameDeleted => "STATUS_NETWORK_NAME_DELETED",
            Status::FileClosed => "STATUS_FILE_CLOSED",
            Status::InvalidParameter => "STATUS_INVALID_PARAMETER",
            Status::Other(_) => "STATUS_UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip_for_known_statuses() {
        let known = [
            Status::ObjectNameCollision,
            Status::AccessDenied,
            Status::ObjectPathNotFound,
            Status::LogonFailure,
            Status::BadNetworkName,
            Status::FileClosed,
        ];
        for status in known {
            assert_eq!(Status::from_code(status.code()), status);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        let status = Status::from_code(0xC000_9999);
        assert_eq!(status, Status::Other(0xC000_9999));
        assert_eq!(status.code(), 0xC000_9999);
    }

    #[test]
    fn display_includes_name_and_hex_code() {
        assert_eq!(
            Status::ObjectNameCollision.to_string(),
            "STATUS_OBJECT_NAME_COLLISION (0xC0000035)"
        );
    }
}
