//! Result codes and search results.

use crate::entry::DirectoryEntry;
use ldap3_proto::proto::{LdapResultCode, LdapSearchResultEntry};
use serde::{Deserialize, Serialize};

/// The result codes a backend produces.
///
/// Each maps onto its [`LdapResultCode`], which supplies the wire number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// Operation completed.
    Success,
    /// Server-side failure while processing the operation.
    OperationsError,
    /// Malformed request.
    ProtocolError,
    /// More entries matched than the size limit allows.
    SizeLimitExceeded,
    /// The target object does not exist.
    NoSuchObject,
    /// Bind credentials were rejected.
    InvalidCredentials,
    /// The caller may not perform this operation.
    InsufficientAccessRights,
    /// The server will not perform this operation.
    UnwillingToPerform,
    /// Anything else.
    Other,
}

impl ResultCode {
    /// Numeric wire value.
    pub fn code(self) -> i64 {
        LdapResultCode::from(self) as i64
    }

    /// Check if the code signals success.
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl From<ResultCode> for LdapResultCode {
    fn from(code: ResultCode) -> Self {
        match code {
            ResultCode::Success => LdapResultCode::Success,
            ResultCode::OperationsError => LdapResultCode::OperationsError,
            ResultCode::ProtocolError => LdapResultCode::ProtocolError,
            ResultCode::SizeLimitExceeded => LdapResultCode::SizeLimitExceeded,
            ResultCode::NoSuchObject => LdapResultCode::NoSuchObject,
            ResultCode::InvalidCredentials => LdapResultCode::InvalidCredentials,
            ResultCode::InsufficientAccessRights => LdapResultCode::InsufficentAccessRights,
            ResultCode::UnwillingToPerform => LdapResultCode::UnwillingToPerform,
            ResultCode::Other => LdapResultCode::Other,
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResultCode::Success => "success",
            ResultCode::OperationsError => "operationsError",
            ResultCode::ProtocolError => "protocolError",
            ResultCode::SizeLimitExceeded => "sizeLimitExceeded",
            ResultCode::NoSuchObject => "noSuchObject",
            ResultCode::InvalidCredentials => "invalidCredentials",
            ResultCode::InsufficientAccessRights => "insufficientAccessRights",
            ResultCode::UnwillingToPerform => "unwillingToPerform",
            ResultCode::Other => "other",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Outcome of a search: the returned entries plus a result code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Entries returned to the client.
    pub entries: Vec<DirectoryEntry>,
    /// Final result code.
    pub result_code: ResultCode,
}

impl SearchResult {
    /// A successful result.
    pub fn ok(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            result_code: ResultCode::Success,
        }
    }

    /// A result with no entries and the given code.
    pub fn failed(result_code: ResultCode) -> Self {
        Self {
            entries: Vec::new(),
            result_code,
        }
    }

    /// Entries in the form a protocol encoder sends them.
    pub fn to_ldap_entries(&self) -> Vec<LdapSearchResultEntry> {
        self.entries.iter().map(LdapSearchResultEntry::from).collect()
    }
}
