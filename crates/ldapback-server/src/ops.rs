//! Reference bind and search coordinator.
//!
//! Handlers delegate `bind` and `search` here, passing themselves as the
//! [`Backend`] to resolve identities and enumerate entries through.

use ldapback_core::security::{AuditEvent, SecurityError, SecurityResult, SharedAuditLogger};
use ldapback_core::{Backend, DirectoryLayout, Identity};
use ldapback_proto::{
    dn, filter, DirectoryEntry, ResultCode, SearchRequest, SearchResult, SearchScope,
};
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use crate::handler::ConnectionInfo;

const HANDLER_NAME: &str = "ops";

/// Bind and search semantics shared by every backend.
pub trait LdapOps: Send + Sync {
    /// Authenticate `dn` with `password` against `backend`.
    fn bind(
        &self,
        backend: &dyn Backend,
        dn: &str,
        password: &str,
        conn: &ConnectionInfo,
    ) -> ResultCode;

    /// Run `request` on behalf of the identity bound as `bound_dn`.
    fn search(
        &self,
        backend: &dyn Backend,
        bound_dn: &str,
        request: &SearchRequest,
        conn: &ConnectionInfo,
    ) -> SearchResult;
}

/// Who a bind DN refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BindTarget {
    /// `<nameformat>=<user>[,<groupformat>=<group>]`
    Name { user: String, group: Option<String> },
    /// Bare e-mail address.
    Mail(String),
}

/// The default coordinator.
pub struct DefaultOps {
    layout: DirectoryLayout,
    audit: SharedAuditLogger,
}

impl DefaultOps {
    /// Create a coordinator for `layout`.
    pub fn new(layout: DirectoryLayout, audit: SharedAuditLogger) -> Self {
        Self { layout, audit }
    }

    fn parse_bind_dn(&self, bind_dn: &str) -> Option<BindTarget> {
        if !bind_dn.contains('=') {
            return bind_dn
                .contains('@')
                .then(|| BindTarget::Mail(bind_dn.trim().to_string()));
        }

        let mut relative = dn::strip_base(bind_dn, &self.layout.base_dn)?;
        if !self.layout.users_hierarchy.is_empty() {
            if let Some(rest) = dn::strip_base(relative, &self.layout.users_hierarchy) {
                relative = rest;
            }
        }

        let rdns = dn::parse(relative).ok()?;
        match rdns.as_slice() {
            [(attr, user)] if attr.eq_ignore_ascii_case(&self.layout.name_format) => {
                Some(BindTarget::Name {
                    user: user.clone(),
                    group: None,
                })
            }
            [(attr, user), (group_attr, group)]
                if attr.eq_ignore_ascii_case(&self.layout.name_format)
                    && group_attr.eq_ignore_ascii_case(&self.layout.group_format) =>
            {
                Some(BindTarget::Name {
                    user: user.clone(),
                    group: Some(group.clone()),
                })
            }
            _ => None,
        }
    }

    fn resolve(
        &self,
        backend: &dyn Backend,
        target: &BindTarget,
    ) -> ldapback_core::Result<Option<Identity>> {
        let (user, group) = match target {
            BindTarget::Mail(mail) => return backend.find_user(mail, true),
            BindTarget::Name { user, group } => (user, group),
        };

        let Some(identity) = backend.find_user(user, false)? else {
            return Ok(None);
        };
        if let Some(group) = group {
            let Some(group) = backend.find_group(group)? else {
                return Ok(None);
            };
            if !backend.is_member(&identity, &group)? {
                return Ok(None);
            }
        }
        Ok(Some(identity))
    }

    fn authenticate(
        &self,
        backend: &dyn Backend,
        bind_dn: &str,
        password: &str,
    ) -> ldapback_core::Result<SecurityResult<Identity>> {
        if password.is_empty() {
            return Ok(Err(SecurityError::AuthenticationFailed("empty password".to_string())));
        }
        let Some(target) = self.parse_bind_dn(bind_dn) else {
            return Ok(Err(SecurityError::AuthenticationFailed(format!(
                "unrecognized bind DN {}",
                bind_dn
            ))));
        };
        let Some(identity) = self.resolve(backend, &target)? else {
            return Ok(Err(SecurityError::AuthenticationFailed("no such user".to_string())));
        };
        if identity.disabled {
            return Ok(Err(SecurityError::AuthenticationFailed("account disabled".to_string())));
        }
        if identity.pass_sha256.is_empty()
            || !password_hash(password).eq_ignore_ascii_case(&identity.pass_sha256)
        {
            return Ok(Err(SecurityError::AuthenticationFailed("invalid password".to_string())));
        }
        Ok(Ok(identity))
    }

    /// Candidate entries for a base, chosen by which hierarchy it falls in.
    fn candidates(
        &self,
        backend: &dyn Backend,
        relative: &str,
    ) -> ldapback_core::Result<Vec<DirectoryEntry>> {
        let layout = &self.layout;
        let below =
            |hierarchy: &str| !hierarchy.is_empty() && dn::is_at_or_below(relative, hierarchy);

        let mut entries = Vec::new();
        if relative.is_empty() {
            entries.extend(backend.find_posix_accounts(&layout.users_hierarchy)?);
            entries.extend(backend.find_posix_groups(&layout.groups_hierarchy)?);
        } else if below(&layout.groups_hierarchy) {
            entries.extend(backend.find_posix_groups(&layout.groups_hierarchy)?);
        } else if below(&layout.users_hierarchy) {
            entries.extend(backend.find_posix_accounts(&layout.users_hierarchy)?);
        } else {
            entries.extend(backend.find_posix_accounts(relative)?);
            entries.extend(backend.find_posix_groups(relative)?);
        }
        Ok(entries)
    }

    fn try_search(
        &self,
        backend: &dyn Backend,
        bound_dn: &str,
        request: &SearchRequest,
    ) -> ldapback_core::Result<SearchResult> {
        let identity = match self.parse_bind_dn(bound_dn) {
            Some(target) => self.resolve(backend, &target)?,
            None => None,
        };
        let Some(identity) = identity else {
            return Ok(self.deny(bound_dn, request, "not bound"));
        };
        if !identity.capability_set().can_search(&request.base_dn) {
            return Ok(self.deny(bound_dn, request, "missing search capability"));
        }

        let Some(relative) = dn::strip_base(&request.base_dn, &self.layout.base_dn) else {
            debug!(base = %request.base_dn, "search base outside directory");
            return Ok(SearchResult::failed(ResultCode::NoSuchObject));
        };

        let search_filter = filter::parse(&request.filter)?;
        let mut entries: Vec<DirectoryEntry> = self
            .candidates(backend, relative)?
            .into_iter()
            .filter(|entry| in_scope(&entry.dn, &request.base_dn, request.scope))
            .filter(|entry| filter::matches(&search_filter, entry))
            .collect();

        for entry in &mut entries {
            entry.project(&request.attributes);
        }

        if request.size_limit > 0 && entries.len() > request.size_limit {
            entries.truncate(request.size_limit);
            return Ok(SearchResult {
                entries,
                result_code: ResultCode::SizeLimitExceeded,
            });
        }
        Ok(SearchResult::ok(entries))
    }

    fn deny(&self, bound_dn: &str, request: &SearchRequest, reason: &str) -> SearchResult {
        let err = SecurityError::PermissionDenied(format!("search {}", request.base_dn));
        warn!(bound_dn, error = %err, reason, "search denied");
        self.audit.log(AuditEvent::search_denied(
            HANDLER_NAME,
            bound_dn,
            request.base_dn.as_str(),
            reason,
        ));
        SearchResult::failed(ResultCode::InsufficientAccessRights)
    }
}

impl LdapOps for DefaultOps {
    fn bind(
        &self,
        backend: &dyn Backend,
        dn: &str,
        password: &str,
        conn: &ConnectionInfo,
    ) -> ResultCode {
        let result = match self.authenticate(backend, dn, password) {
            Ok(Ok(identity)) => {
                debug!(dn, user = %identity.name, peer = %conn.peer, "bind succeeded");
                ResultCode::Success
            }
            Ok(Err(e)) => {
                debug!(dn, peer = %conn.peer, error = %e, "bind rejected");
                ResultCode::InvalidCredentials
            }
            Err(e) => {
                error!(dn, peer = %conn.peer, error = %e, "bind lookup failed");
                ResultCode::OperationsError
            }
        };
        self.audit.log(AuditEvent::bind(HANDLER_NAME, dn, result));
        result
    }

    fn search(
        &self,
        backend: &dyn Backend,
        bound_dn: &str,
        request: &SearchRequest,
        conn: &ConnectionInfo,
    ) -> SearchResult {
        match self.try_search(backend, bound_dn, request) {
            Ok(result) => {
                debug!(
                    base = %request.base_dn,
                    filter = %request.filter,
                    entries = result.entries.len(),
                    result = %result.result_code,
                    "search complete"
                );
                result
            }
            Err(ldapback_core::Error::Protocol(e)) => {
                debug!(filter = %request.filter, error = %e, "malformed search filter");
                SearchResult::failed(ResultCode::ProtocolError)
            }
            Err(e) => {
                error!(
                    base = %request.base_dn,
                    peer = %conn.peer,
                    error = %e,
                    "search lookup failed"
                );
                SearchResult::failed(ResultCode::OperationsError)
            }
        }
    }
}

/// Hex-encoded SHA-256 of `password`.
pub fn password_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn in_scope(entry_dn: &str, base_dn: &str, scope: SearchScope) -> bool {
    match scope {
        SearchScope::BaseObject => entry_dn.eq_ignore_ascii_case(base_dn),
        SearchScope::SingleLevel => {
            dn::parent(entry_dn).is_some_and(|p| p.eq_ignore_ascii_case(base_dn))
        }
        SearchScope::WholeSubtree => dn::is_at_or_below(entry_dn, base_dn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldapback_core::security::{AuditEventType, MemoryAuditLogger};
    use ldapback_core::{Capability, DirectoryData, Group, MemoryStore};
    use std::sync::Arc;

    use crate::handler::StoreHandler;

    const BASE: &str = "dc=glauth,dc=com";

    fn setup() -> (StoreHandler<MemoryStore>, DefaultOps, Arc<MemoryAuditLogger>) {
        let data = DirectoryData {
            users: vec![
                Identity::new("serviceuser", 5003, 5502)
                    .with_mail("serviceuser@glauth.com")
                    .with_pass_sha256(password_hash("mysecret"))
                    .with_capability(Capability::new("search", "*")),
                Identity::new("hackers", 5001, 5501)
                    .with_mail("hackers@glauth.com")
                    .with_pass_sha256(password_hash("dogood")),
                Identity::new("johndoe", 5002, 5501)
                    .with_pass_sha256(password_hash("dogood"))
                    .with_capability(Capability::new("search", "ou=superheros,dc=glauth,dc=com")),
            ],
            groups: vec![Group::new("superheros", 5501), Group::new("svcaccts", 5502)],
        };
        let layout = DirectoryLayout::new(BASE).with_group_format("cn");
        let audit = Arc::new(MemoryAuditLogger::new());
        let ops = DefaultOps::new(layout.clone(), audit.clone());
        let handler = StoreHandler::new(
            MemoryStore::new(data).unwrap(),
            layout.clone(),
            Arc::new(DefaultOps::new(layout, audit.clone())),
            audit.clone(),
        );
        (handler, ops, audit)
    }

    #[test]
    fn test_password_hash() {
        assert_eq!(
            password_hash("mysecret"),
            "652c7dc687d98c9889304ed2e408c74b611e86a40caa51c4b43f1dd5913c5cd0"
        );
    }

    #[test]
    fn test_parse_bind_dn() {
        let (_, ops, _) = setup();
        assert_eq!(
            ops.parse_bind_dn("cn=serviceuser,cn=svcaccts,dc=glauth,dc=com"),
            Some(BindTarget::Name {
                user: "serviceuser".to_string(),
                group: Some("svcaccts".to_string())
            })
        );
        assert_eq!(
            ops.parse_bind_dn("cn=hackers,ou=users,dc=glauth,dc=com"),
            Some(BindTarget::Name {
                user: "hackers".to_string(),
                group: None
            })
        );
        assert_eq!(
            ops.parse_bind_dn("hackers@glauth.com"),
            Some(BindTarget::Mail("hackers@glauth.com".to_string()))
        );
        assert_eq!(ops.parse_bind_dn("cn=hackers,dc=other,dc=com"), None);
        assert_eq!(ops.parse_bind_dn("uid=hackers,dc=glauth,dc=com"), None);
        assert_eq!(ops.parse_bind_dn("hackers"), None);
    }

    #[test]
    fn test_bind() {
        let (backend, ops, audit) = setup();
        let conn = ConnectionInfo::local();

        let cases = [
            ("cn=serviceuser,cn=svcaccts,dc=glauth,dc=com", "mysecret", ResultCode::Success),
            ("cn=serviceuser,dc=glauth,dc=com", "mysecret", ResultCode::Success),
            ("serviceuser@glauth.com", "mysecret", ResultCode::Success),
            (
                "cn=serviceuser,cn=superheros,dc=glauth,dc=com",
                "mysecret",
                ResultCode::InvalidCredentials,
            ),
            ("cn=serviceuser, dc=glauth, dc=com", "mysecret", ResultCode::Success),
            ("cn=serviceuser,dc=glauth,dc=com", "wrong", ResultCode::InvalidCredentials),
            ("cn=serviceuser,dc=glauth,dc=com", "", ResultCode::InvalidCredentials),
            ("cn=nobody,dc=glauth,dc=com", "mysecret", ResultCode::InvalidCredentials),
        ];
        for (dn, password, expected) in cases {
            assert_eq!(ops.bind(&backend, dn, password, &conn), expected, "bind {}", dn);
        }

        let events = audit.events();
        assert_eq!(events.len(), cases.len());
        assert!(matches!(
            &events[0].event_type,
            AuditEventType::Bind { result: ResultCode::Success, .. }
        ));
    }

    #[test]
    fn test_search_requires_capability() {
        let (backend, ops, audit) = setup();
        let conn = ConnectionInfo::local();
        let request = SearchRequest::new(BASE);

        let result = ops.search(&backend, "cn=hackers,dc=glauth,dc=com", &request, &conn);
        assert_eq!(result.result_code, ResultCode::InsufficientAccessRights);
        assert!(result.entries.is_empty());

        let result = ops.search(&backend, "", &request, &conn);
        assert_eq!(result.result_code, ResultCode::InsufficientAccessRights);

        let result = ops.search(&backend, "cn=johndoe,dc=glauth,dc=com", &request, &conn);
        assert_eq!(result.result_code, ResultCode::InsufficientAccessRights);

        assert_eq!(audit.len(), 3);
        assert!(audit
            .events()
            .iter()
            .all(|e| matches!(e.event_type, AuditEventType::SearchDenied { .. })));
    }

    #[test]
    fn test_search_root() {
        let (backend, ops, _) = setup();
        let result = ops.search(
            &backend,
            "cn=serviceuser,dc=glauth,dc=com",
            &SearchRequest::new(BASE),
            &ConnectionInfo::local(),
        );

        assert_eq!(result.result_code, ResultCode::Success);
        let dns: Vec<_> = result.entries.iter().map(|e| e.dn.as_str()).collect();
        assert_eq!(
            dns,
            vec![
                "cn=serviceuser,cn=svcaccts,ou=users,dc=glauth,dc=com",
                "cn=hackers,cn=superheros,ou=users,dc=glauth,dc=com",
                "cn=johndoe,cn=superheros,ou=users,dc=glauth,dc=com",
                "cn=superheros,ou=groups,dc=glauth,dc=com",
                "cn=svcaccts,ou=groups,dc=glauth,dc=com",
            ]
        );
    }

    #[test]
    fn test_search_filter_scope_and_projection() {
        let (backend, ops, _) = setup();
        let conn = ConnectionInfo::local();
        let bound = "cn=serviceuser,dc=glauth,dc=com";

        let request = SearchRequest::new("ou=groups,dc=glauth,dc=com")
            .with_scope(SearchScope::SingleLevel)
            .with_filter("(&(objectClass=groupOfUniqueNames)(cn=super*))")
            .with_attributes(vec!["cn".to_string(), "uniqueMember".to_string()]);
        let result = ops.search(&backend, bound, &request, &conn);

        assert_eq!(result.result_code, ResultCode::Success);
        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_eq!(entry.dn, "cn=superheros,ou=groups,dc=glauth,dc=com");
        let names: Vec<_> = entry.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["cn", "uniqueMember"]);

        let request = SearchRequest::new("cn=hackers,cn=superheros,ou=users,dc=glauth,dc=com")
            .with_scope(SearchScope::BaseObject);
        let result = ops.search(&backend, bound, &request, &conn);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].values("uidNumber"), ["5001"]);
    }

    #[test]
    fn test_search_other_hierarchy_renders_posix_groups() {
        let (backend, ops, _) = setup();
        let request = SearchRequest::new("ou=other,dc=glauth,dc=com")
            .with_filter("(objectClass=posixGroup)");
        let result = ops.search(
            &backend,
            "cn=serviceuser,dc=glauth,dc=com",
            &request,
            &ConnectionInfo::local(),
        );

        assert_eq!(result.result_code, ResultCode::Success);
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].dn, "cn=superheros,ou=other,dc=glauth,dc=com");
        assert_eq!(result.entries[0].values("memberUid"), ["hackers", "johndoe"]);
    }

    #[test]
    fn test_search_errors() {
        let (backend, ops, _) = setup();
        let conn = ConnectionInfo::local();
        let bound = "cn=serviceuser,dc=glauth,dc=com";

        let result = ops.search(&backend, bound, &SearchRequest::new("dc=other,dc=com"), &conn);
        assert_eq!(result.result_code, ResultCode::NoSuchObject);

        let request = SearchRequest::new(BASE).with_filter("(cn=broken");
        let result = ops.search(&backend, bound, &request, &conn);
        assert_eq!(result.result_code, ResultCode::ProtocolError);

        let request = SearchRequest::new(BASE).with_size_limit(2);
        let result = ops.search(&backend, bound, &request, &conn);
        assert_eq!(result.result_code, ResultCode::SizeLimitExceeded);
        assert_eq!(result.entries.len(), 2);
    }

    #[test]
    fn test_deeply_nested_filter_is_protocol_error() {
        let (backend, ops, _) = setup();
        let depth = 200_000;
        let nested = format!("{}(cn=hackers){}", "(!".repeat(depth), ")".repeat(depth));
        let request = SearchRequest::new(BASE).with_filter(nested);

        let result = ops.search(
            &backend,
            "cn=serviceuser,dc=glauth,dc=com",
            &request,
            &ConnectionInfo::local(),
        );
        assert_eq!(result.result_code, ResultCode::ProtocolError);
        assert!(result.entries.is_empty());
    }

    #[test]
    fn test_bind_through_included_group() {
        let data = DirectoryData {
            users: vec![Identity::new("hackers", 5001, 5501)
                .with_pass_sha256(password_hash("dogood"))
                .with_capability(Capability::new("search", "*"))],
            groups: vec![
                Group::new("superheros", 5501),
                Group::new("vpn", 5503).including(5501),
                Group::new("admins", 5504),
            ],
        };
        let layout = DirectoryLayout::new(BASE).with_group_format("cn");
        let audit = Arc::new(MemoryAuditLogger::new());
        let ops = DefaultOps::new(layout.clone(), audit.clone());
        let handler = StoreHandler::new(
            MemoryStore::new(data).unwrap(),
            layout.clone(),
            Arc::new(DefaultOps::new(layout, audit.clone())),
            audit,
        );
        let conn = ConnectionInfo::local();

        let groups = handler.find_posix_groups("ou=other").unwrap();
        assert_eq!(groups[1].dn, "cn=vpn,ou=other,dc=glauth,dc=com");
        assert_eq!(groups[1].values("memberUid"), ["hackers"]);

        let vpn = "cn=hackers,cn=vpn,dc=glauth,dc=com";
        assert_eq!(ops.bind(&handler, vpn, "dogood", &conn), ResultCode::Success);
        assert_eq!(
            ops.bind(&handler, "cn=hackers,cn=admins,dc=glauth,dc=com", "dogood", &conn),
            ResultCode::InvalidCredentials
        );

        let result = ops.search(&handler, vpn, &SearchRequest::new(BASE), &conn);
        assert_eq!(result.result_code, ResultCode::Success);
    }

    #[test]
    fn test_in_scope() {
        let base = "ou=groups,dc=c";
        assert!(in_scope("ou=groups,dc=c", base, SearchScope::BaseObject));
        assert!(!in_scope("cn=a,ou=groups,dc=c", base, SearchScope::BaseObject));
        assert!(in_scope("cn=a,ou=groups,dc=c", base, SearchScope::SingleLevel));
        assert!(!in_scope("cn=x,cn=a,ou=groups,dc=c", base, SearchScope::SingleLevel));
        assert!(in_scope("cn=x,cn=a,ou=groups,dc=c", base, SearchScope::WholeSubtree));
        assert!(in_scope("ou=groups,dc=c", base, SearchScope::WholeSubtree));
    }
}
