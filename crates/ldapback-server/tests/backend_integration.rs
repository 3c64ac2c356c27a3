//! Integration tests for handlers driven through the reference coordinator.

use std::sync::Arc;

use ldapback_core::security::{AuditEventType, MemoryAuditLogger, SharedAuditLogger};
use ldapback_core::{
    Backend, Capability, DirectoryData, DirectoryLayout, DirectoryStore, Group, Identity,
    MemoryStore, SledStore,
};
use ldapback_proto::{
    AddRequest, EntryAttribute, ModifyRequest, ResultCode, SearchRequest, SearchScope,
};
use ldapback_server::{
    open_handler, password_hash, BackendConfig, ConnectionInfo, Datastore, DefaultOps, Handler,
    StoreHandler, StubHandler,
};

const BASE: &str = "dc=example,dc=com";

struct TestContext {
    handler: StoreHandler<SledStore>,
    audit: Arc<MemoryAuditLogger>,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let (store, db) = SledStore::open_path(dir.path().join("db")).unwrap();
        store.import(&directory()).unwrap();

        let layout = layout();
        let audit = Arc::new(MemoryAuditLogger::new());
        let ops = Arc::new(DefaultOps::new(layout.clone(), audit.clone()));
        let handler = StoreHandler::new(store, layout, ops, audit.clone()).with_database(db);

        Self {
            handler,
            audit,
            _dir: dir,
        }
    }
}

fn layout() -> DirectoryLayout {
    DirectoryLayout::new(BASE).with_group_format("cn")
}

fn directory() -> DirectoryData {
    DirectoryData {
        users: vec![
            Identity::new("hackers", 5001, 5501)
                .with_mail("hackers@example.com")
                .with_pass_sha256(password_hash("dogood")),
            Identity::new("johndoe", 5002, 5501)
                .with_other_group(5503)
                .with_pass_sha256(password_hash("dogood")),
            Identity::new("serviceuser", 5003, 5502)
                .with_mail("serviceuser@example.com")
                .with_pass_sha256(password_hash("mysecret"))
                .with_capability(Capability::new("search", "*")),
        ],
        groups: vec![
            Group::new("superheros", 5501),
            Group::new("svcaccts", 5502),
            Group::new("vpn", 5503).including(5501),
        ],
    }
}

fn stub() -> (StubHandler, Arc<MemoryAuditLogger>) {
    let layout = layout();
    let audit = Arc::new(MemoryAuditLogger::new());
    let ops = Arc::new(DefaultOps::new(layout.clone(), audit.clone()));
    (StubHandler::new(layout, ops, audit.clone()), audit)
}

fn has_both_modes(attributes: &[EntryAttribute]) -> bool {
    let names: Vec<_> = attributes.iter().map(|a| a.name.as_str()).collect();
    names.contains(&"uniqueMember") && names.contains(&"memberUid")
}

#[test]
fn test_reference_find_group() {
    let (handler, _) = stub();
    let group = handler.find_group("svcaccts").unwrap().unwrap();
    assert_eq!(group.name, "svcaccts");
    assert_eq!(group.gid_number, 5502);
    assert!(group.include_groups.is_empty());
}

#[test]
fn test_reference_groups_hierarchy() {
    let (handler, _) = stub();
    let entries = handler.find_posix_groups("ou=groups").unwrap();

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.dn, "cn=superheros,ou=groups,dc=example,dc=com");
    assert_eq!(entry.values("cn"), ["superheros"]);
    assert_eq!(entry.values("uid"), ["superheros"]);
    assert_eq!(entry.values("description"), ["superheros"]);
    assert_eq!(entry.values("gidNumber"), ["5501"]);
    assert_eq!(entry.values("objectClass"), ["groupOfUniqueNames", "top"]);
    assert!(entry.has("uniqueMember"));
    assert!(!entry.has("memberUid"));
}

#[test]
fn test_reference_other_hierarchy() {
    let (handler, _) = stub();
    let entries = handler.find_posix_groups("ou=other").unwrap();

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.dn, "cn=superheros,ou=other,dc=example,dc=com");
    assert_eq!(entry.values("objectClass"), ["posixGroup", "top"]);
    assert!(entry.has("memberUid"));
    assert!(!entry.has("uniqueMember"));
}

#[test]
fn test_absent_names() {
    let ctx = TestContext::new();
    let (stub, _) = stub();
    let backends: [&dyn Backend; 2] = [&ctx.handler, &stub];

    for backend in backends {
        assert!(backend.find_user("nonexistent", false).unwrap().is_none());
        assert!(backend.find_user("nonexistent@example.com", true).unwrap().is_none());
        assert!(backend.find_group("nonexistent").unwrap().is_none());
    }
}

#[test]
fn test_present_names() {
    let ctx = TestContext::new();

    let user = ctx.handler.find_user("hackers", false).unwrap().unwrap();
    assert_eq!(user.name, "hackers");
    let user = ctx.handler.find_user("serviceuser@example.com", true).unwrap().unwrap();
    assert_eq!(user.mail, "serviceuser@example.com");
    assert_eq!(user.capabilities, vec![Capability::new("search", "*")]);
}

#[test]
fn test_mode_exclusivity() {
    let ctx = TestContext::new();

    for hierarchy in ["ou=groups", "ou=other", "OU=groups", "ou=sub,ou=groups", ""] {
        for entry in ctx.handler.find_posix_groups(hierarchy).unwrap() {
            assert!(!has_both_modes(&entry.attributes), "{}", entry.dn);
            let classes = entry.values("objectClass");
            assert_eq!(classes.len(), 2);
            assert!(
                classes.contains(&"groupOfUniqueNames".to_string())
                    != classes.contains(&"posixGroup".to_string())
            );
        }
    }
}

#[test]
fn test_synthesis_is_deterministic() {
    let ctx = TestContext::new();
    for hierarchy in ["ou=groups", "ou=other"] {
        assert_eq!(
            ctx.handler.find_posix_groups(hierarchy).unwrap(),
            ctx.handler.find_posix_groups(hierarchy).unwrap()
        );
    }
    assert_eq!(
        ctx.handler.find_posix_accounts("ou=users").unwrap(),
        ctx.handler.find_posix_accounts("ou=users").unwrap()
    );
}

#[test]
fn test_declined_mutations_leave_store_unchanged() {
    let ctx = TestContext::new();
    let conn = ConnectionInfo::new(1, "127.0.0.1:40000");
    let bound = "cn=serviceuser,cn=svcaccts,dc=example,dc=com";
    let users_before = ctx.handler.store().users().unwrap();
    let groups_before = ctx.handler.store().groups().unwrap();

    let add = AddRequest {
        dn: "cn=mallory,ou=users,dc=example,dc=com".to_string(),
        attributes: vec![EntryAttribute::single("uidNumber", "6666")],
    };
    let modify = ModifyRequest {
        dn: "cn=hackers,cn=superheros,ou=users,dc=example,dc=com".to_string(),
        changes: Vec::new(),
    };

    assert_eq!(
        ctx.handler.add(bound, &add, &conn).unwrap(),
        ResultCode::InsufficientAccessRights
    );
    assert_eq!(
        ctx.handler.modify(bound, &modify, &conn).unwrap(),
        ResultCode::InsufficientAccessRights
    );
    assert_eq!(
        ctx.handler
            .delete(bound, "cn=hackers,cn=superheros,ou=users,dc=example,dc=com", &conn)
            .unwrap(),
        ResultCode::InsufficientAccessRights
    );

    assert_eq!(ctx.handler.store().users().unwrap(), users_before);
    assert_eq!(ctx.handler.store().groups().unwrap(), groups_before);
    assert_eq!(ctx.audit.len(), 3);
    assert!(ctx.audit.events().iter().all(|e| e.is_error()));
}

#[test]
fn test_bind_search_close_session() {
    let ctx = TestContext::new();
    let conn = ConnectionInfo::new(2, "127.0.0.1:40001");
    let bound = "cn=serviceuser,cn=svcaccts,dc=example,dc=com";

    assert_eq!(ctx.handler.bind(bound, "mysecret", &conn), ResultCode::Success);

    let request = SearchRequest::new("ou=groups,dc=example,dc=com")
        .with_scope(SearchScope::SingleLevel)
        .with_filter("(cn=vpn)");
    let result = ctx.handler.search(bound, &request, &conn);
    assert_eq!(result.result_code, ResultCode::Success);
    assert_eq!(result.entries.len(), 1);
    assert_eq!(
        result.entries[0].values("uniqueMember"),
        [
            "cn=johndoe,cn=superheros,ou=users,dc=example,dc=com",
            "cn=hackers,cn=superheros,ou=users,dc=example,dc=com"
        ]
    );

    let request = SearchRequest::new(BASE)
        .with_filter("(&(objectClass=posixAccount)(memberOf=cn=vpn,ou=groups,dc=example,dc=com))")
        .with_attributes(vec!["uid".to_string()]);
    let result = ctx.handler.search(bound, &request, &conn);
    let uids: Vec<_> = result
        .entries
        .iter()
        .map(|e| e.values("uid")[0].as_str())
        .collect();
    assert_eq!(uids, vec!["hackers", "johndoe"]);

    ctx.handler.close(bound, &conn).unwrap();
    let events = ctx.audit.events();
    assert!(matches!(
        events.first().map(|e| &e.event_type),
        Some(AuditEventType::Bind { result: ResultCode::Success, .. })
    ));
    assert_eq!(
        events.last().map(|e| &e.event_type),
        Some(&AuditEventType::SessionClosed)
    );
}

#[test]
fn test_unprivileged_search_denied() {
    let ctx = TestContext::new();
    let conn = ConnectionInfo::local();
    let bound = "cn=hackers,cn=superheros,dc=example,dc=com";

    assert_eq!(ctx.handler.bind(bound, "dogood", &conn), ResultCode::Success);
    let result = ctx.handler.search(bound, &SearchRequest::new(BASE), &conn);
    assert_eq!(result.result_code, ResultCode::InsufficientAccessRights);
    assert!(result.entries.is_empty());
}

#[test]
fn test_file_datastore_through_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("directory.json");
    std::fs::write(&path, serde_json::to_vec(&directory()).unwrap()).unwrap();

    let config = BackendConfig::new(BASE)
        .with_group_format("cn")
        .with_datastore(Datastore::File { path });
    let audit: SharedAuditLogger = Arc::new(MemoryAuditLogger::new());
    let handler = open_handler(&config, audit).unwrap();
    let conn = ConnectionInfo::local();

    assert_eq!(
        handler.bind("hackers@example.com", "dogood", &conn),
        ResultCode::Success
    );
    let entries = handler.find_posix_accounts("ou=users").unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].dn, "cn=serviceuser,cn=svcaccts,ou=users,dc=example,dc=com");
}

#[test]
fn test_store_failure_maps_to_operations_error() {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let store = SledStore::open(&db).unwrap();
    store.import(&directory()).unwrap();
    db.open_tree("directory:users")
        .unwrap()
        .insert("serviceuser", &b"{broken"[..])
        .unwrap();

    let layout = layout();
    let audit = Arc::new(MemoryAuditLogger::new());
    let ops = Arc::new(DefaultOps::new(layout.clone(), audit.clone()));
    let handler = StoreHandler::new(store, layout, ops, audit).with_database(db);

    assert!(handler.find_user("serviceuser", false).is_err());
    assert_eq!(
        handler.bind("cn=serviceuser,dc=example,dc=com", "mysecret", &ConnectionInfo::local()),
        ResultCode::OperationsError
    );
    assert!(handler.find_posix_accounts("ou=users").is_err());
}

#[test]
fn test_memory_store_reload_visible_to_handler() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("directory.json");
    std::fs::write(&path, serde_json::to_vec(&directory()).unwrap()).unwrap();

    let store = MemoryStore::open(&path).unwrap();
    let layout = layout();
    let audit: SharedAuditLogger = Arc::new(MemoryAuditLogger::new());
    let ops = Arc::new(DefaultOps::new(layout.clone(), audit.clone()));
    let handler = StoreHandler::new(store, layout, ops, audit);
    assert!(handler.find_group("admins").unwrap().is_none());

    let mut data = directory();
    data.groups.push(Group::new("admins", 5600));
    std::fs::write(&path, serde_json::to_vec(&data).unwrap()).unwrap();
    handler.store().reload().unwrap();

    assert_eq!(handler.find_group("admins").unwrap().unwrap().gid_number, 5600);
}
