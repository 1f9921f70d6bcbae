extern crate authorization_lib;
extern crate diesel;
extern crate failure;

use diesel::pg::PgConnection;
use diesel::Connection;

use authorization_lib::models::{AgentId, NewApiKey, TenantId};
use authorization_lib::repos::legacy_acl::SystemACL;
use authorization_lib::repos::{ApiKeysRepo, ApiKeysRepoImpl};

fn with_test_db_conn<F, T>(f: F) -> T
where
    F: FnOnce(&PgConnection) -> T,
{
    let config = authorization_lib::config::Config::new().unwrap();
    let database_url = config.server.database.parse::<String>().unwrap();
    let db_conn = PgConnection::establish(&database_url).unwrap();

    f(&db_conn)
}

#[test]
#[ignore] // needs a live database
fn api_keys_repo_crud_happy() {
    let tenant = TenantId::Agent(AgentId::new());
    let (new_key, raw) = NewApiKey::generate(tenant.clone(), 8).unwrap();
    let key_id = new_key.id().clone();

    let created = {
        let new_key = new_key.clone();
        with_test_db_conn(move |conn| ApiKeysRepoImpl::new(conn, Box::new(SystemACL::default())).create(new_key)).unwrap()
    };
    assert_eq!(&created.id, &key_id);
    assert_eq!(created.key_hash, raw.hash());
    assert!(created.revoked_at.is_none());

    let by_prefix = {
        let prefix = raw.prefix(8);
        with_test_db_conn(move |conn| {
            ApiKeysRepoImpl::new(conn, Box::new(SystemACL::default())).find_active_by_prefix(prefix)
        }).unwrap()
    };
    assert!(by_prefix.iter().any(|key| key.id == key_id));

    let revoked = {
        let key_id = key_id.clone();
        with_test_db_conn(move |conn| ApiKeysRepoImpl::new(conn, Box::new(SystemACL::default())).revoke(key_id)).unwrap()
    };
    assert!(revoked.revoked_at.is_some());

    // idempotent: the second revoke returns the same row unchanged
    let revoked_again = {
        let key_id = key_id.clone();
        with_test_db_conn(move |conn| ApiKeysRepoImpl::new(conn, Box::new(SystemACL::default())).revoke(key_id)).unwrap()
    };
    assert_eq!(revoked.revoked_at, revoked_again.revoked_at);

    let active = with_test_db_conn(move |conn| {
        ApiKeysRepoImpl::new(conn, Box::new(SystemACL::default())).list_active_for_tenant(tenant)
    }).unwrap();
    assert!(active.iter().all(|key| key.id != key_id));
}
