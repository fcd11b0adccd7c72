use super::*;
use crate::meta::{ColumnDef, EntityDescriptor};

const USER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id").auto_increment(),
    ColumnDef::new("name").nullable(),
    ColumnDef::new("age").nullable(),
];

const MEMBER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("tenant_id").key(),
    ColumnDef::new("user_id").key(),
    ColumnDef::new("role"),
    ColumnDef::new("version"),
];

fn users() -> TableMeta {
    TableMeta::build(&EntityDescriptor {
        table: "users",
        columns: USER_COLUMNS,
    })
    .unwrap()
}

fn members() -> TableMeta {
    TableMeta::build(&EntityDescriptor {
        table: "members",
        columns: MEMBER_COLUMNS,
    })
    .unwrap()
}

fn user(id: Option<i64>, name: Option<&'static str>, age: Option<i32>) -> Vec<Param> {
    vec![
        Param::from_option(id),
        Param::from_option(name),
        Param::from_option(age),
    ]
}

fn member(role: &'static str, version: i32) -> Vec<Param> {
    vec![
        Param::new(1_i64),
        Param::new(2_i64),
        Param::new(role),
        Param::new(version),
    ]
}

#[test]
fn test_insert_non_null_omits_nulls_and_returns_key() {
    let plan = insert(&users(), user(None, Some("A"), None), FieldPolicy::NonNullFields).unwrap();
    assert_eq!(
        plan.statement.sql(),
        "INSERT INTO users (name) VALUES ($1) RETURNING id"
    );
    assert_eq!(plan.statement.params().len(), 1);
    assert!(plan.returns_key);
}

#[test]
fn test_insert_with_null_writes_null_columns_but_not_null_auto_key() {
    let plan = insert(&users(), user(None, Some("A"), None), FieldPolicy::AllFields).unwrap();
    assert_eq!(
        plan.statement.sql(),
        "INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id"
    );
    assert!(plan.statement.params()[1].is_null());
}

#[test]
fn test_insert_with_explicit_key_does_not_return_it() {
    let plan = insert(&users(), user(Some(9), Some("A"), Some(3)), FieldPolicy::NonNullFields)
        .unwrap();
    assert_eq!(
        plan.statement.sql(),
        "INSERT INTO users (id, name, age) VALUES ($1, $2, $3)"
    );
    assert!(!plan.returns_key);
}

#[test]
fn test_insert_without_columns_uses_defaults() {
    let plan = insert(&users(), user(None, None, None), FieldPolicy::NonNullFields).unwrap();
    assert_eq!(
        plan.statement.sql(),
        "INSERT INTO users DEFAULT VALUES RETURNING id"
    );
}

#[test]
fn test_insert_where_not_exist() {
    let predicate = Fragment::new("WHERE name = ?").bind("A");
    let plan = insert_where_not_exist(
        &users(),
        user(None, Some("A"), Some(20)),
        FieldPolicy::NonNullFields,
        &predicate,
    )
    .unwrap();
    assert_eq!(
        plan.statement.sql(),
        "INSERT INTO users (name, age) SELECT $1, $2 WHERE NOT EXISTS \
         (SELECT 1 FROM users WHERE name = $3) RETURNING id"
    );
    assert_eq!(plan.statement.params().len(), 3);
}

#[test]
fn test_insert_where_not_exist_accepts_bare_predicate() {
    let predicate = Fragment::new("name = ? AND age > ?").bind("A").bind(1);
    let plan = insert_where_not_exist(
        &members(),
        member("admin", 1),
        FieldPolicy::AllFields,
        &predicate,
    )
    .unwrap();
    assert_eq!(
        plan.statement.sql(),
        "INSERT INTO members (tenant_id, user_id, role, version) SELECT $1, $2, $3, $4 \
         WHERE NOT EXISTS (SELECT 1 FROM members WHERE name = $5 AND age > $6)"
    );
    assert!(!plan.returns_key);
}

#[test]
fn test_insert_where_not_exist_rejects_empty_predicate() {
    for sql in ["", "   ", "WHERE", "where  -- nothing"] {
        let err = insert_where_not_exist(
            &users(),
            user(None, Some("A"), None),
            FieldPolicy::NonNullFields,
            &Fragment::new(sql),
        )
        .unwrap_err();
        assert!(err.is_precondition(), "{sql:?}: {err}");
    }
}

#[test]
fn test_insert_where_not_exist_rejects_argument_mismatch() {
    let err = insert_where_not_exist(
        &users(),
        user(None, Some("A"), None),
        FieldPolicy::NonNullFields,
        &Fragment::new("name = ?"),
    )
    .unwrap_err();
    assert!(err.is_precondition());
}

#[test]
fn test_batch_insert_writes_every_column() {
    let rows = vec![
        user(None, Some("A"), None),
        user(None, None, Some(2)),
        user(None, Some("C"), Some(3)),
    ];
    let stmt = batch_insert(&users(), rows).unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO users (name, age) VALUES ($1, $2), ($3, $4), ($5, $6)"
    );
    assert_eq!(stmt.params().len(), 6);
    assert!(stmt.params()[1].is_null());
    assert!(stmt.params()[2].is_null());
}

#[test]
fn test_batch_insert_keeps_explicit_keys() {
    let rows = vec![user(Some(1), Some("A"), None), user(Some(2), None, None)];
    let stmt = batch_insert(&users(), rows).unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO users (id, name, age) VALUES ($1, $2, $3), ($4, $5, $6)"
    );
}

#[test]
fn test_batch_insert_preconditions() {
    assert!(batch_insert(&users(), vec![]).unwrap_err().is_precondition());

    let mixed = vec![user(Some(1), Some("A"), None), user(None, Some("B"), None)];
    assert!(batch_insert(&users(), mixed).unwrap_err().is_precondition());

    let ragged = vec![user(None, Some("A"), None), vec![Param::null()]];
    assert!(batch_insert(&users(), ragged).unwrap_err().is_precondition());
}

#[test]
fn test_batch_insert_rejects_too_many_parameters() {
    let rows: Vec<Vec<Param>> = (0..(MAX_BIND_PARAMS / 4 + 1))
        .map(|_| member("r", 1))
        .collect();
    let err = batch_insert(&members(), rows).unwrap_err();
    assert!(err.is_precondition());
}

#[test]
fn test_update_non_null_sets_only_present_fields() {
    let stmt = update(&users(), user(Some(1), None, Some(30)), FieldPolicy::NonNullFields, None)
        .unwrap();
    assert_eq!(stmt.sql(), "UPDATE users SET age = $1 WHERE id = $2");
}

#[test]
fn test_update_with_null_sets_every_non_key_field() {
    let stmt =
        update(&users(), user(Some(1), None, Some(30)), FieldPolicy::AllFields, None).unwrap();
    assert_eq!(stmt.sql(), "UPDATE users SET name = $1, age = $2 WHERE id = $3");
    assert!(stmt.params()[0].is_null());
}

#[test]
fn test_update_with_cas_suffix() {
    let suffix = Fragment::new("WHERE version = ?").bind(3);
    let stmt = update(
        &members(),
        member("owner", 4),
        FieldPolicy::NonNullFields,
        Some(&suffix),
    )
    .unwrap();
    assert_eq!(
        stmt.sql(),
        "UPDATE members SET role = $1, version = $2 WHERE tenant_id = $3 AND user_id = $4 \
         AND (version = $5)"
    );
    assert_eq!(stmt.params().len(), 5);

    let and_suffix = Fragment::new("AND role = ? OR role = ?").bind("a").bind("b");
    let stmt = update(
        &members(),
        member("owner", 4),
        FieldPolicy::NonNullFields,
        Some(&and_suffix),
    )
    .unwrap();
    assert!(stmt.sql().ends_with("AND (role = $5 OR role = $6)"));
}

#[test]
fn test_update_rejects_empty_condition() {
    for sql in ["", "  ", "WHERE", "AND", "where /* none */"] {
        let err = update(
            &members(),
            member("owner", 4),
            FieldPolicy::NonNullFields,
            Some(&Fragment::new(sql)),
        )
        .unwrap_err();
        assert!(err.is_precondition(), "{sql:?}: {err}");
    }
}

#[test]
fn test_update_requires_key_and_set_columns() {
    let err = update(&users(), user(None, Some("A"), None), FieldPolicy::NonNullFields, None)
        .unwrap_err();
    assert!(err.is_null_key_value());

    let err = update(&users(), user(Some(1), None, None), FieldPolicy::NonNullFields, None)
        .unwrap_err();
    assert!(err.is_precondition());
}

#[test]
fn test_delete_by_key_composite() {
    let key = binder::key_from_params(&members(), member("r", 1)).unwrap();
    let stmt = delete_by_key(&members(), &key);
    assert_eq!(
        stmt.sql(),
        "DELETE FROM members WHERE tenant_id = $1 AND user_id = $2"
    );
}

#[test]
fn test_delete_where_requires_where_clause() {
    let stmt = delete_where(&users(), &Fragment::new("WHERE age < ?").bind(18)).unwrap();
    assert_eq!(stmt.sql(), "DELETE FROM users WHERE age < $1");

    for sql in ["", "age < 18", "WHERE", "WHERE   /* */"] {
        let err = delete_where(&users(), &Fragment::new(sql)).unwrap_err();
        assert!(err.is_precondition(), "{sql:?}");
    }
}

#[test]
fn test_select_with_suffix() {
    let stmt = select(
        &users(),
        Some(&Fragment::new("WHERE age > ? ORDER BY id").bind(18)),
    )
    .unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT id, name, age FROM users WHERE age > $1 ORDER BY id"
    );

    let plain = select(&users(), None).unwrap();
    assert_eq!(plain.sql(), "SELECT id, name, age FROM users");
}

#[test]
fn test_select_one_limits_to_first_row() {
    let stmt = select_one(&users(), Some(&Fragment::new("ORDER BY id DESC"))).unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT id, name, age FROM users ORDER BY id DESC LIMIT 1"
    );
}

#[test]
fn test_select_by_key_and_key_list() {
    let key = binder::scalar_key(&users(), Param::new(5_i64)).unwrap();
    assert_eq!(
        select_by_key(&users(), &key).sql(),
        "SELECT id, name, age FROM users WHERE id = $1"
    );

    let keys = [Param::new(1_i64), Param::new(2_i64), Param::new(3_i64)];
    let stmt = select_by_key_list(&users(), &keys).unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT id, name, age FROM users WHERE id IN ($1, $2, $3)"
    );

    assert!(select_by_key_list(&members(), &keys)
        .unwrap_err()
        .is_null_key_value());
}

#[test]
fn test_count_shares_suffix() {
    assert_eq!(
        count(&users(), None).unwrap().sql(),
        "SELECT COUNT(*) FROM users"
    );

    let suffix = Fragment::new("WHERE age > ? ORDER BY id").bind(18);
    let stmt = count(&users(), Some(&suffix)).unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT COUNT(*) FROM (SELECT 1 FROM users WHERE age > $1 ORDER BY id) AS pgdao_count"
    );
    assert_eq!(stmt.params().len(), 1);
}

#[test]
fn test_page_binds_limit_after_suffix_args() {
    let suffix = Fragment::new("WHERE age > ? ORDER BY id").bind(18);
    let stmt = page(&users(), Some(&suffix), 3, 10).unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT id, name, age FROM users WHERE age > $1 ORDER BY id LIMIT $2 OFFSET $3"
    );
    assert_eq!(stmt.params().len(), 3);
}

#[test]
fn test_page_rejects_zero_page_or_size() {
    assert!(page(&users(), None, 0, 10).unwrap_err().is_precondition());
    assert!(page(&users(), None, 1, 0).unwrap_err().is_precondition());
}
