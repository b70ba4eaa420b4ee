use sql_bridge::scanner::{
    PREFIX_TOKEN, Segment, find_unquoted, map_placeholders, number_positional_markers,
    rewrite_prefix, segments,
};

#[test]
fn prefix_and_placeholders_skip_literals() {
    let sql = "SELECT * FROM #__users WHERE name = :name AND note = 'uses :name literally'";
    let rewritten = rewrite_prefix(sql, "app_");
    assert_eq!(
        rewritten,
        "SELECT * FROM app_users WHERE name = :name AND note = 'uses :name literally'"
    );

    let map = map_placeholders(&rewritten);
    assert_eq!(
        map.sql(),
        "SELECT * FROM app_users WHERE name = ? AND note = 'uses :name literally'"
    );
    assert_eq!(map.len(), 1);
    assert_eq!(map.positions_of("name").collect::<Vec<_>>(), vec![0]);
}

#[test]
fn prefix_rewrite_is_idempotent() {
    let sql = "SELECT a.id FROM #__a a JOIN \"#__b\" b ON b.id = a.id WHERE a.x = '#__'";
    let once = rewrite_prefix(sql, "p_").into_owned();
    let twice = rewrite_prefix(&once, "p_").into_owned();
    assert_eq!(once, twice);
    assert_eq!(
        once,
        "SELECT a.id FROM p_a a JOIN \"#__b\" b ON b.id = a.id WHERE a.x = '#__'"
    );
}

#[test]
fn token_only_inside_literals_leaves_sql_untouched() {
    let sql = "INSERT INTO t (v) VALUES ('#__not_a_table')";
    assert_eq!(rewrite_prefix(sql, "zz_"), sql);
    assert_eq!(find_unquoted(sql, PREFIX_TOKEN), None);
}

#[test]
fn escaped_quotes_stay_inside_the_literal() {
    let sql = r"SELECT 'it\'s :fake' , :real";
    let map = map_placeholders(sql);
    assert_eq!(map.sql(), r"SELECT 'it\'s :fake' , ?");
    assert_eq!(map.names(), vec!["real"]);
}

#[test]
fn unterminated_literal_runs_to_the_end() {
    let sql = "SELECT #__t WHERE a = ':open #__x";
    assert_eq!(rewrite_prefix(sql, "p_"), "SELECT p_t WHERE a = ':open #__x");
    assert!(map_placeholders(sql).is_empty());

    let kinds: Vec<bool> = segments(sql)
        .map(|seg| matches!(seg, Segment::Quoted(_)))
        .collect();
    assert_eq!(kinds, vec![false, true]);
}

#[test]
fn each_distinct_placeholder_becomes_one_marker() {
    let names = ["a", "b", "c", "d", "e"];
    let sql = format!(
        "INSERT INTO t VALUES ({})",
        names.iter().map(|n| format!(":{n}")).collect::<Vec<_>>().join(", ")
    );
    let map = map_placeholders(&sql);
    assert_eq!(map.len(), names.len());
    assert_eq!(map.sql().matches('?').count(), names.len());
    for (position, name) in names.iter().enumerate() {
        assert_eq!(map.positions_of(name).collect::<Vec<_>>(), vec![position]);
    }
}

#[test]
fn positional_numbering_follows_the_mapping() {
    let map = map_placeholders("UPDATE t SET a = :a, note = '?' WHERE id = :id OR parent = :id");
    assert_eq!(
        number_positional_markers(map.sql()),
        "UPDATE t SET a = $1, note = '?' WHERE id = $2 OR parent = $3"
    );
}
