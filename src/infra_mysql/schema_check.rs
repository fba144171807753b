//! Keeps the adapter SQL in step with `sql/schema.sql`: every lowercase
//! identifier in a raw SQL block must be a table or a column of the schema.

use std::collections::HashSet;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const ADAPTERS: [(&str, &str); 3] = [
    ("user_repo_mysql.rs", include_str!("user_repo_mysql.rs")),
    ("friendship_repo_mysql.rs", include_str!("friendship_repo_mysql.rs")),
    ("subscription_repo_mysql.rs", include_str!("subscription_repo_mysql.rs")),
];

/// Table and column names declared by `CREATE TABLE` statements.
fn schema_names(schema: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut in_table = false;
    for line in schema.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            if let Some(table) = rest.split_whitespace().next() {
                names.insert(table.to_owned());
            }
            in_table = true;
            continue;
        }
        if line.starts_with(')') {
            in_table = false;
            continue;
        }
        if !in_table {
            continue;
        }
        // column lines start with a lowercase name; keys and constraints are uppercase
        if let Some(first) = line.split_whitespace().next() {
            if first.starts_with(|c: char| c.is_ascii_lowercase()) {
                names.insert(first.to_owned());
            }
        }
    }
    names
}

/// Bodies of the `r#"..."#` literals in a source file.
fn sql_blocks(source: &str) -> Vec<&str> {
    source
        .split("r#\"")
        .skip(1)
        .filter_map(|chunk| chunk.split("\"#").next())
        .collect()
}

/// Lowercase identifiers that are neither schema names nor one-letter table aliases.
fn unknown_identifiers(sql: &str, known: &HashSet<String>) -> Vec<String> {
    // drop `format!` holes such as `{}` and `{predicate}`
    let mut stripped = String::with_capacity(sql.len());
    let mut depth = 0usize;
    for c in sql.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }

    stripped
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .filter(|token| token.starts_with(|c: char| c.is_ascii_lowercase()))
        .map(|token| token.rsplit('.').next().unwrap_or(token))
        .filter(|name| name.len() > 1 && !known.contains(*name))
        .map(str::to_owned)
        .collect()
}

#[test]
fn schema_declares_tables_and_columns() {
    let names = schema_names(SCHEMA);

    for name in [
        "user",
        "friendship",
        "subscription",
        "friendship_id",
        "subscription_id",
        "subscriber_id",
        "pair_lo",
    ] {
        assert!(names.contains(name), "{name} missing from schema");
    }
    assert!(!names.contains("id"));
    assert!(!names.contains("KEY"));
}

#[test]
fn undeclared_column_is_reported() {
    let names = schema_names(SCHEMA);

    let unknown = unknown_identifiers(
        "SELECT u.email FROM subscription s JOIN user u ON u.user_id = s.subscriber_id ORDER BY s.id ASC",
        &names,
    );

    assert_eq!(unknown, vec!["id"]);
}

#[test]
fn adapter_sql_matches_schema() {
    let names = schema_names(SCHEMA);

    for (file, source) in ADAPTERS {
        let blocks = sql_blocks(source);
        assert!(!blocks.is_empty(), "{file} has no SQL");
        for sql in blocks {
            let unknown = unknown_identifiers(sql, &names);
            assert!(unknown.is_empty(), "{file}: unknown {unknown:?} in {sql}");
        }
    }
}
