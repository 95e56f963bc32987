//! 뮤테이션 SQL 생성기
//!
//! 분류된 행 뮤테이션을 파라미터화된 INSERT/UPDATE/DELETE 문과
//! 이름 기반 바인드 변수 맵으로 변환합니다. 값은 항상 바인드 변수로
//! 전달되며 리터럴로 삽입되지 않습니다.
//!
//! PK 제약은 항상 단일 행 생성자 등식 `(c1,c2) = (:v1,:v2)` 형태입니다.
//! 컬럼별 등식의 AND 결합은 다중 컬럼 콜레이션 상호작용을 깨뜨릴 수 있습니다.

use crate::error::{CdcError, Result};
use crate::events::{CellValue, Field};
use crate::metadata::{charset_and_collation, ColumnInfoMap};
use crate::mutation::{MutationKind, RowImage, RowMutation};
use std::collections::HashMap;

/// UPDATE의 WHERE 절 바인드명 접두사 (SET 절과의 충돌 방지)
pub const PK_BIND_PREFIX: &str = "pk_";

/// 생성된 파라미터화 구문
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    /// `:name` 플레이스홀더를 포함한 구문 텍스트
    pub sql: String,
    /// 플레이스홀더명 → 값
    pub bind_vars: HashMap<String, CellValue>,
}

/// 뮤테이션 종류에 따라 해당 구문 생성
pub fn generate_sql(
    table_schema: &str,
    table_name: &str,
    mutation: &RowMutation,
    pk_fields: &[Field],
    col_info_map: &ColumnInfoMap,
) -> Result<SqlStatement> {
    match mutation.kind {
        MutationKind::Insert => generate_insert_sql(table_schema, table_name, mutation),
        MutationKind::Delete => {
            generate_delete_sql(table_schema, table_name, mutation, pk_fields, col_info_map)
        }
        MutationKind::Update => {
            generate_update_sql(table_schema, table_name, mutation, pk_fields, col_info_map)
        }
    }
}

/// INSERT 생성: after 이미지의 모든 컬럼을 선언 순서대로 나열
pub fn generate_insert_sql(
    table_schema: &str,
    table_name: &str,
    mutation: &RowMutation,
) -> Result<SqlStatement> {
    let after = mutation
        .after
        .as_ref()
        .ok_or_else(|| CdcError::InvalidEvent("insert mutation has no after image".to_string()))?;

    let column_list = after.columns.join(",");
    let placeholder_list = after
        .columns
        .iter()
        .map(|name| format!(":{}", name))
        .collect::<Vec<_>>()
        .join(",");

    let sql = format!(
        "insert into {}.{} ({}) values ({})",
        table_schema, table_name, column_list, placeholder_list
    );

    let mut bind_vars = HashMap::new();
    for (name, value) in after.columns.iter().zip(after.values.iter()) {
        bind_vars.insert(name.clone(), value.clone());
    }

    Ok(SqlStatement { sql, bind_vars })
}

/// DELETE 생성: PK만으로 제약 (행 생성자 등식)
pub fn generate_delete_sql(
    table_schema: &str,
    table_name: &str,
    mutation: &RowMutation,
    pk_fields: &[Field],
    col_info_map: &ColumnInfoMap,
) -> Result<SqlStatement> {
    let before = mutation
        .before
        .as_ref()
        .ok_or_else(|| CdcError::InvalidEvent("delete mutation has no before image".to_string()))?;

    let sql = format!(
        "delete from {}.{} where {}",
        table_schema,
        table_name,
        pk_constraint(pk_fields, col_info_map, "")
    );

    let bind_vars = pk_bind_vars(before, pk_fields, "")?;

    Ok(SqlStatement { sql, bind_vars })
}

/// UPDATE 생성: after의 모든 컬럼을 SET, before의 PK 값으로 제약
///
/// WHERE 절 바인드명은 `pk_` 접두사로 SET 절과 구분됩니다.
/// PK 컬럼 자체가 변경되는 UPDATE에서 이름이 겹치면 안 되기 때문입니다.
pub fn generate_update_sql(
    table_schema: &str,
    table_name: &str,
    mutation: &RowMutation,
    pk_fields: &[Field],
    col_info_map: &ColumnInfoMap,
) -> Result<SqlStatement> {
    let before = mutation
        .before
        .as_ref()
        .ok_or_else(|| CdcError::InvalidEvent("update mutation has no before image".to_string()))?;
    let after = mutation
        .after
        .as_ref()
        .ok_or_else(|| CdcError::InvalidEvent("update mutation has no after image".to_string()))?;

    let set_list = after
        .columns
        .iter()
        .map(|name| format!("{}=:{}", name, name))
        .collect::<Vec<_>>()
        .join(",");

    let sql = format!(
        "update {}.{} set {} where {}",
        table_schema,
        table_name,
        set_list,
        pk_constraint(pk_fields, col_info_map, PK_BIND_PREFIX)
    );

    let mut bind_vars = HashMap::new();
    for (name, value) in after.columns.iter().zip(after.values.iter()) {
        bind_vars.insert(name.clone(), value.clone());
    }
    bind_vars.extend(pk_bind_vars(before, pk_fields, PK_BIND_PREFIX)?);

    Ok(SqlStatement { sql, bind_vars })
}

/// PK 행 생성자 등식 구성
///
/// 각 컬럼 참조와 바인드 값에 그 컬럼의 charset 도입자(`_charset`)와
/// `COLLATE` 절을 개별적으로 붙입니다 (캐시에 없으면 생략).
fn pk_constraint(pk_fields: &[Field], col_info_map: &ColumnInfoMap, bind_prefix: &str) -> String {
    let mut buf = String::new();

    let mut separator = "(";
    for field in pk_fields {
        let (charset, collation) = charset_and_collation(&field.name, col_info_map);
        buf.push_str(separator);
        push_annotated(&mut buf, &field.name, &charset, &collation);
        separator = ",";
    }

    separator = ") = (";
    for field in pk_fields {
        let (charset, collation) = charset_and_collation(&field.name, col_info_map);
        buf.push_str(separator);
        let placeholder = format!(":{}{}", bind_prefix, field.name);
        push_annotated(&mut buf, &placeholder, &charset, &collation);
        separator = ",";
    }
    buf.push(')');

    buf
}

fn push_annotated(buf: &mut String, term: &str, charset: &str, collation: &str) {
    if !charset.is_empty() {
        buf.push('_');
        buf.push_str(charset);
        buf.push(' ');
    }
    buf.push_str(term);
    if !collation.is_empty() {
        buf.push_str(" COLLATE ");
        buf.push_str(collation);
    }
}

/// 행 이미지에서 PK 컬럼 값들을 바인드 맵으로 추출
///
/// 참조된 컬럼이 이미지에 없으면 스키마 드리프트로 보고 BindError를 반환합니다.
fn pk_bind_vars(
    image: &RowImage,
    pk_fields: &[Field],
    bind_prefix: &str,
) -> Result<HashMap<String, CellValue>> {
    let mut bind_vars = HashMap::new();
    for field in pk_fields {
        let value = image.get(&field.name).ok_or_else(|| {
            CdcError::BindError(format!("column {} missing from row image", field.name))
        })?;
        bind_vars.insert(format!("{}{}", bind_prefix, field.name), value.clone());
    }
    Ok(bind_vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnInfo;

    fn image(pairs: &[(&str, CellValue)]) -> RowImage {
        RowImage {
            columns: pairs.iter().map(|(name, _)| name.to_string()).collect(),
            values: pairs.iter().map(|(_, value)| value.clone()).collect(),
        }
    }

    fn col_info(name: &str, charset: &str, collation: &str, is_pk: bool) -> (String, ColumnInfo) {
        (
            name.to_string(),
            ColumnInfo {
                name: name.to_string(),
                charset: charset.to_string(),
                collation: collation.to_string(),
                is_primary_key: is_pk,
            },
        )
    }

    #[test]
    fn test_insert_all_columns_bound() {
        let mutation = RowMutation {
            kind: MutationKind::Insert,
            before: None,
            after: Some(image(&[
                ("id", CellValue::Int64(1)),
                ("name", CellValue::String("a".to_string())),
                ("age", CellValue::Int32(30)),
            ])),
        };

        let stmt = generate_insert_sql("commerce", "users", &mutation).unwrap();
        assert_eq!(
            stmt.sql,
            "insert into commerce.users (id,name,age) values (:id,:name,:age)"
        );
        assert_eq!(stmt.bind_vars.len(), 3);
        assert_eq!(stmt.bind_vars["id"], CellValue::Int64(1));
        assert_eq!(stmt.bind_vars["name"], CellValue::String("a".to_string()));
        assert_eq!(stmt.bind_vars["age"], CellValue::Int32(30));
    }

    #[test]
    fn test_delete_composite_pk_row_constructor() {
        let col_info_map: ColumnInfoMap = [
            col_info("id", "utf8mb4", "utf8mb4_bin", true),
            col_info("tenant", "utf8mb4", "utf8mb4_bin", true),
        ]
        .into_iter()
        .collect();
        let pk_fields = vec![Field::new("id", "VARCHAR"), Field::new("tenant", "VARCHAR")];

        let mutation = RowMutation {
            kind: MutationKind::Delete,
            before: Some(image(&[
                ("id", CellValue::String("r1".to_string())),
                ("tenant", CellValue::String("t1".to_string())),
            ])),
            after: None,
        };

        let stmt =
            generate_delete_sql("commerce", "users", &mutation, &pk_fields, &col_info_map).unwrap();

        // 단일 행 생성자 등식이어야 하며, 컬럼별 등식의 AND 결합이 아님
        assert_eq!(
            stmt.sql,
            "delete from commerce.users where \
             (_utf8mb4 id COLLATE utf8mb4_bin,_utf8mb4 tenant COLLATE utf8mb4_bin) \
             = (_utf8mb4 :id COLLATE utf8mb4_bin,_utf8mb4 :tenant COLLATE utf8mb4_bin)"
        );
        assert!(!stmt.sql.contains(" and "));
        assert_eq!(stmt.bind_vars["id"], CellValue::String("r1".to_string()));
        assert_eq!(stmt.bind_vars["tenant"], CellValue::String("t1".to_string()));
    }

    #[test]
    fn test_delete_without_charset_annotation() {
        let col_info_map: ColumnInfoMap =
            [col_info("id", "", "", true)].into_iter().collect();
        let pk_fields = vec![Field::new("id", "INT64")];

        let mutation = RowMutation {
            kind: MutationKind::Delete,
            before: Some(image(&[("id", CellValue::Int64(7))])),
            after: None,
        };

        let stmt =
            generate_delete_sql("commerce", "users", &mutation, &pk_fields, &col_info_map).unwrap();
        assert_eq!(stmt.sql, "delete from commerce.users where (id) = (:id)");
    }

    #[test]
    fn test_update_pk_bind_names_disambiguated() {
        let col_info_map: ColumnInfoMap =
            [col_info("id", "", "", true), col_info("name", "", "", false)]
                .into_iter()
                .collect();
        let pk_fields = vec![Field::new("id", "INT64")];

        let mutation = RowMutation {
            kind: MutationKind::Update,
            before: Some(image(&[
                ("id", CellValue::Int64(1)),
                ("name", CellValue::String("a".to_string())),
            ])),
            after: Some(image(&[
                ("id", CellValue::Int64(2)),
                ("name", CellValue::String("b".to_string())),
            ])),
        };

        let stmt =
            generate_update_sql("commerce", "users", &mutation, &pk_fields, &col_info_map).unwrap();
        assert_eq!(
            stmt.sql,
            "update commerce.users set id=:id,name=:name where (id) = (:pk_id)"
        );

        // SET 절의 id는 after 값, WHERE 절의 pk_id는 before 값 (덮어쓰기 없음)
        assert_eq!(stmt.bind_vars["id"], CellValue::Int64(2));
        assert_eq!(stmt.bind_vars["pk_id"], CellValue::Int64(1));
        assert_eq!(stmt.bind_vars["name"], CellValue::String("b".to_string()));
    }

    #[test]
    fn test_bind_error_on_missing_pk_column() {
        let col_info_map: ColumnInfoMap =
            [col_info("id", "", "", true)].into_iter().collect();
        let pk_fields = vec![Field::new("id", "INT64")];

        // before 이미지에 PK 컬럼이 없음 (스키마 드리프트)
        let mutation = RowMutation {
            kind: MutationKind::Delete,
            before: Some(image(&[("other", CellValue::Int64(1))])),
            after: None,
        };

        let result =
            generate_delete_sql("commerce", "users", &mutation, &pk_fields, &col_info_map);
        match result {
            Err(CdcError::BindError(message)) => assert!(message.contains("id")),
            other => panic!("expected BindError, got {:?}", other),
        }
    }

    #[test]
    fn test_generation_deterministic() {
        let col_info_map: ColumnInfoMap = [
            col_info("id", "", "", true),
            col_info("name", "utf8mb4", "utf8mb4_bin", false),
        ]
        .into_iter()
        .collect();
        let pk_fields = vec![Field::new("id", "INT64")];

        let mutation = RowMutation {
            kind: MutationKind::Update,
            before: Some(image(&[
                ("id", CellValue::Int64(1)),
                ("name", CellValue::String("a".to_string())),
            ])),
            after: Some(image(&[
                ("id", CellValue::Int64(1)),
                ("name", CellValue::String("b".to_string())),
            ])),
        };

        let first =
            generate_sql("commerce", "users", &mutation, &pk_fields, &col_info_map).unwrap();
        let second =
            generate_sql("commerce", "users", &mutation, &pk_fields, &col_info_map).unwrap();
        assert_eq!(first.sql, second.sql);
        assert_eq!(first.bind_vars, second.bind_vars);
    }
}
