use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    domain::hierarchy::creates_cycle,
    error::{AppError, db_error},
    model::{department::Department, role::Capability},
    utils::validation::{ValidationRule, validate},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepartmentInput {
    #[schema(example = "開発部")]
    pub name: String,
    #[schema(nullable = true)]
    pub parent_id: Option<u64>,
}

fn checked_name(input: &DepartmentInput) -> Result<String, AppError> {
    let name = input.name.trim();
    validate(name, ValidationRule::DepartmentName)?;
    Ok(name.to_string())
}

async fn fetch_department<'c, E>(executor: E, id: u64) -> Result<Department, AppError>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    sqlx::query_as::<_, Department>(
        "SELECT id, name, parent_id, created_at, updated_at FROM departments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(db_error("fetch department"))?
    .ok_or_else(|| AppError::not_found("部門が見つかりません"))
}

async fn check_parent(
    tx: &mut Transaction<'_, MySql>,
    department_id: Option<u64>,
    parent_id: u64,
) -> Result<(), AppError> {
    let parents: HashMap<u64, Option<u64>> =
        sqlx::query_as::<_, (u64, Option<u64>)>("SELECT id, parent_id FROM departments")
            .fetch_all(&mut **tx)
            .await
            .map_err(db_error("load department tree"))?
            .into_iter()
            .collect();

    if !parents.contains_key(&parent_id) {
        return Err(AppError::validation("親部門が存在しません"));
    }
    if let Some(id) = department_id {
        if creates_cycle(&parents, id, parent_id) {
            return Err(AppError::validation("部門の親子関係が循環しています"));
        }
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/admin/departments",
    responses((status = 200, description = "Departments ordered by name", body = [Department])),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn list_departments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageDepartments)?;

    let departments = sqlx::query_as::<_, Department>(
        "SELECT id, name, parent_id, created_at, updated_at FROM departments ORDER BY name ASC",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("list departments"))?;

    Ok(HttpResponse::Ok().json(departments))
}

#[utoipa::path(
    post,
    path = "/api/admin/departments",
    request_body = DepartmentInput,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Invalid name or parent", body = AppError)
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DepartmentInput>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageDepartments)?;
    let name = checked_name(&payload)?;

    let mut tx = pool.begin().await.map_err(db_error("begin create department"))?;
    if let Some(parent_id) = payload.parent_id {
        check_parent(&mut tx, None, parent_id).await?;
    }

    let inserted = sqlx::query("INSERT INTO departments (name, parent_id) VALUES (?, ?)")
        .bind(&name)
        .bind(payload.parent_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert department"))?;
    let department = fetch_department(&mut *tx, inserted.last_insert_id()).await?;
    tx.commit().await.map_err(db_error("commit create department"))?;

    info!(actor_id = auth.employee_id, department_id = department.id, "Department created");
    Ok(HttpResponse::Created().json(department))
}

#[utoipa::path(
    put,
    path = "/api/admin/departments/{id}",
    params(("id", Path, description = "Department ID")),
    request_body = DepartmentInput,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Invalid name or parent", body = AppError),
        (status = 404, description = "Department not found", body = AppError)
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DepartmentInput>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageDepartments)?;
    let department_id = path.into_inner();
    let name = checked_name(&payload)?;

    let mut tx = pool.begin().await.map_err(db_error("begin update department"))?;
    sqlx::query("SELECT id FROM departments WHERE id = ? FOR UPDATE")
        .bind(department_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("lock department"))?
        .ok_or_else(|| AppError::not_found("部門が見つかりません"))?;

    if let Some(parent_id) = payload.parent_id {
        check_parent(&mut tx, Some(department_id), parent_id).await?;
    }

    sqlx::query("UPDATE departments SET name = ?, parent_id = ?, updated_at = NOW() WHERE id = ?")
        .bind(&name)
        .bind(payload.parent_id)
        .bind(department_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("update department"))?;
    let department = fetch_department(&mut *tx, department_id).await?;
    tx.commit().await.map_err(db_error("commit update department"))?;

    info!(actor_id = auth.employee_id, department_id, "Department updated");
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    delete,
    path = "/api/admin/departments/{id}",
    params(("id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted", body = Object, example = json!({
            "message": "部門を削除しました"
        })),
        (status = 404, description = "Department not found", body = AppError),
        (status = 409, description = "Employees or child departments still reference it", body = AppError)
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageDepartments)?;
    let department_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(db_error("begin delete department"))?;
    sqlx::query("SELECT id FROM departments WHERE id = ? FOR UPDATE")
        .bind(department_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("lock department"))?
        .ok_or_else(|| AppError::not_found("部門が見つかりません"))?;

    let (employees, children) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM employees WHERE department_id = ?),
            (SELECT COUNT(*) FROM departments WHERE parent_id = ?)
        "#,
    )
    .bind(department_id)
    .bind(department_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error("count department references"))?;

    if employees > 0 || children > 0 {
        return Err(AppError::conflict(
            "所属する社員または下位部門があるため削除できません",
        ));
    }

    sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("delete department"))?;
    tx.commit().await.map_err(db_error("commit delete department"))?;

    info!(actor_id = auth.employee_id, department_id, "Department deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "部門を削除しました" })))
}
