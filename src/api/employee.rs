use std::{collections::HashMap, str::FromStr};

use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{auth::AuthUser, password::hash_password},
    domain::hierarchy::creates_cycle,
    error::{AppError, db_error},
    model::{
        employee::{Employee, EmploymentType},
        role::{Capability, Role},
    },
    utils::{
        db_utils::{Column, ColumnKind, PageWindow, build_update_sql, execute_update},
        email_filter,
        password::{GENERATED_PASSWORD_LENGTH, generate_secure_password},
        validation::{FieldErrors, ValidationRule, validate, validate_fields},
    },
};

const EMPLOYEE_SELECT: &str = r#"
    SELECT e.id, e.user_id, e.employee_number, e.name, u.email, e.department_id,
           d.name AS department_name, e.role, e.employment_type, e.manager_id,
           e.hire_date, e.is_active, e.created_at, e.updated_at
    FROM employees e
    JOIN users u ON u.id = e.user_id
    LEFT JOIN departments d ON d.id = e.department_id
"#;

/// Columns an admin may change through `PUT /admin/employees/{id}`.
const UPDATABLE: &[Column] = &[
    Column { name: "employee_number", kind: ColumnKind::Text, nullable: false },
    Column { name: "name", kind: ColumnKind::Text, nullable: false },
    Column { name: "department_id", kind: ColumnKind::Id, nullable: true },
    Column { name: "role", kind: ColumnKind::Text, nullable: false },
    Column { name: "employment_type", kind: ColumnKind::Text, nullable: false },
    Column { name: "manager_id", kind: ColumnKind::Id, nullable: true },
    Column { name: "hire_date", kind: ColumnKind::Date, nullable: false },
    Column { name: "is_active", kind: ColumnKind::Bool, nullable: false },
];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "E0012")]
    pub employee_number: String,
    #[schema(example = "山田 太郎")]
    pub name: String,
    #[schema(example = "taro.yamada@example.com", format = "email")]
    pub email: String,
    /// Generated and returned once when omitted.
    pub password: Option<String>,
    pub department_id: Option<u64>,
    pub role: Role,
    pub employment_type: EmploymentType,
    pub manager_id: Option<u64>,
    #[schema(example = "2025-04-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedEmployee {
    pub employee: Employee,
    /// Present only when the password was generated.
    pub generated_password: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub is_active: Option<bool>,
    /// Matches name, employee number or email.
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

fn duplicate_to_conflict(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| {
        let duplicate = matches!(
            &err,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23000")
                && db.message().contains("Duplicate")
        );
        if duplicate {
            AppError::conflict("社員番号またはメールアドレスが既に登録されています")
        } else {
            db_error(context)(err)
        }
    }
}

async fn fetch_employee<'c, E>(executor: E, id: u64) -> Result<Employee, AppError>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    sqlx::query_as::<_, Employee>(&format!("{EMPLOYEE_SELECT} WHERE e.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(db_error("fetch employee"))?
        .ok_or_else(|| AppError::not_found("社員が見つかりません"))
}

/// A manager reference must point at another active employee and must not
/// make the reporting line loop back onto `employee_id`.
async fn check_manager(
    tx: &mut Transaction<'_, MySql>,
    manager_id: u64,
    employee_id: Option<u64>,
) -> Result<(), AppError> {
    if Some(manager_id) == employee_id {
        return Err(AppError::validation("自分自身を上長に設定することはできません"));
    }
    let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM employees WHERE id = ?")
        .bind(manager_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("check manager"))?;
    if active != Some(true) {
        return Err(AppError::validation("上長に指定した社員が存在しないか無効です"));
    }

    if let Some(id) = employee_id {
        let managers: HashMap<u64, Option<u64>> =
            sqlx::query_as::<_, (u64, Option<u64>)>("SELECT id, manager_id FROM employees")
                .fetch_all(&mut **tx)
                .await
                .map_err(db_error("load reporting lines"))?
                .into_iter()
                .collect();
        if creates_cycle(&managers, id, manager_id) {
            return Err(AppError::validation("上長の指定が循環しています"));
        }
    }
    Ok(())
}

async fn check_department(
    tx: &mut Transaction<'_, MySql>,
    department_id: u64,
) -> Result<(), AppError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE id = ?")
        .bind(department_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("check department"))?;
    if found > 0 {
        Ok(())
    } else {
        Err(AppError::validation("指定した部門が存在しません"))
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/employees",
    params(EmployeeQuery),
    responses((status = 200, description = "Paginated employee list ordered by employee number", body = EmployeeListResponse)),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageEmployees)?;

    let PageWindow { page, per_page, offset } = PageWindow::new(query.page, query.per_page, 20, 100);

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let mut conditions = Vec::new();
    if query.department_id.is_some() {
        conditions.push("e.department_id = ?");
    }
    if query.is_active.is_some() {
        conditions.push("e.is_active = ?");
    }
    if search.is_some() {
        conditions.push("(e.name LIKE ? OR e.employee_number LIKE ? OR u.email LIKE ?)");
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // Binds in the same order the conditions were pushed.
    macro_rules! bind_filters {
        ($q:expr) => {{
            let mut q = $q;
            if let Some(department_id) = query.department_id {
                q = q.bind(department_id);
            }
            if let Some(is_active) = query.is_active {
                q = q.bind(is_active);
            }
            if let Some(like) = &search {
                q = q.bind(like).bind(like).bind(like);
            }
            q
        }};
    }

    let count_sql = format!(
        "SELECT COUNT(*) FROM employees e JOIN users u ON u.id = e.user_id {where_clause}"
    );
    debug!(sql = %count_sql, "Counting employees");

    let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("count employees"))?;

    let data_sql =
        format!("{EMPLOYEE_SELECT} {where_clause} ORDER BY e.employee_number ASC LIMIT ? OFFSET ?");
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let employees = bind_filters!(sqlx::query_as::<_, Employee>(&data_sql))
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("list employees"))?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = AppError)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageEmployees)?;
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    post,
    path = "/api/admin/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Login account and employee created", body = CreatedEmployee),
        (status = 400, description = "Invalid fields", body = AppError),
        (status = 409, description = "Email or employee number already registered", body = AppError)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageEmployees)?;

    let payload = payload.into_inner();
    let email = payload.email.trim().to_lowercase();
    let employee_number = payload.employee_number.trim().to_string();
    let name = payload.name.trim().to_string();

    let mut fields = vec![
        ("employee_number", employee_number.as_str(), ValidationRule::EmployeeNumber),
        ("name", name.as_str(), ValidationRule::Name),
        ("email", email.as_str(), ValidationRule::Email),
    ];
    if let Some(password) = payload.password.as_deref() {
        fields.push(("password", password, ValidationRule::Password));
    }
    validate_fields(&fields).map_err(AppError::invalid_fields)?;

    if email_filter::is_email_taken(pool.get_ref(), &email)
        .await
        .map_err(db_error("check email"))?
    {
        return Err(AppError::conflict("このメールアドレスは既に登録されています"));
    }

    let generated_password = payload
        .password
        .is_none()
        .then(|| generate_secure_password(GENERATED_PASSWORD_LENGTH));
    let password = payload
        .password
        .as_deref()
        .or(generated_password.as_deref())
        .unwrap_or_default();
    let hashed = hash_password(password).map_err(|e| {
        warn!(error = %e, "Password hashing failed");
        AppError::internal()
    })?;

    let mut tx = pool.begin().await.map_err(db_error("begin create employee"))?;

    if let Some(manager_id) = payload.manager_id {
        check_manager(&mut tx, manager_id, None).await?;
    }
    if let Some(department_id) = payload.department_id {
        check_department(&mut tx, department_id).await?;
    }

    let user = sqlx::query("INSERT INTO users (email, password) VALUES (?, ?)")
        .bind(&email)
        .bind(&hashed)
        .execute(&mut *tx)
        .await
        .map_err(duplicate_to_conflict("insert user"))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO employees
            (user_id, employee_number, name, department_id, role, employment_type,
             manager_id, hire_date, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(user.last_insert_id())
    .bind(&employee_number)
    .bind(&name)
    .bind(payload.department_id)
    .bind(payload.role)
    .bind(payload.employment_type)
    .bind(payload.manager_id)
    .bind(payload.hire_date)
    .execute(&mut *tx)
    .await
    .map_err(duplicate_to_conflict("insert employee"))?;

    let employee = fetch_employee(&mut *tx, inserted.last_insert_id()).await?;
    tx.commit().await.map_err(db_error("commit create employee"))?;

    email_filter::insert(&email);
    info!(
        actor_id = auth.employee_id,
        employee_id = employee.id,
        role = %employee.role,
        "Employee created"
    );

    Ok(HttpResponse::Created().json(CreatedEmployee {
        employee,
        generated_password,
    }))
}

/// Field-level checks for a partial update; the type checks live in the update builder.
///
/// `own_role` is the caller's role when the caller is editing their own record:
/// they may neither deactivate themselves nor change their role.
fn validate_update(payload: &Map<String, Value>, own_role: Option<Role>) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    let text = |key: &str| payload.get(key).and_then(Value::as_str);

    for (key, rule) in [
        ("employee_number", ValidationRule::EmployeeNumber),
        ("name", ValidationRule::Name),
    ] {
        if let Some(Err(e)) = text(key).map(|v| validate(v.trim(), rule)) {
            errors.insert(key.to_string(), e.message.to_string());
        }
    }
    if text("role").is_some_and(|v| Role::from_str(v).is_err()) {
        errors.insert("role".to_string(), "役割が不正です".to_string());
    }
    if text("employment_type").is_some_and(|v| EmploymentType::from_str(v).is_err()) {
        errors.insert("employment_type".to_string(), "雇用区分が不正です".to_string());
    }
    if let Some(own_role) = own_role {
        if payload.get("is_active") == Some(&Value::Bool(false)) {
            errors.insert(
                "is_active".to_string(),
                "自分自身を無効化することはできません".to_string(),
            );
        }
        if text("role").and_then(|v| Role::from_str(v).ok()).is_some_and(|r| r != own_role) {
            errors.insert("role".to_string(), "自分自身の役割は変更できません".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::invalid_fields(errors))
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    request_body(content = Object, description = "Any subset of employee_number, name, department_id, role, employment_type, manager_id, hire_date, is_active"),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Unknown field or invalid value", body = AppError),
        (status = 404, description = "Employee not found", body = AppError)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageEmployees)?;
    let employee_id = path.into_inner();

    let payload = body
        .as_object()
        .ok_or_else(|| AppError::validation("JSON オブジェクトを送信してください"))?;
    let own_role = (employee_id == auth.employee_id).then_some(auth.role);
    validate_update(payload, own_role)?;
    let update = build_update_sql("employees", payload, UPDATABLE, "id", employee_id)?;

    let mut tx = pool.begin().await.map_err(db_error("begin update employee"))?;

    sqlx::query("SELECT id FROM employees WHERE id = ? FOR UPDATE")
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("lock employee"))?
        .ok_or_else(|| AppError::not_found("社員が見つかりません"))?;

    if let Some(manager_id) = payload.get("manager_id").and_then(Value::as_u64) {
        check_manager(&mut tx, manager_id, Some(employee_id)).await?;
    }
    if let Some(department_id) = payload.get("department_id").and_then(Value::as_u64) {
        check_department(&mut tx, department_id).await?;
    }

    execute_update(&mut tx, update)
        .await
        .map_err(duplicate_to_conflict("update employee"))?;
    let employee = fetch_employee(&mut *tx, employee_id).await?;
    tx.commit().await.map_err(db_error("commit update employee"))?;

    info!(actor_id = auth.employee_id, employee_id, fields = ?payload.keys().collect::<Vec<_>>(), "Employee updated");
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    delete,
    path = "/api/admin/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deactivated", body = Object, example = json!({
            "message": "社員を無効化しました"
        })),
        (status = 400, description = "Cannot deactivate yourself", body = AppError),
        (status = 404, description = "Employee not found", body = AppError)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageEmployees)?;
    let employee_id = path.into_inner();

    if employee_id == auth.employee_id {
        return Err(AppError::validation("自分自身を無効化することはできません"));
    }

    let mut tx = pool.begin().await.map_err(db_error("begin deactivate"))?;
    sqlx::query("SELECT id FROM employees WHERE id = ? FOR UPDATE")
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("lock employee"))?
        .ok_or_else(|| AppError::not_found("社員が見つかりません"))?;

    sqlx::query("UPDATE employees SET is_active = FALSE, updated_at = NOW() WHERE id = ?")
        .bind(employee_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("deactivate employee"))?;
    tx.commit().await.map_err(db_error("commit deactivate"))?;

    info!(actor_id = auth.employee_id, employee_id, "Employee deactivated");
    Ok(HttpResponse::Ok().json(json!({ "message": "社員を無効化しました" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn update_checks_text_fields_and_enums() {
        let err = validate_update(&object(json!({
            "employee_number": "e-1",
            "role": "hr",
            "employment_type": "part_time"
        })), None)
        .unwrap_err();

        let fields = err.fields.unwrap();
        assert!(fields.contains_key("employee_number"));
        assert!(fields.contains_key("role"));
        assert!(!fields.contains_key("employment_type"));
    }

    #[test]
    fn valid_partial_update_passes() {
        let payload = object(json!({"name": "佐藤 花子", "role": "manager", "is_active": false}));
        assert!(validate_update(&payload, None).is_ok());
        let update = build_update_sql("employees", &payload, UPDATABLE, "id", 3).unwrap();
        assert!(update.sql.starts_with("UPDATE employees SET is_active = ?, name = ?, role = ?"));
    }

    #[test]
    fn own_record_cannot_be_deactivated_or_change_role() {
        let err = validate_update(
            &object(json!({"is_active": false, "role": "employee"})),
            Some(Role::Admin),
        )
        .unwrap_err();
        let fields = err.fields.unwrap();
        assert_eq!(fields["is_active"], "自分自身を無効化することはできません");
        assert_eq!(fields["role"], "自分自身の役割は変更できません");
    }

    #[test]
    fn own_record_accepts_harmless_edits() {
        let payload = object(json!({"name": "管理 太郎", "role": "admin", "is_active": true}));
        assert!(validate_update(&payload, Some(Role::Admin)).is_ok());
    }

    #[test]
    fn email_is_not_updatable_here() {
        let payload = object(json!({"email": "x@example.com"}));
        assert!(build_update_sql("employees", &payload, UPDATABLE, "id", 3).is_err());
    }
}
