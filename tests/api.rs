//! In-process HTTP tests driving the router with `oneshot`.

mod common;

use axum::http::{Method, StatusCode, header};
use serde_json::{Value, json};

use assetrack::store::Store;
use assetrack::transfer::codec::{Cell, SheetWriter, read_workbook, write_workbook};
use assetrack::transfer::{ASSET_COLUMNS, ASSET_SHEET, EMPLOYEE_COLUMNS, EMPLOYEE_SHEET};
use common::{ADMIN_PASSWORD, TestApp};

#[tokio::test]
async fn test_health_and_fallback() {
    let app = TestApp::new();

    let (status, _) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(Method::GET, "/api/v1/does-not-exist", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"data": null, "error": "Not found"}));
}

#[tokio::test]
async fn test_login_and_profile() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"username": "admin", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"username": "admin", "password": ADMIN_PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let (status, body) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
}

#[tokio::test]
async fn test_missing_and_garbage_tokens_are_rejected() {
    let app = TestApp::new();

    let (status, _) = app.request(Method::GET, "/api/v1/assets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/v1/assets", "not.a.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_assign_and_return_end_to_end() {
    let app = TestApp::new();
    let token = app.admin_token.clone();

    let type_id = app.create_asset_type("Máy tính để bàn").await;
    let employee_id = app.create_employee("E001", "Nguyen Van A").await;
    let asset_id = app.create_asset("PC001", "Dell OptiPlex", type_id).await;

    let (status, body) = app
        .post(
            "/api/v1/assignments",
            &token,
            json!({
                "asset_id": asset_id,
                "employee_id": employee_id,
                "assigned_date": "2024-01-10",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let assignment_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["assigned_by"], "admin");

    let (_, body) = app.get(&format!("/api/v1/assets/{asset_id}"), &token).await;
    assert_eq!(body["data"]["status"], "assigned");
    assert_eq!(body["data"]["assigned_to_code"], "E001");

    let (status, body) = app
        .put(
            &format!("/api/v1/assignments/{assignment_id}/return"),
            &token,
            json!({"return_date": "2024-02-10"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "returned");
    assert_eq!(body["data"]["return_date"], "2024-02-10");
    assert_eq!(body["data"]["usage_days"], 31);

    let (_, body) = app.get(&format!("/api/v1/assets/{asset_id}"), &token).await;
    assert_eq!(body["data"]["status"], "available");

    let (_, body) = app
        .get(&format!("/api/v1/assets/{asset_id}/usage-history"), &token)
        .await;
    assert_eq!(body["data"]["total_usage_days"], 31);
    assert_eq!(body["data"]["history"][0]["department"], "IT");

    let (status, body) = app
        .put(
            &format!("/api/v1/assignments/{assignment_id}/return"),
            &token,
            json!({"return_date": "2024-02-11"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(body["error"], "No active assignment found");

    // An already-returned assignment is reported as gone even when the
    // supplied date would also be out of range.
    let (status, _) = app
        .put(
            &format!("/api/v1/assignments/{assignment_id}/return"),
            &token,
            json!({"return_date": "2023-12-31"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app
        .get("/api/v1/activity-logs?entity_type=assignment", &token)
        .await;
    let actions: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action_type"].as_str().unwrap())
        .collect();
    assert_eq!(actions.len(), 2);
    assert!(actions.contains(&"assign"));
    assert!(actions.contains(&"return"));
    assert_eq!(body["data"]["items"][0]["entity_name"], "PC001 → E001");
}

#[tokio::test]
async fn test_double_assign_is_rejected() {
    let app = TestApp::new();
    let token = app.admin_token.clone();

    let type_id = app.create_asset_type("Laptop").await;
    let first = app.create_employee("E001", "Nguyen Van A").await;
    let second = app.create_employee("E002", "Tran Thi B").await;
    let asset_id = app.create_asset("LT001", "ThinkPad", type_id).await;

    let (status, _) = app
        .post(
            "/api/v1/assignments",
            &token,
            json!({"asset_id": asset_id, "employee_id": first, "assigned_date": "2024-03-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            "/api/v1/assignments",
            &token,
            json!({"asset_id": asset_id, "employee_id": second, "assigned_date": "2024-03-02"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Asset is not available for assignment");

    let (_, body) = app
        .get(&format!("/api/v1/employees/{second}/assignments"), &token)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_delete_guards() {
    let app = TestApp::new();
    let token = app.admin_token.clone();

    let type_id = app.create_asset_type("Màn hình").await;
    let employee_id = app.create_employee("E001", "Nguyen Van A").await;
    let asset_id = app.create_asset("MN001", "Dell 24", type_id).await;

    let (_, body) = app
        .post(
            "/api/v1/assignments",
            &token,
            json!({
                "asset_id": asset_id,
                "employee_id": employee_id,
                "assigned_date": "2024-03-01",
            }),
        )
        .await;
    let assignment_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .delete(&format!("/api/v1/employees/{employee_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.delete(&format!("/api/v1/assets/{asset_id}"), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .delete(&format!("/api/v1/asset-types/{type_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.put(
        &format!("/api/v1/assignments/{assignment_id}/return"),
        &token,
        json!({"return_date": "2024-04-01"}),
    )
    .await;

    let (status, body) = app
        .delete(&format!("/api/v1/employees/{employee_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["message"], "Employee deleted");
}

#[tokio::test]
async fn test_grants_gate_non_admin_users() {
    let app = TestApp::new();
    let type_id = app.create_asset_type("Máy in").await;
    app.create_asset("PR001", "HP LaserJet", type_id).await;

    let (user_id, token) = app.create_user("lan", json!([])).await;

    let (status, _) = app.get("/api/v1/assets", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(
            &format!("/api/v1/users/{user_id}/permissions"),
            &app.admin_token,
            json!({"permissions": [{"entity_type": "asset", "can_view": true}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/v1/assets?search=laser", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["totalItems"], 1);
    assert_eq!(body["data"]["items"][0]["type_name"], "Máy in");

    // Creating stays admin-only whatever the grants say.
    let (status, _) = app
        .post(
            "/api/v1/assets",
            &token,
            json!({"asset_code": "PR002", "asset_name": "Canon", "asset_type_id": type_id}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/v1/users", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_disabled_account_token_is_rejected() {
    let app = TestApp::new();
    let (user_id, token) = app.create_user("minh", json!([])).await;

    let (status, _) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .put(
            &format!("/api/v1/users/{user_id}"),
            &app.admin_token,
            json!({"is_active": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Account is disabled");
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = TestApp::new();
    let admin = app.store.get_user_by_username("admin").unwrap().unwrap();

    let (status, body) = app
        .delete(&format!("/api/v1/users/{}", admin.id), &app.admin_token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete your own account");
}

#[tokio::test]
async fn test_validation_errors() {
    let app = TestApp::new();
    let token = app.admin_token.clone();

    let (status, body) = app
        .post(
            "/api/v1/employees",
            &token,
            json!({"employee_code": "E001", "full_name": "A", "email": "nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email address");

    let (status, body) = app
        .post(
            "/api/v1/assets",
            &token,
            json!({"asset_code": "PC001", "asset_name": "Dell"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Asset type is required");

    let (status, _) = app.get("/api/v1/assets?status=broken", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn asset_workbook(rows: Vec<Vec<Cell>>) -> Vec<u8> {
    let mut sheet = SheetWriter::new(ASSET_SHEET, &ASSET_COLUMNS);
    for row in rows {
        sheet.push(row);
    }
    write_workbook(&[sheet]).unwrap()
}

#[tokio::test]
async fn test_import_assets_reports_rows() {
    let app = TestApp::new();
    let token = app.admin_token.clone();

    let bytes = asset_workbook(vec![
        vec![
            Cell::text("PC100"),
            Cell::text("HP ProDesk"),
            Cell::text("Máy tính để bàn"),
            Cell::text("HP"),
        ],
        vec![Cell::text("PC101")],
    ]);

    let (status, body) = app
        .upload("/api/v1/import/assets", &token, "assets.xlsx", &bytes)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["success"], 1);
    assert_eq!(body["data"]["errors"], 1);
    assert_eq!(body["data"]["details"]["errors"][0]["row"], 3);
    assert_eq!(body["data"]["details"]["success"][0]["action"], "created");

    let imported = app.store.get_asset_by_code("PC100").unwrap().unwrap();
    assert!(imported.asset_type_id.is_some());

    let (_, body) = app
        .get("/api/v1/activity-logs?action_type=import", &token)
        .await;
    assert_eq!(
        body["data"]["items"][0]["entity_name"],
        "Import 1 tài sản từ file Excel"
    );
}

#[tokio::test]
async fn test_import_rejects_non_xlsx_and_non_admin() {
    let app = TestApp::new();
    let bytes = asset_workbook(vec![]);

    let (status, body) = app
        .upload("/api/v1/import/assets", &app.admin_token, "assets.csv", &bytes)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only .xlsx files are accepted");

    let (_, token) = app.create_user("hoa", json!([])).await;
    let (status, _) = app
        .upload("/api/v1/import/assets", &token, "assets.xlsx", &bytes)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_import_employees_upserts_by_code() {
    let app = TestApp::new();
    let token = app.admin_token.clone();
    app.create_employee("E001", "Nguyen Van A").await;

    let mut sheet = SheetWriter::new(EMPLOYEE_SHEET, &EMPLOYEE_COLUMNS);
    sheet.push(vec![
        Cell::text("E001"),
        Cell::text("Nguyen Van An"),
        Cell::text("e001@example.com"),
        Cell::text("Finance"),
    ]);
    sheet.push(vec![
        Cell::text("E002"),
        Cell::text("Tran Thi B"),
        Cell::text("b@example.com"),
    ]);
    let bytes = write_workbook(&[sheet]).unwrap();

    let (status, body) = app
        .upload("/api/v1/import/employees", &token, "staff.XLSX", &bytes)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["success"], 2);

    let (_, body) = app.get("/api/v1/employees?search=Nguyen", &token).await;
    assert_eq!(body["data"]["items"][0]["full_name"], "Nguyen Van An");
    assert_eq!(body["data"]["items"][0]["department"], "Finance");
    assert_eq!(body["data"]["pagination"]["totalItems"], 1);
}

#[tokio::test]
async fn test_export_all_download() {
    let app = TestApp::new();
    let type_id = app.create_asset_type("Laptop").await;
    app.create_asset("LT001", "ThinkPad", type_id).await;

    let request = axum::http::Request::builder()
        .uri("/api/v1/export/all")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    let disposition = response.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename=\"export-all-data-"));

    let sheets = read_workbook(&response.body).unwrap();
    assert_eq!(sheets.len(), 3);
    assert_eq!(sheets[0].cell(1, 0).as_text().as_deref(), Some("LT001"));
}

#[tokio::test]
async fn test_export_user_is_self_or_admin() {
    let app = TestApp::new();
    let (user_id, token) = app.create_user("tuan", json!([])).await;
    let admin = app.store.get_user_by_username("admin").unwrap().unwrap();

    let own = axum::http::Request::builder()
        .uri(format!("/api/v1/export/user/{user_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(app.send(own).await.status, StatusCode::OK);

    let (status, body): (StatusCode, Value) = app
        .get(&format!("/api/v1/export/user/{}", admin.id), &token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
}

#[tokio::test]
async fn test_malformed_requests_use_error_envelope() {
    let app = TestApp::new();
    let token = app.admin_token.clone();

    let (status, body) = app
        .post(
            "/api/v1/employees",
            &token,
            json!({"employee_code": "E001", "full_name": "A"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"].is_null());
    assert!(body["error"].as_str().unwrap().contains("email"), "{body}");

    let (status, body) = app
        .post(
            "/api/v1/assignments",
            &token,
            json!({"asset_id": "one", "employee_id": 1, "assigned_date": "2024-01-10"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/api/v1/assets/not-a-number", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/api/v1/assets?page=first", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_assign_and_return_require_dates() {
    let app = TestApp::new();
    let token = app.admin_token.clone();

    let type_id = app.create_asset_type("Laptop").await;
    let employee_id = app.create_employee("E001", "Nguyen Van A").await;
    let asset_id = app.create_asset("LT001", "ThinkPad", type_id).await;

    let (status, body) = app
        .post(
            "/api/v1/assignments",
            &token,
            json!({"asset_id": asset_id, "employee_id": employee_id}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Assigned date is required");
    assert_eq!(
        app.store.get_asset(asset_id).unwrap().unwrap().status,
        assetrack::types::AssetStatus::Available
    );

    let (status, body) = app
        .post(
            "/api/v1/assignments",
            &token,
            json!({
                "asset_id": asset_id,
                "employee_id": employee_id,
                "assigned_date": "2024-05-02",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let assignment_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .put(
            &format!("/api/v1/assignments/{assignment_id}/return"),
            &token,
            json!({"notes": "no date"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Return date is required");

    let (status, body) = app
        .put(
            &format!("/api/v1/assignments/{assignment_id}/return"),
            &token,
            json!({"return_date": "2024-05-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Return date cannot be earlier than the assigned date"
    );

    let (_, body) = app
        .get(&format!("/api/v1/assignments/{assignment_id}"), &token)
        .await;
    assert_eq!(body["data"]["status"], "active");
}
