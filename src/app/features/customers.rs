use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::{
    db,
    db::audit_logs::{AuditAction, AuditResource},
    db::customers::{Customer, CustomerPatch, NewCustomer, PropertyType},
    domain::{Action, OrganizationId, RecordId, Resource, UserId},
    error::AppError,
    identity::CurrentUser,
    tenant, AppState,
};

/// API shape for a customer: the stored JSON tags column is decoded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub property_type: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CustomerResponse {
    fn from_row(row: Customer) -> Self {
        let tags = serde_json::from_str(&row.tags).unwrap_or_default();
        CustomerResponse {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            property_type: row.property_type,
            notes: row.notes,
            tags,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Request body for creating a customer.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    pub property_type: PropertyType,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request body for partially updating a customer.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    pub property_type: Option<PropertyType>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// GET /api/customers — List customers, gated on the customers read flag.
pub async fn list(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    user.require_permission(Resource::Customers, Action::Read)?;
    let rows = db::customers::list_for_organization(&state.db, &user.organization_id).await?;
    Ok(Json(rows.into_iter().map(CustomerResponse::from_row).collect()))
}

/// GET /api/customers/search?q=term — Same read gate as list, scoped to
/// the caller's organization.
pub async fn search(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    user.require_permission(Resource::Customers, Action::Read)?;
    let rows = db::customers::search(&state.db, &user.organization_id, &query.q).await?;
    Ok(Json(rows.into_iter().map(CustomerResponse::from_row).collect()))
}

/// GET /api/customers/:id
pub async fn get(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = db::customers::find_by_id(&state.db, &customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;
    tenant::require_same_organization(&user, &customer.organization_id)?;
    user.require_permission(Resource::Customers, Action::Read)?;
    Ok(Json(CustomerResponse::from_row(customer)))
}

/// POST /api/customers
pub async fn create(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    user.require_permission(Resource::Customers, Action::Create)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let customer_id = RecordId::new();
    let new_customer = NewCustomer {
        id: customer_id.clone(),
        organization_id: OrganizationId::from_string(&user.organization_id)
            .map_err(|_| AppError::Internal)?,
        name: request.name,
        email: request.email,
        phone: request.phone,
        address: request.address,
        city: request.city,
        state: request.state,
        zip_code: request.zip_code,
        property_type: request.property_type.to_string(),
        notes: request.notes,
        tags: request.tags,
        created_by: UserId::from_string(&user.id).map_err(|_| AppError::Internal)?,
    };

    let mut tx = state.db.begin().await?;
    db::customers::insert(&mut *tx, &new_customer).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Create,
        AuditResource::Customer,
        &customer_id.as_str(),
        None,
    )
    .await?;
    tx.commit().await?;

    let customer = db::customers::find_by_id(&state.db, &customer_id.as_str())
        .await?
        .ok_or(AppError::Internal)?;
    Ok((StatusCode::CREATED, Json(CustomerResponse::from_row(customer))))
}

/// PATCH /api/customers/:id
pub async fn update(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = db::customers::find_by_id(&state.db, &customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;
    tenant::require_same_organization(&user, &customer.organization_id)?;
    user.require_permission(Resource::Customers, Action::Update)?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let changes = CustomerPatch {
        name: request.name,
        email: request.email,
        phone: request.phone,
        address: request.address,
        city: request.city,
        state: request.state,
        zip_code: request.zip_code,
        property_type: request.property_type.map(|p| p.to_string()),
        notes: request.notes,
        tags: request.tags,
    };
    let changed_fields = serde_json::to_value(&changes).map_err(|_| AppError::Internal)?;

    let mut tx = state.db.begin().await?;
    db::customers::patch(&mut *tx, &customer_id, &changes).await?;
    db::audit_logs::record(
        &mut *tx,
        &user.organization_id,
        &user.id,
        AuditAction::Update,
        AuditResource::Customer,
        &customer_id,
        Some(changed_fields),
    )
    .await?;
    tx.commit().await?;

    let customer = db::customers::find_by_id(&state.db, &customer_id)
        .await?
        .ok_or(AppError::Internal)?;
    Ok(Json(CustomerResponse::from_row(customer)))
}

/// Customer routes. There is deliberately no delete route: customers are
/// referenced by leads, proposals, work orders and invoices, and removing
/// one would orphan that history.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", routing::get(list).post(create))
        .route("/api/customers/search", routing::get(search))
        .route("/api/customers/:id", routing::get(get).patch(update))
}
