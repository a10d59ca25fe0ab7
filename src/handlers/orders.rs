use actix_web::{web, HttpRequest, HttpResponse};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::errors::DomainError;
use crate::domain::order::{parse_item_ids, Address, CheckoutView, CommitRequest, OrderPage, OrderView};
use crate::domain::payment::format_amount;
use crate::domain::ports::SessionStore;
use crate::errors::AppError;
use crate::state::AppState;

use super::cart::CartLineResponse;
use super::session::{current_user, require_user, session_user};
use super::{field, Reply};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceForm {
    /// Comma separated item ids picked on the cart page, e.g. "7,9"
    pub sku_ids: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommitForm {
    pub addr_id: Option<String>,
    pub pay_method: Option<String>,
    /// Comma separated item ids, e.g. "7,9"
    pub sku_ids: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayForm {
    pub order_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmForm {
    pub order_id: Option<String>,
    /// Transaction number reported by the payment provider
    pub trade_no: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressResponse {
    pub id: i64,
    pub receiver: String,
    pub addr: String,
    pub phone: String,
}

impl From<Address> for AddressResponse {
    fn from(a: Address) -> Self {
        AddressResponse {
            id: a.id,
            receiver: a.receiver,
            addr: a.addr,
            phone: a.phone,
        }
    }
}

/// Checkout page data. `sku_ids` is echoed back so the page can post it to
/// `/order/commit` unchanged.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub sku_ids: String,
    pub lines: Vec<CartLineResponse>,
    pub addresses: Vec<AddressResponse>,
    pub total_count: i64,
    pub total_price: String,
    pub shipping_fee: String,
    pub total_pay: String,
}

impl From<CheckoutView> for CheckoutResponse {
    fn from(view: CheckoutView) -> Self {
        CheckoutResponse {
            sku_ids: view
                .item_ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
            total_pay: format_amount(&view.total_pay()),
            total_price: format_amount(&view.total_price),
            shipping_fee: format_amount(&view.shipping_fee),
            total_count: view.total_count,
            lines: view.lines.into_iter().map(CartLineResponse::from).collect(),
            addresses: view.addresses.into_iter().map(AddressResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub sku_id: i64,
    pub quantity: i32,
    /// Decimal amounts are rendered as strings, e.g. "9.99"
    pub unit_price: String,
    pub subtotal: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: String,
    pub addr_id: i64,
    pub pay_method: i16,
    pub pay_method_name: String,
    pub status: i16,
    pub status_name: String,
    pub total_count: i32,
    pub total_price: String,
    pub shipping_fee: String,
    pub total_pay: String,
    pub trade_no: Option<String>,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        OrderResponse {
            total_pay: format_amount(&order.total_pay()),
            pay_method: order.pay_method.code(),
            pay_method_name: order.pay_method.name().to_string(),
            status: order.status.code(),
            status_name: order.status.name().to_string(),
            total_count: order.total_count,
            total_price: format_amount(&order.total_price),
            shipping_fee: format_amount(&order.shipping_fee),
            created_at: order.created_at.to_rfc3339(),
            addr_id: order.address_id,
            trade_no: order.trade_no,
            order_id: order.order_id,
            lines: order
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    sku_id: l.item_id,
                    quantity: l.quantity,
                    unit_price: format_amount(&l.unit_price),
                    subtotal: format_amount(&l.subtotal),
                })
                .collect(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of orders per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl From<OrderPage> for ListOrdersResponse {
    fn from(page: OrderPage) -> Self {
        ListOrdersResponse {
            items: page.items.into_iter().map(OrderResponse::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

// ── Result codes ─────────────────────────────────────────────────────────────

pub fn commit_failure(err: &DomainError) -> Reply {
    match err {
        DomainError::Validation(msg) => Reply::failure(1, msg.clone()),
        DomainError::InvalidPayMethod(_) => Reply::failure(2, "invalid pay method"),
        DomainError::AddressNotFound => Reply::failure(3, "invalid address"),
        DomainError::ItemNotFound(item_id) => {
            Reply::failure(4, format!("item {} does not exist", item_id))
        }
        DomainError::InsufficientStock { item_id, .. } => {
            Reply::failure(6, format!("not enough stock for item {}", item_id))
        }
        _ => Reply::failure(7, "order commit failed"),
    }
}

/// Session resolution for the commit endpoint. A session store that cannot be
/// reached is reported with the commit's own failure code rather than a 500.
pub async fn commit_user<S>(req: &HttpRequest, sessions: S) -> Result<i64, Reply>
where
    S: SessionStore + Clone,
{
    match session_user(req, sessions).await {
        Ok(Some(user_id)) => Ok(user_id),
        Ok(None) => Err(Reply::not_logged_in()),
        Err(e) => {
            error!("session lookup for order commit failed: {}", e);
            Err(commit_failure(&e))
        }
    }
}

/// Pay and confirm share their codes: a missing or ineligible order is 2.
/// Anything else is a server failure.
pub fn payment_failure(err: DomainError) -> Result<Reply, AppError> {
    match err {
        DomainError::NotFound => Ok(Reply::failure(2, "invalid order")),
        other => Err(other.into()),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /order/place
///
/// Prices the cart lines picked for checkout and lists the caller's delivery
/// addresses. Nothing is reserved until the order is committed.
#[utoipa::path(
    post,
    path = "/order/place",
    request_body(content = PlaceForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Checkout preview", body = CheckoutResponse),
        (status = 400, description = "No or malformed sku_ids"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "An item is unknown or not in the cart"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<PlaceForm>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req, &state).await?;
    let item_ids = parse_item_ids(field(&form.sku_ids).unwrap_or_default())?;

    let view = web::block(move || state.orders.preview(user_id, &item_ids))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CheckoutResponse::from(view)))
}

/// POST /order/commit
///
/// Turns the listed cart lines into an order. Stock is reserved, the order
/// and its lines are written in one transaction and the purchased lines are
/// then dropped from the cart.
#[utoipa::path(
    post,
    path = "/order/commit",
    request_body(content = CommitForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "res 0-7; 5 means created and carries order_id", body = Reply),
    ),
    tag = "orders"
)]
pub async fn commit_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<CommitForm>,
) -> Result<HttpResponse, AppError> {
    let user_id = match commit_user(&req, state.sessions.clone()).await {
        Ok(user_id) => user_id,
        Err(reply) => return Ok(reply.into_response()),
    };
    let form = form.into_inner();

    let request = match CommitRequest::from_form(
        user_id,
        field(&form.addr_id),
        field(&form.pay_method),
        field(&form.sku_ids),
    ) {
        Ok(request) => request,
        Err(e) => return Ok(commit_failure(&e).into_response()),
    };

    let outcome = web::block(move || state.orders.commit(request))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let reply = match outcome {
        Ok(order) => Reply {
            order_id: Some(order.order_id),
            ..Reply::success(5, "order created")
        },
        Err(e) => {
            if matches!(
                e,
                DomainError::Internal(_) | DomainError::ConcurrentUpdateConflict { .. }
            ) {
                error!("order commit for user {} failed: {}", user_id, e);
            }
            commit_failure(&e)
        }
    };
    Ok(reply.into_response())
}

/// POST /order/pay
///
/// Returns the payment provider URL for an unpaid online order.
#[utoipa::path(
    post,
    path = "/order/pay",
    request_body(content = PayForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "res 0-3; 3 carries pay_url", body = Reply),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn pay_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<PayForm>,
) -> Result<HttpResponse, AppError> {
    let Some(user_id) = current_user(&req, &state).await? else {
        return Ok(Reply::not_logged_in().into_response());
    };
    let Some(order_id) = field(&form.order_id).map(str::to_string) else {
        return Ok(Reply::failure(1, "invalid order id").into_response());
    };

    let outcome = web::block(move || state.orders.payment_url(user_id, &order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let reply = match outcome {
        Ok(url) => Reply {
            pay_url: Some(url),
            ..Reply::success(3, "redirect to payment")
        },
        Err(e) => payment_failure(e)?,
    };
    Ok(reply.into_response())
}

/// POST /order/confirm
///
/// Records a completed payment for an unpaid online order.
#[utoipa::path(
    post,
    path = "/order/confirm",
    request_body(content = ConfirmForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "res 0-3; 3 means the order is paid", body = Reply),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn confirm_payment(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<ConfirmForm>,
) -> Result<HttpResponse, AppError> {
    let Some(user_id) = current_user(&req, &state).await? else {
        return Ok(Reply::not_logged_in().into_response());
    };
    let (Some(order_id), Some(trade_no)) = (
        field(&form.order_id).map(str::to_string),
        field(&form.trade_no).map(str::to_string),
    ) else {
        return Ok(Reply::incomplete().into_response());
    };

    let outcome = web::block(move || state.orders.confirm_payment(user_id, &order_id, &trade_no))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let reply = match outcome {
        Ok(()) => Reply::success(3, "payment recorded"),
        Err(e) => payment_failure(e)?,
    };
    Ok(reply.into_response())
}

/// GET /orders/{order_id}
///
/// Returns one of the caller's orders together with its lines.
#[utoipa::path(
    get,
    path = "/orders/{order_id}",
    params(
        ("order_id" = String, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req, &state).await?;
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.get_order(user_id, &order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    match order {
        Some(order) => Ok(HttpResponse::Ok().json(OrderResponse::from(order))),
        None => Err(AppError::NotFound),
    }
}

/// GET /orders
///
/// The caller's orders, newest first, with their lines.
/// Use `page` (1-based) and `limit` to control pagination.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Orders per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req, &state).await?;
    let params = query.into_inner();

    let page = web::block(move || state.orders.list_orders(user_id, params.page, params.limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse::from(page)))
}
