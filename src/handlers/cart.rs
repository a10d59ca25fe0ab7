use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::cart_service::parse_quantity;
use crate::domain::cart::{CartLineView, CartView};
use crate::domain::errors::DomainError;
use crate::domain::payment::format_amount;
use crate::errors::AppError;
use crate::state::AppState;

use super::session::{current_user, require_user};
use super::{field, Reply};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartLineForm {
    pub sku_id: Option<String>,
    pub count: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartDeleteForm {
    pub sku_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub sku_id: i64,
    pub name: String,
    pub price: String,
    pub quantity: i32,
    pub subtotal: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub total_count: i64,
    pub total_price: String,
}

impl From<CartLineView> for CartLineResponse {
    fn from(line: CartLineView) -> Self {
        CartLineResponse {
            sku_id: line.item.id,
            name: line.item.name,
            price: format_amount(&line.item.price),
            quantity: line.quantity,
            subtotal: format_amount(&line.subtotal),
        }
    }
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        CartResponse {
            lines: cart.lines.into_iter().map(CartLineResponse::from).collect(),
            total_count: cart.total_count,
            total_price: format_amount(&cart.total_price),
        }
    }
}

/// Codes shared by add and update. Storage failures have no code and surface
/// as a 500.
pub fn line_failure(err: DomainError) -> Result<Reply, AppError> {
    match err {
        DomainError::InvalidQuantity(_) => Ok(Reply::failure(2, "invalid item count")),
        DomainError::ItemNotFound(_) => Ok(Reply::failure(3, "item does not exist")),
        DomainError::InsufficientStock { .. } => Ok(Reply::failure(4, "not enough stock")),
        other => Err(other.into()),
    }
}

pub fn delete_failure(err: DomainError) -> Result<Reply, AppError> {
    match err {
        DomainError::ItemNotFound(_) => Ok(Reply::failure(2, "item does not exist")),
        other => Err(other.into()),
    }
}

/// Validate `sku_id`/`count` in the order the codes are checked: presence,
/// then the count, then the item id.
fn parse_line(form: &CartLineForm) -> Result<(i64, i32), Reply> {
    let (Some(sku_id), Some(count)) = (field(&form.sku_id), field(&form.count)) else {
        return Err(Reply::incomplete());
    };
    let quantity = parse_quantity(count).map_err(|_| Reply::failure(2, "invalid item count"))?;
    let item_id = sku_id
        .parse::<i64>()
        .map_err(|_| Reply::failure(3, "item does not exist"))?;
    Ok((item_id, quantity))
}

/// POST /cart/add
///
/// Adds `count` units of the item to the caller's cart.
#[utoipa::path(
    post,
    path = "/cart/add",
    request_body(content = CartLineForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "res 0-5; 5 carries cart_count", body = Reply),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<CartLineForm>,
) -> Result<HttpResponse, AppError> {
    let Some(user_id) = current_user(&req, &state).await? else {
        return Ok(Reply::not_logged_in().into_response());
    };
    let (item_id, quantity) = match parse_line(&form) {
        Ok(line) => line,
        Err(reply) => return Ok(reply.into_response()),
    };

    let outcome = web::block(move || state.carts.add(user_id, item_id, quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let reply = match outcome {
        Ok(cart_count) => Reply {
            cart_count: Some(cart_count),
            ..Reply::success(5, "added to cart")
        },
        Err(e) => line_failure(e)?,
    };
    Ok(reply.into_response())
}

/// POST /cart/update
///
/// Sets the quantity held for an item.
#[utoipa::path(
    post,
    path = "/cart/update",
    request_body(content = CartLineForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "res 0-5; 5 carries total_count", body = Reply),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn update_cart(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<CartLineForm>,
) -> Result<HttpResponse, AppError> {
    let Some(user_id) = current_user(&req, &state).await? else {
        return Ok(Reply::not_logged_in().into_response());
    };
    let (item_id, quantity) = match parse_line(&form) {
        Ok(line) => line,
        Err(reply) => return Ok(reply.into_response()),
    };

    let outcome = web::block(move || state.carts.update(user_id, item_id, quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let reply = match outcome {
        Ok(total_count) => Reply {
            total_count: Some(total_count),
            ..Reply::success(5, "cart updated")
        },
        Err(e) => line_failure(e)?,
    };
    Ok(reply.into_response())
}

/// POST /cart/delete
#[utoipa::path(
    post,
    path = "/cart/delete",
    request_body(content = CartDeleteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "res 0-3; 3 carries total_count", body = Reply),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn delete_from_cart(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<CartDeleteForm>,
) -> Result<HttpResponse, AppError> {
    let Some(user_id) = current_user(&req, &state).await? else {
        return Ok(Reply::not_logged_in().into_response());
    };
    let Some(sku_id) = field(&form.sku_id) else {
        return Ok(Reply::incomplete().into_response());
    };
    let Ok(item_id) = sku_id.parse::<i64>() else {
        return Ok(Reply::failure(2, "item does not exist").into_response());
    };

    let outcome = web::block(move || state.carts.remove(user_id, item_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let reply = match outcome {
        Ok(total_count) => Reply {
            total_count: Some(total_count),
            ..Reply::success(3, "removed from cart")
        },
        Err(e) => delete_failure(e)?,
    };
    Ok(reply.into_response())
}

/// GET /cart
///
/// The caller's cart with per-line subtotals.
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Current cart", body = CartResponse),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn show_cart(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req, &state).await?;

    let cart = web::block(move || state.carts.show(user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::cart::{CartLineView, ItemSummary};

    fn form(sku_id: Option<&str>, count: Option<&str>) -> CartLineForm {
        CartLineForm {
            sku_id: sku_id.map(String::from),
            count: count.map(String::from),
        }
    }

    fn code(result: Result<(i64, i32), Reply>) -> u8 {
        result.map(|_| 5).unwrap_or_else(|reply| reply.res)
    }

    #[test]
    fn parse_line_checks_presence_then_count_then_item() {
        assert_eq!(code(parse_line(&form(None, Some("1")))), 1);
        assert_eq!(code(parse_line(&form(Some("7"), Some(" ")))), 1);
        assert_eq!(code(parse_line(&form(Some("x"), Some("zero")))), 2);
        assert_eq!(code(parse_line(&form(Some("7"), Some("-1")))), 2);
        assert_eq!(code(parse_line(&form(Some("x"), Some("1")))), 3);
        assert_eq!(parse_line(&form(Some("7"), Some("2"))).unwrap(), (7, 2));
    }

    #[test]
    fn line_codes_follow_the_failure_kind() {
        assert_eq!(line_failure(DomainError::InvalidQuantity("0".into())).unwrap().res, 2);
        assert_eq!(line_failure(DomainError::ItemNotFound(7)).unwrap().res, 3);
        let short = DomainError::InsufficientStock {
            item_id: 7,
            requested: 9,
            available: 5,
        };
        assert_eq!(line_failure(short).unwrap().res, 4);
        assert!(line_failure(DomainError::Internal("redis down".into())).is_err());
    }

    #[test]
    fn delete_of_unknown_item_is_code_two() {
        assert_eq!(delete_failure(DomainError::ItemNotFound(7)).unwrap().res, 2);
        assert!(delete_failure(DomainError::Internal("redis down".into())).is_err());
    }

    #[test]
    fn cart_response_prices_every_line() {
        let cart = CartView {
            lines: vec![CartLineView {
                item: ItemSummary {
                    id: 7,
                    name: "apples".to_string(),
                    price: BigDecimal::from_str("10").unwrap(),
                    stock: 5,
                },
                quantity: 2,
                subtotal: BigDecimal::from_str("20").unwrap(),
            }],
            total_count: 2,
            total_price: BigDecimal::from_str("20").unwrap(),
        };

        let body = CartResponse::from(cart);

        assert_eq!(body.lines[0].price, "10.00");
        assert_eq!(body.lines[0].subtotal, "20.00");
        assert_eq!(body.total_count, 2);
        assert_eq!(body.total_price, "20.00");
    }
}
