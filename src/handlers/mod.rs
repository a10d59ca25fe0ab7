pub mod cart;
pub mod orders;
pub mod session;

use actix_web::HttpResponse;
use serde::Serialize;
use utoipa::ToSchema;

/// Body of every form endpoint: a numeric result code plus a message, and
/// whichever extra field the endpoint reports on success.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct Reply {
    pub res: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
}

impl Reply {
    fn bare(res: u8) -> Self {
        Reply {
            res,
            message: None,
            errmsg: None,
            order_id: None,
            pay_url: None,
            cart_count: None,
            total_count: None,
        }
    }

    pub fn success(res: u8, message: &str) -> Self {
        Reply {
            message: Some(message.to_string()),
            ..Reply::bare(res)
        }
    }

    pub fn failure(res: u8, errmsg: impl Into<String>) -> Self {
        Reply {
            errmsg: Some(errmsg.into()),
            ..Reply::bare(res)
        }
    }

    pub fn not_logged_in() -> Self {
        Reply::failure(0, "please log in first")
    }

    pub fn incomplete() -> Self {
        Reply::failure(1, "incomplete data")
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}

fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
