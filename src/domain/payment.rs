use bigdecimal::{BigDecimal, RoundingMode};

use super::errors::DomainError;
use super::order::{OrderStatus, OrderView, PayMethod};

/// Builds the page-pay redirect handed to the external payment provider.
///
/// Signing and callback verification belong to the provider integration and
/// are not done here; the URL only carries the trade parameters.
#[derive(Debug, Clone)]
pub struct PaymentGateway {
    pub gateway_url: String,
    pub app_id: String,
    pub store_name: String,
}

impl PaymentGateway {
    pub fn redirect_url(&self, order: &OrderView) -> Result<String, DomainError> {
        if order.pay_method != PayMethod::Online || order.status != OrderStatus::Unpaid {
            return Err(DomainError::NotFound);
        }

        let total_amount = format_amount(&order.total_pay());
        let subject = format!("{} {}", self.store_name, order.order_id);
        let query = serde_urlencoded::to_string([
            ("app_id", self.app_id.as_str()),
            ("out_trade_no", order.order_id.as_str()),
            ("total_amount", total_amount.as_str()),
            ("subject", subject.as_str()),
        ])
        .map_err(|e| DomainError::Internal(e.to_string()))?;

        Ok(format!("{}?{}", self.gateway_url, query))
    }
}

pub fn format_amount(amount: &BigDecimal) -> String {
    amount.with_scale_round(2, RoundingMode::HalfUp).to_string()
}
