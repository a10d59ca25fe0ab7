use bigdecimal::BigDecimal;

/// Catalog entry as seen by the cart: enough to price a line and check stock.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSummary {
    pub id: i64,
    pub name: String,
    pub price: BigDecimal,
    pub stock: i32,
}

#[derive(Debug, Clone)]
pub struct CartLineView {
    pub item: ItemSummary,
    pub quantity: i32,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total_count: i64,
    pub total_price: BigDecimal,
}
