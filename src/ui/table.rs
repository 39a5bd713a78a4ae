use tabled::{settings::Style, Table, Tabled};
use crate::product::Product;

#[derive(Tabled)]
pub struct ProductRow {
    #[tabled(rename = "Product")]
    pub name: String,
    #[tabled(rename = "Cost")]
    pub cost_price: String,
    #[tabled(rename = "Price")]
    pub sell_price: String,
    #[tabled(rename = "Margin")]
    pub margin: String,
    #[tabled(rename = "In stock")]
    pub in_stock: String,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            cost_price: format!("${:.2}", product.cost_price),
            sell_price: format!("${:.2}", product.sell_price),
            margin: format!("${:.2}", product.margin()),
            in_stock: if product.in_stock == 0 {
                "sold out".to_string()
            } else {
                product.in_stock.to_string()
            },
        }
    }
}

#[derive(Tabled)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Render products as a rounded table; empty input renders nothing
pub fn product_table(products: &[Product]) -> String {
    if products.is_empty() {
        return String::new();
    }

    let rows: Vec<ProductRow> = products.iter().map(ProductRow::from).collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    if stats.is_empty() {
        return String::new();
    }

    let rows: Vec<MetricRow> = stats
        .iter()
        .map(|(label, value)| MetricRow {
            metric: label.to_string(),
            value: value.clone(),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_table() {
        let products = vec![
            Product::new("apple", 0.5, 1.0, 12).unwrap(),
            Product::new("pear", 0.75, 1.25, 0).unwrap(),
        ];
        let table = product_table(&products);
        assert!(table.contains("APPLE"));
        assert!(table.contains("$0.50"));
        assert!(table.contains("sold out"));
        assert!(table.contains("In stock"));
    }

    #[test]
    fn test_empty_tables() {
        assert!(product_table(&[]).is_empty());
        assert!(stats_table(&[]).is_empty());
    }
}
