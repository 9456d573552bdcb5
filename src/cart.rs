//! Point-of-sale cart and the plain-text receipt printed after a sale.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{RapportError, Result};
use crate::report::format_date_time;

/// VAT applied on receipts
pub const TAX_RATE: f64 = 0.18;

/// A product as listed by the catalogue, `quantity` being what is in stock
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    #[serde(deserialize_with = "crate::report::lenient_number")]
    pub sale_price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub stock: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit; never goes past the product's stock
    pub fn add(&mut self, product: &Product) {
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.product_id)
        {
            Some(item) => item.quantity = (item.quantity + 1).min(product.quantity),
            None => self.items.push(CartItem {
                product_id: product.product_id.clone(),
                name: product.name.clone(),
                price: product.sale_price,
                quantity: 1,
                stock: product.quantity,
            }),
        }
    }

    /// Shift a line's quantity by `change`, dropping it once it reaches zero
    pub fn update_quantity(&mut self, product_id: &str, change: i64) {
        for item in self.items.iter_mut().filter(|i| i.product_id == product_id) {
            let wanted = (i64::from(item.quantity) + change).max(0);
            item.quantity = wanted.min(i64::from(item.stock)) as u32;
        }
        self.items.retain(|item| item.quantity > 0);
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|item| item.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total_price(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.price * f64::from(item.quantity))
            .sum()
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_number: String,
    pub date: String,
    pub cashier_name: String,
    pub items: Vec<ReceiptItem>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

fn whole(amount: f64) -> String {
    format!("{:.0}", amount.round())
}

impl Receipt {
    /// Build a receipt for the cart's contents, unit prices rounded to whole francs
    pub fn from_cart(
        cart: &Cart,
        receipt_number: impl Into<String>,
        date: NaiveDateTime,
        cashier_name: impl Into<String>,
    ) -> Result<Self> {
        if cart.is_empty() {
            return Err(RapportError::EmptyCart);
        }

        let items: Vec<ReceiptItem> = cart
            .items()
            .iter()
            .map(|item| {
                let unit_price = item.price.round();
                ReceiptItem {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price,
                    total_price: unit_price * f64::from(item.quantity),
                }
            })
            .collect();

        let subtotal: f64 = items.iter().map(|i| i.total_price).sum();
        let tax_amount = (subtotal * TAX_RATE).round();

        Ok(Self {
            receipt_number: receipt_number.into(),
            date: date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            cashier_name: cashier_name.into(),
            items,
            subtotal,
            tax_amount,
            total_amount: subtotal + tax_amount,
        })
    }

    /// `recu_<number>.txt`
    pub fn filename(&self) -> String {
        format!("recu_{}.txt", self.receipt_number)
    }

    pub fn render_text(&self) -> String {
        let rule = "=".repeat(40);
        let thin = "-".repeat(40);
        let mut out = String::new();

        out.push_str(&format!("{rule}\n"));
        out.push_str("        RESTAURANT FASTFOOD\n");
        out.push_str("        Système de Gestion\n");
        out.push_str(&format!("{rule}\n\n"));

        out.push_str(&format!("N° Reçu: {}\n", self.receipt_number));
        out.push_str(&format!("Date: {}\n", format_date_time(&self.date)));
        out.push_str(&format!("Caissier: {}\n\n", self.cashier_name));

        out.push_str(&format!("{thin}\nARTICLES:\n{thin}\n"));
        for item in &self.items {
            out.push_str(&format!(
                "{}\n{} x {} FCFA = {} FCFA\n",
                item.name,
                item.quantity,
                whole(item.unit_price),
                whole(item.total_price)
            ));
        }
        out.push('\n');

        out.push_str(&format!("{thin}\n"));
        out.push_str(&format!("Sous-total: {} FCFA\n", whole(self.subtotal)));
        out.push_str(&format!("TVA (18%): {} FCFA\n", whole(self.tax_amount)));
        out.push_str(&format!("TOTAL: {} FCFA\n", whole(self.total_amount)));
        out.push_str(&format!("{thin}\n\n"));

        out.push_str("        Merci pour votre visite!\n");
        out.push_str("        Conservez votre reçu\n");
        out.push_str(&format!("{rule}\n"));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn product(id: &str, price: f64, stock: u32) -> Product {
        Product {
            product_id: id.to_string(),
            name: format!("Produit {id}"),
            sale_price: price,
            quantity: stock,
        }
    }

    #[test]
    fn add_caps_at_stock() {
        let mut cart = Cart::new();
        let soda = product("soda", 500.0, 2);
        cart.add(&soda);
        cart.add(&soda);
        cart.add(&soda);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.items()[0].stock, 2);
    }

    #[test]
    fn update_quantity_clamps_and_drops_empty_lines() {
        let mut cart = Cart::new();
        cart.add(&product("a", 1000.0, 5));
        cart.add(&product("b", 250.0, 3));

        cart.update_quantity("a", 10);
        assert_eq!(cart.items()[0].quantity, 5);

        cart.update_quantity("b", -4);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product_id, "a");

        cart.update_quantity("unknown", 1);
        assert_eq!(cart.total_items(), 5);
    }

    #[test]
    fn totals_and_clear() {
        let mut cart = Cart::new();
        cart.add(&product("a", 1000.0, 5));
        cart.add(&product("a", 1000.0, 5));
        cart.add(&product("b", 250.0, 3));
        assert_eq!(cart.total_price(), 2250.0);
        assert_eq!(cart.total_items(), 3);

        cart.remove("a");
        assert_eq!(cart.total_items(), 1);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn product_price_may_be_a_string() {
        let p: Product = serde_json::from_str(
            r#"{"product_id":"p1","name":"Attiéké","sale_price":"1500.00","quantity":4}"#,
        )
        .unwrap();
        assert_eq!(p.sale_price, 1500.0);
    }

    #[test]
    fn receipt_from_cart_adds_vat() {
        let mut cart = Cart::new();
        cart.add(&product("a", 1000.4, 5));
        cart.add(&product("a", 1000.4, 5));
        let at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();

        let receipt = Receipt::from_cart(&cart, "R-42", at, "awa").unwrap();
        assert_eq!(receipt.items[0].unit_price, 1000.0);
        assert_eq!(receipt.subtotal, 2000.0);
        assert_eq!(receipt.tax_amount, 360.0);
        assert_eq!(receipt.total_amount, 2360.0);
        assert_eq!(receipt.filename(), "recu_R-42.txt");
    }

    #[test]
    fn empty_cart_has_no_receipt() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(matches!(
            Receipt::from_cart(&Cart::new(), "R-1", at, "x"),
            Err(RapportError::EmptyCart)
        ));
    }

    #[test]
    fn receipt_text_layout() {
        let receipt = Receipt {
            receipt_number: "0007".into(),
            date: "2024-03-01T12:30:05".into(),
            cashier_name: "Koffi".into(),
            items: vec![ReceiptItem {
                name: "Poulet braisé".into(),
                quantity: 2,
                unit_price: 3500.0,
                total_price: 7000.0,
            }],
            subtotal: 7000.0,
            tax_amount: 1260.0,
            total_amount: 8260.0,
        };

        let text = receipt.render_text();
        assert!(text.starts_with("========================================\n        RESTAURANT FASTFOOD\n"));
        assert!(text.contains("N° Reçu: 0007\n"));
        assert!(text.contains("Date: 01/03/2024 12:30:05\n"));
        assert!(text.contains("Poulet braisé\n2 x 3500 FCFA = 7000 FCFA\n"));
        assert!(text.contains("Sous-total: 7000 FCFA\nTVA (18%): 1260 FCFA\nTOTAL: 8260 FCFA\n"));
        assert!(text.ends_with("Conservez votre reçu\n========================================\n"));
    }
}
