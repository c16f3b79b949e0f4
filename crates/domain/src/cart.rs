//! Shopping cart kept in the user's session.

use std::collections::BTreeMap;

use common::{Money, ProductId};
use repository::{OrderLine, Product};
use serde::{Deserialize, Serialize};

/// One product in the cart, with the name and price captured when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartEntry {
    pub fn total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A labelled amount shown on the payment invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub label: String,
    pub amount: Money,
}

/// The user's cart.
///
/// Entries are keyed by product id and never hold a quantity of zero: an
/// entry that would drop to zero is removed instead. Operations never fail;
/// persisting the cart is a separate step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    entries: BTreeMap<ProductId, CartEntry>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` units of a product.
    ///
    /// A product already in the cart keeps its original price snapshot.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        self.entries
            .entry(product.id)
            .and_modify(|entry| entry.quantity = entry.quantity.saturating_add(quantity))
            .or_insert_with(|| CartEntry {
                name: product.name.clone(),
                unit_price: product.unit_price,
                quantity,
            });
    }

    /// Removes one unit; the last unit removes the entry.
    pub fn decrease(&mut self, product_id: ProductId) {
        if let Some(entry) = self.entries.get_mut(&product_id) {
            if entry.quantity <= 1 {
                self.entries.remove(&product_id);
            } else {
                entry.quantity -= 1;
            }
        }
    }

    pub fn delete(&mut self, product_id: ProductId) {
        self.entries.remove(&product_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sum of `unit_price * quantity` over every entry.
    pub fn total(&self) -> Money {
        self.entries.values().map(CartEntry::total).sum()
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.entries.contains_key(&product_id)
    }

    pub fn get(&self, product_id: ProductId) -> Option<&CartEntry> {
        self.entries.get(&product_id)
    }

    /// Quantity of a product in the cart, zero when absent.
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.entries.get(&product_id).map_or(0, |e| e.quantity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &CartEntry)> {
        self.entries.iter()
    }

    pub fn to_order_lines(&self) -> Vec<OrderLine> {
        self.entries
            .iter()
            .map(|(id, entry)| OrderLine {
                product_id: *id,
                name: entry.name.clone(),
                unit_price: entry.unit_price,
                quantity: entry.quantity,
            })
            .collect()
    }

    pub fn invoice_lines(&self) -> Vec<InvoiceLine> {
        self.entries
            .values()
            .map(|entry| InvoiceLine {
                label: format!("{} x{}", entry.name, entry.quantity),
                amount: entry.total(),
            })
            .collect()
    }
}
