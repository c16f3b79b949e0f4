//! Outbound replies. Rendering them into chat messages is the transport's job.

use common::{Money, ProductId};
use domain::{Cart, CatalogEntry, PageWindow, PaymentRequest, ProductCard, Stage};
use serde::Serialize;

use crate::faq::FaqEntry;

/// Main-menu buttons shown after `/start`.
pub const MAIN_MENU: [&str; 3] = ["Catalog", "Cart", "FAQ"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// A plain message.
    Text { text: String },
    /// A message with persistent menu buttons.
    Menu { text: String, buttons: Vec<String> },
    /// A short notice acknowledging a button press.
    Toast { text: String },
    CatalogPage {
        title: String,
        #[serde(flatten)]
        window: PageWindow<CatalogEntry>,
    },
    Product {
        #[serde(flatten)]
        card: ProductCard,
    },
    Cart { lines: Vec<CartLine>, total: Money },
    Invoice {
        #[serde(flatten)]
        request: PaymentRequest,
    },
    FaqResults { entries: Vec<FaqEntry> },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into() }
    }

    pub fn toast(text: impl Into<String>) -> Self {
        Reply::Toast { text: text.into() }
    }

    pub fn main_menu(text: impl Into<String>) -> Self {
        Reply::Menu {
            text: text.into(),
            buttons: MAIN_MENU.iter().map(|b| b.to_string()).collect(),
        }
    }

    pub fn catalog_page(stage: &Stage, window: PageWindow<CatalogEntry>) -> Self {
        let title = match stage {
            Stage::Category => "Choose a category:",
            Stage::Subcategory { .. } => "Choose a subcategory:",
            Stage::Product { .. } => "Choose a product:",
        };
        Reply::CatalogPage {
            title: title.to_string(),
            window,
        }
    }

    pub fn cart(cart: &Cart) -> Self {
        Reply::Cart {
            lines: cart
                .iter()
                .map(|(id, entry)| CartLine {
                    product_id: *id,
                    name: entry.name.clone(),
                    unit_price: entry.unit_price,
                    quantity: entry.quantity,
                    total: entry.total(),
                })
                .collect(),
            total: cart.total(),
        }
    }
}

/// The body returned by `POST /events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventResponse {
    pub replies: Vec<Reply>,
}
