//! Inbound events delivered by the chat transport.

use common::{CategoryId, ProductId, SubcategoryId, UserId};
use serde::{Deserialize, Serialize};

/// The user an event came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

fn one() -> u32 {
    1
}

/// Everything a user can do, already decoded from buttons and messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Start,
    OpenCatalog,
    SelectCategory {
        category_id: CategoryId,
    },
    SelectSubcategory {
        subcategory_id: SubcategoryId,
    },
    Return,
    NextPage,
    PrevPage,
    ShowProduct {
        product_id: ProductId,
    },
    AddToCart {
        product_id: ProductId,
        #[serde(default = "one")]
        quantity: u32,
    },
    DecreaseInCart {
        product_id: ProductId,
    },
    RemoveFromCart {
        product_id: ProductId,
    },
    ShowCart,
    BeginCheckout,
    CancelCheckout,
    /// Free text typed by the user.
    Text {
        text: String,
    },
    /// Amounts are in minor currency units, as payment providers report them.
    PaymentSucceeded {
        payment_reference: String,
        total_amount: i64,
        currency: String,
    },
    PaymentRefunded {
        payment_reference: String,
        total_amount: i64,
        currency: String,
    },
    Faq,
    FaqQuery {
        #[serde(default)]
        query: String,
    },
}

impl Command {
    /// Stable name used as a metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::OpenCatalog => "open_catalog",
            Command::SelectCategory { .. } => "select_category",
            Command::SelectSubcategory { .. } => "select_subcategory",
            Command::Return => "return",
            Command::NextPage => "next_page",
            Command::PrevPage => "prev_page",
            Command::ShowProduct { .. } => "show_product",
            Command::AddToCart { .. } => "add_to_cart",
            Command::DecreaseInCart { .. } => "decrease_in_cart",
            Command::RemoveFromCart { .. } => "remove_from_cart",
            Command::ShowCart => "show_cart",
            Command::BeginCheckout => "begin_checkout",
            Command::CancelCheckout => "cancel_checkout",
            Command::Text { .. } => "text",
            Command::PaymentSucceeded { .. } => "payment_succeeded",
            Command::PaymentRefunded { .. } => "payment_refunded",
            Command::Faq => "faq",
            Command::FaqQuery { .. } => "faq_query",
        }
    }

    /// Maps main-menu button captions to their commands.
    pub fn from_menu_text(text: &str) -> Option<Command> {
        match text.trim().to_lowercase().as_str() {
            "catalog" => Some(Command::OpenCatalog),
            "cart" => Some(Command::ShowCart),
            "faq" => Some(Command::Faq),
            _ => None,
        }
    }
}

/// One event posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub user: ChatUser,
    pub command: Command,
}
