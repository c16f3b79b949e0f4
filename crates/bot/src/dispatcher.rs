//! Routes inbound events to their handlers under a per-user lock.

use std::sync::Arc;

use domain::{CatalogNavigator, NavAction, SessionRepository};
use repository::{OrderLedger, Repository};
use session_store::{Namespace, SessionKey, SessionStore, UserLocks};

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::events::{Command, InboundEvent};
use crate::faq::FaqBook;
use crate::reply::Reply;

/// Reply sent when a button no longer matches the conversation state.
pub const STALE_ACTION: &str = "This action is no longer available";

/// Dispatcher settings taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub namespace: Namespace,
    pub page_size: usize,
    pub currency: String,
    pub clear_cart_on_payment: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DispatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            namespace: Namespace::new(config.session_namespace.clone()),
            page_size: config.catalog_page_size,
            currency: config.currency.clone(),
            clear_cart_on_payment: config.clear_cart_on_payment,
        }
    }
}

/// Turns inbound events into replies.
///
/// Every event for a user runs under that user's lock, so the load, mutate
/// and save of their session never interleaves with another event of theirs.
pub struct Dispatcher {
    pub(crate) repo: Arc<dyn Repository>,
    pub(crate) ledger: Arc<dyn OrderLedger>,
    pub(crate) sessions: SessionRepository<dyn SessionStore>,
    pub(crate) navigator: CatalogNavigator<dyn Repository>,
    pub(crate) locks: UserLocks,
    pub(crate) faq: FaqBook,
    pub(crate) settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        repo: Arc<dyn Repository>,
        ledger: Arc<dyn OrderLedger>,
        store: Arc<dyn SessionStore>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            navigator: CatalogNavigator::new(Arc::clone(&repo), settings.page_size),
            sessions: SessionRepository::new(store),
            repo,
            ledger,
            locks: UserLocks::new(),
            faq: FaqBook::default(),
            settings,
        }
    }

    pub fn with_faq(mut self, faq: FaqBook) -> Self {
        self.faq = faq;
        self
    }

    pub fn locks(&self) -> &UserLocks {
        &self.locks
    }

    /// Handles one event and returns the replies for the user.
    #[tracing::instrument(skip(self, event), fields(user_id = %event.user.id, command = event.command.name()))]
    pub async fn dispatch(&self, event: InboundEvent) -> Result<Vec<Reply>> {
        metrics::counter!("bot_events_total", "command" => event.command.name()).increment(1);

        let InboundEvent { user, command } = event;
        let command = match command {
            Command::Text { text } => {
                Command::from_menu_text(&text).unwrap_or(Command::Text { text })
            }
            other => other,
        };

        let key = SessionKey::new(self.settings.namespace.clone(), user.id);
        let _guard = self.locks.acquire(&key).await;

        let result = match command {
            Command::Start => self.start(&user).await,
            Command::OpenCatalog => self.navigate(&key, NavAction::Enter).await,
            Command::SelectCategory { category_id } => {
                self.navigate(&key, NavAction::SelectCategory(category_id))
                    .await
            }
            Command::SelectSubcategory { subcategory_id } => {
                self.navigate(&key, NavAction::SelectSubcategory(subcategory_id))
                    .await
            }
            Command::Return => self.navigate(&key, NavAction::Return).await,
            Command::NextPage => self.navigate(&key, NavAction::NextPage).await,
            Command::PrevPage => self.navigate(&key, NavAction::PrevPage).await,
            Command::ShowProduct { product_id } => self.show_product(&key, product_id).await,
            Command::AddToCart {
                product_id,
                quantity,
            } => self.add_to_cart(&key, product_id, quantity).await,
            Command::DecreaseInCart { product_id } => {
                self.decrease_in_cart(&key, product_id).await
            }
            Command::RemoveFromCart { product_id } => {
                self.remove_from_cart(&key, product_id).await
            }
            Command::ShowCart => self.show_cart(&key).await,
            Command::BeginCheckout => self.begin_checkout(&key).await,
            Command::CancelCheckout => self.cancel_checkout(&key).await,
            Command::Text { text } => self.text_input(&key, text).await,
            Command::PaymentSucceeded {
                payment_reference,
                total_amount,
                currency,
            } => {
                self.payment_succeeded(&key, &user, payment_reference, total_amount, currency)
                    .await
            }
            Command::PaymentRefunded {
                payment_reference,
                total_amount,
                currency,
            } => {
                self.payment_refunded(payment_reference, total_amount, currency)
                    .await
            }
            Command::Faq => Ok(vec![Reply::text(self.faq.instructions())]),
            Command::FaqQuery { query } => Ok(vec![Reply::FaqResults {
                entries: self.faq.search(&query),
            }]),
        };

        match result {
            Err(BotError::Domain(err)) if err.is_rejected_action() => {
                tracing::warn!(error = %err, "rejected out-of-date action");
                Ok(vec![Reply::toast(STALE_ACTION)])
            }
            other => other,
        }
    }
}
