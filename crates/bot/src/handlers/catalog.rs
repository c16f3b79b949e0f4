use common::ProductId;
use domain::{NavAction, Navigation};
use session_store::SessionKey;

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::reply::Reply;

impl Dispatcher {
    pub(crate) async fn navigate(&self, key: &SessionKey, action: NavAction) -> Result<Vec<Reply>> {
        let mut cursor = self.sessions.load_cursor(key).await?;

        match self.navigator.navigate(&mut cursor, action).await? {
            Navigation::Page(window) => {
                self.sessions.save_cursor(key, &cursor).await?;
                Ok(vec![Reply::catalog_page(&cursor.stage, window)])
            }
            Navigation::Empty if action == NavAction::Enter => {
                Ok(vec![Reply::text("Nothing here yet")])
            }
            Navigation::Empty => Ok(vec![Reply::toast("Unfortunately there is nothing here yet")]),
        }
    }

    pub(crate) async fn show_product(
        &self,
        key: &SessionKey,
        product_id: ProductId,
    ) -> Result<Vec<Reply>> {
        let cart = self.sessions.load_cart(key).await?;

        Ok(match self.navigator.show_product(product_id, &cart).await? {
            Some(card) => vec![Reply::Product { card }],
            None => vec![Reply::toast("This product is no longer available")],
        })
    }
}
