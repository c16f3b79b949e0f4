use common::ProductId;
use repository::CatalogRepository;
use session_store::SessionKey;

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::reply::Reply;

pub(crate) const EMPTY_CART: &str = "Your cart is empty. Open the catalog to pick products";

impl Dispatcher {
    pub(crate) async fn add_to_cart(
        &self,
        key: &SessionKey,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<Reply>> {
        let Some(product) = self.repo.get_product(product_id).await? else {
            return Ok(vec![Reply::toast("This product is no longer available")]);
        };

        let mut cart = self.sessions.load_cart(key).await?;
        cart.add(&product, quantity);
        self.sessions.save_cart(key, &cart).await?;

        let card = domain::ProductCard {
            in_cart: cart.quantity_of(product.id),
            product,
        };
        Ok(vec![Reply::toast("Added to cart"), Reply::Product { card }])
    }

    pub(crate) async fn decrease_in_cart(
        &self,
        key: &SessionKey,
        product_id: ProductId,
    ) -> Result<Vec<Reply>> {
        let mut cart = self.sessions.load_cart(key).await?;
        cart.decrease(product_id);
        self.sessions.save_cart(key, &cart).await?;

        let mut replies = vec![Reply::toast("Quantity decreased")];
        if let Some(card) = self.navigator.show_product(product_id, &cart).await? {
            replies.push(Reply::Product { card });
        }
        Ok(replies)
    }

    pub(crate) async fn remove_from_cart(
        &self,
        key: &SessionKey,
        product_id: ProductId,
    ) -> Result<Vec<Reply>> {
        let mut cart = self.sessions.load_cart(key).await?;
        cart.delete(product_id);
        self.sessions.save_cart(key, &cart).await?;

        let view = if cart.is_empty() {
            Reply::text(EMPTY_CART)
        } else {
            Reply::cart(&cart)
        };
        Ok(vec![Reply::toast("Removed from cart"), view])
    }

    pub(crate) async fn show_cart(&self, key: &SessionKey) -> Result<Vec<Reply>> {
        let cart = self.sessions.load_cart(key).await?;
        if cart.is_empty() {
            return Ok(vec![Reply::text(EMPTY_CART)]);
        }
        Ok(vec![Reply::cart(&cart)])
    }
}
