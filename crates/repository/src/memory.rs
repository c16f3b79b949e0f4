use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, Money, ProductId, PromoId, SubcategoryId, UserId};
use futures_util::stream;

use crate::{
    Category, CatalogRepository, NewUser, OrderLedger, OrderRecord, OrderStatus, Product, Promo,
    PromoRepository, RefundRecord, Registration, RepositoryError, Result, StoredOrder,
    Subcategory, User, UserBatchStream, UserRepository,
};

#[derive(Debug, Default)]
struct CatalogState {
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    products: Vec<(SubcategoryId, Product)>,
    users: BTreeMap<UserId, User>,
    promos: BTreeMap<PromoId, Promo>,
    next_id: i64,
    consume_calls: usize,
    fail_stream_after_batches: Option<usize>,
}

impl CatalogState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory repository.
///
/// Backs tests and database-less runs. Besides the repository traits it
/// exposes seeding helpers and a few knobs for simulating storage failures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a category and returns its id.
    pub fn add_category(&self, name: impl Into<String>) -> CategoryId {
        let mut state = self.write();
        let id = CategoryId::new(state.next_id());
        state.categories.push(Category {
            id,
            name: name.into(),
        });
        id
    }

    /// Adds a subcategory under `category_id` and returns its id.
    pub fn add_subcategory(
        &self,
        category_id: CategoryId,
        name: impl Into<String>,
    ) -> SubcategoryId {
        let mut state = self.write();
        let id = SubcategoryId::new(state.next_id());
        state.subcategories.push(Subcategory {
            id,
            category_id,
            name: name.into(),
        });
        id
    }

    /// Adds a product under `subcategory_id` and returns it.
    pub fn add_product(
        &self,
        subcategory_id: SubcategoryId,
        name: impl Into<String>,
        unit_price: Money,
    ) -> Product {
        let name = name.into();
        let product = Product {
            id: ProductId::new(),
            description: format!("{name} description"),
            image: format!("https://cdn.example/{}.png", name.to_lowercase()),
            name,
            unit_price,
        };
        self.write()
            .products
            .push((subcategory_id, product.clone()));
        product
    }

    /// Changes a product's catalog price.
    pub fn set_product_price(&self, product_id: ProductId, unit_price: Money) {
        let mut state = self.write();
        if let Some((_, product)) = state.products.iter_mut().find(|(_, p)| p.id == product_id) {
            product.unit_price = unit_price;
        }
    }

    /// Removes every product of a subcategory.
    pub fn clear_products(&self, subcategory_id: SubcategoryId) {
        self.write()
            .products
            .retain(|(owner, _)| *owner != subcategory_id);
    }

    /// Stores a promo as-is, replacing any promo with the same id.
    pub fn add_promo(&self, promo: Promo) {
        self.write().promos.insert(promo.id, promo);
    }

    /// Allocates an id for a new promo.
    pub fn next_promo_id(&self) -> PromoId {
        PromoId::new(self.write().next_id())
    }

    pub fn promo(&self, promo_id: PromoId) -> Option<Promo> {
        self.read().promos.get(&promo_id).cloned()
    }

    /// Number of times [`PromoRepository::mark_promo_consumed`] was called.
    pub fn consume_calls(&self) -> usize {
        self.read().consume_calls
    }

    pub fn user_count(&self) -> usize {
        self.read().users.len()
    }

    pub fn user(&self, user_id: UserId) -> Option<User> {
        self.read().users.get(&user_id).cloned()
    }

    /// Makes the next user streams fail after yielding `batches` batches.
    ///
    /// `None` restores normal behaviour.
    pub fn fail_user_stream_after(&self, batches: Option<usize>) {
        self.write().fail_stream_after_batches = batches;
    }
}

fn sorted_by_name<T: Clone>(items: impl Iterator<Item = T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let state = self.read();
        Ok(sorted_by_name(state.categories.iter().cloned(), |c| {
            c.name.as_str()
        }))
    }

    async fn list_subcategories(&self, category_id: CategoryId) -> Result<Vec<Subcategory>> {
        let state = self.read();
        Ok(sorted_by_name(
            state
                .subcategories
                .iter()
                .filter(|s| s.category_id == category_id)
                .cloned(),
            |s| s.name.as_str(),
        ))
    }

    async fn list_products(&self, subcategory_id: SubcategoryId) -> Result<Vec<Product>> {
        let state = self.read();
        Ok(sorted_by_name(
            state
                .products
                .iter()
                .filter(|(owner, _)| *owner == subcategory_id)
                .map(|(_, p)| p.clone()),
            |p| p.name.as_str(),
        ))
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let state = self.read();
        Ok(state
            .products
            .iter()
            .find(|(_, p)| p.id == product_id)
            .map(|(_, p)| p.clone()))
    }
}

struct StreamCursor {
    repo: InMemoryRepository,
    after: Option<UserId>,
    emitted: usize,
    batch_size: usize,
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn register_user(&self, user: NewUser) -> Result<Registration> {
        let mut state = self.write();
        if state.users.contains_key(&user.id) {
            return Ok(Registration::AlreadyExisted);
        }
        state.users.insert(user.id, user.into_user());
        Ok(Registration::Created)
    }

    async fn stream_users(&self, batch_size: usize) -> Result<UserBatchStream> {
        let cursor = StreamCursor {
            repo: self.clone(),
            after: None,
            emitted: 0,
            batch_size: batch_size.max(1),
        };

        let batches = stream::try_unfold(cursor, |mut cursor| async move {
            let batch: Vec<UserId> = {
                let state = cursor.repo.read();
                if state
                    .fail_stream_after_batches
                    .is_some_and(|limit| cursor.emitted >= limit)
                {
                    return Err(RepositoryError::Unavailable(
                        "user stream interrupted".to_string(),
                    ));
                }
                let range = match cursor.after {
                    Some(after) => state.users.range((
                        std::ops::Bound::Excluded(after),
                        std::ops::Bound::Unbounded,
                    )),
                    None => state.users.range(..),
                };
                range.take(cursor.batch_size).map(|(id, _)| *id).collect()
            };

            match batch.last() {
                None => Ok(None),
                Some(last) => {
                    cursor.after = Some(*last);
                    cursor.emitted += 1;
                    Ok(Some((batch, cursor)))
                }
            }
        });

        Ok(Box::pin(batches))
    }
}

#[async_trait]
impl PromoRepository for InMemoryRepository {
    async fn find_eligible_promo(&self, now: DateTime<Utc>) -> Result<Option<Promo>> {
        let state = self.read();
        Ok(state
            .promos
            .values()
            .filter(|p| p.is_eligible(now))
            .min_by_key(|p| (p.start_time, p.id))
            .cloned())
    }

    async fn mark_promo_consumed(&self, promo_id: PromoId, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.write();
        state.consume_calls += 1;
        if let Some(promo) = state.promos.get_mut(&promo_id) {
            promo.active = false;
            promo.last_succeeded_at = Some(now);
        }
        Ok(())
    }
}

/// In-memory order ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    orders: Arc<RwLock<Vec<StoredOrder>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded order, oldest first.
    pub fn orders(&self) -> Vec<StoredOrder> {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl OrderLedger for InMemoryLedger {
    async fn persist_order(&self, record: OrderRecord) -> Result<()> {
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoredOrder {
                record,
                status: OrderStatus::Paid,
                refunded_amount: None,
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn update_order_on_refund(&self, refund: RefundRecord) -> Result<u64> {
        let mut orders = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = 0;
        for order in orders
            .iter_mut()
            .filter(|o| o.record.payment_reference == refund.payment_reference)
        {
            order.status = OrderStatus::Refunded;
            order.refunded_amount = Some(refund.refunded_amount);
            updated += 1;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientIdentity;
    use chrono::Duration;
    use futures_util::TryStreamExt;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn promo(repo: &InMemoryRepository, start_time: DateTime<Utc>) -> PromoId {
        let id = repo.next_promo_id();
        repo.add_promo(Promo {
            id,
            name: format!("promo-{id}"),
            text: "Big sale".into(),
            cover: "cover.png".into(),
            link: "https://shop.example".into(),
            link_label: "Open".into(),
            start_time,
            active: true,
            last_succeeded_at: None,
        });
        id
    }

    fn new_user(id: i64) -> NewUser {
        NewUser {
            id: UserId::new(id),
            first_name: None,
            username: Some(format!("user{id}")),
        }
    }

    #[tokio::test]
    async fn listings_are_ordered_by_name() {
        let repo = InMemoryRepository::new();
        repo.add_category("Tea");
        repo.add_category("Coffee");
        let cocoa = repo.add_category("Cocoa");
        repo.add_subcategory(cocoa, "Dark");
        repo.add_subcategory(cocoa, "Bitter");

        let names: Vec<_> = repo
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Cocoa", "Coffee", "Tea"]);

        let subs: Vec<_> = repo
            .list_subcategories(cocoa)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(subs, ["Bitter", "Dark"]);
    }

    #[tokio::test]
    async fn get_product_missing_is_none() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_product(ProductId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn products_are_scoped_to_subcategory() {
        let repo = InMemoryRepository::new();
        let cat = repo.add_category("Drinks");
        let tea = repo.add_subcategory(cat, "Tea");
        let coffee = repo.add_subcategory(cat, "Coffee");
        let green = repo.add_product(tea, "Green", money("3.00"));
        repo.add_product(coffee, "Espresso", money("2.00"));

        let products = repo.list_products(tea).await.unwrap();
        assert_eq!(products, vec![green.clone()]);
        assert_eq!(repo.get_product(green.id).await.unwrap(), Some(green));
    }

    #[tokio::test]
    async fn duplicate_registration_reports_already_existed() {
        let repo = InMemoryRepository::new();
        assert_eq!(
            repo.register_user(new_user(1)).await.unwrap(),
            Registration::Created
        );
        assert_eq!(
            repo.register_user(new_user(1)).await.unwrap(),
            Registration::AlreadyExisted
        );
        assert_eq!(repo.user_count(), 1);
    }

    #[tokio::test]
    async fn stream_users_yields_bounded_batches_and_restarts() {
        let repo = InMemoryRepository::new();
        for id in 1..=7 {
            repo.register_user(new_user(id)).await.unwrap();
        }

        let batches: Vec<Vec<UserId>> = repo
            .stream_users(3)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, [3, 3, 1]);

        let again: Vec<Vec<UserId>> = repo
            .stream_users(3)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(batches, again);
    }

    #[tokio::test]
    async fn stream_users_on_empty_set_is_empty() {
        let repo = InMemoryRepository::new();
        let batches: Vec<Vec<UserId>> = repo
            .stream_users(50)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn stream_failure_injection_interrupts_pass() {
        let repo = InMemoryRepository::new();
        for id in 1..=4 {
            repo.register_user(new_user(id)).await.unwrap();
        }
        repo.fail_user_stream_after(Some(1));

        let result: Result<Vec<Vec<UserId>>> =
            repo.stream_users(2).await.unwrap().try_collect().await;
        assert!(matches!(result, Err(RepositoryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn eligible_promo_is_earliest_started_active_one() {
        let repo = InMemoryRepository::new();
        let now = Utc::now();
        let later = promo(&repo, now - Duration::minutes(1));
        let earlier = promo(&repo, now - Duration::minutes(10));
        promo(&repo, now + Duration::minutes(10));

        let found = repo.find_eligible_promo(now).await.unwrap().unwrap();
        assert_eq!(found.id, earlier);

        repo.mark_promo_consumed(earlier, now).await.unwrap();
        let found = repo.find_eligible_promo(now).await.unwrap().unwrap();
        assert_eq!(found.id, later);

        let consumed = repo.promo(earlier).unwrap();
        assert!(!consumed.active);
        assert_eq!(consumed.last_succeeded_at, Some(now));
        assert_eq!(repo.consume_calls(), 1);
    }

    #[tokio::test]
    async fn ledger_marks_refunded_orders() {
        let ledger = InMemoryLedger::new();
        let record = OrderRecord {
            client: ClientIdentity {
                user_id: UserId::new(1),
                username: Some("ann".into()),
            },
            lines: vec![],
            payment_reference: "charge-1".into(),
            paid_amount: money("25.00"),
            currency: "RUB".into(),
            fio: "Ann Smith".into(),
            phone: "+100".into(),
            address: "Main st".into(),
        };
        ledger.persist_order(record).await.unwrap();

        let updated = ledger
            .update_order_on_refund(RefundRecord {
                payment_reference: "charge-1".into(),
                refunded_amount: money("25.00"),
                currency: "RUB".into(),
            })
            .await
            .unwrap();

        assert_eq!(updated, 1);
        let orders = ledger.orders();
        assert_eq!(orders[0].status, OrderStatus::Refunded);
        assert_eq!(orders[0].refunded_amount, Some(money("25.00")));
    }

    #[tokio::test]
    async fn ledger_refund_for_unknown_payment_updates_nothing() {
        let ledger = InMemoryLedger::new();
        let updated = ledger
            .update_order_on_refund(RefundRecord {
                payment_reference: "missing".into(),
                refunded_amount: money("1.00"),
                currency: "RUB".into(),
            })
            .await
            .unwrap();
        assert_eq!(updated, 0);
    }
}
