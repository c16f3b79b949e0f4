//! End-to-end shopping flows over the in-memory stores.

use std::sync::Arc;

use common::{Money, UserId};
use domain::{
    Cart, CatalogNavigator, CheckoutStep, InputOutcome, NavAction, Navigation, SessionRepository,
    Stage, SuccessfulPayment,
};
use repository::{ClientIdentity, InMemoryRepository, OrderLedger, InMemoryLedger, OrderStatus};
use session_store::{InMemorySessionStore, SessionKey, UserLocks};

fn money(s: &str) -> Money {
    s.parse().unwrap()
}

struct Shop {
    catalog: Arc<InMemoryRepository>,
    navigator: CatalogNavigator<InMemoryRepository>,
    sessions: SessionRepository<InMemorySessionStore>,
}

fn shop() -> Shop {
    let catalog = Arc::new(InMemoryRepository::new());
    Shop {
        navigator: CatalogNavigator::new(Arc::clone(&catalog), 6),
        sessions: SessionRepository::new(Arc::new(InMemorySessionStore::new())),
        catalog,
    }
}

mod browse_and_buy {
    use super::*;

    #[tokio::test]
    async fn browse_add_checkout_and_pay() {
        let shop = shop();
        let drinks = shop.catalog.add_category("Drinks");
        let tea = shop.catalog.add_subcategory(drinks, "Tea");
        let green = shop.catalog.add_product(tea, "Green", money("12.50"));
        let key = SessionKey::chat(UserId::new(42));

        // Browse down to the product list, persisting the cursor each step.
        let mut session = shop.sessions.load(&key).await.unwrap();
        for action in [
            NavAction::Enter,
            NavAction::SelectCategory(drinks),
            NavAction::SelectSubcategory(tea),
        ] {
            let outcome = shop
                .navigator
                .navigate(&mut session.cursor, action)
                .await
                .unwrap();
            assert!(matches!(outcome, Navigation::Page(_)));
            shop.sessions.save_cursor(&key, &session.cursor).await.unwrap();
        }
        assert_eq!(
            shop.sessions.load_cursor(&key).await.unwrap().stage,
            Stage::Product {
                category_id: drinks,
                subcategory_id: tea
            }
        );

        // Add two units.
        let card = shop
            .navigator
            .show_product(green.id, &session.cart)
            .await
            .unwrap()
            .unwrap();
        session.cart.add(&card.product, 2);
        shop.sessions.save_cart(&key, &session.cart).await.unwrap();

        // Checkout.
        let mut session = shop.sessions.load(&key).await.unwrap();
        session.checkout.begin(&session.cart).unwrap();
        for text in ["Ann Smith", "+100"] {
            session
                .checkout
                .accept_input(text, &session.cart, "RUB")
                .unwrap();
        }
        let outcome = session
            .checkout
            .accept_input("Main st 1", &session.cart, "RUB")
            .unwrap();
        let InputOutcome::Payment(request) = outcome else {
            panic!("expected a payment request");
        };
        assert_eq!(request.total, money("25.00"));
        shop.sessions
            .save_checkout(&key, &session.checkout)
            .await
            .unwrap();

        // Payment confirmation arrives in a later event.
        let mut session = shop.sessions.load(&key).await.unwrap();
        assert_eq!(session.checkout.step, Some(CheckoutStep::AwaitingPayment));
        let record = session
            .checkout
            .payment_succeeded(
                ClientIdentity {
                    user_id: UserId::new(42),
                    username: Some("ann".into()),
                },
                SuccessfulPayment {
                    payment_reference: "charge-1".into(),
                    total: money("25.00"),
                    currency: "RUB".into(),
                },
                &session.cart,
            )
            .record;
        session.cart.clear();
        shop.sessions
            .save_cart_and_checkout(&key, &session.cart, &session.checkout)
            .await
            .unwrap();

        let ledger = InMemoryLedger::new();
        ledger.persist_order(record).await.unwrap();
        assert_eq!(ledger.orders()[0].status, OrderStatus::Paid);

        let session = shop.sessions.load(&key).await.unwrap();
        assert!(session.cart.is_empty());
        assert!(session.checkout.is_idle());
        // Browsing position survives checkout.
        assert_eq!(session.cursor.page, 0);
        assert!(matches!(session.cursor.stage, Stage::Product { .. }));
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_for_one_user_are_not_lost() {
        let shop = Arc::new(shop());
        let cat = shop.catalog.add_category("Food");
        let sub = shop.catalog.add_subcategory(cat, "Bread");
        let loaf = shop.catalog.add_product(sub, "Loaf", money("1.00"));
        let locks = UserLocks::new();
        let key = SessionKey::chat(UserId::new(7));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let shop = Arc::clone(&shop);
            let locks = locks.clone();
            let key = key.clone();
            let loaf = loaf.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&key).await;
                let mut cart: Cart = shop.sessions.load_cart(&key).await.unwrap();
                tokio::task::yield_now().await;
                cart.add(&loaf, 1);
                shop.sessions.save_cart(&key, &cart).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let cart = shop.sessions.load_cart(&key).await.unwrap();
        assert_eq!(cart.quantity_of(loaf.id), 20);
        assert_eq!(cart.total(), money("20.00"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn different_users_do_not_share_state() {
        let shop = Arc::new(shop());
        let cat = shop.catalog.add_category("Food");
        let sub = shop.catalog.add_subcategory(cat, "Bread");
        let loaf = shop.catalog.add_product(sub, "Loaf", money("1.00"));

        let mut handles = Vec::new();
        for user in 1..=10 {
            let shop = Arc::clone(&shop);
            let loaf = loaf.clone();
            handles.push(tokio::spawn(async move {
                let key = SessionKey::chat(UserId::new(user));
                let mut cart = shop.sessions.load_cart(&key).await.unwrap();
                cart.add(&loaf, user as u32);
                shop.sessions.save_cart(&key, &cart).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for user in 1..=10 {
            let cart = shop
                .sessions
                .load_cart(&SessionKey::chat(UserId::new(user)))
                .await
                .unwrap();
            assert_eq!(cart.quantity_of(loaf.id), user as u32);
        }
    }
}
