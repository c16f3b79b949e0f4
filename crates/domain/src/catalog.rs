//! Catalog browsing: a paginated walk down categories, subcategories and
//! products.
//!
//! ```text
//! Category ──select──► Subcategory ──select──► Product
//!     ▲                    │  ▲                   │
//!     └──────return────────┘  └──────return───────┘
//! ```
//!
//! Every stage carries a page number. The item count is read from the
//! repository on each render, so windows always reflect the current catalog.

use std::sync::Arc;

use common::{CategoryId, ProductId, SubcategoryId};
use repository::{CatalogRepository, Category, Product, Subcategory};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::error::Result;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Where the user is in the catalog tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Category,
    Subcategory {
        category_id: CategoryId,
    },
    Product {
        category_id: CategoryId,
        subcategory_id: SubcategoryId,
    },
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Category => "category",
            Stage::Subcategory { .. } => "subcategory",
            Stage::Product { .. } => "product",
        }
    }

    /// The category stage is the root and has nothing to return to.
    pub fn can_return(&self) -> bool {
        !matches!(self, Stage::Category)
    }

    pub fn can_select_category(&self) -> bool {
        matches!(self, Stage::Category)
    }

    pub fn can_select_subcategory(&self) -> bool {
        matches!(self, Stage::Subcategory { .. } | Stage::Product { .. })
    }

    fn category_id(&self) -> Option<CategoryId> {
        match self {
            Stage::Category => None,
            Stage::Subcategory { category_id } | Stage::Product { category_id, .. } => {
                Some(*category_id)
            }
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage plus page, as persisted in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationCursor {
    #[serde(flatten)]
    pub stage: Stage,
    pub page: usize,
}

impl PaginationCursor {
    pub fn new(stage: Stage) -> Self {
        Self { stage, page: 0 }
    }

    /// Computes the cursor an action leads to, before the page is checked
    /// against the item count.
    pub fn transition(&self, action: NavAction) -> std::result::Result<Self, NavigationError> {
        let invalid = || NavigationError::InvalidTransition {
            stage: self.stage.as_str(),
            action: action.as_str(),
        };

        Ok(match action {
            NavAction::Enter => Self::new(Stage::Category),
            NavAction::SelectCategory(category_id) => {
                if !self.stage.can_select_category() {
                    return Err(invalid());
                }
                Self::new(Stage::Subcategory { category_id })
            }
            NavAction::SelectSubcategory(subcategory_id) => {
                let category_id = self
                    .stage
                    .category_id()
                    .filter(|_| self.stage.can_select_subcategory())
                    .ok_or_else(invalid)?;
                Self::new(Stage::Product {
                    category_id,
                    subcategory_id,
                })
            }
            NavAction::Return => match self.stage {
                Stage::Category => return Err(invalid()),
                Stage::Subcategory { .. } => Self::new(Stage::Category),
                Stage::Product { category_id, .. } => {
                    Self::new(Stage::Subcategory { category_id })
                }
            },
            NavAction::NextPage => Self {
                stage: self.stage,
                page: self.page.saturating_add(1),
            },
            NavAction::PrevPage => Self {
                stage: self.stage,
                page: self.page.saturating_sub(1),
            },
        })
    }
}

/// A user action on the catalog view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "id", rename_all = "snake_case")]
pub enum NavAction {
    /// Opens the catalog at the first page of categories.
    Enter,
    SelectCategory(CategoryId),
    SelectSubcategory(SubcategoryId),
    Return,
    NextPage,
    PrevPage,
}

impl NavAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavAction::Enter => "enter",
            NavAction::SelectCategory(_) => "select_category",
            NavAction::SelectSubcategory(_) => "select_subcategory",
            NavAction::Return => "return",
            NavAction::NextPage => "next_page",
            NavAction::PrevPage => "prev_page",
        }
    }
}

/// Catalog navigation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("cannot {action} from the {stage} stage")]
    InvalidTransition {
        stage: &'static str,
        action: &'static str,
    },
}

/// A row of a catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEntry {
    Category(Category),
    Subcategory(Subcategory),
    Product(Product),
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Category(c) => &c.name,
            CatalogEntry::Subcategory(s) => &s.name,
            CatalogEntry::Product(p) => &p.name,
        }
    }
}

/// The visible slice of a stage plus the controls it offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWindow<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub has_return: bool,
}

/// Cuts page `page` out of `items`.
///
/// A page past the end is clamped to the last page; the returned window
/// reports the page actually shown.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize, has_return: bool) -> PageWindow<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let last_page = total.saturating_sub(1) / page_size;
    let page = page.min(last_page);
    let start = page * page_size;
    let end = (start + page_size).min(total);

    PageWindow {
        items: items.into_iter().skip(start).take(end - start).collect(),
        page,
        total,
        has_prev: page > 0,
        has_next: end < total,
        has_return,
    }
}

/// Result of a navigation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Navigation {
    Page(PageWindow<CatalogEntry>),
    /// The target stage has no items; the cursor was not moved.
    Empty,
}

/// Product details plus how many of it the user already holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCard {
    pub product: Product,
    pub in_cart: u32,
}

/// Drives a [`PaginationCursor`] against the catalog repository.
///
/// The navigator never persists the cursor; callers save it after a
/// successful step.
pub struct CatalogNavigator<R: ?Sized> {
    repo: Arc<R>,
    page_size: usize,
}

impl<R: ?Sized> Clone for CatalogNavigator<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            page_size: self.page_size,
        }
    }
}

impl<R: CatalogRepository + ?Sized> CatalogNavigator<R> {
    pub fn new(repo: Arc<R>, page_size: usize) -> Self {
        Self {
            repo,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Applies `action` to `cursor` and renders the resulting page.
    ///
    /// On [`Navigation::Empty`] or on error the cursor is left untouched.
    #[tracing::instrument(skip(self, cursor), fields(stage = %cursor.stage, page = cursor.page))]
    pub async fn navigate(
        &self,
        cursor: &mut PaginationCursor,
        action: NavAction,
    ) -> Result<Navigation> {
        let target = cursor.transition(action)?;
        let entries = self.entries(&target.stage).await?;
        if entries.is_empty() {
            tracing::debug!(target_stage = %target.stage, "catalog stage is empty");
            return Ok(Navigation::Empty);
        }

        let window = paginate(
            entries,
            target.page,
            self.page_size,
            target.stage.can_return(),
        );
        *cursor = PaginationCursor {
            stage: target.stage,
            page: window.page,
        };
        Ok(Navigation::Page(window))
    }

    /// Renders the page the cursor points at, clamping a stale page.
    pub async fn render(&self, cursor: &mut PaginationCursor) -> Result<Navigation> {
        let entries = self.entries(&cursor.stage).await?;
        if entries.is_empty() {
            return Ok(Navigation::Empty);
        }
        let window = paginate(
            entries,
            cursor.page,
            self.page_size,
            cursor.stage.can_return(),
        );
        cursor.page = window.page;
        Ok(Navigation::Page(window))
    }

    /// Looks a product up; `None` when it no longer exists.
    pub async fn show_product(
        &self,
        product_id: ProductId,
        cart: &Cart,
    ) -> Result<Option<ProductCard>> {
        let product = self.repo.get_product(product_id).await?;
        Ok(product.map(|product| ProductCard {
            in_cart: cart.quantity_of(product.id),
            product,
        }))
    }

    async fn entries(&self, stage: &Stage) -> Result<Vec<CatalogEntry>> {
        Ok(match *stage {
            Stage::Category => self
                .repo
                .list_categories()
                .await?
                .into_iter()
                .map(CatalogEntry::Category)
                .collect(),
            Stage::Subcategory { category_id } => self
                .repo
                .list_subcategories(category_id)
                .await?
                .into_iter()
                .map(CatalogEntry::Subcategory)
                .collect(),
            Stage::Product { subcategory_id, .. } => self
                .repo
                .list_products(subcategory_id)
                .await?
                .into_iter()
                .map(CatalogEntry::Product)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;
    use common::Money;
    use proptest::prelude::*;
    use repository::InMemoryRepository;

    fn window_names(nav: &Navigation) -> Vec<String> {
        match nav {
            Navigation::Page(w) => w.items.iter().map(|e| e.name().to_string()).collect(),
            Navigation::Empty => Vec::new(),
        }
    }

    fn window(nav: Navigation) -> PageWindow<CatalogEntry> {
        match nav {
            Navigation::Page(w) => w,
            Navigation::Empty => panic!("expected a page"),
        }
    }

    /// One category with one subcategory holding `n` products named p00..
    fn seeded(n: usize) -> (Arc<InMemoryRepository>, CategoryId, SubcategoryId) {
        let repo = InMemoryRepository::new();
        let cat = repo.add_category("Drinks");
        let sub = repo.add_subcategory(cat, "Tea");
        for i in 0..n {
            repo.add_product(sub, format!("p{i:02}"), Money::from_minor_units(100));
        }
        (Arc::new(repo), cat, sub)
    }

    #[test]
    fn cursor_serializes_flat() {
        let cursor = PaginationCursor {
            stage: Stage::Product {
                category_id: CategoryId::new(1),
                subcategory_id: SubcategoryId::new(2),
            },
            page: 3,
        };
        let json = serde_json::to_value(cursor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"stage": "product", "category_id": 1, "subcategory_id": 2, "page": 3})
        );
        let back: PaginationCursor = serde_json::from_value(json).unwrap();
        assert_eq!(back, cursor);
    }

    #[test]
    fn return_from_category_is_invalid() {
        let err = PaginationCursor::default()
            .transition(NavAction::Return)
            .unwrap_err();
        assert_eq!(
            err,
            NavigationError::InvalidTransition {
                stage: "category",
                action: "return"
            }
        );
    }

    #[test]
    fn select_subcategory_requires_a_category() {
        assert!(
            PaginationCursor::default()
                .transition(NavAction::SelectSubcategory(SubcategoryId::new(1)))
                .is_err()
        );
    }

    #[test]
    fn return_from_product_keeps_category() {
        let cursor = PaginationCursor {
            stage: Stage::Product {
                category_id: CategoryId::new(4),
                subcategory_id: SubcategoryId::new(5),
            },
            page: 2,
        };
        let back = cursor.transition(NavAction::Return).unwrap();
        assert_eq!(
            back,
            PaginationCursor::new(Stage::Subcategory {
                category_id: CategoryId::new(4)
            })
        );
    }

    #[test]
    fn paginate_clamps_stale_page() {
        let w = paginate((0..8).collect::<Vec<_>>(), 5, 6, false);
        assert_eq!(w.page, 1);
        assert_eq!(w.items, vec![6, 7]);
        assert!(w.has_prev);
        assert!(!w.has_next);
    }

    #[tokio::test]
    async fn fourteen_products_page_through_three_windows() {
        let (repo, cat, sub) = seeded(14);
        let nav = CatalogNavigator::new(repo, 6);
        let mut cursor = PaginationCursor::default();

        nav.navigate(&mut cursor, NavAction::Enter).await.unwrap();
        nav.navigate(&mut cursor, NavAction::SelectCategory(cat))
            .await
            .unwrap();
        let first = window(
            nav.navigate(&mut cursor, NavAction::SelectSubcategory(sub))
                .await
                .unwrap(),
        );
        assert_eq!(first.items.len(), 6);
        assert!(!first.has_prev && first.has_next && first.has_return);

        let second = window(nav.navigate(&mut cursor, NavAction::NextPage).await.unwrap());
        assert_eq!(second.page, 1);
        assert!(second.has_prev && second.has_next);

        let third = nav.navigate(&mut cursor, NavAction::NextPage).await.unwrap();
        assert_eq!(window_names(&third), ["p12", "p13"]);
        let third = window(third);
        assert!(third.has_prev && !third.has_next);

        let still_third = window(nav.navigate(&mut cursor, NavAction::NextPage).await.unwrap());
        assert_eq!(still_third.page, 2);
        assert_eq!(cursor.page, 2);

        let back = window(nav.navigate(&mut cursor, NavAction::Return).await.unwrap());
        assert_eq!(back.page, 0);
        assert_eq!(cursor.stage, Stage::Subcategory { category_id: cat });
    }

    #[tokio::test]
    async fn prev_page_at_zero_is_noop() {
        let (repo, _, _) = seeded(0);
        let nav = CatalogNavigator::new(repo, 6);
        let mut cursor = PaginationCursor::default();
        let w = window(nav.navigate(&mut cursor, NavAction::PrevPage).await.unwrap());
        assert_eq!(w.page, 0);
        assert!(!w.has_prev);
    }

    #[tokio::test]
    async fn empty_stage_does_not_advance() {
        let (repo, cat, sub) = seeded(0);
        let nav = CatalogNavigator::new(repo, 6);
        let mut cursor = PaginationCursor::new(Stage::Subcategory { category_id: cat });

        let outcome = nav
            .navigate(&mut cursor, NavAction::SelectSubcategory(sub))
            .await
            .unwrap();

        assert_eq!(outcome, Navigation::Empty);
        assert_eq!(cursor, PaginationCursor::new(Stage::Subcategory { category_id: cat }));
    }

    #[tokio::test]
    async fn invalid_transition_surfaces_as_domain_error() {
        let (repo, _, _) = seeded(1);
        let nav = CatalogNavigator::new(repo, 6);
        let mut cursor = PaginationCursor::default();
        let err = nav
            .navigate(&mut cursor, NavAction::Return)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Navigation(_)));
        assert_eq!(cursor, PaginationCursor::default());
    }

    #[tokio::test]
    async fn render_clamps_after_catalog_shrinks() {
        let (repo, cat, sub) = seeded(14);
        let nav = CatalogNavigator::new(Arc::clone(&repo), 6);
        let mut cursor = PaginationCursor {
            stage: Stage::Product {
                category_id: cat,
                subcategory_id: sub,
            },
            page: 2,
        };

        repo.clear_products(sub);
        repo.add_product(sub, "only", Money::from_minor_units(100));

        let w = window(nav.render(&mut cursor).await.unwrap());
        assert_eq!(w.page, 0);
        assert_eq!(cursor.page, 0);
    }

    #[tokio::test]
    async fn show_product_reports_cart_quantity() {
        let (repo, _, _) = seeded(0);
        let cat = repo.add_category("Food");
        let sub = repo.add_subcategory(cat, "Bread");
        let loaf = repo.add_product(sub, "Loaf", Money::from_minor_units(250));
        let nav = CatalogNavigator::new(repo, 6);

        let mut cart = Cart::new();
        cart.add(&loaf, 2);

        let card = nav.show_product(loaf.id, &cart).await.unwrap().unwrap();
        assert_eq!(card.in_cart, 2);
        assert!(nav.show_product(ProductId::new(), &cart).await.unwrap().is_none());
    }

    proptest! {
        #[test]
        fn window_controls_match_bounds(total in 0usize..200, page in 0usize..50, size in 1usize..12) {
            let w = paginate((0..total).collect::<Vec<_>>(), page, size, true);
            let end = w.page * size + w.items.len();
            prop_assert_eq!(w.has_next, (w.page + 1) * size < total);
            prop_assert_eq!(w.has_prev, w.page > 0);
            prop_assert!(w.items.len() <= size);
            prop_assert_eq!(w.has_next, end < total);
            if total > 0 {
                prop_assert!(!w.items.is_empty());
            }
        }

        #[test]
        fn child_navigation_resets_page(page in 0usize..100, id in 1i64..1000) {
            let cursor = PaginationCursor { stage: Stage::Category, page };
            let next = cursor.transition(NavAction::SelectCategory(CategoryId::new(id))).unwrap();
            prop_assert_eq!(next.page, 0);
            let deeper = next.transition(NavAction::SelectSubcategory(SubcategoryId::new(id))).unwrap();
            prop_assert_eq!(deeper.page, 0);
        }
    }
}
