//! Integration tests for the login hand-off and logout.

#![allow(clippy::unwrap_used)]

use wearables_core::{CartId, Price, ProductId, ProductSummary, UserId};
use wearables_integration_tests::{FakeBackend, line, user};
use wearables_storefront::CartError;
use wearables_storefront::cart::{CartIdentity, MergeOutcome, MergeStatus};
use wearables_storefront::guest::GUEST_CART_KEY;

fn band() -> ProductSummary {
    ProductSummary {
        id: ProductId::new(7),
        name: "Pulse Band".to_string(),
        price: Price::from_units(100),
        image: String::new(),
    }
}

fn guest_file(dir: &std::path::Path) -> std::path::PathBuf {
    dir.join(format!("{GUEST_CART_KEY}.json"))
}

#[tokio::test]
async fn test_merge_sums_overlapping_quantities() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(
        UserId::new(1),
        CartId::new(10),
        vec![line(7, "Pulse Band", 100, 3)],
    );
    backend.sign_in(user(1));
    let (storefront, dir) = backend.storefront();
    storefront.actions().add(&band(), 2).await.unwrap();
    assert!(guest_file(dir.path()).exists());

    let resolved = storefront.session().resolve_current_user().await.unwrap();

    assert_eq!(resolved.unwrap().id, UserId::new(1));
    let items = storefront.cart().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().unwrap().quantity.get(), 5);
    assert_eq!(
        storefront.cart().identity(),
        CartIdentity::Synced(CartId::new(10))
    );
    assert!(!guest_file(dir.path()).exists());
    assert!(
        backend
            .requests()
            .contains(&"POST /cart/merge?userId=1 (1 lines)".to_string())
    );
}

#[tokio::test]
async fn test_empty_guest_cart_fetches_server_cart() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(
        UserId::new(1),
        CartId::new(10),
        vec![line(8, "Loop Strap", 50, 2)],
    );
    let (storefront, dir) = backend.storefront();

    let outcome = storefront
        .session()
        .login_resolved(user(1).into())
        .await
        .unwrap();

    assert_eq!(outcome, MergeOutcome::Fetched);
    assert_eq!(storefront.cart().total_items(), 2);
    assert_eq!(storefront.cart().cart_id(), Some(CartId::new(10)));
    assert!(!guest_file(dir.path()).exists());
    assert!(
        !backend
            .requests()
            .iter()
            .any(|request| request.starts_with("POST /cart/merge"))
    );
}

#[tokio::test]
async fn test_new_user_gets_a_cart() {
    let backend = FakeBackend::start().await;
    let (storefront, _dir) = backend.storefront();
    storefront.actions().add(&band(), 1).await.unwrap();

    storefront
        .session()
        .login_resolved(user(2).into())
        .await
        .unwrap();

    assert!(storefront.cart().cart_id().is_some());
    assert_eq!(
        backend.server_cart(UserId::new(2)).unwrap().items.len(),
        1
    );
}

#[tokio::test]
async fn test_no_session_stays_guest() {
    let backend = FakeBackend::start().await;
    let (storefront, dir) = backend.storefront();
    storefront.actions().add(&band(), 1).await.unwrap();

    assert!(
        storefront
            .session()
            .resolve_current_user()
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(storefront.cart().identity(), CartIdentity::Guest);
    assert!(guest_file(dir.path()).exists());
}

#[tokio::test]
async fn test_merge_failure_keeps_guest_cart() {
    let backend = FakeBackend::start().await;
    let (storefront, dir) = backend.storefront();
    storefront.actions().add(&band(), 2).await.unwrap();

    backend.fail_with(503);
    let err = storefront
        .session()
        .login_resolved(user(1).into())
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::MergeFailed(_)));
    assert!(matches!(
        storefront.merge().status(),
        MergeStatus::Failed { .. }
    ));
    assert_eq!(storefront.cart().identity(), CartIdentity::Guest);
    assert_eq!(storefront.cart().total_items(), 2);
    assert!(guest_file(dir.path()).exists());

    backend.recover();
    storefront
        .session()
        .login_resolved(user(1).into())
        .await
        .unwrap();
    assert_eq!(
        storefront.merge().status(),
        MergeStatus::Completed(UserId::new(1))
    );
}

#[tokio::test]
async fn test_logout_resets_to_empty_guest() {
    let backend = FakeBackend::start().await;
    backend.sign_in(user(1));
    let (storefront, dir) = backend.storefront();
    storefront.actions().add(&band(), 2).await.unwrap();
    storefront.session().resolve_current_user().await.unwrap();

    storefront.session().logout().await;

    assert_eq!(storefront.session().current_user(), None);
    assert_eq!(storefront.cart().identity(), CartIdentity::Guest);
    assert!(storefront.cart().items().is_empty());
    assert_eq!(storefront.merge().status(), MergeStatus::Idle);
    assert!(!guest_file(dir.path()).exists());
    assert!(backend.requests().contains(&"POST /auth/logout".to_string()));

    // The server cart is untouched and comes back on the next login.
    storefront
        .session()
        .login_resolved(user(1).into())
        .await
        .unwrap();
    assert_eq!(storefront.cart().total_items(), 2);
}
