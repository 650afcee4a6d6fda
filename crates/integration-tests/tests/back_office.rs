//! Admin hero slide management against the mock backend.

#![allow(clippy::unwrap_used)]

use duodude_core::{SlideDraft, SlideId};
use duodude_integration_tests::{ADMIN_TOKEN, MockBackend, SHOPPER_TOKEN};
use duodude_storefront::StorefrontError;
use duodude_storefront::api::SlideClient;
use duodude_storefront::auth::AuthToken;

fn draft(title: &str, order: u32) -> SlideDraft {
    SlideDraft {
        title: title.to_string(),
        subtitle: "New season".to_string(),
        image: format!("https://cdn.duodude.in/{order}.jpg"),
        order,
        ..SlideDraft::default()
    }
}

#[tokio::test]
async fn test_slide_lifecycle() {
    let backend = MockBackend::start().await;
    let slides = SlideClient::new(backend.api());
    let token = AuthToken::new(ADMIN_TOKEN);

    let linen = slides.create_slide(&token, &draft("Linen", 1)).await.unwrap();
    let denim = slides.create_slide(&token, &draft("Denim", 0)).await.unwrap();
    assert!(linen.is_active);
    assert_eq!(linen.button_text.as_deref(), Some("Shop Now"));

    // Listed in display order
    let all = slides.all_slides(&token).await.unwrap();
    assert_eq!(all, vec![denim.clone(), linen.clone()]);

    let moved = slides.move_slide(&token, &linen.id, 0).await.unwrap();
    assert_eq!(moved.order, 0);
    assert_eq!(moved.title, "Linen");

    let mut edited = SlideDraft::from(&denim);
    edited.title = "Raw Denim".to_string();
    edited.order = 1;
    let denim = slides.update_slide(&token, &denim.id, &edited).await.unwrap();
    assert_eq!(denim.title, "Raw Denim");

    let hidden = slides.toggle_slide(&token, &linen.id).await.unwrap();
    assert!(!hidden.is_active);

    slides.delete_slide(&token, &denim.id).await.unwrap();
    assert_eq!(backend.slides(), vec![hidden]);

    let err = slides.delete_slide(&token, &denim.id).await.unwrap_err();
    assert!(matches!(err, StorefrontError::NotFound(_)));
}

#[tokio::test]
async fn test_shoppers_cannot_manage_slides() {
    let backend = MockBackend::start().await;
    let slides = SlideClient::new(backend.api());
    let token = AuthToken::new(SHOPPER_TOKEN);

    let err = slides.all_slides(&token).await.unwrap_err();
    assert!(err.is_authorization());
    let err = slides
        .create_slide(&token, &draft("Linen", 0))
        .await
        .unwrap_err();
    assert!(err.is_authorization());
    let err = slides
        .toggle_slide(&token, &SlideId::new("s1"))
        .await
        .unwrap_err();
    assert!(err.is_authorization());
    assert!(backend.slides().is_empty());
}
