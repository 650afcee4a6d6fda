//! Back-office hero slide client. Every call requires the admin role.
//!
//! # Endpoints
//!
//! - `GET /api/hero-slides/admin/all` - every slide, active or not
//! - `POST /api/hero-slides/admin` - create a slide
//! - `PUT /api/hero-slides/admin/{id}` - edit a slide (or just its `order`)
//! - `PATCH /api/hero-slides/admin/{id}/toggle` - flip `isActive`
//! - `DELETE /api/hero-slides/admin/{id}` - delete a slide

use duodude_core::{HeroSlide, SlideDraft, SlideId};
use reqwest::Method;
use tracing::{info, instrument};
use url::Url;

use super::ApiClient;
use crate::auth::AuthToken;
use crate::error::{self, Result, StorefrontError};

const ADMIN_SLIDES_PATH: &str = "api/hero-slides/admin";

#[derive(Debug, Clone)]
pub struct SlideClient {
    api: ApiClient,
}

impl SlideClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every slide, sorted by display order.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Unauthorized` for non-admin credentials.
    #[instrument(skip(self, token))]
    pub async fn all_slides(&self, token: &AuthToken) -> Result<Vec<HeroSlide>> {
        let mut slides: Vec<HeroSlide> = self
            .api
            .get(self.slide_url(&["all"])?, Some(token))
            .await?;
        slides.sort_by_key(|slide| slide.order);
        Ok(slides)
    }

    /// Create a slide from a filled-in draft.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::BadRequest` for a draft without title or
    /// image, or with an opacity outside `0..=1`.
    #[instrument(skip_all, fields(title = %draft.title))]
    pub async fn create_slide(&self, token: &AuthToken, draft: &SlideDraft) -> Result<HeroSlide> {
        validate(draft)?;
        let slide: HeroSlide = self
            .api
            .send_json(Method::POST, self.api.url(ADMIN_SLIDES_PATH)?, Some(token), draft)
            .await?;

        info!(slide_id = %slide.id, "Slide created");
        error::add_breadcrumb("admin", "Created slide", Some(&[("slide_id", slide.id.as_str())]));
        Ok(slide)
    }

    /// Replace a slide's fields.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for an unknown slide.
    #[instrument(skip_all, fields(slide_id = %id))]
    pub async fn update_slide(
        &self,
        token: &AuthToken,
        id: &SlideId,
        draft: &SlideDraft,
    ) -> Result<HeroSlide> {
        validate(draft)?;
        self.api
            .send_json(Method::PUT, self.slide_url(&[id.as_str()])?, Some(token), draft)
            .await
    }

    /// Move a slide to another display position.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for an unknown slide.
    #[instrument(skip(self, token), fields(slide_id = %id))]
    pub async fn move_slide(&self, token: &AuthToken, id: &SlideId, order: u32) -> Result<HeroSlide> {
        let body = serde_json::json!({ "order": order });
        self.api
            .send_json(Method::PUT, self.slide_url(&[id.as_str()])?, Some(token), &body)
            .await
    }

    /// Show a hidden slide or hide a shown one.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for an unknown slide.
    #[instrument(skip(self, token), fields(slide_id = %id))]
    pub async fn toggle_slide(&self, token: &AuthToken, id: &SlideId) -> Result<HeroSlide> {
        let slide: HeroSlide = self
            .api
            .send_for(Method::PATCH, self.slide_url(&[id.as_str(), "toggle"])?, Some(token))
            .await?;
        info!(active = slide.is_active, "Slide toggled");
        Ok(slide)
    }

    /// Delete a slide.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for an unknown slide.
    #[instrument(skip(self, token), fields(slide_id = %id))]
    pub async fn delete_slide(&self, token: &AuthToken, id: &SlideId) -> Result<()> {
        self.api
            .send_empty(Method::DELETE, self.slide_url(&[id.as_str()])?, Some(token))
            .await?;
        info!("Slide deleted");
        error::add_breadcrumb("admin", "Deleted slide", Some(&[("slide_id", id.as_str())]));
        Ok(())
    }

    fn slide_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api.url(ADMIN_SLIDES_PATH)?;
        url.path_segments_mut()
            .map_err(|()| StorefrontError::BadRequest("API base URL cannot hold a path".to_string()))?
            .extend(segments);
        Ok(url)
    }
}

fn validate(draft: &SlideDraft) -> Result<()> {
    if !draft.is_complete() {
        return Err(StorefrontError::BadRequest(
            "slide needs a title and an image".to_string(),
        ));
    }
    if !draft.has_valid_opacity() {
        return Err(StorefrontError::BadRequest(format!(
            "overlay opacity {} is outside 0..=1",
            draft.overlay_opacity
        )));
    }
    Ok(())
}
