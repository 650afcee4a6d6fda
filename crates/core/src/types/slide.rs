//! Home page hero slides, managed from the back office.

use serde::{Deserialize, Serialize};

use super::id::SlideId;

/// A hero slide as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSlide {
    #[serde(rename = "_id")]
    pub id: SlideId,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_button_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_opacity: Option<f64>,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub is_active: bool,
}

/// The fields an admin fills in to create or edit a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDraft {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub image: String,
    pub button_text: String,
    pub button_link: String,
    pub secondary_button_text: String,
    pub secondary_button_link: String,
    pub background_color: String,
    pub text_color: String,
    pub overlay_opacity: f64,
    pub order: u32,
}

impl Default for SlideDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            description: String::new(),
            image: String::new(),
            button_text: "Shop Now".to_string(),
            button_link: "/products".to_string(),
            secondary_button_text: "Learn More".to_string(),
            secondary_button_link: "/about".to_string(),
            background_color: "#000000".to_string(),
            text_color: "#ffffff".to_string(),
            overlay_opacity: 0.4,
            order: 0,
        }
    }
}

impl SlideDraft {
    /// A slide needs a title and an image.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.image.trim().is_empty()
    }

    /// Whether the overlay opacity is a fraction in `0.0..=1.0`.
    #[must_use]
    pub fn has_valid_opacity(&self) -> bool {
        (0.0..=1.0).contains(&self.overlay_opacity)
    }
}

impl From<&HeroSlide> for SlideDraft {
    /// Prefill the edit form, falling back to the defaults for unset fields.
    fn from(slide: &HeroSlide) -> Self {
        let defaults = Self::default();
        Self {
            title: slide.title.clone(),
            subtitle: slide.subtitle.clone(),
            description: slide.description.clone().unwrap_or_default(),
            image: slide.image.clone(),
            button_text: slide.button_text.clone().unwrap_or(defaults.button_text),
            button_link: slide.button_link.clone().unwrap_or(defaults.button_link),
            secondary_button_text: slide
                .secondary_button_text
                .clone()
                .unwrap_or(defaults.secondary_button_text),
            secondary_button_link: slide
                .secondary_button_link
                .clone()
                .unwrap_or(defaults.secondary_button_link),
            background_color: slide
                .background_color
                .clone()
                .unwrap_or(defaults.background_color),
            text_color: slide.text_color.clone().unwrap_or(defaults.text_color),
            overlay_opacity: slide.overlay_opacity.unwrap_or(defaults.overlay_opacity),
            order: slide.order,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_form_falls_back_to_defaults() {
        let json = r#"{"_id": "s1", "title": "Drop 04", "subtitle": "Linen", "image": "/s1.jpg",
            "buttonText": "Browse", "order": 2, "isActive": true}"#;
        let slide: HeroSlide = serde_json::from_str(json).unwrap();

        let draft = SlideDraft::from(&slide);
        assert_eq!(draft.button_text, "Browse");
        assert_eq!(draft.button_link, "/products");
        assert_eq!(draft.text_color, "#ffffff");
        assert!((draft.overlay_opacity - 0.4).abs() < f64::EPSILON);
        assert_eq!(draft.order, 2);
        assert!(draft.is_complete());
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = SlideDraft {
            title: "Drop 04".to_string(),
            ..SlideDraft::default()
        };
        assert!(!draft.is_complete());

        draft.image = "/s1.jpg".to_string();
        assert!(draft.is_complete());
        assert!(draft.has_valid_opacity());

        draft.overlay_opacity = 1.5;
        assert!(!draft.has_valid_opacity());
    }
}
