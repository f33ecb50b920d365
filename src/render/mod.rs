//! Turns stored page data into view models the templates can walk.
//! Layout rules live here so the templates stay declarative.

use crate::db::models::Page;

/// Shown wherever a split layout is short on photos.
pub const PLACEHOLDER_PHOTO: &str = "/assets/img/placeholder.svg";

/// One renderable page section.
#[derive(Debug, Clone, PartialEq)]
pub enum PageView {
    Text(TextView),
    Gallery(GalleryView),
    Split(SplitView),
    Location(MapView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextView {
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryView {
    pub urls: Vec<String>,
}

/// The two-photo, one-text layout. Always carries exactly two photo
/// slots and one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitView {
    pub text: String,
    pub left_url: String,
    pub right_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub lat: f64,
    pub lng: f64,
}

impl MapView {
    /// Query window for the embedded map frame.
    pub fn bbox(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.lng - 0.005,
            self.lat - 0.003,
            self.lng + 0.005,
            self.lat + 0.003
        )
    }
}

/// Bind a split section: the first text block and the first two
/// photos. Missing photos fall back to the placeholder, extra ones
/// are dropped.
pub fn split_view(content: &[String], urls: &[String]) -> SplitView {
    let photo = |i: usize| {
        urls.get(i)
            .filter(|u| !u.is_empty())
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER_PHOTO.to_string())
    };
    SplitView {
        text: content.first().cloned().unwrap_or_default(),
        left_url: photo(0),
        right_url: photo(1),
    }
}

/// Map stored pages to their view models in document order.
pub fn page_views(pages: &[Page]) -> Vec<PageView> {
    pages
        .iter()
        .map(|page| match page {
            Page::Text { content } => PageView::Text(TextView {
                paragraphs: content.clone(),
            }),
            Page::Gallery { urls } => PageView::Gallery(GalleryView { urls: urls.clone() }),
            Page::Split { content, urls } => PageView::Split(split_view(content, urls)),
            Page::Location { lat, lng } => PageView::Location(MapView {
                lat: *lat,
                lng: *lng,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn split_binds_first_text_and_two_photos() {
        let view = split_view(
            &strings(&["Intro paragraph", "Ignored"]),
            &strings(&["https://a.jpg", "https://b.jpg"]),
        );
        assert_eq!(view.text, "Intro paragraph");
        assert_eq!(view.left_url, "https://a.jpg");
        assert_eq!(view.right_url, "https://b.jpg");
    }

    #[test]
    fn split_with_one_photo_fills_the_right_slot() {
        let view = split_view(&strings(&["Text"]), &strings(&["https://a.jpg"]));
        assert_eq!(view.left_url, "https://a.jpg");
        assert_eq!(view.right_url, PLACEHOLDER_PHOTO);
    }

    #[test]
    fn split_with_no_photos_uses_the_placeholder_twice() {
        let view = split_view(&strings(&["Text"]), &[]);
        assert_eq!(view.left_url, PLACEHOLDER_PHOTO);
        assert_eq!(view.right_url, PLACEHOLDER_PHOTO);
    }

    #[test]
    fn split_with_blank_url_uses_the_placeholder() {
        let view = split_view(&[], &strings(&["", "https://b.jpg"]));
        assert_eq!(view.left_url, PLACEHOLDER_PHOTO);
        assert_eq!(view.right_url, "https://b.jpg");
    }

    #[test]
    fn split_without_text_renders_an_empty_paragraph() {
        let view = split_view(&[], &strings(&["https://a.jpg", "https://b.jpg"]));
        assert_eq!(view.text, "");
    }

    #[test]
    fn extra_photos_are_dropped() {
        let view = split_view(
            &strings(&["Text"]),
            &strings(&["https://a.jpg", "https://b.jpg", "https://c.jpg"]),
        );
        assert_eq!(view.left_url, "https://a.jpg");
        assert_eq!(view.right_url, "https://b.jpg");
    }

    #[test]
    fn map_bbox_brackets_the_marker() {
        let map = MapView {
            lat: 25.03,
            lng: 121.56,
        };
        assert_eq!(map.bbox(), "121.555000,25.027000,121.565000,25.033000");
    }

    #[test]
    fn page_views_keep_document_order() {
        let pages = vec![
            Page::Text {
                content: strings(&["One", "Two"]),
            },
            Page::Split {
                content: strings(&["Caption"]),
                urls: strings(&["https://a.jpg"]),
            },
            Page::Gallery {
                urls: strings(&["https://g1.jpg", "https://g2.jpg"]),
            },
            Page::Location { lat: 25.03, lng: 121.56 },
        ];

        let views = page_views(&pages);
        assert_eq!(views.len(), 4);
        assert!(matches!(&views[0], PageView::Text(t) if t.paragraphs.len() == 2));
        assert!(matches!(&views[1], PageView::Split(s) if s.right_url == PLACEHOLDER_PHOTO));
        assert!(matches!(&views[2], PageView::Gallery(g) if g.urls.len() == 2));
        assert!(matches!(&views[3], PageView::Location(m) if m.lat > 25.0));
    }
}
