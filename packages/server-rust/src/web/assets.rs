//! Stylesheet and script references for rendered pages.

use fedithread_core::Handle;

use super::config::WebConfig;

/// Per-response asset lists handed to the page template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationAssets {
    pub stylesheets: Vec<String>,
    pub javascript: Vec<String>,
}

impl PresentationAssets {
    /// Assets for a thread page owned by `handle`.
    ///
    /// The account's own stylesheet is appended last, and only when the
    /// server allows custom CSS, so it can override the base styles.
    ///
    /// The `/@{handle}/custom.css` stylesheet is served by the account
    /// settings surface in front of this router, not by the thread routes.
    #[must_use]
    pub fn for_thread(config: &WebConfig, handle: &Handle) -> Self {
        let mut stylesheets = vec![
            format!("{}/Fork-Awesome/css/fork-awesome.min.css", config.assets_path_prefix),
            format!("{}/status.css", config.dist_path_prefix),
        ];
        if config.accounts_allow_custom_css {
            stylesheets.push(format!("/@{handle}/custom.css"));
        }

        Self {
            stylesheets,
            javascript: vec![format!("{}/frontend.js", config.dist_path_prefix)],
        }
    }

    /// Assets for the error page. No scripts.
    #[must_use]
    pub fn for_error(config: &WebConfig) -> Self {
        Self {
            stylesheets: vec![
                format!("{}/Fork-Awesome/css/fork-awesome.min.css", config.assets_path_prefix),
                format!("{}/error.css", config.dist_path_prefix),
            ],
            javascript: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Handle {
        Handle::parse("alice").unwrap()
    }

    #[test]
    fn base_assets_without_custom_css() {
        let assets = PresentationAssets::for_thread(&WebConfig::default(), &alice());
        assert_eq!(
            assets.stylesheets,
            vec![
                "/assets/Fork-Awesome/css/fork-awesome.min.css".to_string(),
                "/assets/dist/status.css".to_string(),
            ]
        );
        assert_eq!(assets.javascript, vec!["/assets/dist/frontend.js".to_string()]);
    }

    #[test]
    fn custom_css_appended_when_allowed() {
        let config = WebConfig {
            accounts_allow_custom_css: true,
            ..WebConfig::default()
        };
        let assets = PresentationAssets::for_thread(&config, &alice());
        assert_eq!(assets.stylesheets.len(), 3);
        assert_eq!(assets.stylesheets.last().unwrap(), "/@alice/custom.css");
    }

    #[test]
    fn error_page_has_no_scripts() {
        let assets = PresentationAssets::for_error(&WebConfig::default());
        assert_eq!(assets.stylesheets[1], "/assets/dist/error.css");
        assert!(assets.javascript.is_empty());
    }
}
