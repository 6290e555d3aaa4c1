use std::path::PathBuf;

/// Settings for the human-readable web pages.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// URL prefix under which static assets are served.
    pub assets_path_prefix: String,
    /// URL prefix of the bundled frontend build (stylesheets, scripts).
    pub dist_path_prefix: String,
    /// Directory served at `assets_path_prefix`. `None` disables static
    /// asset serving (assets are then expected from a reverse proxy).
    pub assets_dir: Option<PathBuf>,
    /// Whether accounts may attach their own stylesheet to their pages.
    pub accounts_allow_custom_css: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            assets_path_prefix: "/assets".to_string(),
            dist_path_prefix: "/assets/dist".to_string(),
            assets_dir: None,
            accounts_allow_custom_css: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_config_defaults() {
        let config = WebConfig::default();
        assert_eq!(config.assets_path_prefix, "/assets");
        assert_eq!(config.dist_path_prefix, "/assets/dist");
        assert!(config.assets_dir.is_none());
        assert!(!config.accounts_allow_custom_css);
    }
}
