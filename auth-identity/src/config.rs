use serde::{Deserialize, Serialize};

/// Standing identity used by the development auto-login bypass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevIdentityConfig {
    #[serde(default = "default_dev_email")]
    pub email: String,
    #[serde(default = "default_dev_username")]
    pub username: String,
    #[serde(default = "default_dev_display_name")]
    pub display_name: String,
}

fn default_dev_email() -> String { "dev@localhost".to_string() }
fn default_dev_username() -> String { "dev".to_string() }
fn default_dev_display_name() -> String { "Development User".to_string() }

impl Default for DevIdentityConfig {
    fn default() -> Self {
        Self {
            email: default_dev_email(),
            username: default_dev_username(),
            display_name: default_dev_display_name(),
        }
    }
}
