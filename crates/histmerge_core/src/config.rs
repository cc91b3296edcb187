use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_USER_AGENT: &str = "histmerge/0.1";
pub const DEFAULT_TEMPLATE: &str = "Template:Article history";
pub const DEFAULT_SUMMARY: &str = "[[Wikipedia:Bots/Requests for approval/APersonBot 7|Bot]] merging redundant talk page banners into the article history template.";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct BotConfig {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub bot: BotSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct BotSection {
    pub summary: Option<String>,
    pub template: Option<String>,
}

impl BotConfig {
    /// Resolve the wiki API URL: env WIKI_API_URL > config > enwiki default.
    pub fn api_url(&self) -> String {
        env_override("WIKI_API_URL")
            .or_else(|| self.wiki.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Resolve the user agent: env WIKI_USER_AGENT > config > default.
    pub fn user_agent(&self) -> String {
        env_override("WIKI_USER_AGENT")
            .or_else(|| self.wiki.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    /// Edit summary used on every save.
    pub fn summary(&self) -> String {
        self.bot
            .summary
            .clone()
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string())
    }

    /// Template whose talk-namespace transclusions the batch walks.
    pub fn template(&self) -> String {
        self.bot
            .template
            .clone()
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string())
    }
}

fn env_override(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Load a BotConfig from a TOML file. Returns defaults if the file doesn't
/// exist.
pub fn load_config(config_path: &Path) -> Result<BotConfig> {
    if !config_path.exists() {
        return Ok(BotConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: BotConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_uses_enwiki() {
        let config = BotConfig::default();
        assert_eq!(config.api_url(), "https://en.wikipedia.org/w/api.php");
        assert_eq!(config.template(), "Template:Article history");
        assert!(config.summary().contains("article history"));
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/histmerge.toml")).expect("load config");
        assert!(config.wiki.api_url.is_none());
        assert!(config.bot.summary.is_none());
    }

    #[test]
    fn load_config_parses_both_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("histmerge.toml");
        fs::write(
            &config_path,
            r#"
[wiki]
api_url = "https://test.wikipedia.org/w/api.php"
user_agent = "test-agent/1.0"

[bot]
summary = "merging banners (trial)"
template = "Template:ArticleHistory"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.api_url(), "https://test.wikipedia.org/w/api.php");
        assert_eq!(config.user_agent(), "test-agent/1.0");
        assert_eq!(config.summary(), "merging banners (trial)");
        assert_eq!(config.template(), "Template:ArticleHistory");
    }

    #[test]
    fn load_config_tolerates_partial_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("histmerge.toml");
        fs::write(&config_path, "[bot]\nsummary = \"trial run\"\n").expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.summary(), "trial run");
        assert_eq!(config.api_url(), "https://en.wikipedia.org/w/api.php");
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("histmerge.toml");
        fs::write(&config_path, "[wiki\napi_url = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }
}
