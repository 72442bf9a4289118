use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "s3-bucket-manager.toml";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Everything a [`BucketManager`](crate::BucketManager) needs to reach one bucket.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
}

impl BucketConfig {
    pub fn new(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            bucket_name: bucket_name.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("region", &self.region),
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
            ("bucket_name", &self.bucket_name),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("{field} must not be empty")));
            }
        }

        let region_ok = self
            .region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !region_ok || self.region.starts_with('-') || self.region.ends_with('-') {
            return Err(Error::InvalidConfig(format!(
                "malformed region `{}`",
                self.region
            )));
        }
        Ok(())
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for BucketConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .finish()
    }
}

/// Canned ACL applied to uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    Private,
    PublicRead,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::PublicRead => "public-read",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSettings {
    pub key: String,
    pub secret: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSettings {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

/// On-disk configuration: shared credentials plus any number of named buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub default_bucket: String,
    pub aws: AwsSettings,
    pub buckets: BTreeMap<String, BucketSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut buckets = BTreeMap::new();
        buckets.insert(
            "public".to_string(),
            BucketSettings {
                name: "your-public-bucket-name".to_string(),
                visibility: Some(Visibility::PublicRead),
            },
        );
        buckets.insert(
            "private".to_string(),
            BucketSettings {
                name: "your-private-bucket-name".to_string(),
                visibility: Some(Visibility::Private),
            },
        );

        Self {
            default_bucket: "public".to_string(),
            aws: AwsSettings {
                key: String::new(),
                secret: String::new(),
                region: DEFAULT_REGION.to_string(),
                endpoint: None,
            },
            buckets,
        }
    }
}

impl Settings {
    pub fn load_or_create(config_path: Option<&str>) -> Result<Self> {
        let config_file = config_path.unwrap_or(DEFAULT_CONFIG_FILE);

        if Path::new(config_file).exists() {
            Self::load(config_file)
        } else {
            let settings = Self::default();
            settings.publish(config_file)?;
            tracing::info!(path = config_file, "created default configuration");
            Ok(settings)
        }
    }

    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Writes the settings out as a TOML file.
    pub fn publish(&self, config_path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Overrides values from environment variables. `lookup` is usually
    /// `|name| std::env::var(name).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(key) = non_empty("AWS_ACCESS_KEY_ID") {
            self.aws.key = key;
        }
        if let Some(secret) = non_empty("AWS_SECRET_ACCESS_KEY") {
            self.aws.secret = secret;
        }
        if let Some(region) = non_empty("AWS_DEFAULT_REGION") {
            self.aws.region = region;
        }
        if let Some(endpoint) = non_empty("AWS_ENDPOINT_URL") {
            self.aws.endpoint = Some(endpoint);
        }

        for (bucket, var) in [("public", "AWS_BUCKET_PUBLIC"), ("private", "AWS_BUCKET_PRIVATE")] {
            if let Some(name) = non_empty(var) {
                self.buckets
                    .entry(bucket.to_string())
                    .and_modify(|b| b.name = name.clone())
                    .or_insert(BucketSettings {
                        name,
                        visibility: None,
                    });
            }
        }
    }

    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env(|name| std::env::var(name).ok());
        settings
    }

    pub fn bucket(&self, name: &str) -> Result<&BucketSettings> {
        self.buckets
            .get(name)
            .ok_or_else(|| Error::UnknownBucket(name.to_string()))
    }

    /// Builds the construction config for the named bucket entry.
    pub fn bucket_config(&self, name: &str) -> Result<BucketConfig> {
        let bucket = self.bucket(name)?;
        Ok(BucketConfig::new(
            &self.aws.region,
            &self.aws.key,
            &self.aws.secret,
            &bucket.name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> BucketConfig {
        BucketConfig::new("us-east-1", "test-key", "test-secret", "test-bucket")
    }

    #[test]
    fn test_validate_accepts_well_formed_config() {
        assert!(valid().validate().is_ok());
        let mut cfg = valid();
        cfg.region = "eu-central-1".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut cfg = valid();
        cfg.bucket_name = "  ".into();
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let mut cfg = valid();
        cfg.region = "US East".into();
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let mut cfg = valid();
        cfg.region = "-us".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("test-secret"));
        assert!(rendered.contains("test-bucket"));
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AWS_ACCESS_KEY_ID", "AKIA123"),
            ("AWS_SECRET_ACCESS_KEY", "shh"),
            ("AWS_DEFAULT_REGION", ""),
            ("AWS_BUCKET_PRIVATE", "vault"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.aws.key, "AKIA123");
        assert_eq!(settings.aws.secret, "shh");
        assert_eq!(settings.aws.region, DEFAULT_REGION);
        assert_eq!(settings.buckets["private"].name, "vault");
        assert_eq!(settings.buckets["private"].visibility, Some(Visibility::Private));
        assert_eq!(settings.buckets["public"].name, "your-public-bucket-name");
    }

    #[test]
    fn test_bucket_config_for_named_bucket() {
        let mut settings = Settings::default();
        settings.aws.key = "k".into();
        settings.aws.secret = "s".into();

        let cfg = settings.bucket_config("private").unwrap();
        assert_eq!(cfg, BucketConfig::new(DEFAULT_REGION, "k", "s", "your-private-bucket-name"));
        assert!(matches!(
            settings.bucket_config("archive"),
            Err(Error::UnknownBucket(name)) if name == "archive"
        ));
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm.toml");
        let path = path.to_str().unwrap();

        let created = Settings::load_or_create(Some(path)).unwrap();
        assert_eq!(created, Settings::default());

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("visibility = \"public-read\""));

        let mut edited = created.clone();
        edited.aws.endpoint = Some("http://127.0.0.1:9000".into());
        edited.publish(path).unwrap();
        assert_eq!(Settings::load_or_create(Some(path)).unwrap(), edited);
    }
}
