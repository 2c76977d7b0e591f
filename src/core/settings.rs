use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default model endpoint baked into fresh installs.
pub const DEFAULT_MODEL_URL: &str = "https://teachablemachine.withgoogle.com/models/gIF64n3nR/";

/// User settings persisted across runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Model endpoint the manager loads from
    pub model_url: String,
    /// Reference image paths keyed by pose label
    pub pose_images: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_url: DEFAULT_MODEL_URL.to_string(),
            pose_images: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from file, creating with defaults if it doesn't exist.
    /// A malformed or invalid file also yields defaults rather than an error,
    /// so a corrupted settings file never blocks startup.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::get_settings_path()?;

        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) if settings.validate().is_ok() => Ok(settings),
                Ok(_) | Err(_) => {
                    eprintln!("Settings file invalid, reverting to defaults");
                    Ok(Self::default())
                }
            }
        } else {
            let settings = Self::default();
            settings.save()?;
            Ok(settings)
        }
    }

    /// Save settings to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.validate()?;

        let path = Self::get_settings_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        Ok(())
    }

    /// Validate settings values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.model_url.trim().is_empty() {
            return Err("Model URL cannot be empty".into());
        }

        if !self.model_url.starts_with("http://") && !self.model_url.starts_with("https://") {
            return Err(format!(
                "Invalid model URL: {}. Must start with http:// or https://",
                self.model_url
            )
            .into());
        }

        for (label, image) in &self.pose_images {
            if label.trim().is_empty() {
                return Err("Pose image label cannot be empty".into());
            }
            if image.trim().is_empty() {
                return Err(format!("Pose image path for {} cannot be empty", label).into());
            }
        }

        Ok(())
    }

    /// Reset to default settings
    pub fn reset() -> Result<Self, Box<dyn std::error::Error>> {
        let settings = Self::default();
        settings.save()?;
        Ok(settings)
    }

    /// Get the settings file path
    fn get_settings_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".poseflow");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.model_url, DEFAULT_MODEL_URL);
        assert!(settings.pose_images.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.model_url = "".to_string();
        assert!(settings.validate().is_err());

        settings.model_url = "ftp://example.com/model/".to_string();
        assert!(settings.validate().is_err());

        settings.model_url = "https://example.com/model/".to_string();
        assert!(settings.validate().is_ok());

        settings
            .pose_images
            .insert("Pose1".to_string(), "".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_serialization() {
        let mut settings = Settings::default();
        settings
            .pose_images
            .insert("Pose1".to_string(), "/tmp/pose1.png".to_string());

        let json = serde_json::to_string(&settings).unwrap();
        let deserialized: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, deserialized);
    }

    #[test]
    fn test_malformed_json_is_detected() {
        assert!(serde_json::from_str::<Settings>("{not json").is_err());
        // Missing fields are also rejected, which load() maps to defaults
        assert!(serde_json::from_str::<Settings>("{}").is_err());
    }
}
