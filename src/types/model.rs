use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// Represents a Gemini model identifier.
///
/// This can be a predefined model version or a custom string value
/// for models that may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for future models or tuned models)
    Custom(String),
}

/// Known Gemini model versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// Gemini 2.5 Flash preview (2025-04-17)
    Gemini25FlashPreview0417,

    /// Gemini 2.5 Flash
    Gemini25Flash,

    /// Gemini 2.5 Pro
    Gemini25Pro,

    /// Gemini 2.0 Flash
    Gemini20Flash,

    /// Gemini 2.0 Flash-Lite
    Gemini20FlashLite,
}

impl KnownModel {
    const ALL: [KnownModel; 5] = [
        KnownModel::Gemini25FlashPreview0417,
        KnownModel::Gemini25Flash,
        KnownModel::Gemini25Pro,
        KnownModel::Gemini20Flash,
        KnownModel::Gemini20FlashLite,
    ];

    /// The identifier the API uses for this model.
    pub fn as_str(self) -> &'static str {
        match self {
            KnownModel::Gemini25FlashPreview0417 => "gemini-2.5-flash-preview-04-17",
            KnownModel::Gemini25Flash => "gemini-2.5-flash",
            KnownModel::Gemini25Pro => "gemini-2.5-pro",
            KnownModel::Gemini20Flash => "gemini-2.0-flash",
            KnownModel::Gemini20FlashLite => "gemini-2.0-flash-lite",
        }
    }
}

impl Model {
    /// The identifier the API uses for this model.
    pub fn as_str(&self) -> &str {
        match self {
            Model::Known(known) => known.as_str(),
            Model::Custom(custom) => custom,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("models/").unwrap_or(s);
        KnownModel::ALL
            .into_iter()
            .find(|known| known.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown model: {s}"), Some("model".into())))
    }
}

impl FromStr for Model {
    type Err = Error;

    /// Parses a model name, falling back to [`Model::Custom`] for names that
    /// are not known.  Fails only on empty or whitespace-containing names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.contains(char::is_whitespace) {
            return Err(Error::validation(
                format!("invalid model name: {s:?}"),
                Some("model".into()),
            ));
        }
        Ok(s.parse::<KnownModel>()
            .map(Model::Known)
            .unwrap_or_else(|_| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_round_trips_through_str() {
        let model: Model = "gemini-2.5-flash-preview-04-17".parse().unwrap();
        assert_eq!(model, Model::Known(KnownModel::Gemini25FlashPreview0417));
        assert_eq!(model.to_string(), "gemini-2.5-flash-preview-04-17");
    }

    #[test]
    fn models_prefix_is_accepted() {
        let model: Model = "models/gemini-2.0-flash".parse().unwrap();
        assert_eq!(model, Model::Known(KnownModel::Gemini20Flash));
    }

    #[test]
    fn unknown_names_become_custom() {
        let model: Model = "gemini-9-ultra".parse().unwrap();
        assert_eq!(model, Model::Custom("gemini-9-ultra".to_string()));
        assert_eq!(model.as_str(), "gemini-9-ultra");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!("".parse::<Model>().is_err());
        assert!("gemini 2".parse::<Model>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let model = Model::Known(KnownModel::Gemini25Pro);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gemini-2.5-pro""#);
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
