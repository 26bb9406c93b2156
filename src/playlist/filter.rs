//! Channel selection for generated playlists

use std::collections::BTreeMap;

use crate::catalog::Channel;

/// Filter keys accepted on the command line
pub const FILTER_KEYS: [&str; 6] = ["group", "country", "language", "quality", "category", "tag"];

/// Conjunction of per-field criteria. Fields compare exactly, except `tag`
/// which is a case-insensitive substring of the channel's tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelFilter {
    pub group: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

impl ChannelFilter {
    /// Parse `key=value` arguments
    pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Self, String> {
        let mut map = BTreeMap::new();
        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| format!("Expected key=value, got '{}'", arg))?;
            map.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
        Self::from_map(&map)
    }

    /// Build from a stored criteria map
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, String> {
        let mut filter = ChannelFilter::default();
        for (key, value) in map {
            let slot = match key.as_str() {
                "group" => &mut filter.group,
                "country" => &mut filter.country,
                "language" => &mut filter.language,
                "quality" => &mut filter.quality,
                "category" => &mut filter.category,
                "tag" | "tags" => &mut filter.tag,
                other => {
                    return Err(format!(
                        "Unknown filter '{}' (use {})",
                        other,
                        FILTER_KEYS.join(", ")
                    ))
                }
            };
            *slot = Some(value.clone());
        }
        Ok(filter)
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        [
            ("group", &self.group),
            ("country", &self.country),
            ("language", &self.language),
            ("quality", &self.quality),
            ("category", &self.category),
            ("tag", &self.tag),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == ChannelFilter::default()
    }

    pub fn matches(&self, channel: &Channel) -> bool {
        fn exact(want: &Option<String>, have: Option<&str>) -> bool {
            match want {
                Some(want) => have == Some(want.as_str()),
                None => true,
            }
        }

        let tag_ok = match &self.tag {
            Some(tag) => channel
                .tags
                .as_ref()
                .map(|tags| tags.to_lowercase().contains(&tag.to_lowercase()))
                .unwrap_or(false),
            None => true,
        };

        exact(&self.group, Some(channel.group.as_str()))
            && exact(&self.country, channel.country.as_deref())
            && exact(&self.language, channel.language.as_deref())
            && exact(&self.quality, channel.quality.as_deref())
            && exact(&self.category, channel.category.as_deref())
            && tag_ok
    }
}
