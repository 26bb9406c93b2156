//! Catalog record types
//!
//! One canonical type per entity. Field names match the data files written
//! by earlier deployments and must not change.

use chrono::{Duration, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A record stored in a catalog collection
pub trait Record: Serialize + DeserializeOwned + Clone + std::fmt::Debug {
    /// Collection name, also the backing file stem
    const COLLECTION: &'static str;

    /// Human readable entity name used in messages
    const KIND: &'static str;

    /// Flat row shape used by the CSV format
    type Row: Serialize + DeserializeOwned;

    /// Natural key as stored
    fn key(&self) -> &str;

    /// Whether `key` addresses this record
    fn matches_key(&self, key: &str) -> bool {
        self.key() == key
    }

    fn to_row(&self) -> Self::Row;

    fn from_row(row: Self::Row) -> Result<Self, String>;

    /// Check invariants serde cannot express; run on every decoded record
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// `start` plus `days`, saturating at the largest representable date
pub fn expiry_after(start: NaiveDateTime, days: u32) -> NaiveDateTime {
    start
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDateTime::MAX)
}

fn default_group() -> String {
    "Live".to_string()
}

fn default_source() -> String {
    "telegram".to_string()
}

fn default_active() -> bool {
    true
}

/// A live channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub url: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    pub added: NaiveDateTime,
    pub added_by: i64,
}

impl Channel {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        group: Option<String>,
        added: NaiveDateTime,
        added_by: i64,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            group: group.unwrap_or_else(default_group),
            country: None,
            language: None,
            quality: None,
            category: None,
            tags: None,
            added,
            added_by,
        }
    }
}

impl Record for Channel {
    const COLLECTION: &'static str = "channels";
    const KIND: &'static str = "Channel";
    type Row = Channel;

    fn key(&self) -> &str {
        &self.name
    }

    fn matches_key(&self, key: &str) -> bool {
        self.name.to_lowercase() == key.to_lowercase()
    }

    fn to_row(&self) -> Self::Row {
        self.clone()
    }

    fn from_row(row: Self::Row) -> Result<Self, String> {
        Ok(row)
    }
}

/// A video-on-demand entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VodItem {
    /// Storage provider file handle for uploaded videos
    #[serde(default)]
    pub file_id: Option<String>,
    pub title: String,
    /// Playback URL for entries that were not uploaded
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    pub added: NaiveDateTime,
    pub added_by: i64,
}

impl VodItem {
    /// Entry for an uploaded file
    pub fn uploaded(
        file_id: impl Into<String>,
        title: impl Into<String>,
        added: NaiveDateTime,
        added_by: i64,
    ) -> Self {
        Self {
            file_id: Some(file_id.into()),
            title: title.into(),
            url: None,
            source: default_source(),
            added,
            added_by,
        }
    }

    /// Entry for an external playback URL
    pub fn external(
        url: impl Into<String>,
        title: impl Into<String>,
        added: NaiveDateTime,
        added_by: i64,
    ) -> Self {
        Self {
            file_id: None,
            title: title.into(),
            url: Some(url.into()),
            source: "external".to_string(),
            added,
            added_by,
        }
    }

    /// Title used when an upload carries no caption or file name
    pub fn placeholder_title(now: NaiveDateTime) -> String {
        format!("Video_{}", now.format("%Y%m%d_%H%M%S"))
    }
}

impl Record for VodItem {
    const COLLECTION: &'static str = "vod";
    const KIND: &'static str = "VOD item";
    type Row = VodItem;

    fn key(&self) -> &str {
        self.file_id
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or_default()
    }

    fn to_row(&self) -> Self::Row {
        self.clone()
    }

    fn from_row(row: Self::Row) -> Result<Self, String> {
        Ok(row)
    }

    fn validate(&self) -> Result<(), String> {
        if self.file_id.is_none() && self.url.is_none() {
            return Err(format!("VOD item '{}' has neither file_id nor url", self.title));
        }
        Ok(())
    }
}

/// A playlist access token issued to an end user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub token: String,
    pub username: String,
    pub created: NaiveDateTime,
    pub expires: NaiveDateTime,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub usage_count: u64,
}

impl Customer {
    pub fn new(
        username: impl Into<String>,
        validity_days: u32,
        filters: BTreeMap<String, String>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            token: uuid::Uuid::new_v4().simple().to_string(),
            username: username.into(),
            created: now,
            expires: expiry_after(now, validity_days),
            filters,
            active: true,
            usage_count: 0,
        }
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now > self.expires
    }

    /// Whole days of validity left, zero once expired
    pub fn remaining_days(&self, now: NaiveDateTime) -> u32 {
        let days = (self.expires - now).num_days();
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }
}

/// CSV shape of a customer; the filter map is flattened to `k=v;k=v`
#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerRow {
    pub token: String,
    pub username: String,
    pub created: NaiveDateTime,
    pub expires: NaiveDateTime,
    pub filters: String,
    pub active: bool,
    pub usage_count: u64,
}

impl Record for Customer {
    const COLLECTION: &'static str = "customers";
    const KIND: &'static str = "Customer";
    type Row = CustomerRow;

    fn key(&self) -> &str {
        &self.token
    }

    fn to_row(&self) -> Self::Row {
        CustomerRow {
            token: self.token.clone(),
            username: self.username.clone(),
            created: self.created,
            expires: self.expires,
            filters: encode_filters(&self.filters),
            active: self.active,
            usage_count: self.usage_count,
        }
    }

    fn from_row(row: Self::Row) -> Result<Self, String> {
        Ok(Customer {
            token: row.token,
            username: row.username,
            created: row.created,
            expires: row.expires,
            filters: decode_filters(&row.filters)?,
            active: row.active,
            usage_count: row.usage_count,
        })
    }
}

fn encode_filters(filters: &BTreeMap<String, String>) -> String {
    filters
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(";")
}

fn decode_filters(value: &str) -> Result<BTreeMap<String, String>, String> {
    value
        .split(';')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("invalid filter entry '{}'", pair))
        })
        .collect()
}
