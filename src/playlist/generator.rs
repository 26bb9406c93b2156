//! M3U playlist generator
//!
//! Renders a catalog snapshot into an extended M3U document for one user.

use chrono::NaiveDateTime;

use super::filter::ChannelFilter;
use crate::catalog::types::expiry_after;
use crate::catalog::{Channel, VodItem};
use crate::config::ProxyConfig;

/// Parameters of one playlist
#[derive(Debug, Clone)]
pub struct PlaylistRequest {
    pub username: String,
    pub validity_days: u32,
    pub generated_at: NaiveDateTime,
    pub filter: ChannelFilter,
}

/// A rendered playlist ready for delivery
#[derive(Debug, Clone)]
pub struct PlaylistDocument {
    pub file_name: String,
    pub body: String,
    pub channel_count: usize,
    pub vod_count: usize,
    pub expires_at: NaiveDateTime,
}

impl PlaylistDocument {
    /// Expiry date as shown to users
    pub fn expiry_date(&self) -> String {
        self.expires_at.format("%Y-%m-%d").to_string()
    }
}

/// Playlist file name for a user
pub fn playlist_file_name(username: &str) -> String {
    format!("{}_iptv.m3u", username)
}

/// Build the proxied playback URL of an uploaded file
pub fn proxy_url(proxy: &ProxyConfig, file_id: &str) -> String {
    proxy
        .url_template
        .replace("{base}", proxy.base_url.trim_end_matches('/'))
        .replace("{file_id}", file_id)
        .replace("{key}", &proxy.api_key)
}

/// Collapse line breaks so a value cannot start a new playlist line
pub fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn banner(output: &mut String, title: &str) {
    let rule = "=".repeat(50);
    output.push_str(&format!("#{}\n", rule));
    output.push_str(&format!("# {}\n", title));
    output.push_str(&format!("#{}\n", rule));
}

fn channel_entry(output: &mut String, channel: &Channel) {
    let mut attrs = String::from("tvg-logo=\"\"");
    if let Some(country) = &channel.country {
        attrs.push_str(&format!(" tvg-country=\"{}\"", country));
    }
    if let Some(language) = &channel.language {
        attrs.push_str(&format!(" tvg-language=\"{}\"", language));
    }
    output.push_str(&format!(
        "#EXTINF:-1 {} group-title=\"{}\",{}\n",
        attrs,
        single_line(&channel.group),
        single_line(&channel.name)
    ));
    output.push_str(&format!("{}\n", single_line(&channel.url)));
}

fn vod_entry(output: &mut String, item: &VodItem, proxy: Option<&ProxyConfig>) {
    let playback = match (&item.url, &item.file_id, proxy) {
        (Some(url), _, _) => Some(url.clone()),
        (None, Some(file_id), Some(proxy)) => Some(proxy_url(proxy, file_id)),
        _ => None,
    };

    match (playback, &item.file_id) {
        (Some(url), _) => {
            output.push_str(&format!(
                "#EXTINF:-1 type=\"vod\" group-title=\"VOD\",{}\n",
                single_line(&item.title)
            ));
            output.push_str(&format!("{}\n", single_line(&url)));
        }
        (None, Some(file_id)) => {
            output.push_str(&format!(
                "#EXTINF:-1 group-title=\"VOD Instructions\",{}\n",
                single_line(&item.title)
            ));
            output.push_str(&format!("# File ID: {}\n", single_line(file_id)));
            output.push_str("# Send this File ID to a file-to-link bot on Telegram to get a download link\n");
        }
        (None, None) => {}
    }
}

/// Generate a playlist. Never fails; an empty catalog yields header and
/// instructions only.
pub fn generate_playlist(
    request: &PlaylistRequest,
    channels: &[Channel],
    vod_items: &[VodItem],
    proxy: Option<&ProxyConfig>,
) -> PlaylistDocument {
    let expires_at = expiry_after(request.generated_at, request.validity_days);
    let selected: Vec<&Channel> = channels
        .iter()
        .filter(|c| request.filter.matches(c))
        .collect();

    let mut output = String::new();

    // Header
    output.push_str("#EXTM3U\n");
    output.push_str(&format!("# IPTV Playlist for: {}\n", request.username));
    output.push_str(&format!(
        "# Generated: {}\n",
        request.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("# Expires: {}\n", expires_at.format("%Y-%m-%d")));
    output.push_str("#\n");
    output.push_str(&format!(
        "# This file contains {} live channels and {} VOD items\n",
        selected.len(),
        vod_items.len()
    ));
    output.push_str("#\n");

    if !selected.is_empty() {
        banner(&mut output, "LIVE CHANNELS");
        output.push('\n');
        for channel in &selected {
            channel_entry(&mut output, channel);
        }
        output.push('\n');
    }

    if !vod_items.is_empty() {
        banner(&mut output, "VOD LIBRARY (Movies & Videos)");
        output.push('\n');
        for item in vod_items {
            vod_entry(&mut output, item, proxy);
            output.push('\n');
        }
    }

    banner(&mut output, "INSTRUCTIONS");
    output.push_str("# 1. Save this file\n");
    output.push_str("# 2. Open VLC Media Player (or any IPTV player)\n");
    output.push_str("# 3. File -> Open File -> Select this .m3u file\n");
    output.push_str("# 4. Enjoy your channels and videos!\n");
    output.push_str("#\n");
    output.push_str("# Entries without a URL list a File ID for manual download\n");

    PlaylistDocument {
        file_name: playlist_file_name(&request.username),
        body: output,
        channel_count: selected.len(),
        vod_count: vod_items.len(),
        expires_at,
    }
}
