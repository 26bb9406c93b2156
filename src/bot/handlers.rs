//! Command handlers
//!
//! Each handler runs to completion against the catalog and returns the
//! reply to deliver. Failures become short human-readable messages.

use chrono::NaiveDateTime;

use super::command::{Command, HELP_TEXT};
use super::{Content, Incoming, Reply, Upload};
use crate::catalog::{Channel, Customer, Record, VodItem};
use crate::error::CatalogError;
use crate::playlist::generator::single_line;
use crate::playlist::{generate_playlist, ChannelFilter, PlaylistRequest};
use crate::state::AppState;

pub const UNAUTHORIZED: &str = "Unauthorized";

/// Handle one inbound message. `None` means nothing is sent back.
pub fn handle_incoming(state: &AppState, incoming: &Incoming, now: NaiveDateTime) -> Option<Reply> {
    let is_admin = incoming
        .user_id
        .map(|id| state.config.is_admin(id))
        .unwrap_or(false);

    match &incoming.content {
        Content::Text(text) => {
            let command = match Command::parse(text)? {
                Ok(command) => command,
                Err(usage) if is_admin => return Some(Reply::text(usage)),
                Err(_) => return Some(Reply::text(UNAUTHORIZED)),
            };
            if !command.is_public() && !is_admin {
                tracing::warn!(
                    "Rejected {:?} from non-admin user {:?}",
                    command,
                    incoming.user_id
                );
                return Some(Reply::text(UNAUTHORIZED));
            }
            let user_id = incoming.user_id.unwrap_or_default();
            Some(handle_command(state, command, user_id, now))
        }
        // Uploads from anyone else are ignored
        Content::Video(upload) if is_admin => Some(add_upload(state, upload, incoming, now)),
        Content::Document(upload) if is_admin => {
            if upload.is_video() {
                Some(add_upload(state, upload, incoming, now))
            } else {
                Some(Reply::text("Please send a video file"))
            }
        }
        _ => None,
    }
}

/// Execute an authorized command
pub fn handle_command(state: &AppState, command: Command, user_id: i64, now: NaiveDateTime) -> Reply {
    match command {
        Command::Start | Command::Help => Reply::text(HELP_TEXT),
        Command::Add { name, url, group } => add_channel(state, name, url, group, user_id, now),
        Command::Remove { name } => remove_channel(state, &name),
        Command::List => list_channels(state),
        Command::VodList => list_vod(state),
        Command::AddVod { url, title } => add_external_vod(state, url, title, user_id, now),
        Command::RemoveVod { key } => remove_vod(state, &key),
        Command::Generate {
            username,
            days,
            filters,
        } => generate(state, username, days, &filters, now),
        Command::CreateToken {
            username,
            days,
            filters,
        } => create_token(state, username, days, &filters, now),
        Command::Customers => list_customers(state, now),
        Command::Revoke { token } => revoke(state, &token),
        Command::Stats => stats(state),
        Command::Unknown(name) => Reply::text(format!("Unknown command /{}. Send /help for usage.", name)),
    }
}

/// Turn a catalog failure into a reply, logging the details
fn failure(err: CatalogError, action: &str) -> Reply {
    match err {
        CatalogError::DuplicateKey { kind, key } => {
            Reply::text(format!("{} '{}' already exists!", kind, key))
        }
        CatalogError::NotFound { kind, key } => Reply::text(format!("{} '{}' not found", kind, key)),
        err @ CatalogError::Corrupt { .. } => {
            tracing::error!("{}: {}", action, err);
            Reply::text(format!("Failed to {}: the catalog file is corrupt", action))
        }
        err => {
            tracing::error!("{}: {}", action, err);
            Reply::text(format!("Failed to {}", action))
        }
    }
}

fn add_channel(
    state: &AppState,
    name: String,
    url: String,
    group: Option<String>,
    user_id: i64,
    now: NaiveDateTime,
) -> Reply {
    let channel = Channel::new(name, url, group, now, user_id);
    let name = channel.name.clone();
    match state.catalog.channels.add(channel) {
        Ok(_) => Reply::text(format!("Added live channel: {}", name)),
        Err(e) => failure(e, "save channel"),
    }
}

fn remove_channel(state: &AppState, name: &str) -> Reply {
    match state.catalog.channels.remove(name) {
        Ok(channel) => Reply::text(format!("Removed channel: {}", channel.name)),
        Err(e) => failure(e, "save changes"),
    }
}

/// Render the most recent `limit` lines with a "... and N more" note
fn render_list(title: &str, lines: &[String], limit: usize, unit: &str) -> String {
    let skipped = lines.len().saturating_sub(limit);
    let mut msg = format!("{}\n\n", title);
    for (i, line) in lines.iter().enumerate().skip(skipped) {
        msg.push_str(&format!("{}. {}\n", i + 1, line));
    }
    if skipped > 0 {
        msg.push_str(&format!("\n... and {} more\n", skipped));
    }
    msg.push_str(&format!("\nTotal: {} {}", lines.len(), unit));
    msg
}

fn list_channels(state: &AppState) -> Reply {
    let channels = match state.catalog.channels.load() {
        Ok(channels) => channels,
        Err(e) => return failure(e, "load channels"),
    };
    if channels.is_empty() {
        return Reply::text("No channels yet. Use /add to add some!");
    }

    let lines: Vec<String> = channels
        .iter()
        .map(|c| format!("{} [{}]", c.name, c.group))
        .collect();
    Reply::text(render_list(
        "Your Live Channels:",
        &lines,
        state.config.list_limit,
        "channels",
    ))
}

fn list_vod(state: &AppState) -> Reply {
    let items = match state.catalog.vod.load() {
        Ok(items) => items,
        Err(e) => return failure(e, "load VOD library"),
    };
    if items.is_empty() {
        return Reply::text("No VOD items yet. Send me videos to add them!");
    }

    let lines: Vec<String> = items
        .iter()
        .map(|v| format!("{}\n   {}", v.title, v.added.format("%Y-%m-%d")))
        .collect();
    Reply::text(render_list(
        "Your VOD Library:",
        &lines,
        state.config.list_limit,
        "items",
    ))
}

fn vod_added(state: &AppState, item: VodItem) -> Reply {
    let title = item.title.clone();
    match state.catalog.vod.add(item) {
        Ok(total) => Reply::text(format!(
            "Added to VOD Library\n\nTitle: {}\nTotal VODs: {}",
            title, total
        )),
        Err(CatalogError::DuplicateKey { .. }) => {
            Reply::text("This video is already in your VOD library")
        }
        Err(e) => failure(e, "save VOD"),
    }
}

fn add_upload(state: &AppState, upload: &Upload, incoming: &Incoming, now: NaiveDateTime) -> Reply {
    let title = incoming
        .caption
        .as_deref()
        .map(single_line)
        .filter(|c| !c.is_empty())
        .or_else(|| upload.file_name.as_deref().map(single_line))
        .unwrap_or_else(|| VodItem::placeholder_title(now));

    let item = VodItem::uploaded(
        upload.file_id.clone(),
        title,
        now,
        incoming.user_id.unwrap_or_default(),
    );
    vod_added(state, item)
}

fn add_external_vod(
    state: &AppState,
    url: String,
    title: Option<String>,
    user_id: i64,
    now: NaiveDateTime,
) -> Reply {
    let title = title
        .or_else(|| {
            url.trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty() && !s.contains(':'))
                .map(str::to_string)
        })
        .unwrap_or_else(|| VodItem::placeholder_title(now));
    vod_added(state, VodItem::external(url, title, now, user_id))
}

fn remove_vod(state: &AppState, key: &str) -> Reply {
    match state.catalog.vod.remove(key) {
        Ok(item) => Reply::text(format!("Removed VOD item: {}", item.title)),
        Err(e) => failure(e, "save changes"),
    }
}

fn generate(
    state: &AppState,
    username: String,
    days: u32,
    filters: &[String],
    now: NaiveDateTime,
) -> Reply {
    let filter = match ChannelFilter::parse_args(filters) {
        Ok(filter) => filter,
        Err(e) => return Reply::text(e),
    };
    let channels = match state.catalog.channels.load() {
        Ok(channels) => channels,
        Err(e) => return failure(e, "load channels"),
    };
    let vod_items = match state.catalog.vod.load() {
        Ok(items) => items,
        Err(e) => return failure(e, "load VOD library"),
    };

    let request = PlaylistRequest {
        username,
        validity_days: days,
        generated_at: now,
        filter,
    };
    let doc = generate_playlist(&request, &channels, &vod_items, state.config.proxy.as_ref());
    tracing::info!(
        "Generated playlist for {} ({} channels, {} VOD, expires {})",
        request.username,
        doc.channel_count,
        doc.vod_count,
        doc.expiry_date()
    );

    let caption = format!(
        "User file generated!\n\nUser: {}\nExpires: {}\nLive Channels: {}\nVOD Items: {}\n\n\
         Open this .m3u file in VLC to watch.",
        request.username,
        doc.expiry_date(),
        doc.channel_count,
        doc.vod_count
    );
    Reply::Document {
        file_name: doc.file_name,
        content: doc.body.into_bytes(),
        caption,
    }
}

fn create_token(
    state: &AppState,
    username: String,
    days: u32,
    filters: &[String],
    now: NaiveDateTime,
) -> Reply {
    let filter = match ChannelFilter::parse_args(filters) {
        Ok(filter) => filter,
        Err(e) => return Reply::text(e),
    };

    let customer = Customer::new(username, days, filter.to_map(), now);
    let mut msg = format!(
        "Token created for {}\n\nToken: {}\nExpires: {}",
        customer.username,
        customer.token,
        customer.expires.format("%Y-%m-%d")
    );
    if let Some(url) = state.config.http.playlist_url(&customer.token) {
        msg.push_str(&format!("\nPlaylist: {}", url));
    }

    match state.catalog.customers.add(customer) {
        Ok(_) => Reply::text(msg),
        Err(e) => failure(e, "save customer"),
    }
}

fn list_customers(state: &AppState, now: NaiveDateTime) -> Reply {
    let customers = match state.catalog.customers.load() {
        Ok(customers) => customers,
        Err(e) => return failure(e, "load customers"),
    };
    if customers.is_empty() {
        return Reply::text("No customers yet. Use /createtoken to add one!");
    }

    let lines: Vec<String> = customers
        .iter()
        .map(|c| {
            let status = if !c.active {
                "inactive"
            } else if c.is_expired(now) {
                "expired"
            } else {
                "active"
            };
            format!(
                "{} ({}) expires {}, used {} times\n   {}",
                c.username,
                status,
                c.expires.format("%Y-%m-%d"),
                c.usage_count,
                c.token
            )
        })
        .collect();
    Reply::text(render_list(
        "Customers:",
        &lines,
        state.config.list_limit,
        "customers",
    ))
}

fn revoke(state: &AppState, token: &str) -> Reply {
    match state.catalog.customers.remove(token) {
        Ok(customer) => Reply::text(format!("Revoked token of {}", customer.username)),
        Err(e) => failure(e, "revoke token"),
    }
}

fn count<R: Record>(store: &crate::catalog::CatalogStore<R>) -> String {
    match store.load() {
        Ok(records) => records.len().to_string(),
        Err(e) => {
            tracing::error!("Failed to load {}: {}", R::COLLECTION, e);
            "unavailable".to_string()
        }
    }
}

fn stats(state: &AppState) -> Reply {
    Reply::text(format!(
        "Live Channels: {}\nVOD Items: {}\nCustomers: {}\nUptime: {}s",
        count(&state.catalog.channels),
        count(&state.catalog.vod),
        count(&state.catalog.customers),
        state.uptime_secs()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const ADMIN: i64 = 1001;
    const STRANGER: i64 = 2002;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn setup() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let mut config = BotConfig::default();
        config.admin_ids = vec![ADMIN];
        config.list_limit = 3;
        config.storage.data_dir = dir.path().to_path_buf();
        (dir, AppState::offline(config))
    }

    fn text(user: i64, text: &str) -> Incoming {
        Incoming {
            chat_id: 1,
            user_id: Some(user),
            content: Content::Text(text.to_string()),
            caption: None,
        }
    }

    fn send(state: &AppState, user: i64, msg: &str) -> String {
        match handle_incoming(state, &text(user, msg), now()) {
            Some(Reply::Text(t)) => t,
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_has_no_side_effects() {
        let (_dir, state) = setup();
        assert_eq!(send(&state, STRANGER, "/add BBC http://x"), UNAUTHORIZED);
        assert_eq!(send(&state, STRANGER, "/add"), UNAUTHORIZED);
        assert_eq!(send(&state, STRANGER, "/list"), UNAUTHORIZED);
        assert!(state.catalog.channels.load().unwrap().is_empty());
        assert!(!state.catalog.channels.path().exists());
    }

    #[test]
    fn test_help_is_public() {
        let (_dir, state) = setup();
        assert!(send(&state, STRANGER, "/start").contains("/generate"));
    }

    #[test]
    fn test_plain_text_is_ignored() {
        let (_dir, state) = setup();
        assert!(handle_incoming(&state, &text(ADMIN, "hello"), now()).is_none());
    }

    #[test]
    fn test_add_remove_channel() {
        let (_dir, state) = setup();
        assert_eq!(send(&state, ADMIN, "/add BBC http://x/bbc"), "Added live channel: BBC");
        assert_eq!(
            send(&state, ADMIN, "/add bbc http://x/other"),
            "Channel 'bbc' already exists!"
        );
        assert_eq!(send(&state, ADMIN, "/remove CNN"), "Channel 'CNN' not found");
        assert_eq!(send(&state, ADMIN, "/remove bbc"), "Removed channel: BBC");
        assert!(state.catalog.channels.load().unwrap().is_empty());
    }

    #[test]
    fn test_list_truncates_to_most_recent() {
        let (_dir, state) = setup();
        assert_eq!(
            send(&state, ADMIN, "/list"),
            "No channels yet. Use /add to add some!"
        );
        for name in ["A", "B", "C", "D", "E"] {
            send(&state, ADMIN, &format!("/add {} http://x/{}", name, name));
        }

        let list = send(&state, ADMIN, "/list");
        assert!(!list.contains("1. A"));
        assert!(list.contains("3. C [Live]"));
        assert!(list.contains("5. E [Live]"));
        assert!(list.contains("... and 2 more"));
        assert!(list.ends_with("Total: 5 channels"));
    }

    #[test]
    fn test_video_upload() {
        let (_dir, state) = setup();
        let upload = Incoming {
            chat_id: 1,
            user_id: Some(ADMIN),
            content: Content::Video(Upload {
                file_id: "FILE1".to_string(),
                file_name: Some("clip.mp4".to_string()),
                mime_type: Some("video/mp4".to_string()),
            }),
            caption: Some("Summer Trip".to_string()),
        };

        let reply = handle_incoming(&state, &upload, now()).unwrap();
        assert_eq!(
            reply,
            Reply::text("Added to VOD Library\n\nTitle: Summer Trip\nTotal VODs: 1")
        );
        let again = handle_incoming(&state, &upload, now()).unwrap();
        assert_eq!(again, Reply::text("This video is already in your VOD library"));
        assert_eq!(state.catalog.vod.load().unwrap().len(), 1);

        let mut stranger = upload.clone();
        stranger.user_id = Some(STRANGER);
        assert!(handle_incoming(&state, &stranger, now()).is_none());
    }

    #[test]
    fn test_multiline_caption_stays_one_entry() {
        let (_dir, state) = setup();
        let upload = Incoming {
            chat_id: 1,
            user_id: Some(ADMIN),
            content: Content::Video(Upload {
                file_id: "FILE9".to_string(),
                ..Default::default()
            }),
            caption: Some("Movie\nhttp://evil.example/x.ts".to_string()),
        };
        handle_incoming(&state, &upload, now());
        assert_eq!(
            state.catalog.vod.load().unwrap()[0].title,
            "Movie http://evil.example/x.ts"
        );

        let body = match handle_incoming(&state, &text(ADMIN, "/generate alice 30"), now()) {
            Some(Reply::Document { content, .. }) => String::from_utf8(content).unwrap(),
            other => panic!("unexpected reply {:?}", other),
        };
        let urls: Vec<&str> = body
            .lines()
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        assert!(urls.is_empty(), "{:?}", urls);
    }

    #[test]
    fn test_oversized_validity_is_a_usage_error() {
        let (_dir, state) = setup();
        assert_eq!(
            send(&state, ADMIN, "/generate alice 4000000000"),
            crate::bot::command::USAGE_GENERATE
        );
        assert_eq!(
            send(&state, ADMIN, "/createtoken alice 4000000000"),
            crate::bot::command::USAGE_CREATETOKEN
        );
        assert!(state.catalog.customers.load().unwrap().is_empty());
    }

    #[test]
    fn test_upload_title_fallbacks() {
        let (_dir, state) = setup();
        let mut upload = Incoming {
            chat_id: 1,
            user_id: Some(ADMIN),
            content: Content::Video(Upload {
                file_id: "F1".to_string(),
                ..Default::default()
            }),
            caption: None,
        };
        handle_incoming(&state, &upload, now());

        upload.content = Content::Document(Upload {
            file_id: "F2".to_string(),
            file_name: Some("movie.mkv".to_string()),
            mime_type: Some("video/x-matroska".to_string()),
        });
        handle_incoming(&state, &upload, now());

        let titles: Vec<String> = state
            .catalog
            .vod
            .load()
            .unwrap()
            .into_iter()
            .map(|v| v.title)
            .collect();
        assert_eq!(titles, vec!["Video_20240501_100000", "movie.mkv"]);
    }

    #[test]
    fn test_non_video_document() {
        let (_dir, state) = setup();
        let doc = Incoming {
            chat_id: 1,
            user_id: Some(ADMIN),
            content: Content::Document(Upload {
                file_id: "F".to_string(),
                file_name: Some("notes.pdf".to_string()),
                mime_type: Some("application/pdf".to_string()),
            }),
            caption: None,
        };
        assert_eq!(
            handle_incoming(&state, &doc, now()),
            Some(Reply::text("Please send a video file"))
        );
        assert!(state.catalog.vod.load().unwrap().is_empty());
    }

    #[test]
    fn test_generate_document() {
        let (_dir, state) = setup();
        send(&state, ADMIN, "/add BBC http://x/bbc News");
        send(&state, ADMIN, "/add ESPN http://x/espn Sports");

        let reply = handle_incoming(&state, &text(ADMIN, "/generate alice 30 group=News"), now());
        match reply {
            Some(Reply::Document {
                file_name,
                content,
                caption,
            }) => {
                assert_eq!(file_name, "alice_iptv.m3u");
                let body = String::from_utf8(content).unwrap();
                assert!(body.contains("# Expires: 2024-05-31"));
                assert!(body.contains(",BBC\nhttp://x/bbc\n"));
                assert!(!body.contains("ESPN"));
                assert!(caption.contains("Live Channels: 1"));
            }
            other => panic!("unexpected reply {:?}", other),
        }

        assert!(send(&state, ADMIN, "/generate alice 30 genre=x").contains("Unknown filter"));
        assert!(send(&state, ADMIN, "/generate alice").starts_with("Usage: /generate"));
    }

    #[test]
    fn test_tokens() {
        let (_dir, state) = setup();
        let reply = send(&state, ADMIN, "/createtoken bob 7 group=News");
        assert!(reply.contains("Token created for bob"));
        assert!(reply.contains("Expires: 2024-05-08"));

        let customers = state.catalog.customers.load().unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].filters.get("group").map(String::as_str), Some("News"));
        let token = customers[0].token.clone();

        assert!(send(&state, ADMIN, "/customers").contains("bob (active)"));
        assert_eq!(
            send(&state, ADMIN, &format!("/revoke {}", token)),
            "Revoked token of bob"
        );
        assert_eq!(
            send(&state, ADMIN, &format!("/revoke {}", token)),
            format!("Customer '{}' not found", token)
        );
    }

    #[test]
    fn test_corrupt_file_reply() {
        let (_dir, state) = setup();
        std::fs::write(state.catalog.channels.path(), "garbage").unwrap();
        assert_eq!(
            send(&state, ADMIN, "/list"),
            "Failed to load channels: the catalog file is corrupt"
        );
    }

    #[test]
    fn test_external_vod_and_stats() {
        let (_dir, state) = setup();
        assert_eq!(
            send(&state, ADMIN, "/addvod http://cdn/films/movie.mp4"),
            "Added to VOD Library\n\nTitle: movie.mp4\nTotal VODs: 1"
        );
        assert!(send(&state, ADMIN, "/vodlist").contains("1. movie.mp4\n   2024-05-01"));
        assert!(send(&state, ADMIN, "/stats").starts_with("Live Channels: 0\nVOD Items: 1\nCustomers: 0"));
        assert_eq!(
            send(&state, ADMIN, "/removevod http://cdn/films/movie.mp4"),
            "Removed VOD item: movie.mp4"
        );
    }

    #[test]
    fn test_unknown_command() {
        let (_dir, state) = setup();
        assert!(send(&state, ADMIN, "/frobnicate").starts_with("Unknown command /frobnicate"));
    }
}
