//! End-to-end integration tests

use crate::bot::{handle_incoming, Reply};
use crate::catalog::StorageFormat;
use crate::config::ProxyConfig;
use crate::http::handlers::customer_playlist;
use crate::integration::fixtures::{
    clock, news_and_sports, text_from, video_from, TestBot, ADMIN_ID, USER_ID,
};
use crate::integration::validation::{header_value, validate_m3u};
use crate::state::AppState;

const ALL_FORMATS: [StorageFormat; 3] = [
    StorageFormat::Json,
    StorageFormat::Csv,
    StorageFormat::JsonLines,
];

fn say(state: &AppState, user: i64, text: &str) -> Option<Reply> {
    handle_incoming(state, &text_from(user, text), clock())
}

fn playlist_body(reply: Option<Reply>) -> String {
    match reply {
        Some(Reply::Document { content, .. }) => String::from_utf8(content).unwrap(),
        other => panic!("expected a document, got {:?}", other),
    }
}

#[test]
fn test_admin_session_every_format() {
    for format in ALL_FORMATS {
        let bot = TestBot::new(format);
        let state = &bot.state;

        for command in news_and_sports() {
            assert!(matches!(say(state, ADMIN_ID, &command), Some(Reply::Text(t)) if t.starts_with("Added")));
        }
        handle_incoming(state, &video_from(ADMIN_ID, "VID1", Some("Match Highlights")), clock());
        handle_incoming(state, &video_from(ADMIN_ID, "VID2", None), clock());
        say(state, ADMIN_ID, "/remove cnn");

        // Everything survives a restart
        let restarted = bot.restart();
        let body = playlist_body(say(&restarted, ADMIN_ID, "/generate alice 30"));
        let result = validate_m3u(&body);
        assert!(result.is_valid, "{:?}: {:?}", format, result.errors);
        assert_eq!(result.entries.len(), 4, "{:?}", format);
        assert!(!body.contains("CNN"));
        assert!(body.contains("VOD Instructions\",Match Highlights"));
        assert!(body.contains("VOD Instructions\",vid2.mp4"));
        assert_eq!(header_value(&body, "# Expires: "), Some("2024-10-01"));
        assert_eq!(header_value(&body, "# Generated: "), Some("2024-09-01 20:15:30"));
    }
}

#[test]
fn test_news_filter() {
    let bot = TestBot::new(StorageFormat::Json);
    for command in news_and_sports() {
        say(&bot.state, ADMIN_ID, &command);
    }

    let body = playlist_body(say(&bot.state, ADMIN_ID, "/generate bob 7 group=News"));
    let result = validate_m3u(&body);
    assert!(result.is_valid, "{:?}", result.errors);
    assert_eq!(result.entries.len(), 3);
    assert!(result
        .entries
        .iter()
        .all(|(directive, _)| directive.contains("group-title=\"News\"")));
}

#[test]
fn test_non_admin_cannot_change_anything() {
    let bot = TestBot::new(StorageFormat::Csv);
    say(&bot.state, ADMIN_ID, "/add BBC http://x/bbc");

    for command in ["/add CNN http://x/cnn", "/remove BBC", "/generate eve 30", "/revoke x"] {
        assert_eq!(
            say(&bot.state, USER_ID, command),
            Some(Reply::text("Unauthorized"))
        );
    }
    assert!(handle_incoming(&bot.state, &video_from(USER_ID, "V", None), clock()).is_none());

    let channels = bot.state.catalog.channels.load().unwrap();
    assert_eq!(channels.len(), 1);
    assert!(bot.state.catalog.vod.load().unwrap().is_empty());
}

#[test]
fn test_proxy_rewrites_uploads() {
    let bot = TestBot::with_config(StorageFormat::JsonLines, |config| {
        config.proxy = Some(ProxyConfig::new("https://proxy.example", "pw"));
    });
    handle_incoming(&bot.state, &video_from(ADMIN_ID, "VID1", Some("Clip")), clock());

    let body = playlist_body(say(&bot.state, ADMIN_ID, "/generate alice 30"));
    let result = validate_m3u(&body);
    assert!(result.is_valid, "{:?}", result.errors);
    assert_eq!(
        result.entries,
        vec![(
            "#EXTINF:-1 type=\"vod\" group-title=\"VOD\",Clip".to_string(),
            "https://proxy.example/proxy/telegram/VID1/stream.mp4?api_password=pw".to_string()
        )]
    );
}

#[test]
fn test_token_lifecycle() {
    let bot = TestBot::new(StorageFormat::Csv);
    for command in news_and_sports() {
        say(&bot.state, ADMIN_ID, &command);
    }
    say(&bot.state, ADMIN_ID, "/createtoken carol 30 group=Sports");
    let token = bot.state.catalog.customers.load().unwrap()[0].token.clone();

    let doc = customer_playlist(&bot.state, &token, clock()).unwrap();
    let result = validate_m3u(&doc.body);
    assert!(result.is_valid, "{:?}", result.errors);
    assert_eq!(result.entries.len(), 2);
    assert_eq!(doc.file_name, "carol_iptv.m3u");

    customer_playlist(&bot.state, &token, clock()).unwrap();
    let stored = bot.restart().catalog.customers.find(&token).unwrap().unwrap();
    assert_eq!(stored.usage_count, 2);

    say(&bot.state, ADMIN_ID, &format!("/revoke {}", token));
    assert!(customer_playlist(&bot.state, &token, clock()).is_err());
}

#[test]
fn test_reads_files_written_by_legacy_bot() {
    let bot = TestBot::new(StorageFormat::Json);
    std::fs::write(
        bot.state.catalog.channels.path(),
        r#"[
  {
    "name": "BBC",
    "url": "http://example.com/bbc.m3u8",
    "group": "Live",
    "added": "2024-08-01T10:00:00.123456",
    "added_by": 7001
  }
]"#,
    )
    .unwrap();
    std::fs::write(
        bot.state.catalog.vod.path(),
        r#"[{"file_id": "BAAC", "title": "Old Movie", "added": "2024-08-02T11:00:00", "added_by": 7001}]"#,
    )
    .unwrap();

    assert_eq!(
        say(&bot.state, ADMIN_ID, "/add bbc http://other"),
        Some(Reply::text("Channel 'bbc' already exists!"))
    );
    let body = playlist_body(say(&bot.state, ADMIN_ID, "/generate alice 1"));
    assert!(body.contains("group-title=\"Live\",BBC\nhttp://example.com/bbc.m3u8\n"));
    assert!(body.contains("# File ID: BAAC"));
}
