//! Text command parsing

/// A parsed bot command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Help,
    Add {
        name: String,
        url: String,
        group: Option<String>,
    },
    Remove {
        name: String,
    },
    List,
    VodList,
    AddVod {
        url: String,
        title: Option<String>,
    },
    RemoveVod {
        key: String,
    },
    Generate {
        username: String,
        days: u32,
        filters: Vec<String>,
    },
    CreateToken {
        username: String,
        days: u32,
        filters: Vec<String>,
    },
    Customers,
    Revoke {
        token: String,
    },
    Stats,
    Unknown(String),
}

/// Longest validity accepted for playlists and tokens
pub const MAX_VALIDITY_DAYS: u32 = 36500;

pub const USAGE_ADD: &str = "Usage: /add NAME URL [GROUP]\nExample: /add BBC http://example.com/stream.m3u8";
pub const USAGE_REMOVE: &str = "Usage: /remove NAME";
pub const USAGE_ADDVOD: &str = "Usage: /addvod URL [TITLE]";
pub const USAGE_REMOVEVOD: &str = "Usage: /removevod FILE_ID|URL";
pub const USAGE_GENERATE: &str =
    "Usage: /generate USERNAME DAYS [key=value ...]\nExample: /generate john 30 group=News";
pub const USAGE_CREATETOKEN: &str = "Usage: /createtoken USERNAME DAYS [key=value ...]";
pub const USAGE_REVOKE: &str = "Usage: /revoke TOKEN";

pub const HELP_TEXT: &str = "IPTV Bot\n\n\
Commands:\n\
/add NAME URL [GROUP] - Add live channel\n\
/list - List live channels\n\
/remove NAME - Remove channel\n\
Send any video - Add to VOD library\n\
/addvod URL [TITLE] - Add external VOD\n\
/vodlist - List VOD items\n\
/removevod FILE_ID|URL - Remove VOD item\n\
/generate USERNAME DAYS [key=value ...] - Create user playlist\n\
/createtoken USERNAME DAYS [key=value ...] - Issue playlist token\n\
/customers - List tokens\n\
/revoke TOKEN - Revoke token\n\
/stats - Catalog counts\n\n\
Filters: group, country, language, quality, category, tag\n\n\
Example:\n/add BBC http://example.com/stream.m3u8";

impl Command {
    /// Parse a message. Returns `None` for text that is not a command and
    /// `Some(Err(usage))` for a known command with bad arguments.
    pub fn parse(text: &str) -> Option<Result<Command, &'static str>> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;

        let mut parts = rest.split_whitespace();
        let head = parts.next()?;
        // "/add@my_bot" addresses a specific bot in group chats
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let args: Vec<&str> = parts.collect();

        let command = match name.as_str() {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "add" => match args.as_slice() {
                [name, url, group @ ..] => Ok(Command::Add {
                    name: name.to_string(),
                    url: url.to_string(),
                    group: join_rest(group),
                }),
                _ => Err(USAGE_ADD),
            },
            "remove" => match args.first() {
                Some(name) => Ok(Command::Remove {
                    name: name.to_string(),
                }),
                None => Err(USAGE_REMOVE),
            },
            "list" => Ok(Command::List),
            "vodlist" => Ok(Command::VodList),
            "addvod" => match args.as_slice() {
                [url, title @ ..] => Ok(Command::AddVod {
                    url: url.to_string(),
                    title: join_rest(title),
                }),
                _ => Err(USAGE_ADDVOD),
            },
            "removevod" => match args.first() {
                Some(key) => Ok(Command::RemoveVod {
                    key: key.to_string(),
                }),
                None => Err(USAGE_REMOVEVOD),
            },
            "generate" => parse_user_days(&args)
                .map(|(username, days, filters)| Command::Generate {
                    username,
                    days,
                    filters,
                })
                .ok_or(USAGE_GENERATE),
            "createtoken" => parse_user_days(&args)
                .map(|(username, days, filters)| Command::CreateToken {
                    username,
                    days,
                    filters,
                })
                .ok_or(USAGE_CREATETOKEN),
            "customers" => Ok(Command::Customers),
            "revoke" => match args.first() {
                Some(token) => Ok(Command::Revoke {
                    token: token.to_string(),
                }),
                None => Err(USAGE_REVOKE),
            },
            "stats" => Ok(Command::Stats),
            other => Ok(Command::Unknown(other.to_string())),
        };

        Some(command)
    }

    /// Commands anyone may run
    pub fn is_public(&self) -> bool {
        matches!(self, Command::Start | Command::Help)
    }
}

fn join_rest(parts: &[&str]) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn parse_user_days(args: &[&str]) -> Option<(String, u32, Vec<String>)> {
    match args {
        [username, days, filters @ ..] => {
            let days = days
                .parse::<u32>()
                .ok()
                .filter(|d| (1..=MAX_VALIDITY_DAYS).contains(d))?;
            Some((
                username.to_string(),
                days,
                filters.iter().map(|f| f.to_string()).collect(),
            ))
        }
        _ => None,
    }
}
