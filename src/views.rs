//! HTML for the server-rendered pages.
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::dtos::post_dtos::FullPost;
use crate::models::user::PublicUser;

pub const FAILED_TO_POST: &str = "Failed to post, please try again later";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// "a few seconds ago", "5 minutes ago", "a day ago", ...
pub fn relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds().max(0);
    let plural = |n: i64, unit: &str, one: &str| {
        if n <= 1 {
            format!("{} {} ago", one, unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    };
    match secs {
        0..=44 => "a few seconds ago".to_string(),
        45..=89 => "a minute ago".to_string(),
        90..=2_699 => plural((secs + 30) / 60, "minute", "a"),
        2_700..=5_399 => "an hour ago".to_string(),
        5_400..=75_599 => plural((secs + 1_800) / 3_600, "hour", "an"),
        75_600..=129_599 => "a day ago".to_string(),
        129_600..=2_246_399 => plural((secs + 43_200) / 86_400, "day", "a"),
        2_246_400..=3_887_999 => "a month ago".to_string(),
        3_888_000..=27_647_999 => plural((secs + 1_296_000) / 2_592_000, "month", "a"),
        _ => plural(((secs as f64) / 31_536_000.0).round() as i64, "year", "a"),
    }
}

fn layout(title: &str, body: &str, state: Option<&Value>) -> String {
    let state_script = state
        .map(|s| {
            // `<` is escaped so the payload cannot close the script tag.
            let json = s.to_string().replace('<', "\\u003c");
            format!(r#"<script id="__RPC_STATE__" type="application/json">{}</script>"#, json)
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<main class="page">
{body}
</main>
{state_script}
</body>
</html>
"#,
        title = escape(title),
        body = body,
        state_script = state_script,
    )
}

pub fn post_view(full: &FullPost, now: DateTime<Utc>) -> String {
    let username = escape(&full.author.username);
    let profile_href = format!("/@{}", urlencoding::encode(&full.author.username));
    format!(
        r#"<article class="post" data-post-id="{id}">
<img class="avatar" src="{avatar}" alt="@{username}'s profile picture" width="56" height="56">
<div class="post-body">
<div class="post-meta"><a href="{profile_href}">@{username}</a> <a href="/post/{id}">· {when}</a></div>
<p class="post-content">{content}</p>
</div>
</article>"#,
        id = full.post.id,
        avatar = escape(&full.author.profile_picture),
        username = username,
        profile_href = escape(&profile_href),
        when = escape(&relative_time(full.post.created_at, now)),
        content = escape(&full.post.content),
    )
}

pub fn feed(posts: &[FullPost], now: DateTime<Utc>) -> String {
    if posts.is_empty() {
        return r#"<div class="feed empty">No posts yet</div>"#.to_string();
    }
    let items: Vec<String> = posts.iter().map(|p| post_view(p, now)).collect();
    format!("<div class=\"feed\">\n{}\n</div>", items.join("\n"))
}

pub struct HomeView<'a> {
    /// `None` when the feed could not be loaded.
    pub posts: Option<&'a [FullPost]>,
    pub signed_in: bool,
    pub notice: Option<&'a str>,
    /// Previous input, kept in the box after a failed post.
    pub draft: &'a str,
    pub state: Option<&'a Value>,
}

pub fn home_page(view: &HomeView<'_>, now: DateTime<Utc>) -> String {
    let header = if view.signed_in {
        format!(
            r#"<form class="compose" method="post" action="/">
<input type="text" name="content" placeholder="Type some emojis!" value="{}" autocomplete="off">
<button type="submit">Post</button>
</form>"#,
            escape(view.draft)
        )
    } else {
        r#"<div class="sign-in">Sign in to post</div>"#.to_string()
    };

    let notice = view
        .notice
        .map(|n| format!(r#"<div class="toast error" role="alert">{}</div>"#, escape(n)))
        .unwrap_or_default();

    let feed_html = match view.posts {
        Some(posts) => feed(posts, now),
        None => "<div>Something went wrong</div>".to_string(),
    };

    layout("Chirp", &format!("{}\n{}\n{}", header, notice, feed_html), view.state)
}

pub fn post_page(full: &FullPost, state: &Value, now: DateTime<Utc>) -> String {
    let title = format!("{} - @{} | Chirp", full.post.content, full.author.username);
    layout(&title, &post_view(full, now), Some(state))
}

pub fn profile_page(user: &PublicUser, username: &str, posts: &[FullPost], state: &Value, now: DateTime<Utc>) -> String {
    let body = format!(
        r#"<header class="profile">
<img class="avatar large" src="{avatar}" alt="@{username}'s profile picture" width="128" height="128">
<h1>@{username}</h1>
</header>
{feed}"#,
        avatar = escape(&user.profile_picture),
        username = escape(username),
        feed = feed(posts, now),
    );
    layout(&format!("{} | Chirp", username), &body, Some(state))
}

pub fn not_found_page() -> String {
    layout("404 | Chirp", "<div>404</div>", None)
}

pub fn error_page() -> String {
    layout("Chirp", "<div>Something went wrong</div>", None)
}
