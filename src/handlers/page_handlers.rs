// src/handlers/page_handlers.rs
use actix_web::http::StatusCode;
use actix_web::http::header::{self, ContentType};
use actix_web::{HttpRequest, HttpResponse, ResponseError, get, post, web};
use chrono::Utc;
use log::{debug, error};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::dtos::post_dtos::{ComposeForm, CreatePostInput, GetPostByIdInput, GetPostsByUserIdInput};
use crate::dtos::profile_dtos::GetUserByUsernameInput;
use crate::error::ApiError;
use crate::middleware::auth_extractor::Caller;
use crate::middleware::origin_guard::AllowedOrigins;
use crate::procedures;
use crate::services::page_cache::{PageCache, post_key, profile_key};
use crate::views::{self, FAILED_TO_POST, HomeView};

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType(mime::TEXT_HTML_UTF_8))
        .body(body)
}

fn failure_page(err: &ApiError) -> HttpResponse {
    match err {
        ApiError::NotFound(_) => html(StatusCode::NOT_FOUND, views::not_found_page()),
        other => {
            error!("page render failed: {}", other);
            html(StatusCode::INTERNAL_SERVER_ERROR, views::error_page())
        }
    }
}

/// Message for the inline notification after a failed post.
fn toast_message(err: &ApiError) -> String {
    if let Some(msg) = err.field_error("content") {
        return msg.to_string();
    }
    let msg = err.public_message();
    if msg.trim().is_empty() { FAILED_TO_POST.to_string() } else { msg }
}

async fn render_home(state: &AppState, caller: &Caller, notice: Option<&str>, draft: &str) -> (StatusCode, String) {
    let now = Utc::now();
    match procedures::post::get_all(state).await {
        Ok(posts) => {
            let rpc_state = json!({ "post.getAll": { "data": &posts } });
            let page = views::home_page(
                &HomeView {
                    posts: Some(&posts),
                    signed_in: caller.user_id().is_some(),
                    notice,
                    draft,
                    state: Some(&rpc_state),
                },
                now,
            );
            (StatusCode::OK, page)
        }
        Err(e) => {
            error!("feed failed: {}", e);
            let page = views::home_page(
                &HomeView {
                    posts: None,
                    signed_in: caller.user_id().is_some(),
                    notice,
                    draft,
                    state: None,
                },
                now,
            );
            (StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}

/// GET /
#[get("/")]
pub async fn home(state: web::Data<AppState>, caller: Caller) -> HttpResponse {
    let (status, page) = render_home(&state, &caller, None, "").await;
    html(status, page)
}

/// POST /
/// Compose form. Redirects back to the feed on success, otherwise re-renders the
/// feed with the error shown inline.
#[post("/")]
pub async fn compose(
    state: web::Data<AppState>,
    origins: web::Data<AllowedOrigins>,
    req: HttpRequest,
    caller: Caller,
    form: web::Form<ComposeForm>,
) -> HttpResponse {
    if !origins.permits(&req) {
        return html(StatusCode::FORBIDDEN, views::error_page());
    }

    let content = form.into_inner().content;
    let input = CreatePostInput { content: content.clone() };

    match procedures::post::create(&state, &caller, input).await {
        Ok(post) => {
            debug!("compose created {}", post.id);
            HttpResponse::SeeOther().insert_header((header::LOCATION, "/")).finish()
        }
        Err(e) => {
            let status = e.status_code();
            let notice = toast_message(&e);
            let (_, page) = render_home(&state, &caller, Some(&notice), &content).await;
            html(status, page)
        }
    }
}

/// GET /post/{id}
#[get("/post/{id}")]
pub async fn single_post(
    state: web::Data<AppState>,
    pages: web::Data<PageCache>,
    id: web::Path<String>,
) -> HttpResponse {
    // Every spelling Uuid accepts maps to one cache entry.
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return failure_page(&ApiError::NotFound("Post not found".to_string()));
    };
    let key = post_key(&post_id);
    if let Some(page) = pages.get(&key) {
        return html(StatusCode::OK, page);
    }

    let id = post_id.to_string();
    match procedures::post::get_by_id(&state, GetPostByIdInput { id: id.clone() }).await {
        Ok(full) => {
            let rpc_state = json!({ "post.getById": { "input": { "id": id }, "data": &full } });
            let page = views::post_page(&full, &rpc_state, Utc::now());
            pages.put(&key, &page);
            html(StatusCode::OK, page)
        }
        Err(e) => failure_page(&e),
    }
}

/// GET /{slug}, profile pages live at `/@{username}`.
#[get("/{slug}")]
pub async fn profile(
    state: web::Data<AppState>,
    pages: web::Data<PageCache>,
    slug: web::Path<String>,
) -> HttpResponse {
    let slug = slug.into_inner();
    let username = slug.strip_prefix('@').unwrap_or(&slug).trim().to_string();
    // favicon.ico, robots.txt and friends are never usernames.
    if username.is_empty() || username.contains('.') {
        return failure_page(&ApiError::NotFound("User not found".to_string()));
    }

    let key = profile_key(&username);
    if let Some(page) = pages.get(&key) {
        return html(StatusCode::OK, page);
    }

    let user = match procedures::profile::get_user_by_username(
        &state,
        GetUserByUsernameInput { username: username.clone() },
    )
    .await
    {
        Ok(user) => user,
        Err(e) => return failure_page(&e),
    };

    let Some(display_name) = user.username.clone() else {
        return html(StatusCode::INTERNAL_SERVER_ERROR, views::error_page());
    };

    let posts = match procedures::post::get_posts_by_user_id(
        &state,
        GetPostsByUserIdInput { user_id: user.id.clone() },
    )
    .await
    {
        Ok(posts) => posts,
        Err(e) => return failure_page(&e),
    };

    let rpc_state = json!({
        "profile.getUserByUsername": { "input": { "username": username }, "data": &user },
        "post.getPostByUserId": { "input": { "userId": &user.id }, "data": &posts },
    });
    let page = views::profile_page(&user, &display_name, &posts, &rpc_state, Utc::now());
    pages.put(&key, &page);
    html(StatusCode::OK, page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session_services::SessionVerifier;
    use crate::test_support::{TEST_SECRET, harness, post_by, session_token};
    use actix_web::cookie::Cookie;
    use crate::middleware::auth_extractor::SESSION_COOKIE;
    use actix_web::http::header::ORIGIN;
    use actix_web::{App, test};

    macro_rules! app {
        ($state:expr, $pages:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(web::Data::new(SessionVerifier::from_secret(TEST_SECRET)))
                    .app_data($pages.clone())
                    .app_data(web::Data::new(AllowedOrigins::new(["http://localhost:3000"])))
                    .service(home)
                    .service(compose)
                    .service(single_post)
                    .service(profile),
            )
            .await
        };
    }

    fn pages() -> web::Data<PageCache> {
        web::Data::new(PageCache::new(None))
    }

    macro_rules! body_text {
        ($app:expr, $req:expr) => {{
            let resp = test::call_service($app, $req).await;
            let status = resp.status();
            let body = test::read_body(resp).await;
            (status, String::from_utf8(body.to_vec()).unwrap())
        }};
    }

    #[actix_web::test]
    async fn home_lists_feed() {
        let h = harness();
        h.posts.insert(post_by("u1", "🎉"));
        let app = app!(h.state.clone(), pages());

        let (status, body) = body_text!(&app, test::TestRequest::get().uri("/").to_request());
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("🎉"));
        assert!(body.contains("@alice"));
        assert!(body.contains("Sign in to post"));
        assert!(body.contains("__RPC_STATE__"));
    }

    #[actix_web::test]
    async fn compose_success_redirects() {
        let h = harness();
        let app = app!(h.state.clone(), pages());

        let req = test::TestRequest::post()
            .uri("/")
            .cookie(Cookie::new(SESSION_COOKIE, session_token("u1")))
            .set_form([("content", "🎉")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(h.posts.len(), 1);
    }

    #[actix_web::test]
    async fn compose_error_shows_field_message() {
        let h = harness();
        let app = app!(h.state.clone(), pages());

        let req = test::TestRequest::post()
            .uri("/")
            .cookie(Cookie::new(SESSION_COOKIE, session_token("u1")))
            .set_form([("content", "hello")])
            .to_request();
        let (status, body) = body_text!(&app, req);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Only Emojis are Allowed"));
        assert_eq!(h.posts.len(), 0);
    }

    #[actix_web::test]
    async fn compose_rate_limit_shows_message() {
        let h = harness();
        let app = app!(h.state.clone(), pages());

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/")
                .cookie(Cookie::new(SESSION_COOKIE, session_token("u2")))
                .set_form([("content", "🔥")])
                .to_request();
            let (status, body) = body_text!(&app, req);
            if status == StatusCode::TOO_MANY_REQUESTS {
                assert!(body.contains("You are doing that too much"));
            } else {
                assert_eq!(status, StatusCode::SEE_OTHER);
            }
        }
        assert_eq!(h.posts.len(), 1);
    }

    #[actix_web::test]
    async fn post_page_renders_and_is_cached() {
        let h = harness();
        let post = post_by("u2", "🌮");
        let id = post.id;
        h.posts.insert(post);
        let cache = pages();
        let app = app!(h.state.clone(), cache);

        let uri = format!("/post/{}", id);
        let (status, body) = body_text!(&app, test::TestRequest::get().uri(&uri).to_request());
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<title>🌮 - @bob | Chirp</title>"));
        assert!(cache.get(&post_key(&id)).is_some());
    }

    #[actix_web::test]
    async fn post_id_spellings_share_one_cache_entry() {
        let h = harness();
        let post = post_by("u1", "🎉");
        let id = post.id;
        h.posts.insert(post);
        let cache = pages();
        let app = app!(h.state.clone(), cache);

        let spellings = [
            id.to_string(),
            id.to_string().to_uppercase(),
            id.simple().to_string(),
            id.urn().to_string(),
        ];
        for spelling in &spellings {
            let uri = format!("/post/{}", spelling);
            let (status, _) = body_text!(&app, test::TestRequest::get().uri(&uri).to_request());
            assert_eq!(status, StatusCode::OK, "{}", spelling);
        }
        assert_eq!(cache.len(), 1);
    }

    #[actix_web::test]
    async fn missing_post_is_404_and_not_cached() {
        let h = harness();
        let cache = pages();
        let app = app!(h.state.clone(), cache);

        let (status, body) = body_text!(&app, test::TestRequest::get().uri("/post/nope").to_request());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("404"));
        assert_eq!(cache.len(), 0);
    }

    #[actix_web::test]
    async fn profile_strips_at_and_lists_posts() {
        let h = harness();
        h.posts.insert(post_by("u1", "🎉"));
        let app = app!(h.state.clone(), pages());

        let (status, body) = body_text!(&app, test::TestRequest::get().uri("/@alice").to_request());
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<title>alice | Chirp</title>"));
        assert!(body.contains("🎉"));

        let (status, body) = body_text!(&app, test::TestRequest::get().uri("/@bob").to_request());
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No posts yet"));
    }

    #[actix_web::test]
    async fn unknown_profile_is_404_view() {
        let h = harness();
        let app = app!(h.state.clone(), pages());

        let (status, body) = body_text!(&app, test::TestRequest::get().uri("/@nonexistent").to_request());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("<div>404</div>"));
    }

    #[actix_web::test]
    async fn cached_profile_served_without_lookup() {
        let h = harness();
        let cache = pages();
        cache.put(&profile_key("ghost"), "<p>cached</p>");
        let app = app!(h.state.clone(), cache);

        let (status, body) = body_text!(&app, test::TestRequest::get().uri("/@ghost").to_request());
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>cached</p>");
    }

    #[actix_web::test]
    async fn profile_slug_variants_share_one_cache_entry() {
        let h = harness();
        let cache = pages();
        let app = app!(h.state.clone(), cache);

        for uri in ["/@alice", "/alice", "/@Alice"] {
            let (status, body) = body_text!(&app, test::TestRequest::get().uri(uri).to_request());
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert!(body.contains("<title>alice | Chirp</title>"));
        }
        assert_eq!(cache.len(), 1);
    }

    #[actix_web::test]
    async fn dotted_slug_skips_identity_lookup() {
        let h = harness();
        let app = app!(h.state.clone(), pages());

        for uri in ["/favicon.ico", "/robots.txt", "/@a.b"] {
            let (status, _) = body_text!(&app, test::TestRequest::get().uri(uri).to_request());
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
        assert!(h.identity.username_lookups().is_empty());
    }

    #[actix_web::test]
    async fn compose_from_foreign_origin_is_forbidden() {
        let h = harness();
        let app = app!(h.state.clone(), pages());

        let req = test::TestRequest::post()
            .uri("/")
            .insert_header((ORIGIN, "https://evil.example"))
            .cookie(Cookie::new(SESSION_COOKIE, session_token("u1")))
            .set_form([("content", "🎉")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(h.posts.len(), 0);

        let req = test::TestRequest::post()
            .uri("/")
            .insert_header((ORIGIN, "http://localhost:3000"))
            .cookie(Cookie::new(SESSION_COOKIE, session_token("u1")))
            .set_form([("content", "🎉")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(h.posts.len(), 1);
    }

    #[actix_web::test]
    async fn toast_prefers_field_error() {
        let mut field_errors = std::collections::BTreeMap::new();
        field_errors.insert("content".to_string(), vec!["Only Emojis are Allowed".to_string()]);
        assert_eq!(toast_message(&ApiError::Validation { field_errors }), "Only Emojis are Allowed");
        assert_eq!(toast_message(&ApiError::TooManyRequests), crate::error::TOO_MANY_REQUESTS_MESSAGE);
        assert_eq!(toast_message(&ApiError::BadRequest(String::new())), FAILED_TO_POST);
    }
}
