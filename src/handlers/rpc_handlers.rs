// src/handlers/rpc_handlers.rs
use actix_web::{HttpResponse, get, post, web};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::auth_extractor::Caller;
use crate::procedures::{self, parse_input};

#[derive(Deserialize)]
pub struct RpcQuery {
    input: Option<String>,
}

#[derive(Serialize)]
struct RpcResult<T: Serialize> {
    data: T,
}

#[derive(Serialize)]
struct RpcResponse<T: Serialize> {
    result: RpcResult<T>,
}

fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(RpcResponse {
        result: RpcResult { data },
    })
}

fn no_procedure(kind: &str, path: &str) -> ApiError {
    ApiError::NotFound(format!("No \"{}\"-procedure on path \"{}\"", kind, path))
}

/// Run a query procedure by name.
pub async fn dispatch_query(state: &AppState, path: &str, raw_input: Option<&str>) -> Result<Value, ApiError> {
    let value = match path {
        "post.getAll" => {
            parse_input::<()>(raw_input)?;
            serde_json::to_value(procedures::post::get_all(state).await?)
        }
        "post.getById" => serde_json::to_value(procedures::post::get_by_id(state, parse_input(raw_input)?).await?),
        "post.getPostByUserId" => {
            serde_json::to_value(procedures::post::get_posts_by_user_id(state, parse_input(raw_input)?).await?)
        }
        "profile.getUserByUsername" => {
            serde_json::to_value(procedures::profile::get_user_by_username(state, parse_input(raw_input)?).await?)
        }
        other => return Err(no_procedure("query", other)),
    };
    value.map_err(|e| ApiError::Internal(format!("serialize {}: {}", path, e)))
}

/// GET /api/trpc/{procedure}?input=<json>
#[get("/api/trpc/{procedure}")]
pub async fn rpc_query(
    state: web::Data<AppState>,
    procedure: web::Path<String>,
    query: web::Query<RpcQuery>,
) -> Result<HttpResponse, ApiError> {
    debug!("rpc query {}", procedure);
    let data = dispatch_query(&state, &procedure, query.input.as_deref()).await?;
    Ok(ok(data))
}

/// POST /api/trpc/{procedure} with the input as JSON body
#[post("/api/trpc/{procedure}")]
pub async fn rpc_mutation(
    state: web::Data<AppState>,
    caller: Caller,
    procedure: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    debug!("rpc mutation {}", procedure);
    let raw = std::str::from_utf8(&body).map_err(|_| ApiError::BadRequest("Body is not UTF-8".to_string()))?;

    match procedure.as_str() {
        "post.create" => {
            // Gate before looking at the input at all.
            caller.require()?;
            let post = procedures::post::create(&state, &caller, parse_input(Some(raw))?).await?;
            Ok(ok(post))
        }
        other => Err(no_procedure("mutation", other)),
    }
}
