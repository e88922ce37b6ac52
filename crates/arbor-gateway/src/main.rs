// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HTTP gateway for the Arbor family-graph service.
//! Browsers speak JSON over HTTP; the gateway authenticates the bearer
//! credential, scopes every store call by the resolved owner, and feeds the
//! renderer the reconstructed tree.

use std::{
    collections::HashMap,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, OnceLock},
};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arbor_core::{
    linker, root, AuthError, IdentityProvider, MemberDraft, MemberStore, StoreError, UserProfile,
};
use arbor_graph::{tree, MemberIndex, OwnerId};
use arbor_proto::{
    parse_id_filter, CreateMemberRequest, CreateMemberResponse, ErrorBody, MembersResponse,
    RootResponse, TreeResponse, UserResponse,
};
use arbor_store_fs::FsMemberStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Arbor family-graph gateway")]
struct Args {
    /// TCP listener for clients (e.g. 0.0.0.0:8780)
    #[arg(long, default_value = "0.0.0.0:8780")]
    listen: SocketAddr,
    /// Directory holding the per-owner forest files. Defaults to the
    /// platform data dir.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// JSON file mapping bearer tokens to identities
    #[arg(long, default_value = "arbor-tokens.json")]
    auth_file: PathBuf,
}

/// Shared handle to the one store instance of the process.
type SharedStore = Arc<Mutex<FsMemberStore>>;

/// Lazily-initialized store cell.
///
/// The store opens on first use, and exactly one instance is ever handed out:
/// a racing initializer may open a second adapter, but only the cell winner
/// becomes the canonical handle and the loser is dropped unused before any
/// request touches it.
struct StoreCell {
    data_dir: PathBuf,
    cell: OnceLock<SharedStore>,
}

impl StoreCell {
    fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            cell: OnceLock::new(),
        }
    }

    fn shared(&self) -> Result<SharedStore, StoreError> {
        if let Some(existing) = self.cell.get() {
            return Ok(Arc::clone(existing));
        }
        let fresh = Arc::new(Mutex::new(FsMemberStore::open(&self.data_dir)?));
        Ok(Arc::clone(self.cell.get_or_init(|| fresh)))
    }
}

/// Static bearer-token table standing in for the auth collaborator.
///
/// Credential issuance and validation live outside this service; the gateway
/// only consumes resolved identities.
#[derive(Debug, Default)]
struct TokenTable {
    entries: HashMap<String, UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenEntry {
    token: String,
    owner: String,
    name: String,
    image_url: String,
}

impl TokenTable {
    fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("read auth table {}", path.display()))?;
        let entries: Vec<TokenEntry> = serde_json::from_slice(&raw)
            .with_context(|| format!("parse auth table {}", path.display()))?;
        let entries = entries
            .into_iter()
            .map(|e| {
                (
                    e.token,
                    UserProfile {
                        owner: OwnerId::new(e.owner),
                        name: e.name,
                        image_url: e.image_url,
                    },
                )
            })
            .collect();
        Ok(Self { entries })
    }
}

impl IdentityProvider for TokenTable {
    fn resolve(&self, token: &str) -> Result<UserProfile, AuthError> {
        self.entries.get(token).cloned().ok_or(AuthError::Unauthorized)
    }
}

struct AppState {
    auth: TokenTable,
    store: StoreCell,
}

impl AppState {
    fn authenticate(&self, headers: &HeaderMap) -> Result<UserProfile, ApiError> {
        let token = bearer_token(headers).ok_or(ApiError::Auth(AuthError::Unauthorized))?;
        self.auth.resolve(token).map_err(ApiError::Auth)
    }
}

/// Everything a handler can fail with, mapped onto HTTP statuses.
#[derive(Debug)]
enum ApiError {
    Auth(AuthError),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, name) = match &self {
            Self::Auth(AuthError::Unauthorized) => (StatusCode::UNAUTHORIZED, "E_UNAUTHORIZED"),
            Self::Store(StoreError::Validation { .. }) => (StatusCode::BAD_REQUEST, "E_VALIDATION"),
            Self::Store(StoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, "E_NOT_FOUND"),
            Self::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "E_CONFLICT"),
            Self::Store(
                StoreError::Io(_) | StoreError::Serde(_) | StoreError::Other(_),
            ) => (StatusCode::INTERNAL_SERVER_ERROR, "E_INTERNAL"),
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Adapter details go to the log, not the wire.
            match &self {
                Self::Auth(err) => warn!(%err, "internal error"),
                Self::Store(err) => warn!(%err, "internal error"),
            }
            "internal server error".to_string()
        } else {
            match &self {
                Self::Auth(err) => err.to_string(),
                Self::Store(err) => err.to_string(),
            }
        };
        let body = ErrorBody::new(status.as_u16(), name, message);
        (status, Json(body)).into_response()
    }
}

/// Extract the bearer credential. A bare token without the `Bearer` prefix is
/// accepted too.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = raw.strip_prefix("Bearer ").map_or(raw, str::trim_start);
    (!token.is_empty()).then_some(token)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => FsMemberStore::default_dir().context("resolve data dir")?,
    };
    let auth = TokenTable::load(&args.auth_file)?;

    let state = Arc::new(AppState {
        auth,
        store: StoreCell::new(data_dir),
    });

    let app = Router::new()
        .route("/api/member", post(create_member).get(list_members))
        .route("/api/member/root", get(fetch_root))
        .route("/api/member/tree", get(fetch_tree))
        .route("/api/user", get(fetch_user))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("arbor gateway listening on {}", args.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn create_member(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateMemberRequest>,
) -> Result<Json<CreateMemberResponse>, ApiError> {
    let profile = state.authenticate(&headers)?;
    let shared = state.store.shared()?;
    let mut store = shared.lock().await;
    store.upsert_user(&profile)?;

    let draft = MemberDraft {
        name: req.name,
        image_url: req.image_url,
        relation: req.relation,
        linked_to: req.linked_to,
        display_relation: req.display_relation,
    };
    let member = linker::create_linked(&mut *store, &profile.owner, draft)?;
    info!(owner = %profile.owner, member = %member.id, relation = member.relation.as_str(), "member added");

    Ok(Json(CreateMemberResponse {
        message: "Member added successfully".into(),
        member,
    }))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    ids: Option<String>,
}

async fn list_members(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<MembersResponse>, ApiError> {
    let profile = state.authenticate(&headers)?;
    let filter = query.ids.as_deref().map(parse_id_filter);
    let shared = state.store.shared()?;
    let store = shared.lock().await;
    let members = store.members_for(&profile.owner, filter.as_deref())?;
    Ok(Json(MembersResponse { members }))
}

async fn fetch_root(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RootResponse>, ApiError> {
    let profile = state.authenticate(&headers)?;
    let shared = state.store.shared()?;
    let mut store = shared.lock().await;
    store.upsert_user(&profile)?;
    let root = root::resolve_root(&mut *store, &profile)?;
    Ok(Json(RootResponse { root }))
}

async fn fetch_tree(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TreeResponse>, ApiError> {
    let profile = state.authenticate(&headers)?;
    let shared = state.store.shared()?;
    let mut store = shared.lock().await;
    store.upsert_user(&profile)?;
    let root = root::resolve_root(&mut *store, &profile)?;
    let members = store.members_for(&profile.owner, None)?;
    let index = MemberIndex::build(&members);
    let node = tree::build_tree(&index, &root, tree::TreeMode::Full, true);
    Ok(Json(TreeResponse { tree: node }))
}

async fn fetch_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let profile = state.authenticate(&headers)?;
    let shared = state.store.shared()?;
    let mut store = shared.lock().await;
    store.upsert_user(&profile)?;
    let user = store
        .user(&profile.owner)?
        .ok_or(StoreError::NotFound { what: "user" })?;
    Ok(Json(UserResponse { user }))
}
