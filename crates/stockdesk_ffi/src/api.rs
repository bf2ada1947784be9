//! FFI state API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose slot get/set/clear and the route guard to Dart via FRB.
//! - Own the one process-wide `Session` the UI shares.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Errors are reported in envelopes (`ok=false` + message), never thrown.
//! - The state database path is fixed once the session is first used.

use log::warn;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use stockdesk_core::slot::SlotValue;
use stockdesk_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, logout,
    open_api_url, open_branch, open_lsu, open_user, open_warehouse, ping as ping_inner, Branch,
    CoreConfig, Permissions, PersistedSlot, RouteDecision, RouteGuard, Session, SlotResult,
    SqliteKvStore, UserProfile, Warehouse,
};

static STATE_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static SESSION: OnceCell<Session> = OnceCell::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
/// Repeating the same `level + log_dir` is accepted; changing either is not.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Pins the state database path before the first state call.
///
/// Returns an empty string on success. Fails once a path is already fixed,
/// including the default one resolved by an earlier state call.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_state_db_path(path: String) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "state db path cannot be empty".to_string();
    }
    match STATE_DB_PATH.set(PathBuf::from(trimmed)) {
        Ok(()) => String::new(),
        Err(_) => format!(
            "state db path already fixed at `{}`",
            resolve_state_db_path().display()
        ),
    }
}

/// Generic mutation envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateActionResponse {
    pub ok: bool,
    pub message: String,
}

impl StateActionResponse {
    fn from_result(action: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                message: format!("{action} ok."),
            },
            Err(err) => Self {
                ok: false,
                message: format!("{action} failed: {err}"),
            },
        }
    }
}

/// Branch or warehouse selection. `id == 0` means none selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResponse {
    pub ok: bool,
    pub item: Option<SelectionItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserItem {
    pub id: i64,
    pub name: String,
    pub role: String,
    /// JSON object, `{"all":false}` when nothing was granted.
    pub permissions_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub ok: bool,
    pub item: Option<UserItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub ok: bool,
    pub value: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuardResponse {
    pub ok: bool,
    /// Target route when the navigation must be redirected.
    pub redirect_to: Option<String>,
    pub message: String,
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_get_branch() -> SelectionResponse {
    selection_response(read_slot(open_branch, |branch| SelectionItem {
        id: branch.id,
        label: branch.label,
    }))
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_set_branch(id: i64, label: String) -> StateActionResponse {
    let branch = Branch::new(id, label.trim());
    StateActionResponse::from_result("state_set_branch", write_slot(open_branch, Some(branch)))
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_clear_branch() -> StateActionResponse {
    StateActionResponse::from_result("state_clear_branch", write_slot(open_branch, None))
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_get_warehouse() -> SelectionResponse {
    selection_response(read_slot(open_warehouse, |wh| SelectionItem {
        id: wh.id,
        label: wh.label,
    }))
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_set_warehouse(id: i64, label: String) -> StateActionResponse {
    let warehouse = Warehouse::new(id, label.trim());
    StateActionResponse::from_result(
        "state_set_warehouse",
        write_slot(open_warehouse, Some(warehouse)),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_clear_warehouse() -> StateActionResponse {
    StateActionResponse::from_result("state_clear_warehouse", write_slot(open_warehouse, None))
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_get_user() -> UserResponse {
    match read_slot(open_user, to_user_item) {
        Ok(item) => UserResponse {
            ok: true,
            item: Some(item),
            message: String::new(),
        },
        Err(err) => UserResponse {
            ok: false,
            item: None,
            message: format!("state_get_user failed: {err}"),
        },
    }
}

/// Stores the signed-in user.
///
/// `permissions_json` may be empty for "no access"; otherwise it must be a
/// JSON object.
#[flutter_rust_bridge::frb(sync)]
pub fn state_set_user(
    id: i64,
    name: String,
    role: String,
    permissions_json: String,
) -> StateActionResponse {
    let result = parse_permissions(&permissions_json).and_then(|permissions| {
        let profile =
            UserProfile::new(id, name.trim(), role.trim()).with_permissions(permissions);
        write_slot(open_user, Some(profile))
    });
    StateActionResponse::from_result("state_set_user", result)
}

/// Signs the user out. Shared slots stay registered and branch and
/// warehouse selections stay persisted.
#[flutter_rust_bridge::frb(sync)]
pub fn state_logout() -> StateActionResponse {
    let result = with_session(|session| logout(session).map_err(|err| err.to_string()));
    StateActionResponse::from_result("state_logout", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_get_api_url() -> TextResponse {
    text_response("state_get_api_url", read_slot(open_api_url, |url| url))
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_set_api_url(url: String) -> StateActionResponse {
    let url = url.trim().to_string();
    let value = (!url.is_empty()).then_some(url);
    StateActionResponse::from_result("state_set_api_url", write_slot(open_api_url, value))
}

#[flutter_rust_bridge::frb(sync)]
pub fn state_get_lsu() -> TextResponse {
    text_response("state_get_lsu", read_slot(open_lsu, |lsu| lsu))
}

/// Stores the LSU text; an empty string clears it.
#[flutter_rust_bridge::frb(sync)]
pub fn state_set_lsu(value: String) -> StateActionResponse {
    let value = (!value.is_empty()).then_some(value);
    StateActionResponse::from_result("state_set_lsu", write_slot(open_lsu, value))
}

/// Evaluates the landing-page guard for one navigation.
#[flutter_rust_bridge::frb(sync)]
pub fn route_guard_evaluate(from: String, to: String) -> RouteGuardResponse {
    let result = with_session(|session| {
        RouteGuard::default()
            .evaluate(&from, &to, session.store().as_ref())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(RouteDecision::Redirect(target)) => RouteGuardResponse {
            ok: true,
            redirect_to: Some(target),
            message: String::new(),
        },
        Ok(RouteDecision::Proceed) => RouteGuardResponse {
            ok: true,
            redirect_to: None,
            message: String::new(),
        },
        Err(err) => RouteGuardResponse {
            ok: false,
            redirect_to: None,
            message: format!("route_guard_evaluate failed: {err}"),
        },
    }
}

fn resolve_state_db_path() -> PathBuf {
    STATE_DB_PATH
        .get_or_init(|| CoreConfig::from_env().db_path)
        .clone()
}

fn with_session<R>(f: impl FnOnce(&Session) -> Result<R, String>) -> Result<R, String> {
    let session = SESSION.get_or_try_init(|| {
        let path = resolve_state_db_path();
        SqliteKvStore::open(&path)
            .map(|store| Session::new(Arc::new(store)))
            .map_err(|err| {
                warn!("event=ffi_session_open module=ffi status=error error={err}");
                format!("state DB open failed: {err}")
            })
    })?;
    f(session)
}

fn read_slot<T, R>(
    open: fn(&Session) -> SlotResult<PersistedSlot<T>>,
    map: impl FnOnce(T) -> R,
) -> Result<R, String>
where
    T: SlotValue,
{
    with_session(|session| {
        let slot = open(session).map_err(|err| err.to_string())?;
        Ok(map(slot.get()))
    })
}

fn write_slot<T>(
    open: fn(&Session) -> SlotResult<PersistedSlot<T>>,
    value: Option<T>,
) -> Result<(), String>
where
    T: SlotValue,
{
    with_session(|session| {
        open(session)
            .and_then(|slot| slot.set(value))
            .map_err(|err| err.to_string())
    })
}

fn selection_response(result: Result<SelectionItem, String>) -> SelectionResponse {
    match result {
        Ok(item) => SelectionResponse {
            ok: true,
            item: Some(item),
            message: String::new(),
        },
        Err(err) => SelectionResponse {
            ok: false,
            item: None,
            message: format!("selection read failed: {err}"),
        },
    }
}

fn text_response(action: &str, result: Result<String, String>) -> TextResponse {
    match result {
        Ok(value) => TextResponse {
            ok: true,
            value: Some(value),
            message: String::new(),
        },
        Err(err) => TextResponse {
            ok: false,
            value: None,
            message: format!("{action} failed: {err}"),
        },
    }
}

fn parse_permissions(raw: &str) -> Result<Permissions, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Permissions::no_access());
    }
    serde_json::from_str(trimmed).map_err(|err| format!("invalid permissions_json: {err}"))
}

fn to_user_item(profile: UserProfile) -> UserItem {
    let permissions_json =
        serde_json::to_string(&profile.permissions).unwrap_or_else(|_| "{\"all\":false}".into());
    UserItem {
        id: profile.id,
        name: profile.name,
        role: profile.role,
        permissions_json,
    }
}
