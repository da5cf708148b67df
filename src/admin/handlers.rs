use alloy::primitives::{Address, U256};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::AdminState;
use crate::config::validation::{parse_address, resolve_limits};
use crate::config::{LimitSettings, ValidationError};
use crate::error::GateError;
use crate::gate::GateSettings;
use crate::limiter::LimitConfig;
use crate::persistence::StoreError;

/// Failure of an admin request.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationError> for AdminError {
    fn from(e: ValidationError) -> Self {
        AdminError::Invalid(vec![e])
    }
}

impl From<Vec<ValidationError>> for AdminError {
    fn from(errors: Vec<ValidationError>) -> Self {
        AdminError::Invalid(errors)
    }
}

/// HTTP status for a gate rejection.
pub fn status_for(err: &GateError) -> StatusCode {
    match err {
        GateError::Unauthorized { .. } | GateError::NotWhitelisted(_) => StatusCode::FORBIDDEN,
        GateError::InvalidArgument(_)
        | GateError::LimitExceeded { .. }
        | GateError::InsufficientBalance { .. }
        | GateError::SupplyOverflow { .. } => StatusCode::BAD_REQUEST,
        GateError::CooldownNotElapsed { .. } | GateError::ExceedsPeriodLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        GateError::Paused => StatusCode::LOCKED,
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AdminError::Gate(e) => (status_for(e), e.reason()),
            AdminError::Invalid(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AdminError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "snapshot_failed"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Admin request failed");
        }
        let body = ErrorBody {
            error,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type AdminResult<T> = Result<Json<T>, AdminError>;

/// Render an amount the way config files write it.
fn amount(value: U256) -> String {
    if value == U256::MAX {
        "max".to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

fn ack() -> AdminResult<Ack> {
    Ok(Json(Ack { ok: true }))
}

// -------------------------------------------------------------------------
// Reads
// -------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub identity: Address,
    pub operator: Address,
    pub settings: GateSettings,
    pub whitelist_enabled: bool,
    pub whitelist_members: usize,
    pub tracked_principals: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let gate = state.service.gate();
    let whitelist = gate.whitelist();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        identity: gate.identity(),
        operator: state.operator,
        settings: gate.settings(),
        whitelist_enabled: whitelist.is_enabled(),
        whitelist_members: whitelist.member_count(),
        tracked_principals: gate.limiter().tracked_principals(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LimitsBody {
    pub max_transfer_amount: String,
    pub cooldown_secs: u64,
    pub period_limit: String,
    pub period_duration_secs: u64,
}

impl From<LimitConfig> for LimitsBody {
    fn from(limits: LimitConfig) -> Self {
        Self {
            max_transfer_amount: amount(limits.max_transfer_amount),
            cooldown_secs: limits.cooldown_period,
            period_limit: amount(limits.period_limit),
            period_duration_secs: limits.period_duration,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrincipalStatus {
    pub asset: Address,
    pub account: Address,
    pub balance: String,
    pub whitelisted: bool,
    pub allowed_sender: bool,
    pub exempt: bool,
    pub limits: LimitsBody,
    pub remaining_allowance: String,
    pub period_reset_at: u64,
    pub next_valid_transfer_time: u64,
}

pub async fn get_principal(
    State(state): State<AdminState>,
    Path((asset, account)): Path<(String, String)>,
) -> AdminResult<PrincipalStatus> {
    let asset = parse_address("asset", &asset)?;
    let account = parse_address("address", &account)?;
    let gate = state.service.gate();
    let view = gate.limiter().view(asset, account);

    Ok(Json(PrincipalStatus {
        asset,
        account,
        balance: gate.balance_of(asset, account).to_string(),
        whitelisted: gate.whitelist().is_whitelisted(account),
        allowed_sender: gate.is_allowed_sender(asset, account),
        exempt: view.exempt,
        limits: view.effective.into(),
        remaining_allowance: amount(view.remaining_allowance),
        period_reset_at: view.period_reset_at,
        next_valid_transfer_time: view.next_valid_transfer_time,
    }))
}

// -------------------------------------------------------------------------
// Whitelist
// -------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct WhitelistRequest {
    pub accounts: Vec<String>,
    pub whitelisted: bool,
}

fn parse_accounts(accounts: &[String]) -> Result<Vec<Address>, AdminError> {
    let mut parsed = Vec::with_capacity(accounts.len());
    let mut errors = Vec::new();
    for (i, value) in accounts.iter().enumerate() {
        match parse_address(&format!("accounts[{i}]"), value) {
            Ok(address) => parsed.push(address),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(parsed)
    } else {
        Err(errors.into())
    }
}

pub async fn post_whitelist(State(state): State<AdminState>, Json(req): Json<WhitelistRequest>) -> AdminResult<Ack> {
    let accounts = parse_accounts(&req.accounts)?;
    state
        .service
        .gate()
        .whitelist()
        .batch_set_whitelisted(state.operator, &accounts, req.whitelisted)?;
    ack()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

pub async fn post_whitelist_toggle(
    State(state): State<AdminState>,
    Json(req): Json<ToggleRequest>,
) -> AdminResult<Ack> {
    state
        .service
        .gate()
        .whitelist()
        .toggle_whitelisting(state.operator, req.enabled)?;
    ack()
}

// -------------------------------------------------------------------------
// Limits
// -------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ExemptionsRequest {
    pub asset: String,
    pub accounts: Vec<String>,
    pub exempt: Vec<bool>,
}

pub async fn post_exemptions(
    State(state): State<AdminState>,
    Json(req): Json<ExemptionsRequest>,
) -> AdminResult<Ack> {
    let asset = parse_address("asset", &req.asset)?;
    let accounts = parse_accounts(&req.accounts)?;
    state
        .service
        .gate()
        .limiter()
        .batch_set_exemptions(state.operator, asset, &accounts, &req.exempt)?;
    ack()
}

pub async fn put_default_limits(
    State(state): State<AdminState>,
    Path(asset): Path<String>,
    Json(req): Json<LimitSettings>,
) -> AdminResult<LimitsBody> {
    let asset = parse_address("asset", &asset)?;
    let limits = resolve_limits("limits", &req)?;
    let limiter = state.service.gate().limiter();
    limiter.set_all_default_limits(state.operator, asset, limits)?;
    Ok(Json(limiter.default_limits(asset).into()))
}

pub async fn put_user_limits(
    State(state): State<AdminState>,
    Path((asset, account)): Path<(String, String)>,
    Json(req): Json<LimitSettings>,
) -> AdminResult<LimitsBody> {
    let asset = parse_address("asset", &asset)?;
    let account = parse_address("address", &account)?;
    let limits = resolve_limits("limits", &req)?;
    let limiter = state.service.gate().limiter();
    limiter.set_all_user_limits(state.operator, asset, account, limits)?;
    Ok(Json(limiter.effective_limits(asset, account).into()))
}

pub async fn delete_user_limits(
    State(state): State<AdminState>,
    Path((asset, account)): Path<(String, String)>,
) -> AdminResult<LimitsBody> {
    let asset = parse_address("asset", &asset)?;
    let account = parse_address("address", &account)?;
    let limiter = state.service.gate().limiter();
    limiter.reset_user_to_default(state.operator, asset, account)?;
    Ok(Json(limiter.effective_limits(asset, account).into()))
}

pub async fn post_period_reset(
    State(state): State<AdminState>,
    Path((asset, account)): Path<(String, String)>,
) -> AdminResult<Ack> {
    let asset = parse_address("asset", &asset)?;
    let account = parse_address("address", &account)?;
    state
        .service
        .gate()
        .limiter()
        .reset_user_period(state.operator, asset, account)?;
    ack()
}

// -------------------------------------------------------------------------
// Gate switches
// -------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub limit_checks_enabled: bool,
    pub whitelist_checks_enabled: bool,
}

pub async fn put_config(
    State(state): State<AdminState>,
    Json(req): Json<ConfigRequest>,
) -> AdminResult<GateSettings> {
    let gate = state.service.gate();
    gate.update_config(state.operator, req.limit_checks_enabled, req.whitelist_checks_enabled)?;
    Ok(Json(gate.settings()))
}

pub async fn post_pause(State(state): State<AdminState>) -> AdminResult<GateSettings> {
    let gate = state.service.gate();
    gate.pause(state.operator)?;
    Ok(Json(gate.settings()))
}

pub async fn post_unpause(State(state): State<AdminState>) -> AdminResult<GateSettings> {
    let gate = state.service.gate();
    gate.unpause(state.operator)?;
    Ok(Json(gate.settings()))
}

// -------------------------------------------------------------------------
// Persistence
// -------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotResponse {
    /// `None` when persistence is disabled.
    pub path: Option<String>,
}

pub async fn post_snapshot(State(state): State<AdminState>) -> AdminResult<SnapshotResponse> {
    let service = state.service;
    let path = tokio::task::spawn_blocking(move || service.save())
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;
    Ok(Json(SnapshotResponse {
        path: path.map(|p| p.display().to_string()),
    }))
}
