use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use courier_core::health::{healthz, readyz};
use courier_core::middleware::{panic_response, request_id_layer};

use crate::handlers::{
    auth::{sign_in, verify_sign_in},
    conversation::{
        create_message, get_conversation, get_conversations, get_messages, get_online_users,
        load_conversation,
    },
    file::{serve_client_file, upload},
    hub::hub_ws,
    profile::{get_profile, update_profile},
};
use crate::state::AppState;

/// Uploads are bounded by the temporary-folder policy (100 MB) plus
/// multipart framing overhead.
const MAX_UPLOAD_BYTES: usize = 110 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Auth
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/verify-sign-in", post(verify_sign_in))
        // Profile
        .route("/user/profile", get(get_profile))
        .route("/user/profile", patch(update_profile))
        // Files
        .route("/file/upload", post(upload))
        .route("/file/client/{folder_name}/{file_name}", get(serve_client_file))
        // Conversations
        .route("/conversation/online-users", get(get_online_users))
        .route("/conversation/load", post(load_conversation))
        .route("/conversation", get(get_conversations))
        .route("/conversation/{conversation_id}", get(get_conversation))
        .route("/conversation/{conversation_id}/message", get(get_messages))
        .route("/conversation/{conversation_id}/message", post(create_message))
        // Real-time hub
        .route("/hub", get(hub_ws))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(request_id_layer())
        .with_state(state)
}
