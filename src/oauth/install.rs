use std::sync::Arc;

use crate::oauth::config::OAuthConfig;
use crate::response::Response;
use crate::store::OAuthStateStore;

/// Builds the install-start redirect.
///
/// On success, responds `302` to the generated Slack authorize URL. If
/// `client_id`, `scope`, or `state` cannot be produced, responds `302` to
/// the configured cancellation URL and logs an error — this never surfaces
/// as an `AppError` because OAuth failures are always redirects.
pub async fn build_install_response(
    config: &OAuthConfig,
    state_store: &Arc<dyn OAuthStateStore>,
) -> Response {
    if config.client_id.is_empty() || config.scope.is_empty() {
        tracing::error!("OAuth install start missing client_id or scope");
        return Response::redirect(&config.oauth_cancellation_url);
    }

    let state = match state_store.issue().await {
        Ok(state) if !state.is_empty() => state,
        Ok(_) => {
            tracing::error!("OAuth state store issued an empty state token");
            return Response::redirect(&config.oauth_cancellation_url);
        }
        Err(e) => {
            tracing::error!(error = %e, "OAuth state store failed to issue a state token");
            return Response::redirect(&config.oauth_cancellation_url);
        }
    };

    let mut query = vec![
        ("client_id".to_string(), config.client_id.clone()),
        ("scope".to_string(), config.scope.clone()),
        ("state".to_string(), state),
    ];
    if !config.classic_app_permissions_enabled {
        if let Some(user_scope) = &config.user_scope {
            query.push(("user_scope".to_string(), user_scope.clone()));
        }
    }
    if let Some(redirect_uri) = &config.redirect_uri {
        query.push(("redirect_uri".to_string(), redirect_uri.clone()));
    }
    query.extend(config.extra_install_query_params.iter().cloned());

    let query_string = query
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(&k), urlencoding::encode(&v)))
        .collect::<Vec<_>>()
        .join("&");

    let install_url = format!("{}?{}", config.authorize_base_url(), query_string);
    Response::redirect(&install_url)
}
