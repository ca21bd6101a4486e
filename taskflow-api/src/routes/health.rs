/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// { "status": "healthy", "version": "0.1.0", "database": "connected" }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskflow_shared::db::pool;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

impl HealthResponse {
    fn from_database(connected: bool) -> Self {
        let (status, database) = if connected {
            ("healthy", "connected")
        } else {
            ("degraded", "disconnected")
        };

        Self {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
        }
    }
}

/// Reports service status; always 200 so load balancers can read the body
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(HealthResponse::from_database(connected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_when_database_down() {
        let response = HealthResponse::from_database(false);
        assert_eq!(response.status, "degraded");
        assert_eq!(response.database, "disconnected");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_healthy_when_database_up() {
        let response = HealthResponse::from_database(true);
        assert_eq!(response.status, "healthy");
        assert_eq!(response.database, "connected");
    }
}
