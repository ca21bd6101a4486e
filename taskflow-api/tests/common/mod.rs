/// Shared setup for end-to-end tests
///
/// Needs a reachable PostgreSQL in `DATABASE_URL`; migrations are applied on
/// setup. Every test registers its own users with unique emails and deletes
/// them afterwards, which cascades to their groups.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use taskflow_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskflow_shared::db::{migrations::run_migrations, pool::create_pool};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Corr3ct-Horse!";

/// A registered user and their access token
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub token: String,
}

/// Test context containing the app and its database
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        if std::env::var("JWT_SECRET").is_err() {
            std::env::set_var("JWT_SECRET", "integration-test-secret-at-least-32-bytes");
        }

        let config = Config::from_env()?;

        let db = create_pool(config.database.pool_config()).await?;
        run_migrations(&db).await?;

        let app = build_router(AppState::new(db.clone(), config));

        Ok(Self { db, app })
    }

    /// Registers a user through the API
    pub async fn register(&self, name: &str) -> anyhow::Result<TestUser> {
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4());

        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": name, "email": email, "password": PASSWORD})),
            )
            .await;

        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);

        Ok(TestUser {
            id: body["user"]["id"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("missing user id"))?
                .parse()?,
            name: name.to_string(),
            token: body["token"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("missing token"))?
                .to_string(),
        })
    }

    /// Builds a JSON request, authenticated as `user` when given
    pub fn request(
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }

        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap()
    }

    /// Sends a request and returns the status and JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Self::request(method, uri, user, body);
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Deletes the given users; their groups and tasks go with them
    pub async fn cleanup(&self, users: &[&TestUser]) -> anyhow::Result<()> {
        let ids: Vec<Uuid> = users.iter().map(|user| user.id).collect();

        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
