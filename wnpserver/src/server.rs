//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module fournit une abstraction simple et ergonomique pour créer des serveurs HTTP
//! avec Axum, en cachant la complexité de la configuration et du routage.
//!
//! ## Fonctionnalités
//!
//! - 🧩 **Sous-routers** : fusionnés dans le router principal avec `add_router()`
//! - 📚 **Documentation API** : OpenAPI/Swagger automatique avec `add_openapi()`
//! - 🌍 **CORS** : En-têtes permissifs pour les dashboards servis depuis une autre origine
//! - ⚡ **Gestion gracieuse** : Arrêt propre sur Ctrl+C

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{Method, header};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa_swagger_ui::SwaggerUi;

/// Serveur principal
pub struct Server {
    name: String,
    bind_address: IpAddr,
    http_port: u16,
    cors: bool,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `bind_address` - Interface d'écoute
    /// * `http_port` - Port HTTP à écouter (0 pour un port éphémère)
    pub fn new(name: impl Into<String>, bind_address: IpAddr, http_port: u16) -> Self {
        Self {
            name: name.into(),
            bind_address,
            http_port,
            cors: false,
            router: Arc::new(RwLock::new(Router::new())),
            join_handle: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Fusionne un sous-router (chemins absolus) dans le router principal
    pub async fn add_router(&mut self, sub_router: Router) {
        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(sub_router);
    }

    /// Ajoute une API documentée avec OpenAPI et Swagger UI
    ///
    /// Le `api_router` est monté sous `/api/{name}`, la documentation interactive
    /// sous `/swagger-ui/{name}` et la spécification JSON sous `/api-docs/{name}.json`.
    ///
    /// # Exemple
    ///
    /// ```ignore
    /// let api_router = Router::new().route("/detect", get(detect));
    /// server.add_openapi(api_router, MediaApiDoc::openapi(), "media").await;
    /// // => GET /api/media/detect, /swagger-ui/media, /api-docs/media.json
    /// ```
    pub async fn add_openapi(
        &mut self,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let swagger_path = format!("/swagger-ui/{}", name);
        let swagger_path_static: &'static str = Box::leak(swagger_path.into_boxed_str());

        let openapi_json_path = format!("/api-docs/{}.json", name);
        let openapi_json_path_static: &'static str = Box::leak(openapi_json_path.into_boxed_str());

        let swagger = SwaggerUi::new(swagger_path_static).url(openapi_json_path_static, openapi);

        let base_path = format!("/api/{}", name);
        let nested_router = Router::new().nest(&base_path, api_router);

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(nested_router).merge(swagger);
    }

    /// Router final, couches comprises (CORS, traces HTTP)
    ///
    /// Utilisé par `start()`, et directement par les tests via `tower::ServiceExt`.
    pub async fn router(&self) -> Router {
        let router = self
            .router
            .read()
            .await
            .clone()
            .layer(TraceLayer::new_for_http());

        if self.cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers([header::CONTENT_TYPE]),
            )
        } else {
            router
        }
    }

    /// Démarre le serveur HTTP
    ///
    /// Ouvre le socket d'écoute (une erreur de bind est remontée à l'appelant),
    /// lance le service dans une tâche et met en place la gestion de Ctrl+C
    /// pour un arrêt gracieux. Retourne l'adresse effectivement liée.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let addr = SocketAddr::new(self.bind_address, self.http_port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Cannot bind HTTP server on {}", addr))?;
        let local_addr = listener.local_addr()?;

        info!(
            "Server {} running at http://{}",
            self.name, local_addr
        );

        let router = self.router().await;
        let token = self.shutdown.clone();
        let server_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!("HTTP server error: {}", e);
            }
        });

        let token = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("Ctrl+C reçu, arrêt gracieux"),
                        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
                    }
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });

        self.join_handle = Some(server_task);
        Ok(local_addr)
    }

    /// Jeton d'arrêt partagé : annulé sur Ctrl+C ou par `shutdown()`
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Demande l'arrêt gracieux du serveur
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    bind_address: IpAddr,
    http_port: u16,
    cors: bool,
}

impl ServerBuilder {
    /// Crée un nouveau builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: wnpconfig::DEFAULT_HTTP_PORT,
            cors: false,
        }
    }

    pub fn bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    pub fn http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    /// Construit le serveur
    pub fn build(self) -> Server {
        let mut server = Server::new(self.name, self.bind_address, self.http_port);
        server.cors = self.cors;
        server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn merged_router_is_served() {
        let mut server = ServerBuilder::new("test").build();
        server
            .add_router(
                Router::new().route("/info", get(|| async { Json(serde_json::json!({"version": "1.0.0"})) })),
            )
            .await;

        let response = server
            .router()
            .await
            .oneshot(Request::get("/info").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["version"], "1.0.0");
    }

    #[tokio::test]
    async fn cors_headers_only_when_enabled() {
        for enabled in [true, false] {
            let mut server = ServerBuilder::new("test").cors(enabled).build();
            server
                .add_router(Router::new().route("/ping", get(|| async { "pong" })))
                .await;

            let response = server
                .router()
                .await
                .oneshot(
                    Request::get("/ping")
                        .header(header::ORIGIN, "http://dashboard.local")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(
                response
                    .headers()
                    .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN),
                enabled
            );
        }
    }

    #[tokio::test]
    async fn start_binds_ephemeral_port_and_shuts_down() {
        let mut server = ServerBuilder::new("test").http_port(0).build();
        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown();
        server.wait().await;
        assert!(server.shutdown_token().is_cancelled());
    }
}
