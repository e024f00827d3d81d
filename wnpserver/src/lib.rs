//! # wnpserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour créer le serveur HTTP de
//! WNPBridge : sous-routers, API documentées OpenAPI, CORS et arrêt gracieux.
//!
//! ## Architecture
//!
//! - [`server`] : Implémentation du serveur principal et du builder
//! - [`logs`] : Initialisation du système de logs `tracing`
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use wnpserver::{ServerBuilder, logs::{init_logging, LoggingOptions}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_logging(LoggingOptions::default())?;
//!
//!     let mut server = ServerBuilder::new("WNPBridge").http_port(8080).build();
//!
//!     server
//!         .add_router(Router::new().route("/ping", get(|| async { "pong" })))
//!         .await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LoggingOptions, init_logging};
pub use server::{Server, ServerBuilder};
