//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for Dossier, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Research (`/api/research`)
//! - `POST /api/research/queries` - Plan queries for a topic and outline
//! - `POST /api/research/report` - Run the full pipeline and return the report
//! - `POST /api/research/report/stream` - Same, as server-sent progress events
//!
//! ## Artifact (`/api/artifact`)
//! - `POST /api/artifact/qa` - Ask about, or rewrite, a finished report
//!
//! ## Collections (`/api/collections`)
//! - `GET /api/collections` - Demo collections from the configuration
//!
//! ## Health
//! - `GET /health` - Health check endpoint
//!
//! # OpenAPI Documentation
//!
//! The OpenAPI document is served at `/api/openapi.json`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
