//! lottopro - client controller and offline cache worker for LottoPro AI.
//!
//! The client side validates the six-number form, drives prediction
//! requests and keeps the example-number panel fresh, all through a
//! [`View`] the front end implements. The worker side caches the web app
//! so it keeps working without a network, and can be hosted as an HTTP
//! proxy.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lottopro::{ClientConfig, HttpApi, LogView, LottoApp};
//!
//! # async fn example() -> lottopro::Result<()> {
//! let config = ClientConfig::default();
//! let api = Arc::new(HttpApi::new(&config.base_url)?);
//! let mut app = LottoApp::new(api, Arc::new(LogView), config);
//!
//! app.start().await;
//! app.on_input(0, "7");
//! app.on_input(1, "23");
//! app.on_submit().await;
//! app.dispose().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod app;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod generator;
pub mod model;
pub mod numbers;
pub mod refresh;
pub mod render;
pub mod tasks;
pub mod view;
pub mod worker;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "proxy")]
pub mod proxy;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use app::LottoApp;
pub use client::{HttpApi, LottoApi};
pub use config::{AppConfig, ClientConfig, ProxyConfig, WorkerConfig};
pub use controller::{LifecycleState, PredictionController, SubmitOutcome};
pub use error::{Error, Result};
pub use model::{ExampleNumbers, PredictionRequest, PredictionResponse, StatsResponse};
pub use numbers::{FieldState, NumberForm};
pub use refresh::{ExampleRefresher, RefreshOutcome};
pub use tasks::{Scheduler, SingleFlight};
pub use view::{LogView, NoView, Toast, ToastLevel, View};
pub use worker::{OfflineWorker, ReqwestFetcher, WorkerMessage, WorkerState};
