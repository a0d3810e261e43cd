//! Responses synthesized when neither network nor cache can answer.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderValue};
use serde_json::json;

use super::fetch::WorkerResponse;

/// Message of the offline API response.
pub const OFFLINE_MESSAGE: &str = "No network connection. You are in offline mode.";

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>LottoPro AI v2.0 - Offline</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea, #764ba2);
            color: white;
            margin: 0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            text-align: center;
        }
        .container { max-width: 500px; padding: 2rem; }
        .title { font-size: 2rem; font-weight: bold; margin-bottom: 1rem; }
        .description { font-size: 1.1rem; opacity: 0.9; margin-bottom: 2rem; line-height: 1.6; }
        .btn {
            background: rgba(255, 255, 255, 0.2);
            border: 2px solid rgba(255, 255, 255, 0.3);
            color: white;
            padding: 1rem 2rem;
            border-radius: 50px;
            cursor: pointer;
            text-decoration: none;
            display: inline-block;
            margin: 0.5rem;
        }
        .features {
            background: rgba(255, 255, 255, 0.1);
            border-radius: 15px;
            padding: 1.5rem;
            margin-top: 2rem;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1 class="title">LottoPro AI v2.0</h1>
        <p class="description">
            You are currently offline.<br>
            Check your internet connection and try again.
        </p>
        <button class="btn" onclick="window.location.reload()">Try again</button>
        <a href="/" class="btn">Home</a>
        <div class="features">
            <h3>Available offline:</h3>
            <div>Restarting the app and navigation</div>
            <div>Basic UI and layout</div>
            <div>Locally stored data</div>
            <div>AI predictions need a connection</div>
        </div>
    </div>
    <script>
        window.addEventListener('online', function () { window.location.reload(); });
        document.addEventListener('visibilitychange', function () {
            if (!document.hidden && navigator.onLine) {
                setTimeout(function () { window.location.reload(); }, 1000);
            }
        });
    </script>
</body>
</html>
"#;

/// The self-contained page served for documents while offline.
#[must_use]
pub fn offline_page() -> WorkerResponse {
    WorkerResponse::new(StatusCode::OK)
        .with_header(CONTENT_TYPE, HeaderValue::from_static("text/html"))
        .with_header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .with_body(OFFLINE_PAGE)
}

/// The 503 answer to an API request nobody can serve.
#[must_use]
pub fn offline_api(now: DateTime<Utc>) -> WorkerResponse {
    WorkerResponse::json(
        StatusCode::SERVICE_UNAVAILABLE,
        &json!({
            "success": false,
            "error": OFFLINE_MESSAGE,
            "offline": true,
            "cached_at": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    )
}
