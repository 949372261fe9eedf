use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

use confidant::api::HttpCompanionApi;
use confidant::config::Config;
use confidant::CompanionApi;

/// Config pointing at a wiremock server with a short timeout
#[allow(dead_code)]
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.timeout_seconds = 5;
    config
}

#[allow(dead_code)]
pub fn api_for(server: &MockServer) -> Arc<dyn CompanionApi> {
    Arc::new(HttpCompanionApi::from_config(&config_for(server)).expect("valid api config"))
}

/// A message as the backend stores it
#[allow(dead_code)]
pub fn wire_message(id: &str, role: &str, content: &str, created_at: &str) -> Value {
    json!({
        "_id": id,
        "role": role,
        "content": content,
        "created_at": created_at,
    })
}

#[allow(dead_code)]
pub fn companion_json(id: &str, slug: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "slug": slug,
        "name": name,
        "short_bio": format!("{} is here to listen.", name),
        "traits": ["kind"],
        "avatar_path": "/public/assets/logo.png",
    })
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
