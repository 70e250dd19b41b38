pub mod auth;
pub mod docs;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Version reported by `GET /` and the OpenAPI document.
pub const API_VERSION: &str = "1.0.0";

/// A resource area mounted under `{API_V1_PREFIX}{prefix}`.
pub struct RouteGroup {
    pub prefix: &'static str,
    pub tag: &'static str,
    /// Shown next to the tag in the API docs.
    pub description: &'static str,
    pub configure: fn(&mut web::ServiceConfig),
}

/// Every group served under the versioned API prefix.
pub const API_GROUPS: &[RouteGroup] = &[users::GROUP, auth::GROUP, tasks::GROUP];

/// Mounts every group from [`API_GROUPS`] below `api_prefix`.
pub fn configure_api(cfg: &mut web::ServiceConfig, api_prefix: &str) {
    for group in API_GROUPS {
        let path = format!("{}{}", api_prefix, group.prefix);
        log::debug!("mounting {} routes at {}", group.tag, path);
        cfg.service(web::scope(&path).configure(group.configure));
    }
}
