// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup, fake platform clients, and shared templates.

use std::sync::Once;

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_platform;
#[allow(dead_code)]
pub mod recording;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("oneclick=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Two services, `web` and `db`, with the Postgres version as a variable.
#[allow(dead_code)]
pub const WEB_DB_TEMPLATE: &str = r#"
captainVersion: 2
instructions:
  start: Deploys a web frontend and its database.
  end: All done.
variables:
  - id: $$cap_pg_version
    label: Postgres version
    defaultValue: "14"
    validRegex: /^\d+$/
dockerCompose:
  services:
    web:
      image: $$cap_appname-web
      containerHttpPort: "8080"
      environment:
        DATABASE_HOST: srv-captain--$$cap_appname-db
        PUBLIC_URL: http://$$cap_appname.$$cap_root_domain
    db:
      image: postgres:$$cap_pg_version
      notExposeAsWebApp: true
      volumes:
        - $$cap_appname-db-data:/var/lib/postgresql/data
"#;
