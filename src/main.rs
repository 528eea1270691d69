use acg::cli::{
    Args, build_config, build_policy, handle_create_user, init_logging, load_session_secret,
    normalize_app_domain, open_database, warn_if_no_users,
};
use acg::run_server;
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(session_secret) = load_session_secret(args.session_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(policy) = build_policy(args.session_ttl_minutes, args.renew_window_minutes) else {
        std::process::exit(1);
    };

    let app_domain = match normalize_app_domain(args.app_domain) {
        Ok(domain) => domain,
        Err(reason) => {
            error!(reason, "Invalid app domain");
            std::process::exit(1);
        }
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(username) = args.create_user.as_deref() {
        handle_create_user(&db, username).await;
    }

    warn_if_no_users(&db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(
            address = %local_addr,
            session_ttl_minutes = args.session_ttl_minutes,
            renew_window_minutes = args.renew_window_minutes,
            "Listening"
        ),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    let config = build_config(
        db,
        session_secret,
        policy,
        app_domain,
        args.secure_cookies,
        args.trust_proxy,
    );

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
