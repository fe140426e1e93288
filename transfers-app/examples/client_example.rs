//! Client example demonstrating a full transfer flow against a running server.
//!
//! Starts a stand-in authorizer, a notification sink and the API server on
//! local ports, then drives them through the client SDK.
//!
//! Run with: cargo run -p transfers-app --example client_example --no-default-features --features sqlite

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    routing::{get, post},
};
use tempfile::tempdir;
use tokio::net::TcpListener;

use transfers_authorizer::{HttpAuthorizer, RetryPolicy};
use transfers_client::TransfersClient;
use transfers_hex::{HttpServer, TransferService, UserService};
use transfers_repo::{DEFAULT_QUEUE, NotificationWorker, OutboxNotifier, build_repo};
use transfers_types::{CreateUserRequest, DocumentPayload, WalletPayload};

async fn spawn(router: Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            eprintln!("server stopped: {e}");
        }
    });
    Ok(format!("http://{addr}"))
}

fn registration(
    name: &str,
    email: &str,
    document: &str,
    type_user: &str,
    amount: i64,
) -> CreateUserRequest {
    CreateUserRequest {
        full_name: name.into(),
        email: email.into(),
        password: "correct horse".into(),
        document: DocumentPayload {
            kind: "CPF".into(),
            value: document.into(),
        },
        wallet: WalletPayload {
            currency: "BRL".into(),
            amount,
        },
        type_user: type_user.into(),
    }
}

fn reais(centavos: i64) -> String {
    format!("R${}.{:02}", centavos / 100, centavos % 100)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Stand-in for the external authorization service
    let authorizer_url = spawn(Router::new().route(
        "/authorize",
        get(|| async { Json(serde_json::json!({ "Message": "Autorizado" })) }),
    ))
    .await?;

    // Receives delivered notifications
    let sink_url = spawn(Router::new().route(
        "/notifications",
        post(|body: String| async move {
            println!("📨 Notification received: {body}");
        }),
    ))
    .await?;

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_url = format!("sqlite://{}?mode=rwc", tmp.path().join("transfers.db").display());
    println!("🚀 Database: {db_url}");

    // Build repository (handles connection and migration)
    let repo = build_repo(&db_url).await?;

    let worker = NotificationWorker::new(repo.clone(), format!("{sink_url}/notifications"))
        .with_poll_interval(Duration::from_millis(200));
    tokio::spawn(worker.run());

    let policy = RetryPolicy::default();
    let budget = policy.worst_case();
    let authorizer = HttpAuthorizer::new(format!("{authorizer_url}/authorize"), policy);
    let notifier = OutboxNotifier::new(repo.clone(), DEFAULT_QUEUE);

    let repo = Arc::new(repo);
    let server = HttpServer::new(
        UserService::new(repo.clone()),
        TransferService::new(repo, Arc::new(authorizer), Arc::new(notifier)).with_auth_budget(budget),
    );
    let base_url = spawn(server.router()).await?;

    let client = TransfersClient::new(&base_url);

    // ─────────────────────────────────────────────────────────────────────────
    // Demo: Full transfer flow
    // ─────────────────────────────────────────────────────────────────────────

    let health = client.health().await?;
    println!("✅ Server health: {}", health.status);

    let alice = client
        .create_user(&registration(
            "Alice Souza",
            "alice@example.com",
            "123.456.789-09",
            "COMMON",
            10_000,
        ))
        .await?;
    println!("✅ Created user: {} (id={})", alice.full_name, alice.id);

    let shop = client
        .create_user(&registration(
            "Loja do Bob",
            "bob@example.com",
            "987.654.321-00",
            "MERCHANT",
            0,
        ))
        .await?;
    println!("✅ Created merchant: {} (id={})", shop.full_name, shop.id);

    let transfer = client.create_transfer(alice.id, shop.id, 3_550).await?;
    println!("✅ Transferred {} from Alice to the shop (id={})", reais(transfer.value), transfer.id);

    let alice = client.get_user(alice.id).await?;
    let shop = client.get_user(shop.id).await?;
    println!("   Alice balance: {}", reais(alice.wallet.amount));
    println!("   Shop balance: {}", reais(shop.wallet.amount));

    // Merchants only receive
    let refused = client.create_transfer(shop.id, alice.id, 100).await;
    match refused {
        Err(e) => println!("✅ Merchant transfer refused: {e}"),
        Ok(t) => anyhow::bail!("merchant transfer unexpectedly succeeded: {}", t.id),
    }

    let history = client.list_user_transfers(alice.id).await?;
    println!("\n📋 Alice's transfers:");
    for t in history {
        println!("   - {} {} -> {} at {}", reais(t.value), t.payer_id, t.payee_id, t.created_at);
    }

    // Give the worker a moment to deliver
    tokio::time::sleep(Duration::from_secs(1)).await;

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
