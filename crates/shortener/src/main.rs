use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use futures::FutureExt;
use proto_grpc::shortener::url_shortener_server::UrlShortenerServer;
use shortener::{Args, ShortenerService};
use shortener_sql::PgStore;
use tokio_stream::wrappers::TcpListenerStream;

fn main() -> Result<(), anyhow::Error> {
    // Use reasonable defaults for printing structured logs to stderr.
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    tracing::info!(?args, "started!");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let task = runtime.spawn(async move { async_main(args).await });
    let result = runtime.block_on(task);

    tracing::info!(?result, "main function completed, shutting down runtime");
    runtime.shutdown_timeout(Duration::from_secs(5));
    result?
}

async fn async_main(args: Args) -> Result<(), anyhow::Error> {
    // Bind both listeners early in the lifecycle, to not fail requests which
    // may dispatch as soon as the process is up.
    let grpc_listener = tokio::net::TcpListener::bind(("0.0.0.0", args.grpc_port))
        .await
        .context("failed to bind gRPC port")?;
    let http_listener = tokio::net::TcpListener::bind(("0.0.0.0", args.http_port))
        .await
        .context("failed to bind HTTP port")?;

    let pg_pool = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(args.pg_options())
        .await
        .context("connecting to postgres")?;

    let store = PgStore::new(pg_pool);
    store.migrate().await.context("running schema migration")?;

    // The cache client is established and verified at bootstrap, and held by
    // the service for a future read-through cache on resolve.
    let cache = redis::Client::open(args.redis_url()).context("configuring redis client")?;
    let mut cache_conn = cache
        .get_multiplexed_async_connection()
        .await
        .context("connecting to redis")?;
    let _: String = redis::cmd("PING")
        .query_async(&mut cache_conn)
        .await
        .context("pinging redis")?;

    let counter_store = coordination::ZkStore::connect(
        &args.zk_ensemble(),
        Duration::from_secs(args.zk_session_timeout_secs),
    )
    .await
    .context("connecting to zookeeper")?;
    let allocator = idgen::IdAllocator::new(Arc::new(counter_store), args.allocator_config());

    let service = Arc::new(ShortenerService::new(
        Arc::new(store),
        allocator,
        Some(cache),
    ));

    // Share-able future which completes when the process should exit.
    let shutdown = tokio::signal::ctrl_c().map(|_| ()).shared();

    let grpc_server = tonic::transport::Server::builder()
        .add_service(UrlShortenerServer::from_arc(service.clone()))
        .serve_with_incoming_shutdown(TcpListenerStream::new(grpc_listener), shutdown.clone());
    let grpc_server = async move { anyhow::Result::<(), anyhow::Error>::Ok(grpc_server.await?) };

    let http_server = axum::serve(http_listener, shortener::gateway::router(service))
        .with_graceful_shutdown(shutdown.clone());
    let http_server = async move { anyhow::Result::<(), anyhow::Error>::Ok(http_server.await?) };

    tracing::info!(
        grpc_port = args.grpc_port,
        http_port = args.http_port,
        "serving gRPC and the HTTP gateway"
    );
    let ((), ()) = tokio::try_join!(grpc_server, http_server)?;

    Ok(())
}
