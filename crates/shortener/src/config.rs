use derivative::Derivative;

/// Runtime configuration, read from the environment with flag overrides.
#[derive(Derivative, clap::Parser)]
#[derivative(Debug)]
#[clap(about = "URL-shortener service", version, long_about = None)]
pub struct Args {
    /// Port of the gRPC listener.
    #[clap(long, env = "GRPC_PORT", default_value = "50051")]
    pub grpc_port: u16,
    /// Port of the HTTP gateway listener.
    #[clap(long, env = "HTTP_PORT", default_value = "8080")]
    pub http_port: u16,

    #[clap(long, env = "POSTGRES_HOST", default_value = "localhost")]
    pub postgres_host: String,
    #[clap(long, env = "POSTGRES_PORT", default_value = "5432")]
    pub postgres_port: u16,
    #[clap(long, env = "POSTGRES_USER", default_value = "postgres")]
    pub postgres_user: String,
    #[derivative(Debug = "ignore")]
    #[clap(long, env = "POSTGRES_PASSWORD", default_value = "", hide_env_values = true)]
    pub postgres_password: String,
    #[clap(long, env = "POSTGRES_DBNAME", default_value = "shortener")]
    pub postgres_dbname: String,

    #[clap(long, env = "REDIS_HOST", default_value = "localhost")]
    pub redis_host: String,
    #[clap(long, env = "REDIS_PORT", default_value = "6379")]
    pub redis_port: u16,
    #[derivative(Debug = "ignore")]
    #[clap(long, env = "REDIS_PASSWORD", default_value = "", hide_env_values = true)]
    pub redis_password: String,

    #[clap(long, env = "ZOOKEEPER_HOST", default_value = "localhost")]
    pub zookeeper_host: String,
    #[clap(long, env = "ZOOKEEPER_PORT", default_value = "2181")]
    pub zookeeper_port: u16,
    /// Coordination-store session timeout, in seconds.
    #[clap(long, default_value = "5")]
    pub zk_session_timeout_secs: u64,

    /// Number of ids claimed per coordination round-trip.
    #[clap(long, default_value = "10000")]
    pub lease_size: i64,
    /// Bound on compare-and-set retries within a single lease claim.
    #[clap(long, default_value = "16")]
    pub cas_retry_cap: u32,
}

impl Args {
    pub fn pg_options(&self) -> sqlx::postgres::PgConnectOptions {
        sqlx::postgres::PgConnectOptions::new()
            .host(&self.postgres_host)
            .port(self.postgres_port)
            .username(&self.postgres_user)
            .password(&self.postgres_password)
            .database(&self.postgres_dbname)
            .ssl_mode(sqlx::postgres::PgSslMode::Disable)
    }

    pub fn redis_url(&self) -> String {
        if self.redis_password.is_empty() {
            format!("redis://{}:{}/", self.redis_host, self.redis_port)
        } else {
            format!(
                "redis://:{}@{}:{}/",
                self.redis_password, self.redis_host, self.redis_port
            )
        }
    }

    pub fn zk_ensemble(&self) -> String {
        format!("{}:{}", self.zookeeper_host, self.zookeeper_port)
    }

    pub fn allocator_config(&self) -> idgen::Config {
        idgen::Config {
            lease: self.lease_size,
            retry_cap: self.cas_retry_cap,
            ..idgen::Config::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::Args;
    use clap::Parser;

    #[test]
    fn connection_targets_are_assembled_from_parts() {
        let args = Args::parse_from([
            "shortener",
            "--redis-host",
            "cache.internal",
            "--redis-port",
            "6380",
            "--zookeeper-host",
            "zk.internal",
        ]);

        assert_eq!(args.redis_url(), "redis://cache.internal:6380/");
        assert_eq!(args.zk_ensemble(), "zk.internal:2181");

        let args = Args::parse_from(["shortener", "--redis-password", "hunter2"]);
        assert_eq!(args.redis_url(), "redis://:hunter2@localhost:6379/");
    }
}
