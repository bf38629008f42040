use std::sync::Arc;

use proto_grpc::shortener::url_shortener_server::UrlShortener;
use proto_shortener::shortener as messages;
use shortener_sql::Store;
use tonic::{Request, Response, Status};

/// Upper bound on stored long URLs, in octets. Matches the storage CHECK.
const MAX_LONG_URL_OCTETS: usize = 2048;

/// Orchestrates the shorten and resolve flows over the store, the id
/// allocator, and the short-code encoding. One value is shared by the tonic
/// server and the HTTP gateway.
pub struct ShortenerService {
    store: Arc<dyn Store>,
    allocator: idgen::IdAllocator,
    /// Reserved for a read-through cache on resolve.
    #[allow(dead_code)]
    cache: Option<redis::Client>,
}

impl ShortenerService {
    pub fn new(
        store: Arc<dyn Store>,
        allocator: idgen::IdAllocator,
        cache: Option<redis::Client>,
    ) -> Self {
        Self {
            store,
            allocator,
            cache,
        }
    }

    /// Authenticate, allocate an id, encode it, persist the mapping.
    pub async fn shorten(&self, api_key: &str, long_url: &str) -> Result<String, Status> {
        if api_key.is_empty() {
            return Err(Status::unauthenticated("missing API key"));
        }
        match self.store.api_key_valid(api_key).await {
            Ok(true) => (),
            Ok(false) => return Err(Status::unauthenticated("invalid API key")),
            Err(err) => return Err(store_status(err)),
        }

        if long_url.is_empty() {
            return Err(Status::invalid_argument("long_url is required"));
        }
        if long_url.len() > MAX_LONG_URL_OCTETS {
            return Err(Status::invalid_argument(format!(
                "long_url exceeds {MAX_LONG_URL_OCTETS} octets"
            )));
        }

        let id = self.allocator.next().await.map_err(allocator_status)?;
        let code = shortcode::encode(id as u64);

        match self.store.insert_mapping(&code, long_url).await {
            Ok(()) => Ok(code),
            Err(shortener_sql::Error::Conflict { .. }) => {
                // A duplicate short code means an allocator-issued id was
                // reused. Alertable: operators must investigate the counter.
                tracing::error!(code = %code, id, "freshly-encoded short code already mapped");
                Err(Status::internal("short code collision"))
            }
            Err(err) => Err(store_status(err)),
        }
    }

    pub async fn resolve(&self, short_code: &str) -> Result<String, Status> {
        match self.store.lookup_long(short_code).await {
            Ok(long_url) => Ok(long_url),
            Err(shortener_sql::Error::NotFound) => Err(Status::not_found("unknown short code")),
            Err(err) => Err(store_status(err)),
        }
    }

    pub async fn create_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<shortener_sql::User, Status> {
        self.store
            .insert_user(first_name, last_name, email)
            .await
            .map_err(store_status)
    }

    pub async fn fetch_api_key(&self, email: &str) -> Result<String, Status> {
        match self.store.lookup_user_by_email(email).await {
            Ok(user) => Ok(user.api_key.to_string()),
            Err(shortener_sql::Error::NotFound) => Err(Status::not_found("unknown email")),
            Err(err) => Err(store_status(err)),
        }
    }
}

/// Maps store errors onto the RPC taxonomy.
fn store_status(err: shortener_sql::Error) -> Status {
    match err {
        shortener_sql::Error::NotFound => Status::not_found(err.to_string()),
        shortener_sql::Error::Conflict { .. } => Status::already_exists(err.to_string()),
        shortener_sql::Error::InvalidArgument(_) => Status::invalid_argument(err.to_string()),
        err if err.is_transient() => Status::unavailable(err.to_string()),
        err => Status::internal(err.to_string()),
    }
}

/// Maps allocator errors onto the RPC taxonomy: contention and transient
/// store failures invite a retry, everything else is an internal fault.
fn allocator_status(err: idgen::Error) -> Status {
    if err.is_transient() {
        Status::unavailable(err.to_string())
    } else {
        Status::internal(err.to_string())
    }
}

#[tonic::async_trait]
impl UrlShortener for ShortenerService {
    async fn shorten_url(
        &self,
        request: Request<messages::ShortenUrlRequest>,
    ) -> Result<Response<messages::ShortenUrlResponse>, Status> {
        let messages::ShortenUrlRequest { api_key, long_url } = request.into_inner();
        let short_url = self.shorten(&api_key, &long_url).await?;
        Ok(Response::new(messages::ShortenUrlResponse { short_url }))
    }

    async fn get_url(
        &self,
        request: Request<messages::GetUrlRequest>,
    ) -> Result<Response<messages::GetUrlResponse>, Status> {
        let messages::GetUrlRequest { short_url } = request.into_inner();
        let long_url = self.resolve(&short_url).await?;
        Ok(Response::new(messages::GetUrlResponse { long_url }))
    }

    async fn create_user(
        &self,
        request: Request<messages::CreateUserRequest>,
    ) -> Result<Response<messages::CreateUserResponse>, Status> {
        let messages::CreateUserRequest {
            first_name,
            last_name,
            email,
        } = request.into_inner();
        let user = self.create_user(&first_name, &last_name, &email).await?;
        Ok(Response::new(messages::CreateUserResponse {
            user_id: user.id.to_string(),
            api_key: user.api_key.to_string(),
        }))
    }

    async fn fetch_api_key(
        &self,
        request: Request<messages::FetchApiKeyRequest>,
    ) -> Result<Response<messages::FetchApiKeyResponse>, Status> {
        let messages::FetchApiKeyRequest { email } = request.into_inner();
        let api_key = self.fetch_api_key(&email).await?;
        Ok(Response::new(messages::FetchApiKeyResponse { api_key }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::MemoryStore;
    use tonic::Code;

    fn service(store: Arc<MemoryStore>) -> ShortenerService {
        let allocator = idgen::IdAllocator::new(
            Arc::new(coordination::MemStore::new()),
            idgen::Config::default(),
        );
        ShortenerService::new(store, allocator, None)
    }

    #[tokio::test]
    async fn shorten_requires_an_api_key() {
        let svc = service(Arc::new(MemoryStore::new()));

        let err = svc.shorten("", "https://example.com/a").await.unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
        assert!(err.message().contains("missing"));
    }

    #[tokio::test]
    async fn shorten_rejects_unknown_and_malformed_keys() {
        let svc = service(Arc::new(MemoryStore::new()));

        let unknown = uuid::Uuid::new_v4().to_string();
        let err = svc
            .shorten(&unknown, "https://example.com/a")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
        assert!(err.message().contains("invalid"));

        let err = svc
            .shorten("not-a-key", "https://example.com/a")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn shorten_then_resolve_round_trips() {
        let svc = service(Arc::new(MemoryStore::new()));
        let user = svc
            .create_user("Ada", "Lovelace", "ada@example.com")
            .await
            .unwrap();
        let key = user.api_key.to_string();

        let code = svc.shorten(&key, "https://example.com/a").await.unwrap();
        // The first id vended by a fresh cluster is 1.
        assert_eq!(code, shortcode::encode(1));
        assert_eq!(
            svc.resolve(&code).await.unwrap(),
            "https://example.com/a".to_string()
        );

        let err = svc.resolve("zzzzzzz").await.unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn shorten_validates_the_long_url() {
        let svc = service(Arc::new(MemoryStore::new()));
        let user = svc
            .create_user("Ada", "Lovelace", "ada@example.com")
            .await
            .unwrap();
        let key = user.api_key.to_string();

        let err = svc.shorten(&key, "").await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let oversized = format!("https://example.com/{}", "a".repeat(2048));
        let err = svc.shorten(&key, &oversized).await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn mapping_conflict_is_an_internal_fault() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let user = svc
            .create_user("Ada", "Lovelace", "ada@example.com")
            .await
            .unwrap();

        // Plant the code the allocator's first id will produce.
        store
            .insert_mapping(&shortcode::encode(1), "https://example.com/planted")
            .await
            .unwrap();

        let err = svc
            .shorten(&user.api_key.to_string(), "https://example.com/a")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Internal);
    }

    #[tokio::test]
    async fn duplicate_email_is_already_exists() {
        let svc = service(Arc::new(MemoryStore::new()));
        svc.create_user("Ada", "Lovelace", "ada@example.com")
            .await
            .unwrap();

        let err = svc
            .create_user("Ada", "Again", "ada@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::AlreadyExists);
    }

    #[tokio::test]
    async fn fetch_api_key_returns_the_issued_key() {
        let svc = service(Arc::new(MemoryStore::new()));
        let user = svc
            .create_user("Ada", "Lovelace", "ada@example.com")
            .await
            .unwrap();

        assert_eq!(
            svc.fetch_api_key("ada@example.com").await.unwrap(),
            user.api_key.to_string()
        );

        let err = svc.fetch_api_key("nobody@example.com").await.unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }
}
