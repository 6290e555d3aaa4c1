//! `GET /@{user}/statuses/{id}`: a thread page for browsers, a federation
//! document for servers.

use std::sync::Arc;
use std::time::Instant;

use askama::Template;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use bytes::Bytes;
use fedithread_core::{InstanceMetadata, RequestContext, Status, TargetReference, WebError};
use tracing::{debug, Span};

use super::assets::PresentationAssets;
use super::error;
use super::instance::InstanceGetter;
use super::metrics::record_thread_request;
use super::negotiate::{negotiate, NegotiatedFormat};
use super::og::OgMeta;
use super::views::ThreadView;
use super::{with_cancel, WebState};

/// State accumulated while one thread request moves through the pipeline.
struct ThreadRequest<'a> {
    web: &'a WebState,
    ctx: RequestContext,
    /// Set by the instance stage, to a placeholder if the fetch failed.
    /// The error page reads it instead of fetching again.
    instance: Option<Arc<InstanceMetadata>>,
    format: Option<NegotiatedFormat>,
}

impl<'a> ThreadRequest<'a> {
    fn new(web: &'a WebState, ctx: RequestContext) -> Self {
        Self {
            web,
            ctx,
            instance: None,
            format: None,
        }
    }

    async fn run(
        &mut self,
        handle_segment: &str,
        status_segment: &str,
        headers: &HeaderMap,
    ) -> Result<Response, WebError> {
        let target = TargetReference::from_path(handle_segment, status_segment)?;

        let caller = self.web.identity.resolve(&self.ctx, headers).await?;
        self.ctx.caller = caller;

        let instance = match InstanceGetter::Live(self.web.instance.as_ref())
            .get(&self.ctx)
            .await
        {
            Ok(instance) => instance,
            Err(e) => {
                // the error page must not fetch a second time
                self.instance = Some(Arc::new(InstanceMetadata::placeholder()));
                return Err(e);
            }
        };
        self.instance = Some(Arc::clone(&instance));

        let status = self.validate_ownership(&target).await?;

        let format = negotiate(headers);
        self.format = Some(format);
        Span::current().record("format", format.as_str());

        match format {
            NegotiatedFormat::WebPage => self.thread_page(&target, &instance, &status).await,
            NegotiatedFormat::FederationJson | NegotiatedFormat::FederationJsonLd => {
                self.federation_document(&target, format).await
            }
        }
    }

    /// The account must be local, the status visible, and the status
    /// authored by that account. A mismatch looks exactly like a missing
    /// status.
    async fn validate_ownership(&self, target: &TargetReference) -> Result<Status, WebError> {
        let ctx = &self.ctx;
        with_cancel(ctx, self.web.accounts.get_local_by_username(ctx, &target.handle)).await?;
        let status = with_cancel(ctx, self.web.statuses.get_status(ctx, &target.status_id)).await?;

        if status.account.username != target.handle.as_str() {
            debug!(
                status_id = %target.status_id,
                handle = %target.handle,
                "status author does not match handle"
            );
            return Err(WebError::NotFound(format!(
                "status {} not owned by @{}",
                target.status_id, target.handle
            )));
        }
        Ok(status)
    }

    async fn thread_page(
        &self,
        target: &TargetReference,
        instance: &InstanceMetadata,
        status: &Status,
    ) -> Result<Response, WebError> {
        let ctx = &self.ctx;
        let context = with_cancel(ctx, self.web.statuses.get_context(ctx, &target.status_id)).await?;

        let assets = PresentationAssets::for_thread(&self.web.config, &target.handle);
        let og = OgMeta::base(instance).with_status(status);
        let html = ThreadView {
            instance,
            status,
            context: &context,
            og: &og,
            stylesheets: &assets.stylesheets,
            javascript: &assets.javascript,
        }
        .render()
        .map_err(|e| WebError::Internal(anyhow::Error::new(e).context("rendering thread page")))?;

        Ok(([(header::VARY, "Accept")], Html(html)).into_response())
    }

    /// Never reuses the status fetched for the ownership check; the
    /// federation provider applies its own rules.
    async fn federation_document(
        &self,
        target: &TargetReference,
        format: NegotiatedFormat,
    ) -> Result<Response, WebError> {
        let ctx = &self.ctx;
        let document = with_cancel(
            ctx,
            self.web
                .federation
                .get_status_document(ctx, &target.handle, &target.status_id),
        )
        .await?;

        let body = document.to_bytes().map_err(|e| {
            WebError::Internal(anyhow::Error::new(e).context("serializing federation document"))
        })?;

        Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, format.mime()), (header::VARY, "Accept")],
            Bytes::from(body),
        )
            .into_response())
    }

    fn instance_getter(&self) -> InstanceGetter<'_> {
        match &self.instance {
            Some(instance) => InstanceGetter::Cached(Arc::clone(instance)),
            None => InstanceGetter::Live(self.web.instance.as_ref()),
        }
    }
}

/// Serves one thread request. Always produces a response; failures are
/// rendered by the error responder.
///
/// `handle_segment` is the raw first path segment, including its `@`.
pub async fn thread_get(
    web: &WebState,
    ctx: RequestContext,
    handle_segment: &str,
    status_segment: &str,
    headers: &HeaderMap,
) -> Response {
    let started = Instant::now();
    let mut request = ThreadRequest::new(web, ctx);

    let response = match request.run(handle_segment, status_segment, headers).await {
        Ok(response) => response,
        Err(err) => {
            error::respond(err, request.instance_getter(), &request.ctx, &web.config).await
        }
    };

    Span::current().record("status", response.status().as_u16());
    record_thread_request(request.format, response.status(), started.elapsed());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{issue_token, unix_now, BearerTokenResolver};
    use crate::memory::fixtures::{self, NESTED_REPLY_ID, PRIVATE_ID, REPLY_ID, ROOT_ID};
    use crate::memory::MemoryStore;
    use crate::web::negotiate::APP_ACTIVITY_LD_JSON;
    use crate::web::WebConfig;
    use axum::body::to_bytes;
    use axum::http::HeaderValue;
    use tokio_util::sync::CancellationToken;

    const SECRET: &[u8] = b"thread-secret";

    fn setup(config: WebConfig) -> (Arc<MemoryStore>, WebState) {
        let store = Arc::new(fixtures::seeded_store());
        let identity = Arc::new(BearerTokenResolver::new(Some(SECRET), store.clone()));
        let web = WebState::from_store(Arc::clone(&store), identity, config);
        (store, web)
    }

    fn ctx() -> RequestContext {
        RequestContext::anonymous("req-1", CancellationToken::new())
    }

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn body_bytes(response: Response) -> Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn browser_gets_thread_page() {
        let (store, web) = setup(WebConfig {
            accounts_allow_custom_css: true,
            ..WebConfig::default()
        });

        let response = thread_get(&web, ctx(), "@alice", ROOT_ID, &accept("text/html")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::VARY], "Accept");
        let html = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
        assert!(html.contains("Hello, fediverse!"));
        assert!(html.contains("Hi alice"));
        assert!(html.contains("Hi both"));
        assert!(html.contains("custom.css"));
        assert!(html.contains("status.css"));

        let counts = store.call_counts();
        assert_eq!(counts.instance, 1);
        assert_eq!(counts.contexts, 1);
        assert_eq!(counts.documents, 0);
    }

    #[tokio::test]
    async fn missing_accept_gets_thread_page() {
        let (_, web) = setup(WebConfig::default());
        let response = thread_get(&web, ctx(), "@alice", ROOT_ID, &HeaderMap::new()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
    }

    #[tokio::test]
    async fn ld_json_gets_exact_document_bytes() {
        let (store, web) = setup(WebConfig::default());
        let expected = {
            use fedithread_core::{FederationProvider, Handle, StatusId};
            store
                .get_status_document(
                    &ctx(),
                    &Handle::parse("bob").unwrap(),
                    &StatusId::parse(REPLY_ID).unwrap(),
                )
                .await
                .unwrap()
                .to_bytes()
                .unwrap()
        };

        let response =
            thread_get(&web, ctx(), "@bob", REPLY_ID, &accept(APP_ACTIVITY_LD_JSON)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], APP_ACTIVITY_LD_JSON);
        assert_eq!(body_bytes(response).await.as_ref(), expected.as_slice());
    }

    #[tokio::test]
    async fn activity_json_skips_thread_context() {
        let (store, web) = setup(WebConfig::default());

        let response = thread_get(
            &web,
            ctx(),
            "@alice",
            ROOT_ID,
            &accept("application/activity+json"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/activity+json");
        let counts = store.call_counts();
        assert_eq!(counts.contexts, 0);
        assert_eq!(counts.documents, 1);
    }

    #[tokio::test]
    async fn author_mismatch_is_not_found() {
        let (store, web) = setup(WebConfig::default());

        let response = thread_get(&web, ctx(), "@bob", ROOT_ID, &accept("text/html")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let counts = store.call_counts();
        assert_eq!(counts.instance, 1, "error page reuses fetched instance");
        assert_eq!(counts.contexts, 0);
        assert_eq!(counts.documents, 0);
    }

    #[tokio::test]
    async fn mismatch_and_missing_render_identically() {
        let (_, web) = setup(WebConfig::default());

        let mismatch = thread_get(&web, ctx(), "@bob", ROOT_ID, &HeaderMap::new()).await;
        let missing = thread_get(
            &web,
            ctx(),
            "@bob",
            "01H9XKQ3Z8V4N6T2B5C7D9E1ZZ",
            &HeaderMap::new(),
        )
        .await;

        assert_eq!(mismatch.status(), missing.status());
        assert_eq!(body_bytes(mismatch).await, body_bytes(missing).await);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized_before_lookups() {
        let (store, web) = setup(WebConfig::default());
        let token = issue_token(SECRET, "alice", unix_now() - 3600).unwrap();
        let mut headers = accept("text/html");
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let response = thread_get(&web, ctx(), "@alice", ROOT_ID, &headers).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let counts = store.call_counts();
        assert_eq!(counts.accounts, 0);
        assert_eq!(counts.statuses, 0);
    }

    #[tokio::test]
    async fn author_sees_own_private_status() {
        let (_, web) = setup(WebConfig::default());
        let token = issue_token(SECRET, "alice", unix_now() + 3600).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let response = thread_get(&web, ctx(), "@alice", PRIVATE_ID, &headers).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_private_status_is_not_found() {
        let (_, web) = setup(WebConfig::default());
        let response = thread_get(&web, ctx(), "@alice", PRIVATE_ID, &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_caller_private_status_is_forbidden() {
        let (_, web) = setup(WebConfig::default());
        let token = issue_token(SECRET, "bob", unix_now() + 3600).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let response = thread_get(&web, ctx(), "@alice", PRIVATE_ID, &headers).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn federation_failure_reuses_fetched_instance() {
        let (store, web) = setup(WebConfig::default());
        let token = issue_token(SECRET, "alice", unix_now() + 3600).unwrap();
        let mut headers = accept("application/activity+json");
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        // Ownership passes for the author; private statuses have no document.
        let response = thread_get(&web, ctx(), "@alice", PRIVATE_ID, &headers).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let counts = store.call_counts();
        assert_eq!(counts.instance, 1);
        assert_eq!(counts.contexts, 0);
        assert_eq!(counts.documents, 1);
    }

    #[tokio::test]
    async fn malformed_parameters_are_bad_request() {
        let (store, web) = setup(WebConfig::default());

        for (user, id) in [("@alice", "not-a-ulid"), ("@al!ce", ROOT_ID)] {
            let response = thread_get(&web, ctx(), user, id, &HeaderMap::new()).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{user} {id}");
        }
        assert_eq!(store.call_counts().accounts, 0);
    }

    #[tokio::test]
    async fn segment_without_at_is_not_found() {
        let (_, web) = setup(WebConfig::default());
        let response = thread_get(&web, ctx(), "alice", ROOT_ID, &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn handle_and_id_case_is_normalized() {
        let (_, web) = setup(WebConfig::default());
        let lower_id = NESTED_REPLY_ID.to_lowercase();
        let response = thread_get(&web, ctx(), "@CAROL", &lower_id, &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unavailable_instance_is_internal_error() {
        let (store, web) = setup(WebConfig::default());
        store.set_instance_unavailable(true);

        let response = thread_get(&web, ctx(), "@alice", ROOT_ID, &HeaderMap::new()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let counts = store.call_counts();
        assert_eq!(counts.instance, 1);
        assert_eq!(counts.accounts, 0);
    }

    #[tokio::test]
    async fn cancelled_request_is_internal_error() {
        let (store, web) = setup(WebConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        let response = thread_get(
            &web,
            RequestContext::anonymous("req-cancel", token),
            "@alice",
            ROOT_ID,
            &HeaderMap::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.call_counts().statuses, 0);
    }

    #[tokio::test]
    async fn remote_account_is_not_found() {
        let (_, web) = setup(WebConfig::default());
        let response = thread_get(&web, ctx(), "@dave", ROOT_ID, &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
