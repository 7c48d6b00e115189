use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures::future::LocalBoxFuture;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::errors::AppError;

pub const GATEWAY_KEY_HEADER: &str = "x-api-key";
pub const DIRECT_ACCESS_MESSAGE: &str = "Direct access to this service is not allowed";

/// Rejects requests that did not come through the API gateway, identified by
/// the shared secret in the `x-api-key` header.
#[derive(Clone)]
pub struct GatewayKeyMiddleware {
    expected_digest: [u8; 32],
}

fn digest(value: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value));
    out
}

impl GatewayKeyMiddleware {
    pub fn new(gateway_key: &SecretString) -> Self {
        Self {
            expected_digest: digest(gateway_key.expose_secret().as_bytes()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GatewayKeyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = GatewayKeyMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GatewayKeyMiddlewareService {
            service: Rc::new(service),
            expected_digest: self.expected_digest,
        }))
    }
}

pub struct GatewayKeyMiddlewareService<S> {
    service: Rc<S>,
    expected_digest: [u8; 32],
}

impl<S> GatewayKeyMiddlewareService<S> {
    fn is_from_gateway(&self, req: &ServiceRequest) -> bool {
        // Digests have a fixed length, so the comparison does not depend on
        // how much of the key matched.
        req.headers()
            .get(GATEWAY_KEY_HEADER)
            .filter(|value| !value.is_empty())
            .map(|value| digest(value.as_bytes()) == self.expected_digest)
            .unwrap_or(false)
    }
}

impl<S, B> Service<ServiceRequest> for GatewayKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !self.is_from_gateway(&req) {
            log::warn!(
                "Rejected direct request to {} {}",
                req.method(),
                req.path()
            );
            let response = AppError::Forbidden(DIRECT_ACCESS_MESSAGE.to_string()).error_response();
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    use super::*;

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().body("reached")
    }

    fn gate() -> GatewayKeyMiddleware {
        GatewayKeyMiddleware::new(&SecretString::from("shared-secret".to_string()))
    }

    #[actix_web::test]
    async fn missing_header_is_forbidden() {
        let app = test::init_service(
            App::new().service(web::scope("/api").wrap(gate()).route("/x", web::get().to(ok))),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/x").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], DIRECT_ACCESS_MESSAGE);
    }

    #[actix_web::test]
    async fn wrong_key_is_forbidden() {
        let app = test::init_service(
            App::new().service(web::scope("/api").wrap(gate()).route("/x", web::get().to(ok))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/x")
            .insert_header((GATEWAY_KEY_HEADER, "shared-secret-but-longer"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn matching_key_reaches_handler() {
        let app = test::init_service(
            App::new().service(web::scope("/api").wrap(gate()).route("/x", web::get().to(ok))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/x")
            .insert_header((GATEWAY_KEY_HEADER, "shared-secret"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        assert_eq!(body, "reached");
    }

    #[actix_web::test]
    async fn empty_key_never_matches_even_an_empty_secret() {
        let unset = GatewayKeyMiddleware::new(&SecretString::from(String::new()));
        let app = test::init_service(
            App::new().service(web::scope("/api").wrap(unset).route("/x", web::get().to(ok))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/x")
            .insert_header((GATEWAY_KEY_HEADER, ""))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/x").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
