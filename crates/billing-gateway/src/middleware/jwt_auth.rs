//! JWT Authentication Middleware
//!
//! Guards operator endpoints with `Authorization: Bearer <token>` (HS256).
//! Valid claims are stored in request extensions; handlers read the caller
//! with [`get_user_id`]. Requests without a valid token are answered with
//! a JSON 401 and never reach the handler.
//!
//! # Usage
//!
//! ```ignore
//! web::scope("")
//!     .wrap(JwtAuth::new(config.server.jwt_secret.clone()))
//!     .route("/subscription", web::patch().to(handlers::update_subscription))
//! ```

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, HttpRequest, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::{
    future::{ready, Ready},
    rc::Rc,
};
use tracing::{debug, warn};

use crate::models::{Claims, ErrorResponse};

/// JWT authentication middleware
pub struct JwtAuth {
    secret: Rc<String>,
}

impl JwtAuth {
    pub fn new(secret: String) -> Self {
        Self {
            secret: Rc::new(secret),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
    secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
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
        let service = self.service.clone();
        let secret = self.secret.clone();

        Box::pin(async move {
            let claims = match bearer_token(&req).map(|token| validate_token(token, &secret)) {
                Some(Ok(claims)) => claims,
                Some(Err(e)) => {
                    warn!(error = %e, path = %req.path(), "Rejected invalid JWT");
                    return Ok(unauthorized(req, "Invalid or expired token"));
                }
                None => {
                    debug!(path = %req.path(), "Missing bearer token");
                    return Ok(unauthorized(req, "Missing bearer token"));
                }
            };

            debug!(user_id = %claims.sub, "Authenticated request");
            req.extensions_mut().insert(claims);

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Decode and verify an HS256 token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

fn unauthorized<B>(req: ServiceRequest, message: &str) -> ServiceResponse<EitherBody<B>> {
    let response = HttpResponse::Unauthorized().json(ErrorResponse::new("unauthorized", message));
    req.into_response(response).map_into_right_body()
}

/// Id of the authenticated caller
///
/// Fails when the request did not pass through [`JwtAuth`].
pub fn get_user_id(req: &HttpRequest) -> Result<String, actix_web::Error> {
    req.extensions()
        .get::<Claims>()
        .map(|claims| claims.sub.clone())
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("Authentication required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_secret_that_is_at_least_32_chars";

    fn token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match get_user_id(&req) {
            Ok(id) => HttpResponse::Ok().body(id),
            Err(_) => HttpResponse::InternalServerError().finish(),
        }
    }

    #[actix_web::test]
    async fn test_valid_token_reaches_handler() {
        let app = test::init_service(
            App::new().service(
                web::scope("")
                    .wrap(JwtAuth::new(SECRET.to_string()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let claims = Claims::new("operator-1".to_string(), "ops".to_string(), 1);
        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token(&claims, SECRET))))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body = test::read_body(resp).await;
        assert_eq!(body, "operator-1");
    }

    #[actix_web::test]
    async fn test_missing_token_is_rejected() {
        let app = test::init_service(
            App::new().service(
                web::scope("")
                    .wrap(JwtAuth::new(SECRET.to_string()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/whoami").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 401);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "unauthorized");
    }

    #[actix_web::test]
    async fn test_wrong_secret_is_rejected() {
        let app = test::init_service(
            App::new().service(
                web::scope("")
                    .wrap(JwtAuth::new(SECRET.to_string()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let claims = Claims::new("operator-1".to_string(), "ops".to_string(), 1);
        let forged = token(&claims, "another_secret_that_is_32_chars_long");
        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", forged)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_expired_token_fails_validation() {
        let claims = Claims::new("operator-1".to_string(), "ops".to_string(), -2);
        assert!(validate_token(&token(&claims, SECRET), SECRET).is_err());
    }
}
