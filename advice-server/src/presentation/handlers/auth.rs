use actix_web::{HttpRequest, HttpResponse, Scope, post, web};
use tracing::info;

use crate::application::auth_service::{AuthService, Registration};
use crate::domain::error::DomainError;
use crate::domain::user::Role;
use crate::presentation::dto::{AuthResponse, LoginRequest, RegisterRequest, RegisterResponse};
use crate::presentation::utils::request_id;

pub fn scope() -> Scope {
    web::scope("/auth").service(register).service(login)
}

#[post("/register")]
async fn register(
    req: HttpRequest,
    service: web::Data<AuthService>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, DomainError> {
    let payload = payload.into_inner();
    let user = service
        .register(Registration {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            admin_key: payload.admin_key,
        })
        .await?;

    info!(request_id = %request_id(&req), user_id = %user.id, "registration completed");

    let message = match user.role {
        Role::Admin => "administrator registered successfully",
        Role::User => "user registered successfully",
    };
    Ok(HttpResponse::Created().json(RegisterResponse { user, message }))
}

#[post("/login")]
async fn login(
    req: HttpRequest,
    service: web::Data<AuthService>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, DomainError> {
    let signed = service.sign_in(&payload.email, &payload.password).await?;

    info!(request_id = %request_id(&req), user_id = %signed.user.id, "user logged in");

    Ok(HttpResponse::Ok().json(AuthResponse {
        user: signed.user,
        access_token: signed.access_token,
        token_type: "Bearer",
        expires_in: signed.expires_in,
    }))
}
