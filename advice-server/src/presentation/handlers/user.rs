use actix_web::{HttpRequest, HttpResponse, Scope, web};
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::application::user_directory::ProfileUpdate;
use crate::domain::error::DomainError;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::dto::UpdateProfileRequest;
use crate::presentation::middleware::JwtAuthMiddleware;
use crate::presentation::utils::{AuthenticatedUser, request_id};

pub fn scope(keys: JwtKeys) -> Scope {
    web::scope("/users").service(
        web::resource("/me")
            .wrap(JwtAuthMiddleware::new(keys))
            .route(web::get().to(me))
            .route(web::put().to(update_me)),
    )
}

async fn me(
    user: AuthenticatedUser,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, DomainError> {
    let profile = service.get_user(user.id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn update_me(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<AuthService>,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, DomainError> {
    let payload = payload.into_inner();
    let profile = service
        .update_profile(
            user.id,
            ProfileUpdate {
                name: payload.name,
                email: payload.email,
                image: payload.image,
                password: payload.password,
            },
        )
        .await?;

    info!(request_id = %request_id(&req), user_id = %user.id, "profile updated");

    Ok(HttpResponse::Ok().json(profile))
}
