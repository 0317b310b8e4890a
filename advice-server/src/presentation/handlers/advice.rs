use actix_web::{HttpRequest, HttpResponse, Scope, guard, web};
use tracing::info;

use crate::application::advice_ledger::{AdviceLedger, NewAdvice};
use crate::domain::advice::Category;
use crate::domain::error::{DomainError, ValidationError};
use crate::infrastructure::security::JwtKeys;
use crate::presentation::dto::{CreateAdviceRequest, ListAdvicesQuery, ListAdvicesResponse};
use crate::presentation::middleware::JwtAuthMiddleware;
use crate::presentation::utils::{AuthenticatedUser, request_id};

/// Reading is public; adding needs a bearer token. The guards keep an
/// unsupported method from reaching the auth check.
pub fn scope(keys: JwtKeys) -> Scope {
    web::scope("/advices")
        .service(web::resource("").guard(guard::Get()).to(list_advices))
        .service(
            web::resource("")
                .guard(guard::Post())
                .wrap(JwtAuthMiddleware::new(keys))
                .to(create_advice),
        )
}

fn parse_category(raw: &str) -> Result<Category, ValidationError> {
    raw.trim()
        .to_lowercase()
        .parse()
        .map_err(ValidationError::InvalidCategory)
}

async fn list_advices(
    req: HttpRequest,
    ledger: web::Data<AdviceLedger>,
    query: web::Query<ListAdvicesQuery>,
) -> Result<HttpResponse, DomainError> {
    let category = match query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(raw) => Some(parse_category(raw)?),
        None => None,
    };
    let advices = ledger.list(category).await?;

    info!(
        request_id = %request_id(&req),
        count = advices.len(),
        "advices retrieved"
    );

    Ok(HttpResponse::Ok().json(ListAdvicesResponse {
        total: advices.len(),
        advices,
    }))
}

async fn create_advice(
    req: HttpRequest,
    user: AuthenticatedUser,
    ledger: web::Data<AdviceLedger>,
    payload: web::Json<CreateAdviceRequest>,
) -> Result<HttpResponse, DomainError> {
    let payload = payload.into_inner();
    let category = parse_category(&payload.category)?;
    let question = payload.question.trim().to_string();
    let answer = payload.answer.trim().to_string();
    if question.is_empty() {
        return Err(ValidationError::EmptyField("question").into());
    }
    if answer.is_empty() {
        return Err(ValidationError::EmptyField("answer").into());
    }

    let advice = ledger
        .create(NewAdvice {
            category,
            question,
            answer,
            author_id: payload.author_id.or(Some(user.id)),
        })
        .await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        author = %user.name,
        advice_id = %advice.id,
        "advice created"
    );

    Ok(HttpResponse::Created().json(advice))
}
