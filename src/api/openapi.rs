//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, authors, books, borrows, claims, health, support, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shelfmark API",
        version = "0.3.0",
        description = "Library lending REST API: catalog, borrows, fines and claims",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::obtain_token,
        auth::refresh_token,
        // Catalog
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Lending
        borrows::borrow_book,
        borrows::return_book,
        borrows::report_lost,
        borrows::approve_fine,
        borrows::my_borrows,
        borrows::list_borrows,
        // Claims
        claims::list_claims,
        claims::create_claim,
        claims::get_claim,
        claims::delete_claim,
        claims::claim_action,
        claims::review_claim,
        // Admin
        users::list_users,
        users::create_user,
        users::update_user_status,
        // Support
        support::submit_message,
        support::list_messages,
        support::mark_processed,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::RegisterUser,
            crate::models::user::TokenRequest,
            crate::models::user::TokenPair,
            crate::models::user::RefreshRequest,
            crate::models::user::AccessToken,
            // Users
            crate::models::user::UserSummary,
            crate::models::user::AdminCreateUser,
            crate::models::user::CreatedUser,
            crate::models::user::UpdateUserStatus,
            crate::models::user::UserStatusResponse,
            // Catalog
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::book::Book,
            crate::models::book::BookPage,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Lending
            crate::models::borrow::BorrowStatus,
            crate::models::borrow::BorrowDetails,
            crate::models::borrow::BorrowRequest,
            crate::models::borrow::BorrowActionRequest,
            // Claims
            crate::models::claim::ClaimType,
            crate::models::claim::ClaimStatus,
            crate::models::claim::ClaimDetails,
            crate::models::claim::CreateClaimRequest,
            crate::models::claim::ReviewClaimRequest,
            // Support
            crate::models::support_message::SupportMessage,
            crate::models::support_message::CreateSupportMessage,
            // Health
            health::HealthResponse,
            // Errors
            crate::api::DetailResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and tokens"),
        (name = "catalog", description = "Authors and books"),
        (name = "lending", description = "Borrowing, returns and fines"),
        (name = "claims", description = "Fine disputes"),
        (name = "users", description = "User administration"),
        (name = "support", description = "Support inbox")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_lending_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/borrow", "/return", "/report-lost", "/approve-fine", "/claims/review"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
