//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{borrow_records, fines, health, physical_copies, readers, reservations, stats};

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "0.3.0",
        description = "School library circulation REST API: borrow records, reservations and fines",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Borrow records
        borrow_records::list_borrow_records,
        borrow_records::get_borrow_record,
        borrow_records::create_borrow_record,
        borrow_records::approve_borrow_record,
        borrow_records::reject_borrow_record,
        borrow_records::return_borrow_record,
        borrow_records::renew_borrow_record,
        borrow_records::mark_overdue,
        borrow_records::cancel_borrow_record,
        borrow_records::delete_borrow_record,
        borrow_records::fine_borrow_record,
        borrow_records::remind_borrow_record,
        // Reservations
        reservations::list_reservations,
        reservations::expiring_soon,
        reservations::list_book_reservations,
        reservations::get_reservation,
        reservations::create_reservation,
        reservations::fulfill_reservation,
        reservations::cancel_reservation,
        reservations::expire_reservation,
        // Fines
        fines::list_fines,
        fines::get_fine,
        fines::create_fine,
        fines::pay_fine,
        fines::waive_fine,
        // Copies
        physical_copies::get_copy,
        physical_copies::update_copy_status,
        // Readers
        readers::get_reader,
        readers::create_reader,
        readers::list_reader_types,
        // Stats
        stats::get_borrow_stats,
        stats::get_overdue_stats,
        stats::get_fine_stats,
        stats::get_reservation_stats,
    ),
    components(
        schemas(
            // Enums
            crate::models::enums::BorrowStatus,
            crate::models::enums::CopyStatus,
            crate::models::enums::ReservationStatus,
            crate::models::enums::FineStatus,
            crate::models::enums::FineReason,
            crate::models::enums::ReaderCategory,
            // Borrow records
            crate::models::borrow_record::BorrowRecord,
            crate::models::borrow_record::BorrowRecordDetails,
            crate::models::borrow_record::CreateBorrowRecord,
            crate::models::borrow_record::BorrowActionRequest,
            crate::models::borrow_record::ReturnBorrowRecord,
            crate::models::borrow_record::RenewBorrowRecord,
            crate::models::borrow_record::FineAndSettle,
            crate::models::borrow_record::ReminderRequest,
            borrow_records::FineSettlementResponse,
            borrow_records::ReminderResponse,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::CreateReservation,
            crate::models::reservation::FulfillReservation,
            crate::models::reservation::ReservationActionRequest,
            reservations::FulfillResponse,
            reservations::ExpireResponse,
            // Fines
            crate::models::fine::Fine,
            crate::models::fine::CreateFine,
            crate::models::fine::PayFine,
            crate::models::fine::WaiveFine,
            // Copies and readers
            crate::models::physical_copy::PhysicalCopy,
            crate::models::physical_copy::CopyShort,
            crate::models::physical_copy::UpdateCopyStatus,
            crate::models::reader::Reader,
            crate::models::reader::ReaderShort,
            crate::models::reader::ReaderType,
            crate::models::reader::ReaderWithType,
            crate::models::reader::CreateReader,
            // Stats
            stats::StatEntry,
            stats::BorrowStats,
            stats::OverdueStats,
            stats::FineStats,
            stats::ReservationStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "borrow-records", description = "Borrow record lifecycle"),
        (name = "reservations", description = "Reservations (holds)"),
        (name = "fines", description = "Fines and payments"),
        (name = "physical-copies", description = "Physical copies"),
        (name = "readers", description = "Readers and reader types"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_circulation_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/borrow-records/{id}/renew",
            "/reservations/{id}/fulfill",
            "/fines/{id}/pay",
            "/stats/overdue",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {}", expected);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
