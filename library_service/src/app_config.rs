use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::resource("/add_book")
                .app_data(handlers::add_book_json_config())
                .route(web::post().to(handlers::add_book)),
        )
        .service(web::resource("/add_customer").route(web::post().to(handlers::add_customer)))
        .service(web::resource("/loan_book").route(web::post().to(handlers::loan_book)))
        .service(web::resource("/return_book").route(web::post().to(handlers::return_book)))
        .service(web::resource("/books").route(web::get().to(handlers::get_all_books)))
        .service(web::resource("/customers").route(web::get().to(handlers::get_all_customers)))
        .service(web::resource("/loans").route(web::get().to(handlers::get_all_loans)))
        .service(web::resource("/late_loans").route(web::get().to(handlers::get_late_loans)))
        .service(web::resource("/find_book").route(web::post().to(handlers::find_book)))
        .service(web::resource("/find_customer").route(web::post().to(handlers::find_customer)));
}
