use actix_web::{middleware, web, App, HttpResponse, HttpServer};

use super::{handlers, AppState, Config};
use crate::data;

async fn health() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().finish()
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("starting server at {}:{}", config.host, config.port);
    let addr = (config.host.clone(), config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(AppState {
                config: config.clone(),
                db: data::make_conn(&config.db_path),
            }))
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(health))
            .service(
                web::resource("/players")
                    .route(web::get().to(handlers::player::list))
                    .route(web::post().to(handlers::player::create)),
            )
            .service(
                web::resource("/players/{id}")
                    .route(web::put().to(handlers::player::update))
                    .route(web::delete().to(handlers::player::delete)),
            )
            .service(
                web::scope("/{ruleset}")
                    .service(
                        web::resource("/players").route(web::get().to(handlers::player::list_active)),
                    )
                    .service(
                        web::resource("/tournaments")
                            .route(web::get().to(handlers::tournament::list))
                            .route(web::post().to(handlers::tournament::create)),
                    )
                    .service(
                        web::resource("/tournaments/{id}")
                            .route(web::put().to(handlers::tournament::update))
                            .route(web::delete().to(handlers::tournament::delete)),
                    )
                    // the listings go before /games/{id} so "years" is not
                    // parsed as a game id
                    .service(web::resource("/games/years").route(web::get().to(handlers::game::years)))
                    .service(web::resource("/games/days").route(web::get().to(handlers::game::days)))
                    .service(web::resource("/games/ids").route(web::get().to(handlers::game::ids)))
                    .service(web::resource("/games").route(web::post().to(handlers::game::create)))
                    .service(
                        web::resource("/games/{id}")
                            .route(web::get().to(handlers::game::get))
                            .route(web::delete().to(handlers::game::delete)),
                    )
                    .service(
                        web::resource("/stats/analyze").route(web::get().to(handlers::stats::analyze)),
                    )
                    .service(
                        web::resource("/stats/ranking").route(web::get().to(handlers::stats::ranking)),
                    )
                    .service(
                        web::resource("/stats/trend").route(web::get().to(handlers::stats::trend)),
                    ),
            )
            .default_service(web::route().to(not_found))
    })
    .bind(addr)?
    .run()
    .await?;
    Ok(())
}
