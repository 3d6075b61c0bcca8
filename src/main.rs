use dotenv::dotenv;
use movie_catalog::configuration::get_configuration;
use movie_catalog::startup;
use movie_catalog::telemetry::{get_subscriber, init_subscriber};
use std::net::TcpListener;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    let subscriber = get_subscriber("movie_catalog", "info", std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration("configuration").map_err(|err| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!(
                "Failed to read `configuration.json`. Please make sure it exists and is valid JSON: {}",
                err
            ),
        )
    })?;
    let catalog = startup::build_catalog(&configuration)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Listening on {}", address);
    startup::run_server(listener, catalog, &configuration)?.await
}
